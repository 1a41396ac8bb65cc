use crate::ui;
use chrono::{
    DateTime,
    Local,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use crossterm::event::EventStream;
use darepot::{
    FileStore,
    GameConfig,
    IgnoreReason,
    PoolKind,
    RngSource,
    SessionPhase,
    SpinOutcome,
    SpinPools,
    SpinSession,
    Trigger,
    catalog,
};
use futures::StreamExt;
use rand::{
    rngs::StdRng,
    seq::IndexedRandom,
};
use std::{
    collections::VecDeque,
    path::PathBuf,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time::{
        self,
        Instant,
    },
};
use tracing::{
    info,
    warn,
};

const ANIMATION_TICK: Duration = Duration::from_millis(80);
const RECENT_SPINS: usize = 8;
const IDLE_REEL: &str = "???";
const CURSE_MARK: &str = "6 6 6";
const OPENING_MESSAGE: &str = "THE CURSE HAS AWAKENED...";
const SPINNING_MESSAGE: &str = "THE WHEELS TURN IN DARKNESS...";
/// A challenge by this name is shown in the text box instead of a popup.
const MARKED_CHALLENGE: &str = "666";
const CURSED_FLASH: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub enum PoolSource {
    Directory(PathBuf),
    Demo { players: usize },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub game: GameConfig,
    pub pools: PoolSource,
    pub state_file: PathBuf,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct ReelView {
    pub label: &'static str,
    pub value: String,
    pub stopped: bool,
    pub cursed: bool,
}

#[derive(Clone, Debug)]
pub struct SpinRecord {
    pub at: DateTime<Local>,
    pub spin_number: u64,
    pub outcome: SpinOutcome,
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub curse_meter: u8,
    pub cursed_chance: f64,
    pub spin_count: u64,
    pub phase: SessionPhase,
    pub reels: Vec<ReelView>,
    pub message: String,
    pub status: String,
    pub recent: Vec<SpinRecord>,
    pub popup: Option<SpinOutcome>,
    pub cursed_flash: bool,
}

type Session = SpinSession<RngSource<StdRng>, FileStore>;

pub struct AppController {
    session: Session,
    outcome_tx: mpsc::UnboundedSender<SpinOutcome>,
    last_outcome: Option<SpinOutcome>,
    message: String,
    status: String,
    recent: VecDeque<SpinRecord>,
    popup: Option<SpinOutcome>,
    flash_until: Option<Instant>,
}

impl AppController {
    pub fn new(
        config: AppConfig,
        outcome_tx: mpsc::UnboundedSender<SpinOutcome>,
    ) -> Result<Self> {
        let pools = match &config.pools {
            PoolSource::Directory(dir) => catalog::load_pools(dir)
                .wrap_err_with(|| format!("loading pools from {}", dir.display()))?,
            PoolSource::Demo { players } => catalog::demo_pools(*players),
        };
        let rng = match config.seed {
            Some(seed) => RngSource::seeded(seed),
            None => RngSource::from_entropy(),
        };
        let store = FileStore::open(&config.state_file).wrap_err_with(|| {
            format!("opening state file {}", config.state_file.display())
        })?;
        let session = SpinSession::new(&config.game, pools, rng, store);
        let status = startup_status(session.pools());
        Ok(Self {
            session,
            outcome_tx,
            last_outcome: None,
            message: String::from(OPENING_MESSAGE),
            status,
            recent: VecDeque::with_capacity(RECENT_SPINS),
            popup: None,
            flash_until: None,
        })
    }

    pub fn reveal_deadline(&self) -> Option<Instant> {
        self.session.reveal_deadline()
    }

    pub fn is_revealing(&self) -> bool {
        self.session.phase() == SessionPhase::Revealing
    }

    /// Reels spinning or the cursed banner up: the screen needs ticks.
    pub fn is_animating(&self, now: Instant) -> bool {
        self.is_revealing() || self.flash_active(now)
    }

    fn flash_active(&self, now: Instant) -> bool {
        self.flash_until.is_some_and(|until| now < until)
    }

    /// Spin button: closes an open result first, otherwise triggers a spin.
    pub fn press_spin(&mut self) {
        if self.popup.take().is_some() {
            return;
        }
        let tx = self.outcome_tx.clone();
        let trigger = self.session.trigger(move |outcome| {
            let _ = tx.send(outcome.clone());
        });
        match trigger {
            Trigger::Started(_) => {
                self.message = self
                    .session
                    .flavor_message()
                    .unwrap_or(SPINNING_MESSAGE)
                    .to_string();
                self.status = String::from("Spinning...");
            }
            Trigger::Ignored(reason) => {
                self.status = format!("Spin ignored: {reason}");
            }
        }
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    pub fn finish_reveal(&mut self) {
        match self.session.finish_reveal() {
            Ok(report) => {
                self.status = format!(
                    "Spin #{} done, curse at {}%",
                    report.counters.spin_count, report.counters.curse_meter
                );
            }
            Err(e) => warn!(error = %e, "reveal timer fired without a finished reveal"),
        }
    }

    /// Completion callback delivery: record the result and open the popup.
    /// A marked challenge skips the popup and goes straight to the text box.
    pub fn show_result(&mut self, outcome: SpinOutcome) {
        let mut open_popup = true;
        if let SpinOutcome::Cursed { challenge, .. } = &outcome {
            self.message = challenge.text.clone();
            self.flash_until = Some(Instant::now() + CURSED_FLASH);
            open_popup = challenge.name != MARKED_CHALLENGE;
        }
        if self.recent.len() == RECENT_SPINS {
            self.recent.pop_back();
        }
        self.recent.push_front(SpinRecord {
            at: Local::now(),
            spin_number: self.session.spin_count(),
            outcome: outcome.clone(),
        });
        self.last_outcome = Some(outcome.clone());
        self.popup = open_popup.then_some(outcome);
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            curse_meter: self.session.curse_meter().value(),
            cursed_chance: self.session.cursed_chance(),
            spin_count: self.session.spin_count(),
            phase: self.session.phase(),
            reels: self.reels(Instant::now()),
            message: self.message.clone(),
            status: self.status.clone(),
            recent: self.recent.iter().cloned().collect(),
            popup: self.popup.clone(),
            cursed_flash: self.flash_active(Instant::now()),
        }
    }

    fn reels(&self, now: Instant) -> Vec<ReelView> {
        if let Some(outcome) = self.session.revealing() {
            let stopped = self.session.reels_stopped(now).unwrap_or(0);
            let pools = self.session.pools();
            let mut rng = rand::rng();
            return reel_values(outcome)
                .into_iter()
                .enumerate()
                .map(|(idx, (label, value))| {
                    let is_stopped = idx < stopped;
                    let value = if is_stopped {
                        value
                    } else {
                        let candidates = reel_candidates(pools, outcome.is_cursed(), idx);
                        candidates
                            .choose(&mut rng)
                            .cloned()
                            .unwrap_or_else(|| IDLE_REEL.to_string())
                    };
                    ReelView {
                        label,
                        value,
                        stopped: is_stopped,
                        cursed: outcome.is_cursed(),
                    }
                })
                .collect();
        }

        match &self.last_outcome {
            Some(outcome) => reel_values(outcome)
                .into_iter()
                .map(|(label, value)| ReelView {
                    label,
                    value,
                    stopped: true,
                    cursed: outcome.is_cursed(),
                })
                .collect(),
            None => ["Player", "Category", "Game"]
                .into_iter()
                .map(|label| ReelView {
                    label,
                    value: IDLE_REEL.to_string(),
                    stopped: true,
                    cursed: false,
                })
                .collect(),
        }
    }
}

fn startup_status(pools: &SpinPools) -> String {
    let missing = if pools.players.is_empty() {
        Some(PoolKind::Players)
    } else if pools.games.is_empty() {
        Some(PoolKind::Games)
    } else {
        None
    };
    match missing {
        Some(kind) => format!(
            "Spin unavailable: {}",
            IgnoreReason::EmptyPool(kind)
        ),
        None => String::from("Ready"),
    }
}

fn reel_values(outcome: &SpinOutcome) -> [(&'static str, String); 3] {
    match outcome {
        SpinOutcome::Normal {
            player,
            category,
            game,
        } => [
            ("Player", player.to_string()),
            ("Category", category.clone()),
            ("Game", game.name.clone()),
        ],
        SpinOutcome::Cursed { player, challenge } => [
            ("Player", player.to_string()),
            ("Curse", CURSE_MARK.to_string()),
            ("Challenge", challenge.name.clone()),
        ],
    }
}

fn reel_candidates(pools: &darepot::SpinPools, cursed: bool, reel: usize) -> Vec<String> {
    match (reel, cursed) {
        (0, _) => pools.players.iter().map(|p| p.to_string()).collect(),
        (1, false) => pools.games.categories().map(str::to_string).collect(),
        (1, true) => vec![CURSE_MARK.to_string()],
        (_, false) => pools
            .games
            .entries()
            .into_iter()
            .map(|(_, game)| game.name.clone())
            .collect(),
        (_, true) => pools.challenges.iter().map(|c| c.name.clone()).collect(),
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
    let mut controller = AppController::new(config, outcome_tx)?;
    let mut ui_state = ui::UiState::default();

    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&mut controller, &mut ui_state, &mut outcome_rx).await;
    ui::terminal_exit()?;
    res
}

async fn reveal_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn run_loop(
    controller: &mut AppController,
    ui_state: &mut ui::UiState,
    outcome_rx: &mut mpsc::UnboundedReceiver<SpinOutcome>,
) -> Result<()> {
    let mut input_events = EventStream::new();
    let mut ticker = time::interval(ANIMATION_TICK);
    ui::draw(ui_state, &controller.snapshot())?;
    loop {
        let deadline = controller.reveal_deadline();
        let animating = controller.is_animating(Instant::now());
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { break; }
            _ = reveal_elapsed(deadline) => controller.finish_reveal(),
            Some(outcome) = outcome_rx.recv() => controller.show_result(outcome),
            _ = ticker.tick(), if animating => {}
            maybe_event = input_events.next() => {
                let event = match maybe_event {
                    Some(event) => event.wrap_err("reading terminal input failed")?,
                    None => break,
                };
                match ui::handle_event(ui_state, event) {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Spin => controller.press_spin(),
                    ui::UserEvent::ClosePopup => controller.close_popup(),
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::Ignore => continue,
                }
            }
        }
        ui::draw(ui_state, &controller.snapshot()).wrap_err("draw failed")?;
    }
    Ok(())
}
