//! Spin sequencing: `Idle -> Resolving -> Revealing -> Completed -> Idle`.
//!
//! A trigger fixes the outcome up front and schedules a single
//! reveal-complete event after [`RevealTimings::hold`]. Counters only move
//! once that event is handled, so the persisted meter and count never run
//! ahead of what the reels are showing.

use crate::{
    catalog::SpinPools,
    config::GameConfig,
    curse::{
        CurseMeter,
        CurseRules,
    },
    error::{
        Error,
        Result,
    },
    outcome::{
        EmptyPool,
        PoolKind,
        SpinOutcome,
        resolve,
    },
    random::{
        RandomSource,
        pick,
    },
    store::{
        CounterStore,
        Counters,
    },
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    time::Duration,
};
use tokio::time::Instant;
use tracing::{
    debug,
    error,
    info,
    warn,
};

/// Per-reel stop windows, measured from the trigger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealTimings {
    pub reel_stops_ms: Vec<u64>,
    /// Extra hold after the last reel stops.
    pub settle_ms: u64,
}

impl Default for RevealTimings {
    fn default() -> Self {
        Self {
            reel_stops_ms: vec![4000, 6000, 8000],
            settle_ms: 100,
        }
    }
}

impl RevealTimings {
    pub fn reel_count(&self) -> usize {
        self.reel_stops_ms.len()
    }

    pub fn reel_stop(&self, reel: usize) -> Option<Duration> {
        self.reel_stops_ms
            .get(reel)
            .copied()
            .map(Duration::from_millis)
    }

    /// Total time between trigger and completion.
    pub fn hold(&self) -> Duration {
        let last_stop = self.reel_stops_ms.iter().copied().max().unwrap_or(0);
        Duration::from_millis(last_stop.saturating_add(self.settle_ms))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SessionPhase {
    Idle,
    Resolving,
    Revealing,
    Completed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IgnoreReason {
    /// A spin is already in flight.
    Busy,
    EmptyPool(PoolKind),
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::Busy => f.write_str("a spin is already running"),
            IgnoreReason::EmptyPool(kind) => write!(f, "no {kind} to pick from"),
        }
    }
}

/// What the caller learns from a trigger.
#[derive(Clone, Debug, PartialEq)]
pub enum Trigger {
    Started(RevealPlan),
    Ignored(IgnoreReason),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RevealPlan {
    pub outcome: SpinOutcome,
    pub started_at: Instant,
    /// When the reveal-complete event is due.
    pub deadline: Instant,
}

/// Reported once a spin has been revealed and its counters applied.
#[derive(Clone, Debug, PartialEq)]
pub struct SpinReport {
    pub outcome: SpinOutcome,
    pub counters: Counters,
}

type OnComplete = Box<dyn FnOnce(&SpinOutcome)>;

struct Reveal {
    outcome: SpinOutcome,
    started_at: Instant,
    deadline: Instant,
    on_complete: OnComplete,
}

enum Phase {
    Idle,
    Resolving,
    Revealing(Reveal),
    Completed,
}

pub struct SpinSession<R, S> {
    phase: Phase,
    counters: Counters,
    rules: CurseRules,
    timings: RevealTimings,
    pools: SpinPools,
    rng: R,
    store: S,
}

impl<R, S> fmt::Debug for SpinSession<R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinSession")
            .field("phase", &self.phase())
            .field("counters", &self.counters)
            .field("rules", &self.rules)
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

impl<R, S> SpinSession<R, S> {
    pub fn phase(&self) -> SessionPhase {
        match self.phase {
            Phase::Idle => SessionPhase::Idle,
            Phase::Resolving => SessionPhase::Resolving,
            Phase::Revealing(_) => SessionPhase::Revealing,
            Phase::Completed => SessionPhase::Completed,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn curse_meter(&self) -> CurseMeter {
        self.counters.curse_meter
    }

    pub fn spin_count(&self) -> u64 {
        self.counters.spin_count
    }

    /// Cursed chance, in percent, for the next trigger.
    pub fn cursed_chance(&self) -> f64 {
        self.rules.chance(self.counters.curse_meter)
    }

    pub fn rules(&self) -> &CurseRules {
        &self.rules
    }

    pub fn timings(&self) -> &RevealTimings {
        &self.timings
    }

    pub fn pools(&self) -> &SpinPools {
        &self.pools
    }

    /// Replaces the pools. A spin already in flight keeps its outcome.
    pub fn set_pools(&mut self, pools: SpinPools) {
        self.pools = pools;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The outcome being revealed, if any.
    pub fn revealing(&self) -> Option<&SpinOutcome> {
        match &self.phase {
            Phase::Revealing(reveal) => Some(&reveal.outcome),
            _ => None,
        }
    }

    pub fn reveal_deadline(&self) -> Option<Instant> {
        match &self.phase {
            Phase::Revealing(reveal) => Some(reveal.deadline),
            _ => None,
        }
    }

    /// How many reels have reached their stop window at `now`. `None`
    /// outside a reveal.
    pub fn reels_stopped(&self, now: Instant) -> Option<usize> {
        let Phase::Revealing(reveal) = &self.phase else {
            return None;
        };
        let elapsed = now.saturating_duration_since(reveal.started_at);
        let stopped = self
            .timings
            .reel_stops_ms
            .iter()
            .filter(|stop| Duration::from_millis(**stop) <= elapsed)
            .count();
        Some(stopped)
    }

    fn missing_pool(&self) -> Option<PoolKind> {
        if self.pools.players.is_empty() {
            Some(PoolKind::Players)
        } else if self.pools.games.is_empty() {
            Some(PoolKind::Games)
        } else {
            None
        }
    }
}

impl<R: RandomSource, S: CounterStore> SpinSession<R, S> {
    /// Builds an idle session, loading counters from `store`.
    pub fn new(config: &GameConfig, pools: SpinPools, rng: R, store: S) -> Self {
        let counters = store.load();
        info!(
            curse_meter = %counters.curse_meter,
            spin_count = counters.spin_count,
            "loaded spin counters"
        );
        Self {
            phase: Phase::Idle,
            counters,
            rules: config.curse,
            timings: config.reveal.clone(),
            pools,
            rng,
            store,
        }
    }

    pub fn trigger<F>(&mut self, on_complete: F) -> Trigger
    where
        F: FnOnce(&SpinOutcome) + 'static,
    {
        self.trigger_at(Instant::now(), on_complete)
    }

    /// Starts a spin as of `now`. Ignored unless idle with players and games
    /// to pick from.
    pub fn trigger_at<F>(&mut self, now: Instant, on_complete: F) -> Trigger
    where
        F: FnOnce(&SpinOutcome) + 'static,
    {
        if !self.is_idle() {
            debug!(phase = ?self.phase(), "trigger ignored, spin in flight");
            return Trigger::Ignored(IgnoreReason::Busy);
        }
        if let Some(kind) = self.missing_pool() {
            warn!(pool = %kind, "trigger ignored, empty pool");
            return Trigger::Ignored(IgnoreReason::EmptyPool(kind));
        }

        self.phase = Phase::Resolving;
        let decision = self.rules.decide(self.counters.curse_meter, &mut self.rng);
        let outcome = match resolve(decision.cursed, &self.pools, &mut self.rng) {
            Ok(outcome) => outcome,
            Err(EmptyPool(kind)) => {
                self.phase = Phase::Idle;
                warn!(pool = %kind, cursed = decision.cursed, "trigger ignored, empty pool");
                return Trigger::Ignored(IgnoreReason::EmptyPool(kind));
            }
        };
        debug!(
            cursed = decision.cursed,
            roll = decision.roll,
            chance = decision.chance,
            %outcome,
            "spin resolved"
        );

        let deadline = now + self.timings.hold();
        self.phase = Phase::Revealing(Reveal {
            outcome: outcome.clone(),
            started_at: now,
            deadline,
            on_complete: Box::new(on_complete),
        });
        Trigger::Started(RevealPlan {
            outcome,
            started_at: now,
            deadline,
        })
    }

    pub fn finish_reveal(&mut self) -> Result<SpinReport> {
        self.finish_reveal_at(Instant::now())
    }

    /// Handles the reveal-complete event: applies the deferred meter update,
    /// counts the spin, persists both and fires the completion callback.
    /// Refused while the hold is still running.
    pub fn finish_reveal_at(&mut self, now: Instant) -> Result<SpinReport> {
        let reveal = match std::mem::replace(&mut self.phase, Phase::Completed) {
            Phase::Revealing(reveal) if now >= reveal.deadline => reveal,
            Phase::Revealing(reveal) => {
                let remaining = reveal.deadline - now;
                self.phase = Phase::Revealing(reveal);
                return Err(Error::RevealPending { remaining });
            }
            other => {
                self.phase = other;
                return Err(Error::SessionIdle);
            }
        };

        let Reveal {
            outcome,
            on_complete,
            ..
        } = reveal;
        self.counters = Counters {
            curse_meter: self
                .rules
                .after_spin(self.counters.curse_meter, outcome.is_cursed()),
            spin_count: self.counters.spin_count.saturating_add(1),
        };
        if let Err(e) = self.store.save(self.counters) {
            error!(error = %e, "failed to persist spin counters");
        }
        info!(
            %outcome,
            curse_meter = %self.counters.curse_meter,
            spin_count = self.counters.spin_count,
            "spin completed"
        );

        // Idle before the callback runs; a panicking callback leaves no spin in flight
        self.phase = Phase::Idle;
        on_complete(&outcome);
        Ok(SpinReport {
            outcome,
            counters: self.counters,
        })
    }

    /// Runs one spin end to end: trigger, wait out the reveal, complete.
    /// `Ok(None)` when the trigger was ignored.
    pub async fn spin<F>(&mut self, on_complete: F) -> Result<Option<SpinReport>>
    where
        F: FnOnce(&SpinOutcome) + 'static,
    {
        let plan = match self.trigger(on_complete) {
            Trigger::Started(plan) => plan,
            Trigger::Ignored(reason) => {
                debug!(%reason, "spin skipped");
                return Ok(None);
            }
        };
        tokio::time::sleep_until(plan.deadline).await;
        self.finish_reveal_at(plan.deadline.max(Instant::now()))
            .map(Some)
    }

    /// A flavor message for the presentation layer, drawn from the session's
    /// random source.
    pub fn flavor_message(&mut self) -> Option<&str> {
        pick(&self.pools.messages, &mut self.rng).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        store::MemoryStore,
        test_helpers::{
            ScriptedSource,
            sample_pools,
        },
    };
    use std::{
        cell::RefCell,
        rc::Rc,
    };

    fn session(
        rng: ScriptedSource,
        store: MemoryStore,
    ) -> SpinSession<ScriptedSource, MemoryStore> {
        SpinSession::new(&GameConfig::default(), sample_pools(), rng, store)
    }

    #[test]
    fn hold__is_last_reel_plus_settle() {
        assert_eq!(RevealTimings::default().hold(), Duration::from_millis(8100));
    }

    #[test]
    fn trigger_at__moves_to_revealing_without_touching_counters() {
        // given
        let rng = ScriptedSource::new().with_units([0.5]).with_indices([0, 0]);
        let mut session = session(rng, MemoryStore::new());
        let now = Instant::now();

        // when
        let trigger = session.trigger_at(now, |_| {});

        // then
        assert!(matches!(trigger, Trigger::Started(_)));
        assert_eq!(session.phase(), SessionPhase::Revealing);
        assert_eq!(session.counters(), Counters::default());
        assert_eq!(session.reveal_deadline(), Some(now + Duration::from_millis(8100)));
    }

    #[test]
    fn finish_reveal_at__refuses_before_deadline() {
        // given
        let rng = ScriptedSource::new().with_units([0.5]).with_indices([0, 0]);
        let mut session = session(rng, MemoryStore::new());
        let now = Instant::now();
        session.trigger_at(now, |_| {});

        // when
        let result = session.finish_reveal_at(now + Duration::from_millis(8000));

        // then
        assert!(matches!(result, Err(Error::RevealPending { .. })));
        assert_eq!(session.phase(), SessionPhase::Revealing);
        assert_eq!(session.spin_count(), 0);
    }

    #[test]
    fn finish_reveal_at__idle_session_is_an_error() {
        let mut session = session(ScriptedSource::new(), MemoryStore::new());
        let result = session.finish_reveal_at(Instant::now());
        assert!(matches!(result, Err(Error::SessionIdle)));
    }

    #[test]
    fn finish_reveal_at__applies_counters_then_calls_back_once() {
        // given
        let rng = ScriptedSource::new().with_units([0.5]).with_indices([0, 0]);
        let store = MemoryStore::new();
        let mut session = session(rng, store.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let persisted = store.clone();
        let now = Instant::now();
        session.trigger_at(now, move |outcome| {
            // counters are saved before the callback runs
            sink.borrow_mut().push((outcome.clone(), persisted.load()));
        });

        // when
        let report = session
            .finish_reveal_at(now + Duration::from_millis(8100))
            .unwrap();

        // then
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, report.outcome);
        assert_eq!(seen[0].1, report.counters);
        assert_eq!(report.counters.curse_meter.value(), 10);
        assert_eq!(report.counters.spin_count, 1);
        assert!(session.is_idle());
    }

    #[test]
    fn finish_reveal_at__panicking_callback_leaves_session_usable() {
        // given
        let rng = ScriptedSource::new()
            .with_units([0.5, 0.5])
            .with_indices([0, 0, 1, 1]);
        let mut session = session(rng, MemoryStore::new());
        let now = Instant::now();
        session.trigger_at(now, |_| panic!("callback blew up"));

        // when
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            session.finish_reveal_at(now + Duration::from_millis(8100))
        }));
        let again = session.trigger_at(now + Duration::from_millis(9000), |_| {});

        // then
        assert!(result.is_err());
        assert_eq!(session.spin_count(), 1);
        assert!(matches!(again, Trigger::Started(_)));
    }

    #[test]
    fn reels_stopped__counts_reels_past_their_window() {
        // given
        let rng = ScriptedSource::new().with_units([0.5]).with_indices([0, 0]);
        let mut session = session(rng, MemoryStore::new());
        let now = Instant::now();
        session.trigger_at(now, |_| {});

        // then
        assert_eq!(session.reels_stopped(now), Some(0));
        assert_eq!(session.reels_stopped(now + Duration::from_millis(4000)), Some(1));
        assert_eq!(session.reels_stopped(now + Duration::from_millis(7000)), Some(2));
        assert_eq!(session.reels_stopped(now + Duration::from_millis(8050)), Some(3));
    }

    #[test]
    fn reels_stopped__none_when_idle() {
        let session = session(ScriptedSource::new(), MemoryStore::new());
        assert_eq!(session.reels_stopped(Instant::now()), None);
    }

    #[test]
    fn trigger_at__cursed_roll_without_challenges_stays_idle() {
        // given
        let store = MemoryStore::new().with_entry(crate::store::CURSE_METER_KEY, "100");
        let rng = ScriptedSource::new().with_units([0.1]).with_indices([0]);
        let pools = SpinPools {
            challenges: Vec::new(),
            ..sample_pools()
        };
        let mut session = SpinSession::new(&GameConfig::default(), pools, rng, store);

        // when
        let trigger = session.trigger_at(Instant::now(), |_| {});

        // then
        assert_eq!(
            trigger,
            Trigger::Ignored(IgnoreReason::EmptyPool(PoolKind::Challenges))
        );
        assert!(session.is_idle());
        assert_eq!(session.curse_meter().value(), 100);
    }

    #[test]
    fn flavor_message__draws_from_messages() {
        // given
        let rng = ScriptedSource::new().with_indices([1]);
        let mut session = session(rng, MemoryStore::new());

        // when
        let message = session.flavor_message().map(str::to_string);

        // then
        assert_eq!(message, sample_pools().messages.get(1).cloned());
    }
}
