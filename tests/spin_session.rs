#![allow(non_snake_case)]
use darepot::{
    Challenge,
    CounterStore,
    Game,
    GameCatalog,
    GameConfig,
    IgnoreReason,
    MemoryStore,
    Player,
    PoolKind,
    SessionPhase,
    SpinOutcome,
    SpinPools,
    SpinSession,
    Trigger,
    store::CURSE_METER_KEY,
    test_helpers::*,
};
use std::{
    cell::RefCell,
    rc::Rc,
    time::Duration,
};
use tokio::time::Instant;

type Seen = Rc<RefCell<Vec<SpinOutcome>>>;

fn recorder() -> (Seen, impl FnOnce(&SpinOutcome) + 'static) {
    let seen: Seen = Rc::default();
    let sink = seen.clone();
    (seen, move |outcome: &SpinOutcome| {
        sink.borrow_mut().push(outcome.clone())
    })
}

#[tokio::test(start_paused = true)]
async fn spin__quiet_meter_never_curses_and_builds_up() {
    // given
    let store = MemoryStore::new();
    let rng = ScriptedSource::new().with_units([0.5]).with_indices([0, 0]);
    let mut session = SpinSession::new(&GameConfig::default(), sample_pools(), rng, store.clone());
    let (seen, on_complete) = recorder();

    // when
    let report = session.spin(on_complete).await.unwrap().unwrap();

    // then
    assert!(!report.outcome.is_cursed());
    assert_eq!(report.counters.curse_meter.value(), 10);
    assert_eq!(report.counters.spin_count, 1);
    assert_eq!(store.load(), report.counters);
    assert_eq!(seen.borrow().as_slice(), &[report.outcome]);
}

#[tokio::test(start_paused = true)]
async fn spin__full_meter_curses_on_low_roll_and_resets() {
    // given
    let store = MemoryStore::new().with_entry(CURSE_METER_KEY, "100");
    let rng = ScriptedSource::new().with_units([0.3]).with_indices([1, 0]);
    let mut session = SpinSession::new(&GameConfig::default(), sample_pools(), rng, store.clone());
    assert_eq!(session.cursed_chance(), 50.0);
    let (seen, on_complete) = recorder();

    // when
    let report = session.spin(on_complete).await.unwrap().unwrap();

    // then
    assert_eq!(
        report.outcome,
        SpinOutcome::Cursed {
            player: Player::new("Bob"),
            challenge: Challenge::new("Blindfold", "Play without looking."),
        }
    );
    assert_eq!(report.counters.curse_meter.value(), 0);
    assert_eq!(report.counters.spin_count, 1);
    assert_eq!(seen.borrow().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn trigger__no_players_is_a_no_op() {
    // given
    let pools = SpinPools {
        players: Vec::new(),
        ..sample_pools()
    };
    let store = MemoryStore::new();
    let mut session = SpinSession::new(
        &GameConfig::default(),
        pools,
        ScriptedSource::new(),
        store.clone(),
    );
    let (seen, on_complete) = recorder();

    // when
    let trigger = session.trigger(on_complete);
    tokio::time::sleep(Duration::from_secs(10)).await;

    // then
    assert_eq!(
        trigger,
        Trigger::Ignored(IgnoreReason::EmptyPool(PoolKind::Players))
    );
    assert!(session.is_idle());
    assert!(seen.borrow().is_empty());
    assert_eq!(store.load().spin_count, 0);
}

#[tokio::test(start_paused = true)]
async fn spin__normal_outcome_reports_the_games_own_category() {
    // given
    let pools = SpinPools {
        players: vec![Player::new("Ann")],
        games: GameCatalog::new()
            .with_category("Arcade", [Game::named("Pong")])
            .with_category("Puzzle", [Game::named("Tetris")]),
        ..SpinPools::default()
    };
    let rng = ScriptedSource::new().with_units([0.9]).with_indices([0, 1]);
    let mut session = SpinSession::new(&GameConfig::default(), pools, rng, MemoryStore::new());

    // when
    let report = session.spin(|_| {}).await.unwrap().unwrap();

    // then
    assert_eq!(
        report.outcome,
        SpinOutcome::Normal {
            player: Player::new("Ann"),
            category: "Puzzle".to_string(),
            game: Game::named("Tetris"),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn trigger__while_revealing_is_ignored_and_fires_once() {
    // given
    let rng = ScriptedSource::new().with_units([0.5]).with_indices([2, 2]);
    let mut session =
        SpinSession::new(&GameConfig::default(), sample_pools(), rng, MemoryStore::new());
    let (seen, on_complete) = recorder();
    let (second_seen, second_complete) = recorder();
    let Trigger::Started(plan) = session.trigger(on_complete) else {
        panic!("first trigger should start a reveal");
    };

    // when
    tokio::time::sleep(Duration::from_millis(5000)).await;
    let second = session.trigger(second_complete);
    tokio::time::sleep_until(plan.deadline).await;
    let report = session.finish_reveal().unwrap();

    // then
    assert_eq!(second, Trigger::Ignored(IgnoreReason::Busy));
    assert_eq!(report.outcome, plan.outcome);
    assert_eq!(report.counters.spin_count, 1);
    assert_eq!(seen.borrow().len(), 1);
    assert!(second_seen.borrow().is_empty());
}

#[tokio::test(start_paused = true)]
async fn finish_reveal__waits_for_the_full_hold() {
    // given
    let rng = ScriptedSource::new().with_units([0.5]).with_indices([0, 0]);
    let mut session =
        SpinSession::new(&GameConfig::default(), sample_pools(), rng, MemoryStore::new());
    let started = Instant::now();
    session.trigger(|_| {});

    // when
    tokio::time::sleep(Duration::from_millis(8000)).await;
    let early = session.finish_reveal();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let on_time = session.finish_reveal();

    // then
    assert!(early.is_err());
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(on_time.is_ok());
    assert!(Instant::now() - started >= Duration::from_millis(8100));
}

#[tokio::test(start_paused = true)]
async fn spin__failed_save_still_completes() {
    // given
    let store = ReadOnlyStore::new(MemoryStore::new());
    let rng = ScriptedSource::new().with_units([0.5]).with_indices([0, 0]);
    let mut session = SpinSession::new(&GameConfig::default(), sample_pools(), rng, store);
    let (seen, on_complete) = recorder();

    // when
    let report = session.spin(on_complete).await.unwrap().unwrap();

    // then
    assert_eq!(report.counters.spin_count, 1);
    assert_eq!(session.spin_count(), 1);
    assert!(session.store().load().spin_count == 0);
    assert_eq!(seen.borrow().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn spin__meter_climbs_until_it_hits_the_ceiling() {
    // given
    let rolls = vec![0.99; 12];
    let indices = [0, 0].repeat(12);
    let rng = ScriptedSource::new().with_units(rolls).with_indices(indices);
    let mut session =
        SpinSession::new(&GameConfig::default(), sample_pools(), rng, MemoryStore::new());

    // when
    let mut meters = Vec::new();
    for _ in 0..12 {
        let report = session.spin(|_| {}).await.unwrap().unwrap();
        meters.push(report.counters.curse_meter.value());
    }

    // then
    assert_eq!(
        meters,
        vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 100, 100]
    );
    assert_eq!(session.spin_count(), 12);
}
