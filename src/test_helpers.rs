use crate::{
    catalog::{
        Challenge,
        Game,
        GameCatalog,
        Player,
        SpinPools,
    },
    error::{
        Error,
        Result,
    },
    random::RandomSource,
    store::{
        KeyValueStore,
        MemoryStore,
    },
};
use std::{
    collections::VecDeque,
    io,
};

/// Replays queued draws. Panics when a queue runs dry so a test never
/// silently depends on more randomness than it scripted.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSource {
    units: VecDeque<f64>,
    indices: VecDeque<usize>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units(mut self, units: impl IntoIterator<Item = f64>) -> Self {
        self.units.extend(units);
        self
    }

    pub fn with_indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.indices.extend(indices);
        self
    }
}

impl RandomSource for ScriptedSource {
    fn unit(&mut self) -> f64 {
        self.units.pop_front().expect("scripted unit draws exhausted")
    }

    fn index(&mut self, len: usize) -> usize {
        let idx = self
            .indices
            .pop_front()
            .expect("scripted index draws exhausted");
        assert!(idx < len, "scripted index {idx} out of range for {len}");
        idx
    }
}

pub fn sample_pools() -> SpinPools {
    SpinPools {
        players: vec![Player::new("Ann"), Player::new("Bob"), Player::new("Cyd")],
        games: GameCatalog::new()
            .with_category("Arcade", [Game::named("Pong"), Game::named("Galaga")])
            .with_category("Puzzle", [Game::named("Tetris")]),
        challenges: vec![
            Challenge::new("Blindfold", "Play without looking."),
            Challenge::new("Off Hand", "Use only your weaker hand."),
        ],
        messages: vec![
            "THE CURSE HAS AWAKENED...".to_string(),
            "THE WHEELS TURN IN DARKNESS...".to_string(),
        ],
    }
}

/// Reads like a [`MemoryStore`] but refuses every write.
#[derive(Clone, Debug, Default)]
pub struct ReadOnlyStore {
    inner: MemoryStore,
}

impl ReadOnlyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner }
    }
}

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, _value: String) -> Result<()> {
        Err(Error::io(
            key,
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only store"),
        ))
    }
}
