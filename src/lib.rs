//! Jack'o Darepot: a cursed slot machine that picks who plays what.
//!
//! The library holds the spin rules and the session that sequences a spin;
//! rendering belongs to whoever drives [`SpinSession`].

pub mod catalog;

pub mod config;

pub mod curse;

pub mod error;

pub mod outcome;

pub mod random;

pub mod session;

pub mod store;

pub mod test_helpers;

pub use catalog::{
    Challenge,
    Game,
    GameCatalog,
    Player,
    SpinPools,
};
pub use config::GameConfig;
pub use curse::{
    CurseDecision,
    CurseMeter,
    CurseRules,
};
pub use error::{
    Error,
    Result,
};
pub use outcome::{
    EmptyPool,
    PoolKind,
    SpinOutcome,
    resolve,
};
pub use random::{
    RandomSource,
    RngSource,
};
pub use session::{
    IgnoreReason,
    RevealPlan,
    RevealTimings,
    SessionPhase,
    SpinReport,
    SpinSession,
    Trigger,
};
pub use store::{
    CounterStore,
    Counters,
    FileStore,
    KeyValueStore,
    MemoryStore,
};
