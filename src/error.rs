use crate::outcome::EmptyPool;
use std::{
    path::PathBuf,
    time::Duration,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    EmptyPool(#[from] EmptyPool),

    #[error("stored value for `{key}` is not a number: {raw:?}")]
    MalformedPersistedValue { key: &'static str, raw: String },

    #[error("reveal still running, {remaining:?} left")]
    RevealPending { remaining: Duration },

    #[error("no spin is being revealed")]
    SessionIdle,

    #[error("invalid game config: {0}")]
    InvalidConfig(String),

    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
