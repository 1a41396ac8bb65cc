//! Persisted spin counters.
//!
//! Counters live in a string-encoded key/value store under the keys
//! [`CURSE_METER_KEY`] and [`SPIN_COUNT_KEY`]. Absent or unparsable values
//! load as zero.

use crate::{
    curse::{
        CurseMeter,
        METER_CEILING,
    },
    error::{
        Error,
        Result,
    },
};
use serde_json::Value;
use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    fs,
    io,
    path::{
        Path,
        PathBuf,
    },
    sync::{
        Arc,
        Mutex,
        PoisonError,
    },
};
use tracing::warn;

pub const CURSE_METER_KEY: &str = "curseMeter";
pub const SPIN_COUNT_KEY: &str = "spinCount";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Counters {
    pub curse_meter: CurseMeter,
    pub spin_count: u64,
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String) -> Result<()>;

    /// write several entries; stores that persist per write should override
    fn set_all(&mut self, entries: Vec<(&str, String)>) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Load/save port the spin session persists its counters through.
pub trait CounterStore {
    /// never fails; bad or missing values fall back to zero
    fn load(&self) -> Counters;

    fn save(&mut self, counters: Counters) -> Result<()>;
}

impl<K: KeyValueStore> CounterStore for K {
    fn load(&self) -> Counters {
        Counters {
            curse_meter: load_field(self, CURSE_METER_KEY, parse_curse_meter),
            spin_count: load_field(self, SPIN_COUNT_KEY, parse_spin_count),
        }
    }

    fn save(&mut self, counters: Counters) -> Result<()> {
        self.set_all(vec![
            (CURSE_METER_KEY, counters.curse_meter.value().to_string()),
            (SPIN_COUNT_KEY, counters.spin_count.to_string()),
        ])
    }
}

fn load_field<K, T>(store: &K, key: &'static str, parse: fn(&str) -> Option<T>) -> T
where
    K: KeyValueStore + ?Sized,
    T: Default,
{
    let Some(raw) = store.get(key) else {
        return T::default();
    };
    match parse(&raw) {
        Some(value) => value,
        None => {
            let err = Error::MalformedPersistedValue { key, raw };
            warn!(error = %err, "falling back to zero");
            T::default()
        }
    }
}

/// Accepts integer or decimal text; clamps into the meter range.
pub fn parse_curse_meter(raw: &str) -> Option<CurseMeter> {
    let value = raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    let clamped = value.clamp(0.0, f64::from(METER_CEILING));
    Some(CurseMeter::new(clamped.floor() as u8))
}

pub fn parse_spin_count(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(count) = raw.parse::<u64>() {
        return Some(count);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.trunc() as u64)
}

/// Process-local store. Clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: &str, value: impl Into<String>) -> Self {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.into());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key.to_string(), value);
        Ok(())
    }
}

/// A JSON object of string values kept in a single file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store, creating parent directories as needed. A missing
    /// file starts empty; an unreadable one is logged and replaced on the
    /// next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let entries = match fs::read(&path) {
            Ok(data) if data.is_empty() => BTreeMap::new(),
            Ok(data) => match serde_json::from_slice::<BTreeMap<String, Value>>(&data) {
                Ok(raw) => raw
                    .into_iter()
                    .map(|(key, value)| (key, value_text(value)))
                    .collect(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "state file unreadable, starting fresh");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::io(&path, e)),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.entries)
            .map_err(|e| Error::json(&self.path, e))?;
        fs::write(&self.path, json).map_err(|e| Error::io(&self.path, e))
    }
}

// Non-string values keep their JSON text; the counter parsers decide per field.
fn value_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn set_all(&mut self, entries: Vec<(&str, String)>) -> Result<()> {
        for (key, value) in entries {
            self.entries.insert(key.to_string(), value);
        }
        self.flush()
    }
}
