use crate::{
    curse::{
        CurseRules,
        METER_CEILING,
    },
    error::{
        Error,
        Result,
    },
    session::RevealTimings,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::Path,
};

/// Tunables for a spin session. Every field has a default, so a config file
/// only needs the values it changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub reveal: RevealTimings,
    pub curse: CurseRules,
}

impl GameConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| Error::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reveal.reel_stops_ms.is_empty() {
            return Err(Error::InvalidConfig(
                "reveal.reel_stops_ms needs at least one reel".to_string(),
            ));
        }
        if !self.reveal.reel_stops_ms.is_sorted() {
            return Err(Error::InvalidConfig(
                "reveal.reel_stops_ms must be in stopping order".to_string(),
            ));
        }
        if self.curse.step == 0 {
            return Err(Error::InvalidConfig(
                "curse.step must be positive".to_string(),
            ));
        }
        if self.curse.max > METER_CEILING {
            return Err(Error::InvalidConfig(format!(
                "curse.max must be at most {METER_CEILING}, got {}",
                self.curse.max
            )));
        }
        if !(0.0..=100.0).contains(&self.curse.chance_cap) {
            return Err(Error::InvalidConfig(format!(
                "curse.chance_cap must be a percentage, got {}",
                self.curse.chance_cap
            )));
        }
        Ok(())
    }
}
