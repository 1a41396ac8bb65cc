//! Curse meter and the per-spin cursed decision.

use crate::random::RandomSource;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

pub const METER_CEILING: u8 = 100;

/// Bounded curse meter, always within `0..=100`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CurseMeter(u8);

impl CurseMeter {
    pub const EMPTY: Self = Self(0);

    /// Clamps to the ceiling.
    pub fn new(value: u8) -> Self {
        Self(value.min(METER_CEILING))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for CurseMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurseRules {
    /// Meter gain after a spin that was not cursed.
    pub step: u8,
    /// Meter ceiling, at most 100.
    pub max: u8,
    /// Upper bound on the cursed chance, in percent.
    pub chance_cap: f64,
}

impl Default for CurseRules {
    fn default() -> Self {
        Self {
            step: 10,
            max: METER_CEILING,
            chance_cap: 50.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurseDecision {
    pub cursed: bool,
    /// Percent roll in `[0, 100)`.
    pub roll: f64,
    /// Percent chance the roll was compared against.
    pub chance: f64,
}

impl CurseRules {
    /// Cursed chance in percent: half the meter, capped.
    pub fn chance(&self, meter: CurseMeter) -> f64 {
        (f64::from(meter.value()) / 2.0).min(self.chance_cap)
    }

    pub fn decide(&self, meter: CurseMeter, rng: &mut impl RandomSource) -> CurseDecision {
        let chance = self.chance(meter);
        let roll = rng.unit() * 100.0;
        CurseDecision {
            cursed: roll < chance,
            roll,
            chance,
        }
    }

    /// Meter value to apply once a spin has been revealed.
    pub fn after_spin(&self, meter: CurseMeter, cursed: bool) -> CurseMeter {
        if cursed {
            CurseMeter::EMPTY
        } else {
            let ceiling = self.max.min(METER_CEILING);
            CurseMeter::new(meter.value().saturating_add(self.step).min(ceiling))
        }
    }
}
