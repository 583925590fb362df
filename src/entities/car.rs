// 🏎️ Car Entity
//
// A car belongs to exactly one team and never changes after registration.
// Its four performance attributes feed the speed model in `race`.

use crate::error::{RallyError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// ATTRIBUTE RANGES
// ============================================================================

/// Inclusive range a performance attribute must fall in, plus the value the
/// registration form starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRange {
    pub label: &'static str,
    pub min: i64,
    pub max: i64,
    pub default: i64,
}

impl AttributeRange {
    pub const fn new(label: &'static str, min: i64, max: i64, default: i64) -> Self {
        AttributeRange {
            label,
            min,
            max,
            default,
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }

    fn check(&self, value: i64) -> Result<()> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(RallyError::validation(
                self.label,
                format!("{} is outside {}-{}", value, self.min, self.max),
            ))
        }
    }
}

pub const ENGINE_POWER: AttributeRange = AttributeRange::new("engine power", 150, 400, 250);
pub const WEIGHT_KG: AttributeRange = AttributeRange::new("weight (kg)", 900, 1500, 1200);
pub const AERODYNAMICS: AttributeRange = AttributeRange::new("aerodynamics", 30, 100, 70);
pub const TIRE_QUALITY: AttributeRange = AttributeRange::new("tire quality", 50, 100, 80);

// ============================================================================
// PERFORMANCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    pub engine_power: i64,
    pub weight_kg: i64,
    pub aerodynamics: i64,
    pub tire_quality: i64,
}

impl Performance {
    pub fn new(engine_power: i64, weight_kg: i64, aerodynamics: i64, tire_quality: i64) -> Self {
        Performance {
            engine_power,
            weight_kg,
            aerodynamics,
            tire_quality,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ENGINE_POWER.check(self.engine_power)?;
        WEIGHT_KG.check(self.weight_kg)?;
        AERODYNAMICS.check(self.aerodynamics)?;
        TIRE_QUALITY.check(self.tire_quality)?;
        Ok(())
    }
}

impl Default for Performance {
    fn default() -> Self {
        Performance {
            engine_power: ENGINE_POWER.default,
            weight_kg: WEIGHT_KG.default,
            aerodynamics: AERODYNAMICS.default,
            tire_quality: TIRE_QUALITY.default,
        }
    }
}

// ============================================================================
// CAR
// ============================================================================

/// A registered car, as read back joined to its owning team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: i64,
    pub name: String,
    pub team_id: i64,
    pub team_name: String,
    #[serde(flatten)]
    pub performance: Performance,
}

// ============================================================================
// NEW CAR (registration input)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCar {
    pub name: String,
    pub team_id: i64,
    #[serde(flatten)]
    pub performance: Performance,
}

impl NewCar {
    pub fn new(name: &str, team_id: i64, performance: Performance) -> Self {
        NewCar {
            name: name.trim().to_string(),
            team_id,
            performance,
        }
    }

    /// Field checks only; whether the team exists is a database question
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RallyError::validation("car name", "is required"));
        }
        self.performance.validate()
    }
}
