// 👥 Team Entity
//
// The team name is the display key: race settlement looks teams up by name,
// so the schema keeps it UNIQUE. The id is what cars reference.

use crate::error::{RallyError, Result};
use serde::{Deserialize, Serialize};

/// Lowest budget accepted at registration
pub const MIN_BUDGET: f64 = 5_000.0;

/// Highest budget accepted at registration
pub const MAX_BUDGET: f64 = 50_000.0;

/// Budget offered by the registration form
pub const DEFAULT_BUDGET: f64 = 15_000.0;

// ============================================================================
// TEAM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,

    /// Free text, e.g. "John Smith, Jane Doe"
    pub members: String,

    /// Signed; race settlement may push it below zero
    pub budget: f64,
}

// ============================================================================
// NEW TEAM (registration input)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTeam {
    pub name: String,
    pub members: String,
    pub budget: f64,
}

impl NewTeam {
    pub fn new(name: &str, members: &str, budget: f64) -> Self {
        NewTeam {
            name: name.trim().to_string(),
            members: members.trim().to_string(),
            budget,
        }
    }

    /// Check required fields and the budget bounds
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RallyError::validation("team name", "is required"));
        }

        if self.members.trim().is_empty() {
            return Err(RallyError::validation("team members", "are required"));
        }

        if !(MIN_BUDGET..=MAX_BUDGET).contains(&self.budget) {
            return Err(RallyError::validation(
                "budget",
                format!(
                    "{:.0} is outside {:.0}-{:.0}",
                    self.budget, MIN_BUDGET, MAX_BUDGET
                ),
            ));
        }

        Ok(())
    }
}
