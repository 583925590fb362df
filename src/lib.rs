// Rally Racing Management - Core Library
// Exposes all modules for use in the interactive UI, headless commands, and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod logging;
pub mod race;
pub mod settlement;

// Re-export commonly used types
pub use config::{Command, RallyConfig};
pub use db::{
    NewRaceResult, RaceResult,
    open_database, setup_database,
    get_all_teams, get_all_cars, insert_team, insert_car, find_team,
    adjust_team_budget, append_race_result, get_race_results, apply_settlement,
    count_teams, count_cars,
};
pub use entities::{AttributeRange, Car, NewCar, NewTeam, Performance, Team};
pub use error::{RallyError, Result};
pub use race::{
    FixedFactor, RaceEntry, RaceFactor, SequenceFactor, UniformFactor,
    calculate_speed, race_time_minutes,
};
pub use settlement::{
    AdjustmentReason, BudgetAdjustment, PrizeCreditPolicy, RaceOutcome, RaceReport,
    Settlement, SettlementEngine, Standing,
    ENTRY_FEE, PRIZE_SHARE, format_money,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
