// ⚙️ Runtime configuration - command line first, environment as fallback

use crate::race::{RaceFactor, UniformFactor};
use crate::settlement::{PrizeCreditPolicy, SettlementEngine};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "rally", author, version, about = "Rally racing team management", long_about = None)]
pub struct RallyConfig {
    /// SQLite database file (created if missing)
    #[arg(long, env = "RALLY_DB", default_value = "rally.db")]
    pub db: PathBuf,

    /// Seed for the race random factor; omit for a fresh draw every race
    #[arg(long, env = "RALLY_SEED")]
    pub seed: Option<u64>,

    /// Credit the winner's prize twice (legacy settlement arithmetic)
    #[arg(long)]
    pub double_prize: bool,

    /// Where the interactive UI writes its log
    #[arg(long, default_value = "rally.log")]
    pub log_file: PathBuf,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive terminal UI (default)
    Ui,

    /// Run one race over the full roster and print the standings
    Race {
        #[arg(long)]
        json: bool,
    },

    /// List past race results
    History {
        #[arg(long)]
        json: bool,
    },
}

impl RallyConfig {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Ui)
    }

    pub fn prize_policy(&self) -> PrizeCreditPolicy {
        if self.double_prize {
            PrizeCreditPolicy::Doubled
        } else {
            PrizeCreditPolicy::Single
        }
    }

    pub fn race_factor(&self) -> Box<dyn RaceFactor> {
        match self.seed {
            Some(seed) => Box::new(UniformFactor::seeded(seed)),
            None => Box::new(UniformFactor::new()),
        }
    }

    pub fn settlement_engine(&self) -> SettlementEngine {
        SettlementEngine::new(self.race_factor()).with_policy(self.prize_policy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RallyConfig::try_parse_from(["rally", "--db", "test.db"]).unwrap();
        assert_eq!(config.db, PathBuf::from("test.db"));
        assert_eq!(config.command(), Command::Ui);
        assert_eq!(config.prize_policy(), PrizeCreditPolicy::Single);
        assert!(!config.verbose);
    }

    #[test]
    fn test_race_subcommand_with_options() {
        let config = RallyConfig::try_parse_from([
            "rally",
            "--db",
            "test.db",
            "--seed",
            "7",
            "--double-prize",
            "race",
            "--json",
        ])
        .unwrap();

        assert_eq!(config.seed, Some(7));
        assert_eq!(config.command(), Command::Race { json: true });
        assert_eq!(config.settlement_engine().policy(), PrizeCreditPolicy::Doubled);
    }

    #[test]
    fn test_seeded_factor_is_reproducible() {
        let config = RallyConfig::try_parse_from(["rally", "--db", "test.db", "--seed", "99"]).unwrap();
        let mut a = config.race_factor();
        let mut b = config.race_factor();
        assert_eq!(a.next_factor(), b.next_factor());
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(RallyConfig::try_parse_from(["rally", "delete-team"]).is_err());
    }
}
