// 💰 Settlement Engine - roster in, ranked result and budget changes out
//
// Every car pays the entry fee for its team. The winner's team collects 60%
// of the fees. Adjustments and the race log row are written in a single
// transaction (see `db::apply_settlement`).

use crate::db::{self, NewRaceResult};
use crate::entities::Car;
use crate::error::{RallyError, Result};
use crate::race::{rank_entries, round2, RaceEntry, RaceFactor};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Charged once per car entered
pub const ENTRY_FEE: f64 = 1_000.0;

/// Share of the collected fees paid to the winner
pub const PRIZE_SHARE: f64 = 0.6;

// ============================================================================
// PRIZE CREDIT POLICY
// ============================================================================

/// How many times the winning team is credited the prize.
///
/// The legacy settlement credited the winner twice, once before and once
/// after collecting entry fees. `Single` is the default; `Doubled` keeps the
/// old arithmetic for anyone replaying historical budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrizeCreditPolicy {
    #[default]
    Single,
    Doubled,
}

impl PrizeCreditPolicy {
    pub fn credits(&self) -> usize {
        match self {
            PrizeCreditPolicy::Single => 1,
            PrizeCreditPolicy::Doubled => 2,
        }
    }
}

// ============================================================================
// BUDGET ADJUSTMENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentReason {
    EntryFee,
    Prize,
}

/// Additive change to one team's budget, keyed by team name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAdjustment {
    pub team_name: String,
    pub amount: f64,
    pub reason: AdjustmentReason,
}

/// Everything one race writes to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub adjustments: Vec<BudgetAdjustment>,
    pub result: NewRaceResult,
}

impl Settlement {
    /// Sum of all adjustments for `team_name`
    pub fn net_delta(&self, team_name: &str) -> f64 {
        self.adjustments
            .iter()
            .filter(|a| a.team_name == team_name)
            .map(|a| a.amount)
            .sum()
    }
}

// ============================================================================
// RACE OUTCOME
// ============================================================================

/// Ranked entries of one race, before anything is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceOutcome {
    /// Fastest first
    pub entries: Vec<RaceEntry>,
    pub entry_fee: f64,
    pub prize: f64,
}

impl RaceOutcome {
    pub fn winner(&self) -> &RaceEntry {
        // evaluate() never builds an empty outcome
        &self.entries[0]
    }

    pub fn participants(&self) -> usize {
        self.entries.len()
    }

    pub fn total_fees(&self) -> f64 {
        self.participants() as f64 * self.entry_fee
    }

    /// 1-based positions with speed and time rounded for display
    pub fn standings(&self) -> Vec<Standing> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| Standing {
                position: i + 1,
                car_name: e.car_name.clone(),
                team_name: e.team_name.clone(),
                speed: round2(e.speed),
                time_minutes: round2(e.time_minutes),
            })
            .collect()
    }

    /// Text stored in the race log
    pub fn details(&self) -> String {
        let winner = self.winner();
        format!(
            "Winner: {} - Time: {} minutes",
            winner.car_name,
            round2(winner.time_minutes)
        )
    }

    /// Announcement shown to the user
    pub fn summary(&self) -> String {
        let winner = self.winner();
        format!(
            "🏆 Winner: {} from {}! Prize: ${}",
            winner.car_name,
            winner.team_name,
            format_money(self.prize)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub position: usize,
    pub car_name: String,
    pub team_name: String,
    pub speed: f64,
    pub time_minutes: f64,
}

/// What the presentation layer gets back after a race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceReport {
    pub race_id: i64,
    pub standings: Vec<Standing>,
    pub prize: f64,
    pub message: String,
    pub adjustments: Vec<BudgetAdjustment>,
}

// ============================================================================
// SETTLEMENT ENGINE
// ============================================================================

pub struct SettlementEngine {
    factor: Box<dyn RaceFactor>,
    entry_fee: f64,
    prize_share: f64,
    policy: PrizeCreditPolicy,
}

impl SettlementEngine {
    pub fn new(factor: Box<dyn RaceFactor>) -> Self {
        SettlementEngine {
            factor,
            entry_fee: ENTRY_FEE,
            prize_share: PRIZE_SHARE,
            policy: PrizeCreditPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PrizeCreditPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PrizeCreditPolicy {
        self.policy
    }

    pub fn entry_fee(&self) -> f64 {
        self.entry_fee
    }

    pub fn prize_share(&self) -> f64 {
        self.prize_share
    }

    /// Score and rank the roster. One factor draw per car, in roster order.
    pub fn evaluate(&mut self, cars: &[Car]) -> Result<RaceOutcome> {
        if cars.is_empty() {
            return Err(RallyError::NoCars);
        }

        let entries: Vec<RaceEntry> = cars
            .iter()
            .map(|car| {
                let entry = RaceEntry::evaluate(car, self.factor.as_mut());
                debug!(
                    car = %entry.car_name,
                    team = %entry.team_name,
                    speed = entry.speed,
                    time = entry.time_minutes,
                    "entry evaluated"
                );
                entry
            })
            .collect();

        let prize = entries.len() as f64 * self.entry_fee * self.prize_share;

        Ok(RaceOutcome {
            entries: rank_entries(entries),
            entry_fee: self.entry_fee,
            prize,
        })
    }

    /// Budget adjustments and log row for an outcome.
    ///
    /// Order: prize credit, one entry fee per car in finishing order, then
    /// the second prize credit when the policy is `Doubled`.
    pub fn settle(&self, outcome: &RaceOutcome) -> Settlement {
        let winner = outcome.winner();
        let prize_credit = || BudgetAdjustment {
            team_name: winner.team_name.clone(),
            amount: outcome.prize,
            reason: AdjustmentReason::Prize,
        };

        let mut adjustments = vec![prize_credit()];
        adjustments.extend(outcome.entries.iter().map(|e| BudgetAdjustment {
            team_name: e.team_name.clone(),
            amount: -outcome.entry_fee,
            reason: AdjustmentReason::EntryFee,
        }));
        for _ in 1..self.policy.credits() {
            adjustments.push(prize_credit());
        }

        Settlement {
            adjustments,
            result: NewRaceResult {
                winning_team_id: winner.team_id,
                total_participants: outcome.participants() as i64,
                prize_amount: outcome.prize,
                race_details: outcome.details(),
                raced_at: Utc::now(),
            },
        }
    }

    /// Read the roster, run the race, and persist the settlement atomically
    pub fn run_race(&mut self, conn: &mut Connection) -> Result<RaceReport> {
        let cars = db::get_all_cars(conn)?;
        let outcome = self.evaluate(&cars)?;
        let settlement = self.settle(&outcome);
        let race_id = db::apply_settlement(conn, &settlement)?;

        let winner = outcome.winner();
        info!(
            race_id,
            winner = %winner.car_name,
            team = %winner.team_name,
            participants = outcome.participants(),
            prize = outcome.prize,
            policy = ?self.policy,
            "race settled"
        );

        Ok(RaceReport {
            race_id,
            standings: outcome.standings(),
            prize: outcome.prize,
            message: outcome.summary(),
            adjustments: settlement.adjustments,
        })
    }
}

/// `1800.0` → `"1,800.00"`
pub fn format_money(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as i64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, grouped, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Performance;
    use crate::race::{FixedFactor, SequenceFactor, UniformFactor};

    fn car(id: i64, name: &str, team_id: i64, team: &str, perf: Performance) -> Car {
        Car {
            id,
            name: name.to_string(),
            team_id,
            team_name: team.to_string(),
            performance: perf,
        }
    }

    /// Speeds 80, 95 and 60 at factor 1.0
    fn scenario_roster() -> Vec<Car> {
        vec![
            car(1, "Slow Burner", 1, "Alpha", Performance::new(200, 1000, 50, 80)),
            car(2, "Red Thunder", 2, "Bravo", Performance::new(250, 1000, 50, 80)),
            car(3, "Old Faithful", 3, "Charlie", Performance::new(150, 1000, 40, 68)),
        ]
    }

    #[test]
    fn test_empty_roster() {
        let mut engine = SettlementEngine::new(Box::new(FixedFactor(1.0)));
        assert!(matches!(engine.evaluate(&[]), Err(RallyError::NoCars)));
    }

    #[test]
    fn test_scenario_ranking() {
        let mut engine = SettlementEngine::new(Box::new(FixedFactor(1.0)));
        let outcome = engine.evaluate(&scenario_roster()).unwrap();

        let standings = outcome.standings();
        assert_eq!(standings[0].car_name, "Red Thunder");
        assert_eq!(standings[0].position, 1);
        assert_eq!(standings[0].time_minutes, 63.16);
        assert_eq!(standings[1].car_name, "Slow Burner");
        assert_eq!(standings[1].time_minutes, 75.0);
        assert_eq!(standings[2].car_name, "Old Faithful");
        assert_eq!(standings[2].time_minutes, 100.0);
        assert_eq!(standings[2].position, 3);

        assert_eq!(outcome.prize, 1_800.0);
        assert_eq!(outcome.total_fees(), 3_000.0);
    }

    #[test]
    fn test_single_credit_deltas() {
        let mut engine = SettlementEngine::new(Box::new(FixedFactor(1.0)));
        let outcome = engine.evaluate(&scenario_roster()).unwrap();
        let settlement = engine.settle(&outcome);

        assert_eq!(settlement.adjustments.len(), 4);
        assert_eq!(settlement.net_delta("Bravo"), 800.0);
        assert_eq!(settlement.net_delta("Alpha"), -1_000.0);
        assert_eq!(settlement.net_delta("Charlie"), -1_000.0);
        assert_eq!(settlement.result.winning_team_id, 2);
        assert_eq!(settlement.result.total_participants, 3);
        assert_eq!(settlement.result.race_details, "Winner: Red Thunder - Time: 63.16 minutes");
    }

    #[test]
    fn test_doubled_credit_deltas() {
        let mut engine =
            SettlementEngine::new(Box::new(FixedFactor(1.0))).with_policy(PrizeCreditPolicy::Doubled);
        let outcome = engine.evaluate(&scenario_roster()).unwrap();
        let settlement = engine.settle(&outcome);

        assert_eq!(settlement.adjustments.len(), 5);
        assert_eq!(settlement.net_delta("Bravo"), 2_600.0);
        assert_eq!(settlement.net_delta("Alpha"), -1_000.0);
        let last = settlement.adjustments.last().unwrap();
        assert_eq!(last.reason, AdjustmentReason::Prize);
    }

    #[test]
    fn test_fee_charged_per_car_not_per_team() {
        let roster = vec![
            car(1, "A1", 1, "Alpha", Performance::new(400, 900, 100, 100)),
            car(2, "A2", 1, "Alpha", Performance::new(150, 1500, 30, 50)),
            car(3, "B1", 2, "Bravo", Performance::new(150, 1500, 30, 50)),
        ];
        let mut engine = SettlementEngine::new(Box::new(FixedFactor(1.0)));
        let outcome = engine.evaluate(&roster).unwrap();
        let settlement = engine.settle(&outcome);

        let alpha_fees = settlement
            .adjustments
            .iter()
            .filter(|a| a.team_name == "Alpha" && a.reason == AdjustmentReason::EntryFee)
            .count();
        assert_eq!(alpha_fees, 2);
        // 1800 prize - 2 fees
        assert_eq!(settlement.net_delta("Alpha"), -200.0);
        assert_eq!(settlement.net_delta("Bravo"), -1_000.0);
    }

    #[test]
    fn test_floor_ties_keep_roster_order() {
        let slow = Performance::new(150, 1500, 30, 50);
        let roster = vec![
            car(1, "First", 1, "Alpha", slow),
            car(2, "Second", 2, "Bravo", slow),
            car(3, "Third", 3, "Charlie", slow),
        ];
        let mut engine = SettlementEngine::new(Box::new(SequenceFactor::new(vec![0.8, 0.9, 1.0])));
        let outcome = engine.evaluate(&roster).unwrap();

        let names: Vec<&str> = outcome.entries.iter().map(|e| e.car_name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
        assert_eq!(outcome.winner().team_name, "Alpha");
    }

    #[test]
    fn test_random_outcome_is_sorted() {
        let roster: Vec<Car> = (0..20)
            .map(|i| {
                car(
                    i,
                    &format!("Car {}", i),
                    i,
                    &format!("Team {}", i),
                    Performance::new(150 + i * 12, 900 + i * 30, 30 + i * 3, 50 + i * 2),
                )
            })
            .collect();
        let mut engine = SettlementEngine::new(Box::new(UniformFactor::seeded(2024)));
        let outcome = engine.evaluate(&roster).unwrap();

        assert_eq!(outcome.participants(), 20);
        assert!(outcome
            .entries
            .windows(2)
            .all(|w| w[0].time_minutes <= w[1].time_minutes));
    }

    #[test]
    fn test_summary_message() {
        let mut engine = SettlementEngine::new(Box::new(FixedFactor(1.0)));
        let outcome = engine.evaluate(&scenario_roster()).unwrap();
        assert_eq!(outcome.summary(), "🏆 Winner: Red Thunder from Bravo! Prize: $1,800.00");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0.0), "0.00");
        assert_eq!(format_money(600.0), "600.00");
        assert_eq!(format_money(1_800.0), "1,800.00");
        assert_eq!(format_money(1_234_567.891), "1,234,567.89");
        assert_eq!(format_money(-2_500.5), "-2,500.50");
    }
}
