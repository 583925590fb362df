// 🏁 Speed Model - turns a car's attributes into a race time
//
// base  = engine·0.3 + aero·0.2 + tires·0.25 − weight·0.01
// speed = max(base · factor, 50)
// time  = 100 km / speed, in minutes
//
// The factor comes from a `RaceFactor` so races can be replayed with a seed
// or pinned to a constant in tests.

use crate::entities::{Car, Performance};
use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Course length in km
pub const COURSE_DISTANCE_KM: f64 = 100.0;

/// Floor applied after the random factor
pub const MIN_SPEED: f64 = 50.0;

pub const FACTOR_LOW: f64 = 0.8;
pub const FACTOR_HIGH: f64 = 1.2;

const ENGINE_WEIGHT: f64 = 0.3;
const AERO_WEIGHT: f64 = 0.2;
const TIRE_WEIGHT: f64 = 0.25;
const MASS_PENALTY: f64 = 0.01;

// ============================================================================
// RANDOM FACTOR PROVIDERS
// ============================================================================

/// Source of the per-car multiplier. One call per car per race.
pub trait RaceFactor {
    fn next_factor(&mut self) -> f64;
}

/// Uniform draw from [0.8, 1.2]
pub struct UniformFactor<R: Rng> {
    rng: R,
}

impl<R: Rng> UniformFactor<R> {
    pub fn with_rng(rng: R) -> Self {
        UniformFactor { rng }
    }
}

impl UniformFactor<ThreadRng> {
    pub fn new() -> Self {
        Self::with_rng(rand::rng())
    }
}

impl Default for UniformFactor<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl UniformFactor<StdRng> {
    /// Reproducible sequence of factors
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RaceFactor for UniformFactor<R> {
    fn next_factor(&mut self) -> f64 {
        self.rng.random_range(FACTOR_LOW..=FACTOR_HIGH)
    }
}

/// Always returns the same factor
#[derive(Debug, Clone, Copy)]
pub struct FixedFactor(pub f64);

impl RaceFactor for FixedFactor {
    fn next_factor(&mut self) -> f64 {
        self.0
    }
}

/// Replays a list of factors, wrapping around at the end
#[derive(Debug, Clone)]
pub struct SequenceFactor {
    factors: Vec<f64>,
    next: usize,
}

impl SequenceFactor {
    pub fn new(factors: Vec<f64>) -> Self {
        SequenceFactor { factors, next: 0 }
    }
}

impl RaceFactor for SequenceFactor {
    fn next_factor(&mut self) -> f64 {
        if self.factors.is_empty() {
            return 1.0;
        }
        let factor = self.factors[self.next % self.factors.len()];
        self.next += 1;
        factor
    }
}

// ============================================================================
// SPEED & TIME
// ============================================================================

/// Linear score before randomness; may be zero or negative for heavy cars
pub fn base_speed(perf: &Performance) -> f64 {
    perf.engine_power as f64 * ENGINE_WEIGHT
        + perf.aerodynamics as f64 * AERO_WEIGHT
        + perf.tire_quality as f64 * TIRE_WEIGHT
        - perf.weight_kg as f64 * MASS_PENALTY
}

/// Speed for a known factor
pub fn speed_with_factor(perf: &Performance, factor: f64) -> f64 {
    (base_speed(perf) * factor).max(MIN_SPEED)
}

/// Speed in km/h, consuming one draw from `factor`
pub fn calculate_speed(perf: &Performance, factor: &mut dyn RaceFactor) -> f64 {
    speed_with_factor(perf, factor.next_factor())
}

/// Minutes to cover the course at `speed`
pub fn race_time_minutes(speed: f64) -> f64 {
    (COURSE_DISTANCE_KM / speed) * 60.0
}

/// Round to cents / hundredths for display and stored summaries
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// RACE ENTRY
// ============================================================================

/// One car's result in one race. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceEntry {
    pub car_id: i64,
    pub car_name: String,
    pub team_id: i64,
    pub team_name: String,
    pub speed: f64,
    pub time_minutes: f64,
}

impl RaceEntry {
    pub fn evaluate(car: &Car, factor: &mut dyn RaceFactor) -> Self {
        let speed = calculate_speed(&car.performance, factor);
        RaceEntry {
            car_id: car.id,
            car_name: car.name.clone(),
            team_id: car.team_id,
            team_name: car.team_name.clone(),
            speed,
            time_minutes: race_time_minutes(speed),
        }
    }
}

/// Fastest first. Stable, so equal times keep roster order.
pub fn rank_entries(mut entries: Vec<RaceEntry>) -> Vec<RaceEntry> {
    entries.sort_by(|a, b| a.time_minutes.total_cmp(&b.time_minutes));
    entries
}
