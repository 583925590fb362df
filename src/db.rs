use crate::entities::{Car, NewCar, NewTeam, Performance, Team};
use crate::error::{RallyError, Result};
use crate::settlement::Settlement;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Race log row, joined to the winning team's current name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub race_id: i64,
    pub winning_team_id: i64,
    pub winning_team_name: Option<String>,
    pub total_participants: i64,
    pub prize_amount: f64,
    pub race_details: String,
    pub raced_at: DateTime<Utc>,
}

/// Race log row before it has an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRaceResult {
    pub winning_team_id: i64,
    pub total_participants: i64,
    pub prize_amount: f64,
    pub race_details: String,
    pub raced_at: DateTime<Utc>,
}

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(|source| RallyError::Connection {
        path: path.to_path_buf(),
        source,
    })?;
    setup_database(&conn)?;
    info!(path = %path.display(), "database ready");
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Teams
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS racing_teams (
            team_id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_name TEXT UNIQUE NOT NULL,
            members TEXT NOT NULL,
            budget REAL NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Cars (immutable once inserted)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS racing_cars (
            car_id INTEGER PRIMARY KEY AUTOINCREMENT,
            car_name TEXT NOT NULL,
            team_id INTEGER NOT NULL REFERENCES racing_teams(team_id),
            engine_power INTEGER NOT NULL,
            weight_kg INTEGER NOT NULL,
            aerodynamics INTEGER NOT NULL,
            tire_quality INTEGER NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Race results (append-only log)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS race_results (
            race_id INTEGER PRIMARY KEY AUTOINCREMENT,
            winning_team_id INTEGER NOT NULL REFERENCES racing_teams(team_id),
            total_participants INTEGER NOT NULL,
            prize_amount REAL NOT NULL,
            race_details TEXT NOT NULL,
            raced_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_cars_team ON racing_cars(team_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// Teams
// ============================================================================

pub fn insert_team(conn: &Connection, team: &NewTeam) -> Result<i64> {
    if let Err(e) = team.validate() {
        warn!(error = %e, "rejected team");
        return Err(e);
    }

    let result = conn.execute(
        "INSERT INTO racing_teams (team_name, members, budget) VALUES (?1, ?2, ?3)",
        params![team.name, team.members, team.budget],
    );

    match result {
        Ok(_) => {
            let team_id = conn.last_insert_rowid();
            info!(team_id, name = %team.name, budget = team.budget, "team added");
            Ok(team_id)
        }
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            warn!(name = %team.name, "duplicate team name");
            Err(RallyError::validation(
                "team name",
                format!("'{}' already exists", team.name),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_all_teams(conn: &Connection) -> Result<Vec<Team>> {
    let mut stmt = conn.prepare(
        "SELECT team_id, team_name, members, budget
         FROM racing_teams
         ORDER BY team_id",
    )?;

    let teams = stmt
        .query_map([], |row| {
            Ok(Team {
                id: row.get(0)?,
                name: row.get(1)?,
                members: row.get(2)?,
                budget: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(teams)
}

pub fn find_team(conn: &Connection, team_id: i64) -> Result<Option<Team>> {
    let team = conn
        .query_row(
            "SELECT team_id, team_name, members, budget FROM racing_teams WHERE team_id = ?1",
            [team_id],
            |row| {
                Ok(Team {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    members: row.get(2)?,
                    budget: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(team)
}

/// Additive budget update keyed by team name
pub fn adjust_team_budget(conn: &Connection, team_name: &str, delta: f64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE racing_teams SET budget = budget + ?1 WHERE team_name = ?2",
        params![delta, team_name],
    )?;

    if updated == 0 {
        warn!(team = team_name, "budget update matched no team");
        return Err(RallyError::Storage(rusqlite::Error::QueryReturnedNoRows));
    }

    debug!(team = team_name, delta, "budget adjusted");
    Ok(())
}

pub fn count_teams(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM racing_teams", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// Cars
// ============================================================================

/// Insert a car after checking its fields and that its team exists
pub fn insert_car(conn: &Connection, car: &NewCar) -> Result<i64> {
    if let Err(e) = car.validate() {
        warn!(error = %e, "rejected car");
        return Err(e);
    }

    if find_team(conn, car.team_id)?.is_none() {
        warn!(team_id = car.team_id, "car references unknown team");
        return Err(RallyError::validation(
            "team",
            format!("no team with id {}", car.team_id),
        ));
    }

    conn.execute(
        "INSERT INTO racing_cars (
            car_name, team_id, engine_power, weight_kg, aerodynamics, tire_quality
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            car.name,
            car.team_id,
            car.performance.engine_power,
            car.performance.weight_kg,
            car.performance.aerodynamics,
            car.performance.tire_quality,
        ],
    )?;

    let car_id = conn.last_insert_rowid();
    info!(car_id, name = %car.name, team_id = car.team_id, "car added");
    Ok(car_id)
}

/// The roster: every car joined to its team. Cars without a team are not returned.
pub fn get_all_cars(conn: &Connection) -> Result<Vec<Car>> {
    let mut stmt = conn.prepare(
        "SELECT c.car_id, c.car_name, c.team_id, t.team_name,
                c.engine_power, c.weight_kg, c.aerodynamics, c.tire_quality
         FROM racing_cars c
         JOIN racing_teams t ON c.team_id = t.team_id
         ORDER BY c.car_id",
    )?;

    let cars = stmt
        .query_map([], |row| {
            Ok(Car {
                id: row.get(0)?,
                name: row.get(1)?,
                team_id: row.get(2)?,
                team_name: row.get(3)?,
                performance: Performance {
                    engine_power: row.get(4)?,
                    weight_kg: row.get(5)?,
                    aerodynamics: row.get(6)?,
                    tire_quality: row.get(7)?,
                },
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(cars)
}

pub fn count_cars(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM racing_cars", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// Race results
// ============================================================================

pub fn append_race_result(conn: &Connection, result: &NewRaceResult) -> Result<i64> {
    conn.execute(
        "INSERT INTO race_results (
            winning_team_id, total_participants, prize_amount, race_details, raced_at
        ) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            result.winning_team_id,
            result.total_participants,
            result.prize_amount,
            result.race_details,
            result.raced_at.to_rfc3339(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Race history, newest first
pub fn get_race_results(conn: &Connection) -> Result<Vec<RaceResult>> {
    let mut stmt = conn.prepare(
        "SELECT r.race_id, r.winning_team_id, t.team_name, r.total_participants,
                r.prize_amount, r.race_details, r.raced_at
         FROM race_results r
         LEFT JOIN racing_teams t ON r.winning_team_id = t.team_id
         ORDER BY r.race_id DESC",
    )?;

    let results = stmt
        .query_map([], |row| {
            let raced_at_str: String = row.get(6)?;

            Ok(RaceResult {
                race_id: row.get(0)?,
                winning_team_id: row.get(1)?,
                winning_team_name: row.get(2)?,
                total_participants: row.get(3)?,
                prize_amount: row.get(4)?,
                race_details: row.get(5)?,
                raced_at: DateTime::parse_from_rfc3339(&raced_at_str)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?
                    .with_timezone(&Utc),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(results)
}

/// Apply every budget adjustment and append the race result in one
/// transaction. Any failure rolls the whole settlement back.
pub fn apply_settlement(conn: &mut Connection, settlement: &Settlement) -> Result<i64> {
    let tx = conn.transaction()?;

    for adjustment in &settlement.adjustments {
        adjust_team_budget(&tx, &adjustment.team_name, adjustment.amount)?;
    }
    let race_id = append_race_result(&tx, &settlement.result)?;

    tx.commit()?;

    info!(
        race_id,
        adjustments = settlement.adjustments.len(),
        prize = settlement.result.prize_amount,
        "settlement committed"
    );
    Ok(race_id)
}
