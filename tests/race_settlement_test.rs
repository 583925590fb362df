use rally_management::{
    count_cars, get_all_cars, get_all_teams, get_race_results, insert_car, insert_team,
    open_database, FixedFactor, NewCar, NewTeam, Performance, PrizeCreditPolicy, RallyError,
    SettlementEngine,
};
use rusqlite::Connection;
use tempfile::TempDir;

/// Three teams, one car each. At factor 1.0 the cars run 80, 95 and 60 km/h.
fn seed_scenario(conn: &Connection) {
    let alpha = insert_team(conn, &NewTeam::new("Alpha", "Ann, Al", 15_000.0)).unwrap();
    let bravo = insert_team(conn, &NewTeam::new("Bravo", "Bea, Bo", 15_000.0)).unwrap();
    let charlie = insert_team(conn, &NewTeam::new("Charlie", "Cy", 15_000.0)).unwrap();

    insert_car(conn, &NewCar::new("Slow Burner", alpha, Performance::new(200, 1000, 50, 80))).unwrap();
    insert_car(conn, &NewCar::new("Red Thunder", bravo, Performance::new(250, 1000, 50, 80))).unwrap();
    insert_car(conn, &NewCar::new("Old Faithful", charlie, Performance::new(150, 1000, 40, 68))).unwrap();
}

fn budget(conn: &Connection, team: &str) -> f64 {
    get_all_teams(conn)
        .unwrap()
        .into_iter()
        .find(|t| t.name == team)
        .unwrap()
        .budget
}

#[test]
fn test_scenario_single_credit() {
    let dir = TempDir::new().unwrap();
    let mut conn = open_database(&dir.path().join("rally.db")).unwrap();
    seed_scenario(&conn);

    let mut engine = SettlementEngine::new(Box::new(FixedFactor(1.0)));
    let report = engine.run_race(&mut conn).unwrap();

    let order: Vec<&str> = report.standings.iter().map(|s| s.car_name.as_str()).collect();
    assert_eq!(order, vec!["Red Thunder", "Slow Burner", "Old Faithful"]);
    let times: Vec<f64> = report.standings.iter().map(|s| s.time_minutes).collect();
    assert_eq!(times, vec![63.16, 75.0, 100.0]);

    assert_eq!(report.prize, 1_800.0);
    assert_eq!(report.message, "🏆 Winner: Red Thunder from Bravo! Prize: $1,800.00");

    assert_eq!(budget(&conn, "Bravo"), 15_800.0);
    assert_eq!(budget(&conn, "Alpha"), 14_000.0);
    assert_eq!(budget(&conn, "Charlie"), 14_000.0);

    let history = get_race_results(&conn).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].race_id, report.race_id);
    assert_eq!(history[0].winning_team_name.as_deref(), Some("Bravo"));
    assert_eq!(history[0].total_participants, 3);
    assert_eq!(history[0].prize_amount, 1_800.0);
    assert_eq!(history[0].race_details, "Winner: Red Thunder - Time: 63.16 minutes");
}

#[test]
fn test_scenario_doubled_credit() {
    let dir = TempDir::new().unwrap();
    let mut conn = open_database(&dir.path().join("rally.db")).unwrap();
    seed_scenario(&conn);

    let mut engine =
        SettlementEngine::new(Box::new(FixedFactor(1.0))).with_policy(PrizeCreditPolicy::Doubled);
    engine.run_race(&mut conn).unwrap();

    // +1800 - 1000 + 1800
    assert_eq!(budget(&conn, "Bravo"), 17_600.0);
    assert_eq!(budget(&conn, "Alpha"), 14_000.0);
}

#[test]
fn test_empty_roster_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let mut conn = open_database(&dir.path().join("rally.db")).unwrap();
    insert_team(&conn, &NewTeam::new("Alpha", "Ann", 15_000.0)).unwrap();

    let mut engine = SettlementEngine::new(Box::new(FixedFactor(1.0)));
    let err = engine.run_race(&mut conn).unwrap_err();

    assert!(matches!(err, RallyError::NoCars));
    assert_eq!(budget(&conn, "Alpha"), 15_000.0);
    assert!(get_race_results(&conn).unwrap().is_empty());
}

#[test]
fn test_unknown_team_rejected_before_insert() {
    let dir = TempDir::new().unwrap();
    let conn = open_database(&dir.path().join("rally.db")).unwrap();

    let err = insert_car(&conn, &NewCar::new("Ghost", 42, Performance::default())).unwrap_err();

    assert!(err.is_validation());
    assert_eq!(count_cars(&conn).unwrap(), 0);
}

#[test]
fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rally.db");

    {
        let mut conn = open_database(&path).unwrap();
        seed_scenario(&conn);
        SettlementEngine::new(Box::new(FixedFactor(1.0)))
            .run_race(&mut conn)
            .unwrap();
    }

    let conn = open_database(&path).unwrap();
    assert_eq!(get_all_cars(&conn).unwrap().len(), 3);
    assert_eq!(get_race_results(&conn).unwrap().len(), 1);
    assert_eq!(budget(&conn, "Bravo"), 15_800.0);
}

#[test]
fn test_unreachable_database_is_connection_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("nested").join("rally.db");

    let err = open_database(&path).unwrap_err();
    assert!(matches!(err, RallyError::Connection { .. }));
}
