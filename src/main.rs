// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::Parser;

use rally_management::{
    format_money, get_all_teams, get_race_results, logging, open_database, Command, RallyConfig,
    RallyError,
};

fn main() -> Result<()> {
    let config = RallyConfig::parse();

    match config.command() {
        Command::Race { json } => {
            logging::init_cli_logger(config.verbose);
            run_race(&config, json)?;
        }
        Command::History { json } => {
            logging::init_cli_logger(config.verbose);
            run_history(&config, json)?;
        }
        Command::Ui => run_ui_mode(&config)?,
    }

    Ok(())
}

fn run_race(config: &RallyConfig, json: bool) -> Result<()> {
    let mut conn = open_database(&config.db)?;
    let mut engine = config.settlement_engine();

    let report = match engine.run_race(&mut conn) {
        Ok(report) => report,
        Err(RallyError::NoCars) => {
            eprintln!("⚠️  No cars available for racing! Please add cars first.");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("🏁 Rally Race - {} cars, 100km", report.standings.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "{:>4}  {:<24} {:<20} {:>10} {:>10}",
        "Pos", "Car", "Team", "km/h", "Minutes"
    );
    for s in &report.standings {
        println!(
            "{:>4}  {:<24} {:<20} {:>10.2} {:>10.2}",
            s.position, s.car_name, s.team_name, s.speed, s.time_minutes
        );
    }

    println!("\n{}", report.message);

    println!("\n💰 Updated Team Budgets");
    for team in get_all_teams(&conn)? {
        println!("   {:<24} ${:>12}", team.name, format_money(team.budget));
    }

    Ok(())
}

fn run_history(config: &RallyConfig, json: bool) -> Result<()> {
    let conn = open_database(&config.db)?;
    let results = get_race_results(&conn)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No races run yet.");
        return Ok(());
    }

    println!("🏆 Race History ({} races)", results.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for race in &results {
        let winner = race
            .winning_team_name
            .clone()
            .unwrap_or_else(|| format!("team #{}", race.winning_team_id));
        println!(
            "#{:<4} {}  {:<20} {:>3} cars  ${:>10}  {}",
            race.race_id,
            race.raced_at.format("%Y-%m-%d %H:%M"),
            winner,
            race.total_participants,
            format_money(race.prize_amount),
            race.race_details
        );
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &RallyConfig) -> Result<()> {
    logging::init_file_logger(config.verbose, &config.log_file)?;

    println!("🖥️  Loading Rally Racing Management...\n");

    let conn = match open_database(&config.db) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("❌ Cannot connect to the database. {}", e);
            std::process::exit(1);
        }
    };

    let mut app = ui::App::new(conn, config.settlement_engine())?;
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &RallyConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or run a headless race: rally race");
    std::process::exit(1);
}
