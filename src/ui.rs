use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use rally_management::entities::car::{AERODYNAMICS, ENGINE_POWER, TIRE_QUALITY, WEIGHT_KG};
use rally_management::entities::team::{DEFAULT_BUDGET, MAX_BUDGET, MIN_BUDGET};
use rally_management::{
    format_money, get_all_cars, get_all_teams, get_race_results, insert_car, insert_team,
    AttributeRange, Car, NewCar, NewTeam, Performance, RaceReport, RaceResult, RallyError,
    SettlementEngine, Team,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};
use rusqlite::Connection;
use std::io;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Cars,
    Teams,
    Race,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Dashboard, Page::Cars, Page::Teams, Page::Race];

    pub fn next(&self) -> Self {
        match self {
            Page::Dashboard => Page::Cars,
            Page::Cars => Page::Teams,
            Page::Teams => Page::Race,
            Page::Race => Page::Dashboard,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Dashboard => Page::Race,
            Page::Cars => Page::Dashboard,
            Page::Teams => Page::Cars,
            Page::Race => Page::Teams,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Cars => "Manage Cars",
            Page::Teams => "Manage Teams",
            Page::Race => "Start Race!",
        }
    }

    /// Pages with a form take printable keys as text input
    fn has_form(&self) -> bool {
        matches!(self, Page::Cars | Page::Teams)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Success(String),
    Error(String),
}

// ============================================================================
// FORMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarField {
    Name,
    Team,
    EnginePower,
    Weight,
    Aerodynamics,
    TireQuality,
}

impl CarField {
    const ORDER: [CarField; 6] = [
        CarField::Name,
        CarField::Team,
        CarField::EnginePower,
        CarField::Weight,
        CarField::Aerodynamics,
        CarField::TireQuality,
    ];

    fn slider(&self) -> Option<(AttributeRange, i64)> {
        match self {
            CarField::EnginePower => Some((ENGINE_POWER, 10)),
            CarField::Weight => Some((WEIGHT_KG, 25)),
            CarField::Aerodynamics => Some((AERODYNAMICS, 5)),
            CarField::TireQuality => Some((TIRE_QUALITY, 5)),
            CarField::Name | CarField::Team => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarForm {
    pub name: String,
    pub team_index: usize,
    pub performance: Performance,
    pub focus: usize,
}

impl Default for CarForm {
    fn default() -> Self {
        CarForm {
            name: String::new(),
            team_index: 0,
            performance: Performance::default(),
            focus: 0,
        }
    }
}

impl CarForm {
    pub fn focused(&self) -> CarField {
        CarField::ORDER[self.focus]
    }

    fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % CarField::ORDER.len();
    }

    fn focus_previous(&mut self) {
        self.focus = (self.focus + CarField::ORDER.len() - 1) % CarField::ORDER.len();
    }

    fn value_mut(&mut self, field: CarField) -> Option<&mut i64> {
        match field {
            CarField::EnginePower => Some(&mut self.performance.engine_power),
            CarField::Weight => Some(&mut self.performance.weight_kg),
            CarField::Aerodynamics => Some(&mut self.performance.aerodynamics),
            CarField::TireQuality => Some(&mut self.performance.tire_quality),
            CarField::Name | CarField::Team => None,
        }
    }

    /// Left/Right on a slider or the team selector. `direction` is -1 or 1.
    fn adjust(&mut self, direction: i64, team_count: usize) {
        let field = self.focused();
        if field == CarField::Team {
            if team_count > 0 {
                let step = if direction < 0 { team_count - 1 } else { 1 };
                self.team_index = (self.team_index + step) % team_count;
            }
            return;
        }
        if let Some((range, step)) = field.slider() {
            if let Some(value) = self.value_mut(field) {
                *value = range.clamp(*value + direction * step);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamField {
    Name,
    Members,
    Budget,
}

impl TeamField {
    const ORDER: [TeamField; 3] = [TeamField::Name, TeamField::Members, TeamField::Budget];
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamForm {
    pub name: String,
    pub members: String,
    pub budget: f64,
    pub focus: usize,
}

impl Default for TeamForm {
    fn default() -> Self {
        TeamForm {
            name: String::new(),
            members: String::new(),
            budget: DEFAULT_BUDGET,
            focus: 0,
        }
    }
}

impl TeamForm {
    const BUDGET_STEP: f64 = 1_000.0;

    pub fn focused(&self) -> TeamField {
        TeamField::ORDER[self.focus]
    }

    fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % TeamField::ORDER.len();
    }

    fn focus_previous(&mut self) {
        self.focus = (self.focus + TeamField::ORDER.len() - 1) % TeamField::ORDER.len();
    }

    fn adjust(&mut self, direction: f64) {
        if self.focused() == TeamField::Budget {
            self.budget = (self.budget + direction * Self::BUDGET_STEP).clamp(MIN_BUDGET, MAX_BUDGET);
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.focused() {
            TeamField::Name => Some(&mut self.name),
            TeamField::Members => Some(&mut self.members),
            TeamField::Budget => None,
        }
    }
}

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    conn: Connection,
    engine: SettlementEngine,
    pub teams: Vec<Team>,
    pub cars: Vec<Car>,
    pub history: Vec<RaceResult>,
    pub current_page: Page,
    pub car_form: CarForm,
    pub team_form: TeamForm,
    pub last_race: Option<RaceReport>,
    pub status: Option<Status>,
    pub should_quit: bool,
}

impl App {
    pub fn new(conn: Connection, engine: SettlementEngine) -> Result<Self> {
        let mut app = Self {
            conn,
            engine,
            teams: Vec::new(),
            cars: Vec::new(),
            history: Vec::new(),
            current_page: Page::Dashboard,
            car_form: CarForm::default(),
            team_form: TeamForm::default(),
            last_race: None,
            status: None,
            should_quit: false,
        };
        app.refresh()?;
        Ok(app)
    }

    /// Re-read teams, cars and race history
    pub fn refresh(&mut self) -> Result<()> {
        self.teams = get_all_teams(&self.conn)?;
        self.cars = get_all_cars(&self.conn)?;
        self.history = get_race_results(&self.conn)?;

        if self.car_form.team_index >= self.teams.len() {
            self.car_form.team_index = 0;
        }
        Ok(())
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    fn report(&mut self, outcome: std::result::Result<String, RallyError>) {
        self.status = Some(match outcome {
            Ok(message) => Status::Success(message),
            Err(e) => {
                error!(error = %e, "operation failed");
                Status::Error(format!("❌ {}", e))
            }
        });
        if let Err(e) = self.refresh() {
            self.status = Some(Status::Error(format!("❌ {}", e)));
        }
    }

    pub fn submit_team(&mut self) {
        let form = &self.team_form;
        let team = NewTeam::new(&form.name, &form.members, form.budget);

        let outcome = insert_team(&self.conn, &team).map(|_| {
            self.team_form = TeamForm::default();
            format!("✅ Team '{}' added successfully!", team.name)
        });
        self.report(outcome);
    }

    pub fn submit_car(&mut self) {
        let team_id = match self.teams.get(self.car_form.team_index) {
            Some(team) => team.id,
            None => {
                self.status = Some(Status::Error(
                    "⚠️ Please add teams first before adding cars!".to_string(),
                ));
                return;
            }
        };
        let car = NewCar::new(&self.car_form.name, team_id, self.car_form.performance);

        let outcome = insert_car(&self.conn, &car).map(|_| {
            self.car_form.name.clear();
            format!("✅ Car '{}' added successfully!", car.name)
        });
        self.report(outcome);
    }

    pub fn start_race(&mut self) {
        info!(cars = self.cars.len(), "race started from UI");
        let outcome = self.engine.run_race(&mut self.conn).map(|report| {
            let message = report.message.clone();
            self.last_race = Some(report);
            message
        });
        self.report(outcome);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.next_page(),
            KeyCode::BackTab => self.previous_page(),
            _ => match self.current_page {
                Page::Cars => self.handle_car_form_key(key.code),
                Page::Teams => self.handle_team_form_key(key.code),
                Page::Race => match key.code {
                    KeyCode::Char('r') | KeyCode::Enter => self.start_race(),
                    KeyCode::Char('q') => self.should_quit = true,
                    _ => {}
                },
                Page::Dashboard => match key.code {
                    KeyCode::Char('q') => self.should_quit = true,
                    KeyCode::Char('g') => {
                        if let Err(e) = self.refresh() {
                            self.status = Some(Status::Error(format!("❌ {}", e)));
                        }
                    }
                    _ => {}
                },
            },
        }
    }

    fn handle_car_form_key(&mut self, code: KeyCode) {
        if code == KeyCode::Enter {
            self.submit_car();
            return;
        }

        let team_count = self.teams.len();
        let form = &mut self.car_form;
        match code {
            KeyCode::Down => form.focus_next(),
            KeyCode::Up => form.focus_previous(),
            KeyCode::Left => form.adjust(-1, team_count),
            KeyCode::Right => form.adjust(1, team_count),
            KeyCode::Backspace if form.focused() == CarField::Name => {
                form.name.pop();
            }
            KeyCode::Char(c) if form.focused() == CarField::Name => form.name.push(c),
            _ => {}
        }
    }

    fn handle_team_form_key(&mut self, code: KeyCode) {
        if code == KeyCode::Enter {
            self.submit_team();
            return;
        }

        let form = &mut self.team_form;
        match code {
            KeyCode::Down => form.focus_next(),
            KeyCode::Up => form.focus_previous(),
            KeyCode::Left => form.adjust(-1.0),
            KeyCode::Right => form.adjust(1.0),
            KeyCode::Backspace => {
                if let Some(text) = form.text_mut() {
                    text.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(text) = form.text_mut() {
                    text.push(c);
                }
            }
            _ => {}
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Dashboard => render_dashboard(f, chunks[1], app),
        Page::Cars => render_cars_page(f, chunks[1], app),
        Page::Teams => render_teams_page(f, chunks[1], app),
        Page::Race => render_race_page(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![Span::styled(
        "🏁 Rally Racing  ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    for (i, page) in Page::ALL.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Teams: {}", app.teams.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Cars: {}", app.cars.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Races: {}", app.history.len()),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn titled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn budget_color(budget: f64) -> Color {
    if budget < 0.0 {
        Color::Red
    } else {
        Color::Green
    }
}

fn render_cars_table(f: &mut Frame, area: Rect, cars: &[Car], title: &str) {
    if cars.is_empty() {
        let empty = Paragraph::new("  No cars registered yet!").block(titled_block(title));
        f.render_widget(empty, area);
        return;
    }

    let rows = cars.iter().map(|car| {
        let perf = &car.performance;
        Row::new(vec![
            Cell::from(car.id.to_string()),
            Cell::from(truncate(&car.name, 22)),
            Cell::from(truncate(&car.team_name, 18)),
            Cell::from(perf.engine_power.to_string()),
            Cell::from(perf.weight_kg.to_string()),
            Cell::from(perf.aerodynamics.to_string()),
            Cell::from(perf.tire_quality.to_string()),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Length(24),
            Constraint::Length(20),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["ID", "Car", "Team", "Engine", "Weight", "Aero", "Tires"]))
    .block(titled_block(title));

    f.render_widget(table, area);
}

fn render_teams_table(f: &mut Frame, area: Rect, teams: &[Team], title: &str) {
    if teams.is_empty() {
        let empty = Paragraph::new("  No teams registered yet!").block(titled_block(title));
        f.render_widget(empty, area);
        return;
    }

    let rows = teams.iter().map(|team| {
        Row::new(vec![
            Cell::from(team.id.to_string()),
            Cell::from(truncate(&team.name, 20)),
            Cell::from(truncate(&team.members, 30)),
            Cell::from(format!("${}", format_money(team.budget)))
                .style(Style::default().fg(budget_color(team.budget))),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Length(22),
            Constraint::Min(20),
            Constraint::Length(14),
        ],
    )
    .header(header_row(&["ID", "Team", "Members", "Budget"]))
    .block(titled_block(title));

    f.render_widget(table, area);
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[0]);

    render_cars_table(f, columns[0], &app.cars, " 🏎️ Racing Cars ");
    render_teams_table(f, columns[1], &app.teams, " 👥 Racing Teams ");
    render_history(f, rows[1], &app.history);
}

fn render_history(f: &mut Frame, area: Rect, history: &[RaceResult]) {
    let rows = history.iter().map(|race| {
        Row::new(vec![
            Cell::from(race.race_id.to_string()),
            Cell::from(race.raced_at.format("%Y-%m-%d %H:%M").to_string()),
            Cell::from(
                race.winning_team_name
                    .clone()
                    .unwrap_or_else(|| format!("#{}", race.winning_team_id)),
            ),
            Cell::from(race.total_participants.to_string()),
            Cell::from(format!("${}", format_money(race.prize_amount)))
                .style(Style::default().fg(Color::Green)),
            Cell::from(race.race_details.clone()),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Length(17),
            Constraint::Length(20),
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Min(20),
        ],
    )
    .header(header_row(&["Race", "When", "Winner", "Cars", "Prize", "Details"]))
    .block(titled_block(" 🏆 Race History "));

    f.render_widget(table, area);
}

fn form_line(label: &str, value: String, focused: bool) -> Line<'static> {
    let marker = if focused {
        Span::styled("→ ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        Span::raw("  ")
    };
    let value_style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    Line::from(vec![
        marker,
        Span::styled(
            format!("{:<16}", label),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(value, value_style),
    ])
}

fn slider_value(range: &AttributeRange, value: i64) -> String {
    format!("◀ {:>5} ▶   ({}-{})", value, range.min, range.max)
}

fn render_cars_page(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(12)])
        .split(area);

    render_cars_table(f, chunks[0], &app.cars, " Current Racing Cars ");

    if app.teams.is_empty() {
        let warning = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  ⚠️ Please add teams first before adding cars!",
                Style::default().fg(Color::Yellow),
            )),
        ])
        .block(titled_block(" ➕ Add New Racing Car "));
        f.render_widget(warning, chunks[1]);
        return;
    }

    let form = &app.car_form;
    let focused = form.focused();
    let team_name = app
        .teams
        .get(form.team_index)
        .map(|t| t.name.clone())
        .unwrap_or_default();
    let perf = &form.performance;

    let content = vec![
        form_line("Car Name*", format!("{}▏", form.name), focused == CarField::Name),
        form_line("Team*", format!("◀ {} ▶", team_name), focused == CarField::Team),
        form_line(
            "Engine Power",
            slider_value(&ENGINE_POWER, perf.engine_power),
            focused == CarField::EnginePower,
        ),
        form_line(
            "Weight (kg)",
            slider_value(&WEIGHT_KG, perf.weight_kg),
            focused == CarField::Weight,
        ),
        form_line(
            "Aerodynamics",
            slider_value(&AERODYNAMICS, perf.aerodynamics),
            focused == CarField::Aerodynamics,
        ),
        form_line(
            "Tire Quality",
            slider_value(&TIRE_QUALITY, perf.tire_quality),
            focused == CarField::TireQuality,
        ),
        Line::from(""),
        Line::from(Span::styled(
            "  ↑/↓ field  ←/→ adjust  Enter add car",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let paragraph = Paragraph::new(content).block(titled_block(" ➕ Add New Racing Car "));
    f.render_widget(paragraph, chunks[1]);
}

fn render_teams_page(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(8)])
        .split(area);

    render_teams_table(f, chunks[0], &app.teams, " Current Racing Teams ");

    let form = &app.team_form;
    let focused = form.focused();
    let content = vec![
        form_line("Team Name*", format!("{}▏", form.name), focused == TeamField::Name),
        form_line("Team Members*", format!("{}▏", form.members), focused == TeamField::Members),
        form_line(
            "Budget ($)",
            format!(
                "◀ {} ▶   ({}-{})",
                format_money(form.budget),
                format_money(MIN_BUDGET),
                format_money(MAX_BUDGET)
            ),
            focused == TeamField::Budget,
        ),
        Line::from(""),
        Line::from(Span::styled(
            "  ↑/↓ field  ←/→ budget  Enter add team",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let paragraph = Paragraph::new(content).block(titled_block(" ➕ Add New Racing Team "));
    f.render_widget(paragraph, chunks[1]);
}

fn render_race_page(f: &mut Frame, area: Rect, app: &App) {
    if app.cars.is_empty() {
        let warning = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  ⚠️ No cars available for racing! Please add cars first.",
                Style::default().fg(Color::Yellow),
            )),
        ])
        .block(titled_block(" 🏁 Rally Race Simulation "));
        f.render_widget(warning, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(5)])
        .split(area);

    let info = Paragraph::new(vec![
        Line::from(format!("  🏎️ {} cars ready for racing!", app.cars.len())),
        Line::from(format!(
            "  💰 Entry fee: ${} per car",
            format_money(app.engine.entry_fee())
        )),
        Line::from(format!(
            "  🏆 Winner takes {:.0}% of total entry fees as prize!",
            app.engine.prize_share() * 100.0
        )),
        Line::from(Span::styled(
            "  Press r or Enter to START RACE!",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
    ])
    .block(titled_block(" 🏁 Rally Race Simulation "));
    f.render_widget(info, chunks[0]);

    match &app.last_race {
        Some(report) => {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);
            render_race_results(f, columns[0], report);
            render_teams_table(f, columns[1], &app.teams, " 💰 Updated Team Budgets ");
        }
        None => render_cars_table(f, chunks[1], &app.cars, " 🏎️ Participating Cars "),
    }
}

fn render_race_results(f: &mut Frame, area: Rect, report: &RaceReport) {
    let rows = report.standings.iter().map(|s| {
        let style = if s.position == 1 {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Row::new(vec![
            Cell::from(s.position.to_string()),
            Cell::from(truncate(&s.car_name, 22)),
            Cell::from(truncate(&s.team_name, 18)),
            Cell::from(format!("{:.2}", s.speed)),
            Cell::from(format!("{:.2}", s.time_minutes)),
        ])
        .style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(24),
            Constraint::Length(20),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["Pos", "Car", "Team", "Speed km/h", "Time (min)"]))
    .block(titled_block(" 🏁 Race Results "));

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = match &app.status {
        Some(Status::Success(msg)) => vec![Span::styled(
            format!(" {} ", msg),
            Style::default().fg(Color::Green),
        )],
        Some(Status::Error(msg)) => vec![Span::styled(
            format!(" {} ", msg),
            Style::default().fg(Color::Red),
        )],
        None => vec![Span::styled(
            format!(" {} ", app.current_page.title()),
            Style::default().fg(Color::Cyan),
        )],
    };

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    if app.current_page.has_form() {
        status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Submit | "));
    }
    status_spans.push(Span::styled("Esc", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rally_management::{setup_database, FixedFactor};

    fn test_app() -> App {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        App::new(conn, SettlementEngine::new(Box::new(FixedFactor(1.0)))).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn add_team_via_form(app: &mut App, name: &str) {
        app.current_page = Page::Teams;
        type_text(app, name);
        press(app, KeyCode::Down);
        type_text(app, "Jane Doe");
        press(app, KeyCode::Enter);
    }

    #[test]
    fn test_page_cycle() {
        let mut app = test_app();
        for _ in 0..4 {
            press(&mut app, KeyCode::Tab);
        }
        assert_eq!(app.current_page, Page::Dashboard);

        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.current_page, Page::Race);
    }

    #[test]
    fn test_add_team_through_form() {
        let mut app = test_app();
        add_team_via_form(&mut app, "Speed Demons");

        assert_eq!(app.teams.len(), 1);
        assert_eq!(app.teams[0].budget, DEFAULT_BUDGET);
        assert!(matches!(app.status, Some(Status::Success(_))));
        assert_eq!(app.team_form, TeamForm::default());
    }

    #[test]
    fn test_team_form_requires_members() {
        let mut app = test_app();
        app.current_page = Page::Teams;
        type_text(&mut app, "Lonely");
        press(&mut app, KeyCode::Enter);

        assert!(app.teams.is_empty());
        assert!(matches!(app.status, Some(Status::Error(_))));
        assert_eq!(app.team_form.name, "Lonely");
    }

    #[test]
    fn test_budget_slider_is_bounded() {
        let mut app = test_app();
        app.current_page = Page::Teams;
        press(&mut app, KeyCode::Up);
        assert_eq!(app.team_form.focused(), TeamField::Budget);

        for _ in 0..100 {
            press(&mut app, KeyCode::Right);
        }
        assert_eq!(app.team_form.budget, MAX_BUDGET);

        for _ in 0..100 {
            press(&mut app, KeyCode::Left);
        }
        assert_eq!(app.team_form.budget, MIN_BUDGET);
    }

    #[test]
    fn test_add_car_without_teams() {
        let mut app = test_app();
        app.current_page = Page::Cars;
        type_text(&mut app, "Red Thunder");
        press(&mut app, KeyCode::Enter);

        assert!(app.cars.is_empty());
        assert!(matches!(app.status, Some(Status::Error(_))));
    }

    #[test]
    fn test_add_car_and_race() {
        let mut app = test_app();
        add_team_via_form(&mut app, "Speed Demons");

        app.current_page = Page::Cars;
        type_text(&mut app, "Red Thunder");
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.cars.len(), 1);
        assert_eq!(app.cars[0].performance.engine_power, ENGINE_POWER.default + 10);
        assert!(app.car_form.name.is_empty());

        app.current_page = Page::Race;
        press(&mut app, KeyCode::Char('r'));

        let report = app.last_race.as_ref().unwrap();
        assert_eq!(report.standings.len(), 1);
        assert_eq!(app.history.len(), 1);
        // one car: prize 600, fee 1000
        assert_eq!(app.teams[0].budget, DEFAULT_BUDGET - 400.0);
    }

    #[test]
    fn test_race_with_no_cars_reports_error() {
        let mut app = test_app();
        app.current_page = Page::Race;
        press(&mut app, KeyCode::Enter);

        assert!(app.last_race.is_none());
        assert!(app.history.is_empty());
        assert!(matches!(app.status, Some(Status::Error(ref m)) if m.contains("No cars")));
    }

    #[test]
    fn test_quit_keys() {
        let mut app = test_app();
        app.current_page = Page::Teams;
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);
        assert_eq!(app.team_form.name, "q");

        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long car name", 10), "a very ...");
    }
}
