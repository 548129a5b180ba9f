use anyhow::Result;
use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use log::{info, warn};
use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{
        canvas::{Canvas, Points},
        Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, List, ListItem, ListState,
        Paragraph, Row, Table, TableState, Wrap,
    },
};
use std::io::{stdout, Write};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use crate::celebrate::{self, Fireworks};
use crate::export;
use crate::milestone::Celebration;
use crate::settings::Settings;
use crate::timers::{Tick, Timers};
use crate::tracker::{Tracker, TrackerError};
use crate::view::{self, Filter, Status, View};

const IDLE_POLL: Duration = Duration::from_millis(250);

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Company,
    Type,
    Phone,
}

impl Field {
    fn next(self) -> Self {
        match self {
            Field::Company => Field::Type,
            Field::Type => Field::Phone,
            Field::Phone => Field::Company,
        }
    }

    fn prev(self) -> Self {
        match self {
            Field::Company => Field::Phone,
            Field::Type => Field::Company,
            Field::Phone => Field::Type,
        }
    }
}

/// Add/edit dialog. `editing` holds the id of the record being edited.
#[derive(Debug, Clone)]
struct Form {
    editing: Option<u64>,
    company: String,
    types: Vec<String>,
    type_index: usize,
    phone: String,
    focus: Field,
    error: Option<String>,
}

impl Form {
    fn add(types: &[String]) -> Self {
        Self {
            editing: None,
            company: String::new(),
            types: types.to_vec(),
            type_index: 0,
            phone: String::new(),
            focus: Field::Company,
            error: None,
        }
    }

    fn edit(id: u64, company: &str, job_type: &str, phone: &str, types: &[String]) -> Self {
        let mut types = types.to_vec();
        // Keep a type that was removed from the list after the record was made
        let type_index = match types.iter().position(|t| t == job_type) {
            Some(i) => i,
            None => {
                types.push(job_type.to_string());
                types.len() - 1
            }
        };
        Self {
            editing: Some(id),
            company: company.to_string(),
            types,
            type_index,
            phone: phone.to_string(),
            focus: Field::Company,
            error: None,
        }
    }

    fn job_type(&self) -> &str {
        self.types.get(self.type_index).map(|s| s.as_str()).unwrap_or("")
    }

    fn cycle_type(&mut self, forward: bool) {
        if self.types.is_empty() {
            return;
        }
        let n = self.types.len();
        self.type_index = if forward {
            (self.type_index + 1) % n
        } else {
            (self.type_index + n - 1) % n
        };
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            Field::Company => Some(&mut self.company),
            Field::Phone => Some(&mut self.phone),
            Field::Type => None,
        }
    }
}

/// Job type manager: edits a working copy that is only saved on confirm.
#[derive(Debug, Clone)]
struct TypeManager {
    types: Vec<String>,
    selected: usize,
    adding: Option<String>,
    confirm_remove: bool,
    error: Option<String>,
}

impl TypeManager {
    fn new(types: &[String]) -> Self {
        Self {
            types: types.to_vec(),
            selected: 0,
            adding: None,
            confirm_remove: false,
            error: None,
        }
    }

    fn add(&mut self, name: &str) -> Result<(), &'static str> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Job type cannot be empty.");
        }
        if self.types.iter().any(|t| t == name) {
            return Err("This job type already exists.");
        }
        self.types.push(name.to_string());
        self.selected = self.types.len() - 1;
        Ok(())
    }

    fn can_remove(&self) -> Result<(), &'static str> {
        if self.types.len() <= 1 {
            return Err("At least one job type must remain.");
        }
        Ok(())
    }

    fn remove_selected(&mut self) {
        if self.can_remove().is_ok() && self.selected < self.types.len() {
            self.types.remove(self.selected);
            self.selected = self.selected.min(self.types.len().saturating_sub(1));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputTarget {
    Search,
    DateFrom,
    DateTo,
}

impl InputTarget {
    fn label(self) -> &'static str {
        match self {
            InputTarget::Search => "Search company",
            InputTarget::DateFrom => "From date (YYYY-MM-DD)",
            InputTarget::DateTo => "To date (YYYY-MM-DD)",
        }
    }
}

enum Mode {
    Normal,
    Form(Form),
    Input { target: InputTarget, buffer: String },
    ConfirmDelete(u64),
    Types(TypeManager),
    Chart { type_index: usize },
    Message { title: String, body: String },
    Celebrate(Fireworks),
}

struct App {
    tracker: Tracker,
    filter: Filter,
    view: View,
    table_state: TableState,
    mode: Mode,
    pending: Vec<Mode>,
    sound: bool,
    notice: Option<String>,
    last_frame: Instant,
}

impl App {
    fn new(mut tracker: Tracker, settings: &Settings) -> Self {
        let warnings = tracker.take_warnings();
        let mut app = Self {
            tracker,
            filter: Filter::default(),
            view: View::default(),
            table_state: TableState::default(),
            mode: Mode::Normal,
            pending: Vec::new(),
            sound: settings.sound,
            notice: None,
            last_frame: Instant::now(),
        };
        for w in warnings {
            app.show(Mode::Message {
                title: "Data Load Error".to_string(),
                body: w,
            });
        }
        app.refresh();
        app
    }

    fn refresh(&mut self) {
        self.view = self.tracker.view(&self.filter, today());
        let len = self.view.rows.len();
        match self.table_state.selected() {
            _ if len == 0 => self.table_state.select(None),
            Some(i) if i >= len => self.table_state.select(Some(len - 1)),
            None => self.table_state.select(Some(0)),
            _ => {}
        }
    }

    fn selected_id(&self) -> Option<u64> {
        self.table_state
            .selected()
            .and_then(|i| self.view.rows.get(i))
            .map(|r| r.app.id)
    }

    /// Shows a popup now if nothing else is open, otherwise after the current one.
    fn show(&mut self, mode: Mode) {
        if matches!(self.mode, Mode::Normal) {
            self.mode = mode;
        } else {
            self.pending.push(mode);
        }
    }

    fn close_popup(&mut self) {
        self.mode = if self.pending.is_empty() {
            Mode::Normal
        } else {
            self.pending.remove(0)
        };
    }

    fn report(&mut self, title: &str, err: &TrackerError) {
        warn!("{}: {}", title, err);
        let body = err.to_string();
        self.show(Mode::Message {
            title: title.to_string(),
            body,
        });
    }

    fn celebrate(&mut self, celebration: Celebration) {
        self.show(Mode::Celebrate(Fireworks::new(celebration)));
    }

    fn check_milestone(&mut self) {
        if let Some(c) = self.tracker.check_milestone(today()) {
            self.celebrate(c);
        }
    }

    fn on_tick(&mut self, tick: Tick) {
        match tick {
            Tick::Refresh => {
                self.refresh();
                if self.sound && self.view.ready_to_call() {
                    bell();
                }
            }
            Tick::Milestone => self.check_milestone(),
        }
    }

    fn is_animating(&self) -> bool {
        matches!(&self.mode, Mode::Celebrate(fw) if !fw.is_finished())
    }

    fn animate(&mut self) {
        if let Mode::Celebrate(fw) = &mut self.mode {
            while !fw.is_finished() && self.last_frame.elapsed() >= celebrate::FRAME {
                fw.step();
                self.last_frame += celebrate::FRAME;
            }
        } else {
            // A queued celebration starts from its first frame when shown
            self.last_frame = Instant::now();
        }
    }

    fn export(&mut self) {
        let html = export::render_summary(&self.view.rows, &self.filter, Local::now().naive_local());
        let result = export::write_summary(self.tracker.store().dir(), &html)
            .and_then(|path| export::open_in_browser(&path).map(|_| path));
        match result {
            Ok(path) => {
                info!("Exported summary to {}", path.display());
                self.notice = Some(format!("Summary exported to {}", path.display()));
            }
            Err(e) => {
                warn!("Export failed: {:#}", e);
                self.show(Mode::Message {
                    title: "Export Error".to_string(),
                    body: format!("{:#}", e),
                });
            }
        }
    }

    fn cycle_filter_type(&mut self) {
        let types = self.tracker.job_types();
        self.filter.job_type = match &self.filter.job_type {
            None => types.first().cloned(),
            Some(current) => match types.iter().position(|t| t == current) {
                Some(i) => types.get(i + 1).cloned(),
                None => None,
            },
        };
        self.refresh();
    }

    /// Returns false when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal => return self.handle_normal(key),
            Mode::Form(form) => self.handle_form(form, key),
            Mode::Input { target, buffer } => self.handle_input(target, buffer, key),
            Mode::ConfirmDelete(id) => self.handle_confirm_delete(id, key),
            Mode::Types(manager) => self.handle_types(manager, key),
            Mode::Chart { type_index } => self.handle_chart(type_index, key),
            Mode::Message { title, body } => match key.code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') | KeyCode::Char('q') => {
                    self.close_popup()
                }
                _ => self.mode = Mode::Message { title, body },
            },
            Mode::Celebrate(fw) => match key.code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => self.close_popup(),
                _ => self.mode = Mode::Celebrate(fw),
            },
        }
        // Popups queued behind a dialog open once it closes
        if matches!(self.mode, Mode::Normal) && !self.pending.is_empty() {
            self.mode = self.pending.remove(0);
        }
        true
    }

    fn handle_normal(&mut self, key: KeyEvent) -> bool {
        self.notice = None;
        let len = self.view.rows.len();
        match key.code {
            KeyCode::Char('q') => return false,
            KeyCode::Down | KeyCode::Char('j') => {
                if len > 0 {
                    let next = self.table_state.selected().map_or(0, |i| (i + 1).min(len - 1));
                    self.table_state.select(Some(next));
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let prev = self.table_state.selected().map_or(0, |i| i.saturating_sub(1));
                if len > 0 {
                    self.table_state.select(Some(prev));
                }
            }
            KeyCode::Char('a') => self.mode = Mode::Form(Form::add(self.tracker.job_types())),
            KeyCode::Char('e') | KeyCode::Enter => match self.selected_id().and_then(|id| self.tracker.get(id)) {
                Some(app) => {
                    let form = Form::edit(
                        app.id,
                        &app.company,
                        &app.job_type,
                        &app.hr_phone,
                        self.tracker.job_types(),
                    );
                    self.mode = Mode::Form(form);
                }
                None => self.no_selection("Select an entry to edit."),
            },
            KeyCode::Char('d') => match self.selected_id() {
                Some(id) => self.mode = Mode::ConfirmDelete(id),
                None => self.no_selection("Select an entry to delete."),
            },
            KeyCode::Char('c') => match self.selected_id() {
                Some(id) => {
                    if let Err(e) = self.tracker.mark_called(id) {
                        self.report("Save Error", &e);
                    }
                    self.refresh();
                }
                None => self.no_selection("Select an entry."),
            },
            KeyCode::Char('i') => match self.selected_id() {
                Some(id) => {
                    if let Err(e) = self.tracker.mark_inactive(id) {
                        self.report("Save Error", &e);
                    }
                    self.refresh();
                }
                None => self.no_selection("Select an entry."),
            },
            KeyCode::Char('/') => {
                self.mode = Mode::Input {
                    target: InputTarget::Search,
                    buffer: self.filter.search.clone(),
                }
            }
            KeyCode::Char('f') => {
                self.mode = Mode::Input {
                    target: InputTarget::DateFrom,
                    buffer: self.filter.date_from.clone(),
                }
            }
            KeyCode::Char('u') => {
                self.mode = Mode::Input {
                    target: InputTarget::DateTo,
                    buffer: self.filter.date_to.clone(),
                }
            }
            KeyCode::Char('t') => self.cycle_filter_type(),
            KeyCode::Esc if !self.filter.is_empty() => {
                self.filter = Filter::default();
                self.notice = Some("Filters cleared".to_string());
                self.refresh();
            }
            KeyCode::Char('g') => self.mode = Mode::Chart { type_index: 0 },
            KeyCode::Char('x') => self.export(),
            KeyCode::Char('m') => self.mode = Mode::Types(TypeManager::new(self.tracker.job_types())),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('s') => {
                self.sound = !self.sound;
                self.notice = Some(format!("Sound {}", if self.sound { "on" } else { "off" }));
            }
            _ => {}
        }
        true
    }

    fn no_selection(&mut self, body: &str) {
        self.show(Mode::Message {
            title: "No Selection".to_string(),
            body: body.to_string(),
        });
    }

    fn handle_form(&mut self, mut form: Form, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => return,
            KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
            KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.prev(),
            KeyCode::Left if form.focus == Field::Type => form.cycle_type(false),
            KeyCode::Right | KeyCode::Char(' ') if form.focus == Field::Type => {
                form.cycle_type(true)
            }
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
            KeyCode::Enter => {
                let job_type = form.job_type().to_string();
                let result = match form.editing {
                    Some(id) => self.tracker.edit(id, &form.company, &job_type, &form.phone),
                    None => self
                        .tracker
                        .add(&form.company, &job_type, &form.phone, today())
                        .map(|_| ()),
                };
                match result {
                    Ok(()) => {
                        self.refresh();
                        if form.editing.is_none() {
                            self.check_milestone();
                        }
                        return;
                    }
                    Err(e) if e.is_validation() => form.error = Some(e.to_string()),
                    Err(e) => {
                        // Kept in memory; the user is told the write failed
                        self.refresh();
                        self.report("Save Error", &e);
                        return;
                    }
                }
            }
            _ => {}
        }
        self.mode = Mode::Form(form);
    }

    fn handle_input(&mut self, target: InputTarget, mut buffer: String, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                if target == InputTarget::Search {
                    self.filter.search.clear();
                    self.refresh();
                }
                return;
            }
            KeyCode::Enter => {
                match target {
                    InputTarget::Search => self.filter.search = buffer,
                    InputTarget::DateFrom | InputTarget::DateTo => {
                        let raw = buffer.trim().to_string();
                        if !raw.is_empty() && view::parse_date(&raw).is_none() {
                            // Back to the input once the message is dismissed
                            self.pending.insert(0, Mode::Input { target, buffer });
                            self.mode = Mode::Message {
                                title: "Invalid Date".to_string(),
                                body: "Please enter a valid date.".to_string(),
                            };
                            return;
                        }
                        if target == InputTarget::DateFrom {
                            self.filter.date_from = raw;
                        } else {
                            self.filter.date_to = raw;
                        }
                    }
                }
                self.refresh();
                return;
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) => buffer.push(c),
            _ => {}
        }
        // Search filters live while typing
        if target == InputTarget::Search {
            self.filter.search = buffer.clone();
            self.refresh();
        }
        self.mode = Mode::Input { target, buffer };
    }

    fn handle_confirm_delete(&mut self, id: u64, key: KeyEvent) {
        if let KeyCode::Char('y') | KeyCode::Char('Y') = key.code {
            if let Err(e) = self.tracker.delete(id) {
                self.report("Save Error", &e);
            }
            self.refresh();
        }
    }

    fn handle_types(&mut self, mut manager: TypeManager, key: KeyEvent) {
        if let Some(mut name) = manager.adding.take() {
            match key.code {
                KeyCode::Esc => {}
                KeyCode::Enter => match manager.add(&name) {
                    Ok(()) => manager.error = None,
                    Err(msg) => {
                        manager.error = Some(msg.to_string());
                        manager.adding = Some(name);
                    }
                },
                KeyCode::Backspace => {
                    name.pop();
                    manager.adding = Some(name);
                }
                KeyCode::Char(c) => {
                    name.push(c);
                    manager.adding = Some(name);
                }
                _ => manager.adding = Some(name),
            }
            self.mode = Mode::Types(manager);
            return;
        }

        if manager.confirm_remove {
            manager.confirm_remove = false;
            if let KeyCode::Char('y') | KeyCode::Char('Y') = key.code {
                manager.remove_selected();
            }
            self.mode = Mode::Types(manager);
            return;
        }

        manager.error = None;
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return,
            KeyCode::Down | KeyCode::Char('j') => {
                if manager.selected + 1 < manager.types.len() {
                    manager.selected += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => manager.selected = manager.selected.saturating_sub(1),
            KeyCode::Char('a') => manager.adding = Some(String::new()),
            KeyCode::Char('d') => match manager.can_remove() {
                Ok(()) => manager.confirm_remove = true,
                Err(msg) => manager.error = Some(msg.to_string()),
            },
            KeyCode::Enter | KeyCode::Char('s') => {
                match self.tracker.set_job_types(manager.types.clone()) {
                    Ok(()) => {
                        self.filter.job_type = None;
                        self.refresh();
                        return;
                    }
                    Err(e) if e.is_validation() => manager.error = Some(e.to_string()),
                    Err(e) => {
                        self.report("Save Error", &e);
                        return;
                    }
                }
            }
            _ => {}
        }
        self.mode = Mode::Types(manager);
    }

    fn handle_chart(&mut self, type_index: usize, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('g') => {}
            KeyCode::Char('t') | KeyCode::Right => {
                let options = self.tracker.job_types().len() + 1;
                self.mode = Mode::Chart {
                    type_index: (type_index + 1) % options,
                };
            }
            KeyCode::Left => {
                let options = self.tracker.job_types().len() + 1;
                self.mode = Mode::Chart {
                    type_index: (type_index + options - 1) % options,
                };
            }
            _ => self.mode = Mode::Chart { type_index },
        }
    }

    fn chart_type(&self, type_index: usize) -> Option<&str> {
        match type_index {
            0 => None,
            i => self.tracker.job_types().get(i - 1).map(|s| s.as_str()),
        }
    }
}

fn bell() {
    let mut out = stdout();
    let _ = out.write_all(b"\x07");
    let _ = out.flush();
}

pub fn run_dashboard(tracker: Tracker, settings: &Settings) -> Result<()> {
    let mut app = App::new(tracker, settings);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let (tx, rx) = mpsc::channel();
    let timers = Timers::start(settings.refresh_interval(), settings.milestone_interval(), tx);

    let result = run_loop(&mut terminal, &mut app, &rx);

    timers.stop();

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    rx: &Receiver<Tick>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, app))?;

        let timeout = if app.is_animating() { celebrate::FRAME } else { IDLE_POLL };
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !app.handle_key(key) {
                    break;
                }
            }
        }

        // Deferred work from the timer threads runs here, on the UI thread
        while let Ok(tick) = rx.try_recv() {
            app.on_tick(tick);
        }
        app.animate();
    }
    Ok(())
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let sound = if app.sound { "sound on" } else { "sound off" };
    let header = Line::from(vec![
        Span::styled(
            " Job Application Tracker ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" [{}]", sound), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(header), chunks[0]);

    let filter = &app.filter;
    let filter_line = format!(
        " Type: {}   From: {}   To: {}   Search: {}",
        filter.type_label(),
        if filter.date_from.is_empty() { "-" } else { filter.date_from.as_str() },
        if filter.date_to.is_empty() { "-" } else { filter.date_to.as_str() },
        if filter.search.is_empty() { "-" } else { filter.search.as_str() },
    );
    frame.render_widget(
        Paragraph::new(filter_line).style(Style::default().fg(Color::Magenta)),
        chunks[1],
    );

    let stats_line = match &app.notice {
        Some(notice) => Span::styled(format!(" {}", notice), Style::default().fg(Color::Yellow)),
        None => Span::styled(format!(" {}", app.view.stats), Style::default().fg(Color::Gray)),
    };
    frame.render_widget(Paragraph::new(Line::from(stats_line)), chunks[2]);

    draw_table(frame, app, chunks[3]);

    let help = Paragraph::new(
        " j/k:move a:add e:edit d:delete c:called i:inactive /:search f/u:from/to t:type esc:clear g:graph x:export m:types s:sound q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[4]);

    let area = frame.area();
    match &app.mode {
        Mode::Normal => {}
        Mode::Form(form) => draw_form(frame, form, area),
        Mode::Input { target, buffer } => draw_input(frame, *target, buffer, area),
        Mode::ConfirmDelete(id) => {
            let company = app.tracker.get(*id).map(|a| a.company.clone()).unwrap_or_default();
            draw_message(
                frame,
                "Confirm",
                &format!("Delete #{} {}? (y/n)", id, company),
                area,
            );
        }
        Mode::Types(manager) => draw_types(frame, manager, area),
        Mode::Chart { type_index } => draw_chart(frame, app, *type_index, area),
        Mode::Message { title, body } => draw_message(frame, title, body, area),
        Mode::Celebrate(fw) => draw_celebration(frame, fw, area),
    }
}

fn draw_table(frame: &mut Frame, app: &mut App, area: Rect) {
    let header = Row::new(
        ["ID", "Company", "Type", "HR Phone", "Apply Date", "Days Left", "Status"]
            .into_iter()
            .map(Cell::from),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .view
        .rows
        .iter()
        .map(|row| {
            let phone = if row.app.hr_phone.is_empty() { "-" } else { row.app.hr_phone.as_str() };
            let status_style = match row.status {
                Status::Called => Style::default().fg(Color::Green),
                Status::Ready => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                Status::Waiting(_) => Style::default(),
            };
            let r = Row::new(vec![
                Cell::from(row.app.id.to_string()),
                Cell::from(row.app.company.clone()),
                Cell::from(row.app.job_type.clone()),
                Cell::from(phone.to_string()),
                Cell::from(row.app.apply_date.to_string()),
                Cell::from(row.days_left.to_string()),
                Cell::from(row.status.to_string()).style(status_style),
            ]);
            if row.is_ready_to_call() {
                r.style(Style::default().bg(Color::Rgb(0x25, 0x35, 0x25)))
            } else {
                r
            }
        })
        .collect();

    let widths = [
        Constraint::Length(5),
        Constraint::Percentage(28),
        Constraint::Percentage(20),
        Constraint::Length(14),
        Constraint::Length(11),
        Constraint::Length(9),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Applications ({}) ",
            app.view.rows.len()
        )))
        .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

fn draw_form(frame: &mut Frame, form: &Form, area: Rect) {
    let popup = centered(area, 60, 11);
    frame.render_widget(Clear, popup);

    let title = if form.editing.is_some() { " Edit Application " } else { " Add Application " };
    let field = |label: &str, value: String, which: Field| {
        let style = if form.focus == which {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(format!("{:<10}", label), Style::default().fg(Color::Magenta)),
            Span::styled(value, style),
        ])
    };

    let cursor = |s: &str, f: Field| {
        if form.focus == f { format!("{}_", s) } else { s.to_string() }
    };

    let mut lines = vec![
        field("Company", cursor(&form.company, Field::Company), Field::Company),
        Line::from(""),
        field("Job Type", format!("< {} >", form.job_type()), Field::Type),
        Line::from(""),
        field("HR Phone", cursor(&form.phone, Field::Phone), Field::Phone),
        Line::from(""),
    ];
    if let Some(err) = &form.error {
        lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
    }
    lines.push(Line::from(Span::styled(
        "tab:next field  left/right:type  enter:save  esc:cancel",
        Style::default().fg(Color::DarkGray),
    )));

    let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(widget, popup);
}

fn draw_input(frame: &mut Frame, target: InputTarget, buffer: &str, area: Rect) {
    let popup = centered(area, 50, 3);
    frame.render_widget(Clear, popup);
    let widget = Paragraph::new(format!("{}_", buffer)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", target.label())),
    );
    frame.render_widget(widget, popup);
}

fn draw_message(frame: &mut Frame, title: &str, body: &str, area: Rect) {
    let width = 56u16;
    let text = textwrap::fill(body, (width - 4) as usize);
    let height = text.lines().count() as u16 + 4;
    let popup = centered(area, width, height);
    frame.render_widget(Clear, popup);

    let mut lines: Vec<Line> = text.lines().map(|l| Line::from(l.to_string())).collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("enter: close", Style::default().fg(Color::DarkGray))));
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", title)));
    frame.render_widget(widget, popup);
}

fn draw_types(frame: &mut Frame, manager: &TypeManager, area: Rect) {
    let popup = centered(area, 48, 16);
    frame.render_widget(Clear, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(popup);

    let items: Vec<ListItem> = manager.types.iter().map(|t| ListItem::new(t.as_str())).collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Manage Job Types "))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(Some(manager.selected));
    frame.render_stateful_widget(list, chunks[0], &mut state);

    let footer = if let Some(name) = &manager.adding {
        let mut spans = vec![Span::raw(format!("New type: {}_  ", name))];
        if let Some(err) = &manager.error {
            spans.push(Span::styled(err.clone(), Style::default().fg(Color::Red)));
        }
        Line::from(spans)
    } else if manager.confirm_remove {
        let name = manager.types.get(manager.selected).cloned().unwrap_or_default();
        Line::from(format!("Delete '{}'? (y/n)", name))
    } else if let Some(err) = &manager.error {
        Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red)))
    } else {
        Line::from(Span::styled(
            "a:add d:remove enter:save esc:cancel",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(
        Paragraph::new(footer).block(Block::default().borders(Borders::ALL)),
        chunks[1],
    );
}

fn draw_chart(frame: &mut Frame, app: &App, type_index: usize, area: Rect) {
    let popup = centered(area, 84, 22);
    frame.render_widget(Clear, popup);

    let job_type = app.chart_type(type_index);
    let series = app.tracker.week_series(job_type, today());

    let mut chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Last 7 Days: Applications & HR Calls ({}) | t:type esc:close ",
            job_type.unwrap_or("All")
        )))
        .bar_width(4)
        .bar_gap(1)
        .group_gap(3);

    for day in &series {
        let group = BarGroup::default()
            .label(Line::from(day.date.format("%m-%d").to_string()))
            .bars(&[
                Bar::default()
                    .value(day.apps as u64)
                    .style(Style::default().fg(Color::Cyan)),
                Bar::default()
                    .value(day.calls as u64)
                    .style(Style::default().fg(Color::Green)),
            ]);
        chart = chart.data(group);
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(popup);
    frame.render_widget(chart, chunks[0]);

    let legend = Line::from(vec![
        Span::styled(" ## ", Style::default().fg(Color::Cyan)),
        Span::raw("Applications   "),
        Span::styled("## ", Style::default().fg(Color::Green)),
        Span::raw("HR Calls"),
    ]);
    frame.render_widget(Paragraph::new(legend), chunks[1]);
}

fn draw_celebration(frame: &mut Frame, fw: &Fireworks, area: Rect) {
    let popup = centered(area, 70, 24);
    frame.render_widget(Clear, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
        .split(popup);

    let heading = Paragraph::new(vec![
        Line::from(Span::styled(
            fw.celebration.title(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(fw.celebration.message()),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP | Borders::LEFT | Borders::RIGHT).title(" Achievement Unlocked! "));
    frame.render_widget(heading, chunks[0]);

    let groups = fw.points();
    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM))
        .background_color(Color::Black)
        .marker(Marker::Braille)
        .x_bounds([0.0, celebrate::WIDTH])
        .y_bounds([0.0, celebrate::HEIGHT])
        .paint(|ctx| {
            for ((r, g, b), coords) in &groups {
                ctx.draw(&Points {
                    coords,
                    color: Color::Rgb(*r, *g, *b),
                });
            }
        });
    frame.render_widget(canvas, chunks[1]);

    frame.render_widget(
        Paragraph::new("enter: close")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn app(dir: &std::path::Path) -> App {
        let tracker = Tracker::open(Store::open(dir).unwrap(), 10);
        App::new(tracker, &Settings::default())
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_add_through_form() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Acme");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "555");
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.view.rows.len(), 1);
        let row = &app.view.rows[0];
        assert_eq!(row.app.company, "Acme");
        assert_eq!(row.app.job_type, "Data Analyst");
        assert_eq!(row.app.hr_phone, "555");
        assert_eq!(app.table_state.selected(), Some(0));
    }

    #[test]
    fn test_form_rejects_missing_company() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Enter);
        match &app.mode {
            Mode::Form(form) => assert_eq!(form.error.as_deref(), Some("Company is required.")),
            _ => panic!("form should stay open"),
        }
        assert!(app.tracker.applications().is_empty());
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        app.tracker.add("Acme", "Software Engineer", "", today()).unwrap();
        app.refresh();

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.view.rows.len(), 1);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.view.rows.is_empty());
        assert!(app.tracker.applications().is_empty());
    }

    #[test]
    fn test_mark_inactive_hides_row() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        app.tracker.add("Acme", "Software Engineer", "", today()).unwrap();
        app.refresh();
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.view.rows[0].status, Status::Called);
        press(&mut app, KeyCode::Char('i'));
        assert!(app.view.rows.is_empty());
        assert_eq!(app.tracker.applications().len(), 1);
    }

    #[test]
    fn test_no_selection_message() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        press(&mut app, KeyCode::Char('e'));
        assert!(matches!(&app.mode, Mode::Message { title, .. } if title == "No Selection"));
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn test_live_search_and_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        app.tracker.add("Acme", "Software Engineer", "", today()).unwrap();
        app.tracker.add("Globex", "Software Engineer", "", today()).unwrap();
        app.refresh();

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "glo");
        assert_eq!(app.view.rows.len(), 1);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.filter.search, "glo");

        press(&mut app, KeyCode::Esc);
        assert!(app.filter.is_empty());
        assert_eq!(app.view.rows.len(), 2);
    }

    #[test]
    fn test_invalid_date_reopens_input() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        press(&mut app, KeyCode::Char('f'));
        type_text(&mut app, "2024-13-01");
        press(&mut app, KeyCode::Enter);
        assert!(matches!(&app.mode, Mode::Message { title, .. } if title == "Invalid Date"));
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Input { target: InputTarget::DateFrom, .. }));
        assert!(app.filter.date_from.is_empty());
    }

    #[test]
    fn test_type_filter_cycles_back_to_all() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        let count = app.tracker.job_types().len();
        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.filter.job_type.as_deref(), Some("Software Engineer"));
        for _ in 0..count {
            press(&mut app, KeyCode::Char('t'));
        }
        assert_eq!(app.filter.job_type, None);
    }

    #[test]
    fn test_type_manager_keeps_last_type() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        app.tracker.set_job_types(vec!["Only".to_string()]).unwrap();

        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Char('d'));
        match &app.mode {
            Mode::Types(m) => {
                assert_eq!(m.error.as_deref(), Some("At least one job type must remain."));
                assert_eq!(m.types.len(), 1);
            }
            _ => panic!("type manager should stay open"),
        }
    }

    #[test]
    fn test_type_manager_add_remove_save() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        press(&mut app, KeyCode::Char('t'));

        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "SRE");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('k'));
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(
            app.tracker.job_types(),
            ["Software Engineer", "Data Analyst", "Product Manager", "SRE"]
        );
        assert_eq!(app.filter.job_type, None);
    }

    #[test]
    fn test_milestone_after_tenth_add() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        for i in 0..9 {
            app.tracker
                .add(&format!("Company {}", i), "Software Engineer", "", today())
                .unwrap();
        }
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Tenth");
        press(&mut app, KeyCode::Enter);
        assert!(app.is_animating());

        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
        app.on_tick(Tick::Milestone);
        assert!(!app.is_animating());
    }

    #[test]
    fn test_celebration_waits_for_open_dialog() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        for i in 0..10 {
            app.tracker
                .add(&format!("Company {}", i), "Software Engineer", "", today())
                .unwrap();
        }
        press(&mut app, KeyCode::Char('g'));
        app.on_tick(Tick::Milestone);
        assert!(matches!(app.mode, Mode::Chart { .. }));

        press(&mut app, KeyCode::Esc);
        assert!(app.is_animating());
        assert!(app.pending.is_empty());
    }

    #[test]
    fn test_messages_queue_behind_form() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        press(&mut app, KeyCode::Char('a'));
        app.no_selection("first");
        app.no_selection("second");

        press(&mut app, KeyCode::Esc);
        assert!(matches!(&app.mode, Mode::Message { body, .. } if body == "first"));
        press(&mut app, KeyCode::Enter);
        assert!(matches!(&app.mode, Mode::Message { body, .. } if body == "second"));
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn test_finished_celebration_stops_animating() {
        use rand::SeedableRng;
        use rand::rngs::StdRng;

        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        let celebration = Celebration { date: today(), count: 10 };
        let mut fw = Fireworks::with_rng(celebration, StdRng::seed_from_u64(3));
        while !fw.is_finished() {
            fw.step();
        }
        app.mode = Mode::Celebrate(fw);

        assert!(!app.is_animating());
        assert!(matches!(app.mode, Mode::Celebrate(_)));
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn test_esc_clears_filters() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        press(&mut app, KeyCode::Char('t'));
        assert!(!app.filter.is_empty());

        press(&mut app, KeyCode::Esc);
        assert!(app.filter.is_empty());
        assert_eq!(app.notice.as_deref(), Some("Filters cleared"));
    }

    #[test]
    fn test_ctrl_c_quits_from_popup() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        press(&mut app, KeyCode::Char('a'));
        let quit = app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!quit);
    }
}
