// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use maildelay_app::{
    AppCommand, AppEvent, AppMode, AppState, BackendRequest, ConfirmDeleteState, DatePickerState,
    MailId, PatternKind, PopoverState, RefreshSchedule, RequestFailure,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use time::{Date, Month, OffsetDateTime};

const INPUT_POLL: Duration = Duration::from_millis(120);
const STATUS_CLEAR_DELAY: Duration = Duration::from_secs(4);
const POPOVER_MARK: &str = "ⓘ";

/// Server operations the UI needs. Implementations run on the request worker
/// thread, one call at a time.
pub trait MailBackend: Send {
    fn fetch_table(&mut self) -> Result<String, RequestFailure>;
    fn update_due(&mut self, id: MailId, due: &str) -> Result<(), RequestFailure>;
    fn delete_mail(&mut self, id: MailId) -> Result<(), RequestFailure>;
}

/// Runs one request against the backend and wraps the outcome in the command
/// that reports it back to the app state.
pub fn execute_request<B: MailBackend + ?Sized>(
    backend: &mut B,
    request: BackendRequest,
) -> AppCommand {
    match request {
        BackendRequest::FetchTable => AppCommand::TableFetched(backend.fetch_table()),
        BackendRequest::UpdateDue { id, due } => {
            let result = backend.update_due(id, &due);
            AppCommand::DueUpdated { id, due, result }
        }
        BackendRequest::DeleteMail { id } => AppCommand::MailDeleted {
            id,
            result: backend.delete_mail(id),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    Backend(AppCommand),
}

/// Handle to the single background thread that talks to the server.
/// Requests run strictly in submission order.
#[derive(Debug, Clone)]
pub struct RequestWorker {
    tx: Sender<BackendRequest>,
}

impl RequestWorker {
    pub fn spawn<B: MailBackend + 'static>(mut backend: B, events: Sender<InternalEvent>) -> Self {
        let (tx, rx) = mpsc::channel::<BackendRequest>();
        thread::spawn(move || {
            for request in rx {
                let label = request.label();
                let started = Instant::now();
                let command = execute_request(&mut backend, request);
                tracing::debug!(
                    request = label,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "request finished"
                );
                if events.send(InternalEvent::Backend(command)).is_err() {
                    break;
                }
            }
        });
        Self { tx }
    }

    /// Queues `request`; hands it back when the worker is gone.
    pub fn submit(&self, request: BackendRequest) -> Result<(), BackendRequest> {
        self.tx.send(request).map_err(|error| error.0)
    }
}

struct UiContext {
    internal_tx: Sender<InternalEvent>,
    worker: RequestWorker,
    status_token: u64,
}

impl UiContext {
    fn arm_status_clear(&mut self) {
        self.status_token = self.status_token.saturating_add(1);
        schedule_status_clear(&self.internal_tx, self.status_token);
    }
}

pub fn run_app<B: MailBackend + 'static>(
    state: &mut AppState,
    backend: B,
    refresh_interval: Duration,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend_terminal = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_terminal).context("create terminal")?;

    let (internal_tx, internal_rx) = mpsc::channel();
    let worker = RequestWorker::spawn(backend, internal_tx.clone());
    let mut ctx = UiContext {
        internal_tx,
        worker,
        status_token: 0,
    };

    dispatch(state, &mut ctx, AppCommand::Load);
    let mut schedule = RefreshSchedule::starting_at(Instant::now(), refresh_interval);
    tracing::info!(
        interval_ms = refresh_interval.as_millis() as u64,
        "refresh loop started"
    );

    let result = event_loop(state, &mut ctx, &mut terminal, &internal_rx, &mut schedule);
    dispatch(state, &mut ctx, AppCommand::BeginUnload);

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn event_loop(
    state: &mut AppState,
    ctx: &mut UiContext,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    internal_rx: &Receiver<InternalEvent>,
    schedule: &mut RefreshSchedule,
) -> Result<()> {
    loop {
        process_internal_events(state, ctx, internal_rx);
        run_refresh_tick(state, ctx, schedule, Instant::now());

        terminal
            .draw(|frame| render(frame, state))
            .context("draw frame")?;

        let wait = INPUT_POLL.min(schedule.until_due(Instant::now()));
        if event::poll(wait).context("poll event")?
            && let Event::Key(key) = event::read().context("read event")?
            && handle_key_event(state, ctx, key)
        {
            return Ok(());
        }
    }
}

/// Fires a refresh tick when the schedule is due. The next tick is armed
/// from `now` whether or not the tick was suppressed.
fn run_refresh_tick(
    state: &mut AppState,
    ctx: &mut UiContext,
    schedule: &mut RefreshSchedule,
    now: Instant,
) -> bool {
    schedule
        .run_if_due(now, || dispatch(state, ctx, AppCommand::RefreshTick))
        .is_some()
}

fn process_internal_events(
    state: &mut AppState,
    ctx: &mut UiContext,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == ctx.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Backend(command) => dispatch(state, ctx, command),
        }
    }
}

/// Applies `command` and carries out the side effects its events ask for.
fn dispatch(state: &mut AppState, ctx: &mut UiContext, command: AppCommand) {
    for event in state.dispatch(command) {
        match event {
            AppEvent::RequestIssued(request) => {
                if let Err(request) = ctx.worker.submit(request) {
                    tracing::error!(request = request.label(), "request worker stopped");
                    let failure = RequestFailure::transport("request worker stopped");
                    dispatch(state, ctx, request.failed(failure));
                }
            }
            AppEvent::Notified(_) | AppEvent::StatusUpdated(_) => ctx.arm_status_clear(),
            _ => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_DELAY);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

/// Returns true when the user asked to quit.
fn handle_key_event(state: &mut AppState, ctx: &mut UiContext, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
    {
        return true;
    }

    if let Some(picker) = state.date_picker.clone() {
        handle_date_picker_key(state, ctx, &picker, key);
        return false;
    }

    if let Some(modal) = state.modal.clone() {
        handle_confirm_delete_key(state, ctx, &modal, key);
        return false;
    }

    if state.popover.is_some() {
        dispatch(state, ctx, AppCommand::ClosePopover);
        return false;
    }

    if state.help_visible {
        dispatch(state, ctx, AppCommand::ToggleHelp);
        return false;
    }

    match state.mode {
        AppMode::Search => handle_search_key(state, ctx, key),
        AppMode::Nav => handle_nav_key(state, ctx, key),
    }
    false
}

fn handle_search_key(state: &mut AppState, ctx: &mut UiContext, key: KeyEvent) {
    let command = match key.code {
        KeyCode::Esc => AppCommand::ClearSearch,
        KeyCode::Enter | KeyCode::Down | KeyCode::Up => AppCommand::BlurSearch,
        KeyCode::Backspace => AppCommand::SearchBackspace,
        KeyCode::Char(ch) => AppCommand::SearchInput(ch),
        _ => return,
    };
    dispatch(state, ctx, command);
}

fn handle_nav_key(state: &mut AppState, ctx: &mut UiContext, key: KeyEvent) {
    let command = match key.code {
        KeyCode::Char('j') | KeyCode::Down => AppCommand::MoveSelection(1),
        KeyCode::Char('k') | KeyCode::Up => AppCommand::MoveSelection(-1),
        KeyCode::Char('g') | KeyCode::Home => AppCommand::JumpFirstRow,
        KeyCode::Char('G') | KeyCode::End => AppCommand::JumpLastRow,
        KeyCode::Char('/') => AppCommand::FocusSearch,
        KeyCode::Esc if !state.search().is_empty() => AppCommand::ClearSearch,
        KeyCode::Char('e') => AppCommand::OpenDatePicker {
            today: OffsetDateTime::now_utc().date(),
        },
        KeyCode::Char('p') | KeyCode::Enter => AppCommand::OpenPopover,
        KeyCode::Char('d') | KeyCode::Delete => AppCommand::RequestDelete,
        KeyCode::Char('?') => AppCommand::ToggleHelp,
        _ => return,
    };
    dispatch(state, ctx, command);
}

fn handle_date_picker_key(
    state: &mut AppState,
    ctx: &mut UiContext,
    picker: &DatePickerState,
    key: KeyEvent,
) {
    let current = picker.selected;
    let next = match key.code {
        KeyCode::Esc => {
            dispatch(state, ctx, AppCommand::CancelDatePicker);
            return;
        }
        KeyCode::Enter => {
            dispatch(state, ctx, AppCommand::CommitDatePicker);
            return;
        }
        KeyCode::Char('h') | KeyCode::Left => shift_date_by_days(current, -1),
        KeyCode::Char('l') | KeyCode::Right => shift_date_by_days(current, 1),
        KeyCode::Char('j') | KeyCode::Down => shift_date_by_days(current, 7),
        KeyCode::Char('k') | KeyCode::Up => shift_date_by_days(current, -7),
        KeyCode::Char('H') => shift_date_by_months(current, -1),
        KeyCode::Char('L') => shift_date_by_months(current, 1),
        KeyCode::Char('[') => shift_date_by_years(current, -1),
        KeyCode::Char(']') => shift_date_by_years(current, 1),
        _ => None,
    };

    if let Some(date) = next {
        dispatch(state, ctx, AppCommand::MoveDatePicker(date));
    }
}

fn handle_confirm_delete_key(
    state: &mut AppState,
    ctx: &mut UiContext,
    modal: &ConfirmDeleteState,
    key: KeyEvent,
) {
    if modal.pending {
        return;
    }
    let command = match key.code {
        KeyCode::Char('y') | KeyCode::Enter => AppCommand::ConfirmDelete,
        KeyCode::Char('n') | KeyCode::Esc => AppCommand::CancelDelete,
        _ => return,
    };
    dispatch(state, ctx, command);
}

fn shift_date_by_days(date: Date, days: i64) -> Option<Date> {
    date.checked_add(time::Duration::days(days))
}

fn shift_date_by_years(date: Date, years: i32) -> Option<Date> {
    shift_date_by_months(date, years.saturating_mul(12))
}

fn shift_date_by_months(date: Date, months: i32) -> Option<Date> {
    let base_month = i32::from(date.month() as u8);
    let total_month = base_month - 1 + months;
    let year = date.year() + total_month.div_euclid(12);
    let month = Month::try_from((total_month.rem_euclid(12) + 1) as u8).ok()?;
    let day = date.day().min(last_day_of_month(year, month)?);
    Date::from_calendar_date(year, month, day).ok()
}

fn last_day_of_month(year: i32, month: Month) -> Option<u8> {
    let (next_year, next_month) = if month == Month::December {
        (year + 1, Month::January)
    } else {
        (year, month.next())
    };

    let first_next_month = Date::from_calendar_date(next_year, next_month, 1).ok()?;
    let last = first_next_month - time::Duration::days(1);
    Some(last.day())
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let search_style = if state.mode == AppMode::Search {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    };
    let search = Paragraph::new(search_bar_text(state)).style(search_style).block(
        Block::default()
            .title(header_title(state))
            .borders(Borders::ALL),
    );
    frame.render_widget(search, layout[0]);

    render_table(frame, layout[1], state);

    let status = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(picker) = &state.date_picker {
        let area = centered_rect(48, 36, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(render_date_picker_overlay_text(picker))
            .block(Block::default().title("due date").borders(Borders::ALL));
        frame.render_widget(widget, area);
    }

    if let Some(popover) = &state.popover {
        let area = centered_rect(60, 40, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(render_popover_overlay_text(popover)).block(
            Block::default()
                .title(popover.popover.title.as_str())
                .borders(Borders::ALL),
        );
        frame.render_widget(widget, area);
    }

    if let Some(modal) = &state.modal {
        let area = centered_rect(50, 25, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(render_confirm_delete_text(modal)).block(
            Block::default()
                .title("delete mail")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(widget, area);
    }

    if state.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn header_title(state: &AppState) -> String {
    let total = state.list().rows().len();
    let visible = state.visible_rows().len();
    let mut title = format!("maildelay | {visible}/{total} mails");
    if let Some(reason) = state.tick_conditions().suppression() {
        title.push_str(&format!(" | refresh paused: {}", reason.as_str()));
    }
    title
}

fn search_bar_text(state: &AppState) -> String {
    let search = state.search();
    let cursor = if state.mode == AppMode::Search { "_" } else { "" };
    let mut text = format!("/ {}{cursor}", search.query());
    if !search.is_empty() && search.kind() == PatternKind::Literal {
        text.push_str("  (literal match)");
    }
    text
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState) {
    let header = Row::new(["subject", "sent", "due", ""].map(|label| {
        Cell::from(label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let visible = state.visible_rows();
    let rows = visible.iter().enumerate().map(|(index, row)| {
        let style = if index == state.selected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let mark = if row.popover.is_some() && state.bindings().popover_bound(row.id) {
            POPOVER_MARK
        } else {
            ""
        };
        Row::new([
            Cell::from(row.subject.clone()),
            Cell::from(row.sent.clone()),
            Cell::from(row.due.clone()),
            Cell::from(mark),
        ])
        .style(style)
    });

    let widths = [
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(2),
    ];
    let empty_title = if state.list().is_empty() && state.refreshes() == 0 {
        "loading"
    } else {
        "mails"
    };
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().title(empty_title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn status_text(state: &AppState) -> String {
    if state.date_picker.is_some()
        || state.popover.is_some()
        || state.modal.is_some()
        || state.help_visible
    {
        return state.status_line.clone().unwrap_or_default();
    }

    let (mode, hints) = match state.mode {
        AppMode::Nav => (
            "NAV",
            "j/k g/G | / search | e due | enter details | d delete | ? help | ctrl+q",
        ),
        AppMode::Search => ("SEARCH", "type to filter | enter keep | esc clear"),
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn render_date_picker_overlay_text(picker: &DatePickerState) -> String {
    let original = if picker.original.is_empty() {
        "(empty)"
    } else {
        picker.original.as_str()
    };
    [
        format!("mail: {} (#{})", picker.subject, picker.mail_id),
        format!("orig: {original}"),
        format!("pick: {}", picker.selected),
        String::new(),
        "h/l day | j/k week | H/L month | [/] year".to_owned(),
        "enter save | esc cancel".to_owned(),
    ]
    .join("\n")
}

fn render_popover_overlay_text(popover: &PopoverState) -> String {
    [
        popover.popover.content.clone(),
        String::new(),
        "press any key to close".to_owned(),
    ]
    .join("\n")
}

fn render_confirm_delete_text(modal: &ConfirmDeleteState) -> String {
    let prompt = if modal.pending {
        "deleting...".to_owned()
    } else {
        "y/enter delete | n/esc keep".to_owned()
    };
    [
        format!("Stop tracking \"{}\"?", modal.subject),
        String::new(),
        prompt,
    ]
    .join("\n")
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit\n\
nav: j/k move | g/G first/last | / search | esc clear search\n\
nav: e edit due date | enter/p recipients | d delete | ? help\n\
search: type to filter (regex, case-insensitive) | enter keep filter | esc clear\n\
date picker: h/l day j/k week H/L month [/] year enter save esc cancel\n\
delete: y/enter confirm | n/esc cancel\n\
popover: any key close\n\
refresh pauses while the date picker, a popover or a search filter is up"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
