mod layout;
mod view;

use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use dbx_adapters::export::export_results;
use dbx_core::connection::ConnectionMonitor;
use dbx_core::focus::Pane;
use dbx_core::query_client::{QueryClient, QueryTransport};
use dbx_core::response::Row;
use dbx_core::scroll::ScrollDirection;
use dbx_core::session::{
    event_channel, EventSender, ExportFailure, PendingQuery, SessionController, SessionEvent,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Position, Rect};
use ratatui::Terminal;
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::layout::{
    follow, list_capacity, list_hit, pane_areas, table_capacity, table_hit, TableHit,
};

const TICK_RATE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct TuiOptions {
    /// Where exports are written.
    pub export_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    NextPane,
    Submit,
    Export,
    DeleteHistoryEntry,
    Sort,
    Move(ScrollDirection),
    Page(ScrollDirection),
    Column { forward: bool },
    Insert(char),
    Newline,
    Backspace,
    Click { column: u16, row: u16 },
}

/// Work the event loop hands to the runtime.
#[derive(Debug)]
enum Command {
    RunQuery(PendingQuery),
    Export(Vec<Row>),
}

#[derive(Debug)]
pub(crate) struct TuiApp {
    pub(crate) session: SessionController,
    pub(crate) endpoint: String,
    pub(crate) history_offset: usize,
    pub(crate) results_offset: usize,
    pub(crate) detail_scroll: u16,
    pub(crate) raw_scroll: u16,
    area: Rect,
    should_quit: bool,
}

impl TuiApp {
    fn new(session: SessionController, endpoint: impl Into<String>) -> Self {
        Self {
            session,
            endpoint: endpoint.into(),
            history_offset: 0,
            results_offset: 0,
            detail_scroll: 0,
            raw_scroll: 0,
            area: Rect::default(),
            should_quit: false,
        }
    }

    /// Records the terminal size and scrolls list windows to keep the
    /// selections visible.
    fn resize(&mut self, area: Rect) {
        self.area = area;
        let areas = pane_areas(area);
        self.history_offset = follow(
            self.history_offset,
            self.session.history_cursor(),
            list_capacity(areas.history),
        );
        self.results_offset = match self.session.selected_row() {
            Some(selected) => follow(self.results_offset, selected, table_capacity(areas.results)),
            None => 0,
        };
    }

    fn handle(&mut self, msg: Msg, now: Instant) -> Option<Command> {
        match msg {
            Msg::Quit => self.should_quit = true,
            Msg::NextPane => {
                let pane = self.session.cycle_focus();
                debug!(pane = pane.title(), "focus moved");
            }
            Msg::Submit => return self.submit(),
            Msg::Export => return self.session.rows_for_export().map(Command::Export),
            Msg::DeleteHistoryEntry => {
                let cursor = self.session.history_cursor();
                self.session.delete_history_entry(cursor);
            }
            Msg::Sort => {
                self.session.sort_by_selected_column();
            }
            Msg::Move(direction) => self.move_in_pane(direction, now),
            Msg::Page(direction) => self.page_in_pane(direction),
            Msg::Column { forward } => self.session.move_column(forward),
            Msg::Insert(ch) => self.session.editor_mut().push(ch),
            Msg::Newline => self.session.editor_mut().push('\n'),
            Msg::Backspace => {
                self.session.editor_mut().pop();
            }
            Msg::Click { column, row } => self.click(Position::new(column, row)),
        }
        None
    }

    fn submit(&mut self) -> Option<Command> {
        match self.session.focus() {
            Pane::Editor => {
                let pending = self.session.submit_editor(Utc::now())?;
                self.results_offset = 0;
                self.detail_scroll = 0;
                self.raw_scroll = 0;
                Some(Command::RunQuery(pending))
            }
            Pane::History => {
                let cursor = self.session.history_cursor();
                self.session.activate_history_entry(cursor);
                None
            }
            Pane::Results | Pane::Detail | Pane::Raw => None,
        }
    }

    fn move_in_pane(&mut self, direction: ScrollDirection, now: Instant) {
        match self.session.focus() {
            Pane::History => self.session.move_history_cursor(direction),
            Pane::Results => {
                self.session.scroll_rows(direction, now);
                self.detail_scroll = 0;
            }
            Pane::Detail => scroll_text(&mut self.detail_scroll, direction, 1),
            Pane::Raw => scroll_text(&mut self.raw_scroll, direction, 1),
            Pane::Editor => {}
        }
    }

    fn page_in_pane(&mut self, direction: ScrollDirection) {
        let step = self.session.config().page_scroll_step;
        match self.session.focus() {
            Pane::Results => {
                self.session.page_rows(direction);
                self.detail_scroll = 0;
            }
            Pane::Detail => scroll_text(&mut self.detail_scroll, direction, step),
            Pane::Raw => scroll_text(&mut self.raw_scroll, direction, step),
            Pane::Editor | Pane::History => {}
        }
    }

    fn click(&mut self, position: Position) {
        let areas = pane_areas(self.area);
        let Some(pane) = areas.pane_at(position) else {
            return;
        };
        self.session.focus_pane(pane);

        match pane {
            Pane::Results => {
                let hit = self.session.model().and_then(|model| {
                    table_hit(areas.results, model, self.results_offset, position)
                });
                match hit {
                    Some(TableHit::Header(column)) => {
                        self.session.sort_by_column(column);
                        self.detail_scroll = 0;
                    }
                    Some(TableHit::Row { index, column }) => {
                        self.session.select_row(index);
                        if let Some(column) = column {
                            self.session.select_column(column);
                        }
                        self.detail_scroll = 0;
                    }
                    None => {}
                }
            }
            Pane::History => {
                let len = self.session.visible_history().len();
                if let Some(index) = list_hit(areas.history, self.history_offset, len, position) {
                    self.session.set_history_cursor(index);
                }
            }
            Pane::Editor | Pane::Detail | Pane::Raw => {}
        }
    }
}

fn scroll_text(offset: &mut u16, direction: ScrollDirection, step: usize) {
    let step = u16::try_from(step).unwrap_or(u16::MAX);
    *offset = match direction {
        ScrollDirection::Up => offset.saturating_sub(step),
        ScrollDirection::Down => offset.saturating_add(step),
    };
}

/// Runs the interactive workbench until the user quits.
///
/// Queries, probes and exports run on a background runtime; their results
/// come back over the session's event channel and are applied between frames.
pub fn run<T>(
    session: SessionController,
    client: QueryClient<T>,
    options: &TuiOptions,
) -> Result<(), TuiError>
where
    T: QueryTransport + Clone + 'static,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, &runtime, session, &client, options);
    let restore_result = restore_terminal(&mut terminal);
    runtime.shutdown_background();

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop<T>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    runtime: &Runtime,
    session: SessionController,
    client: &QueryClient<T>,
    options: &TuiOptions,
) -> Result<(), TuiError>
where
    T: QueryTransport + Clone + 'static,
{
    let (sender, mut receiver) = event_channel();
    let interval = Duration::from_secs(session.config().connection_check_sec);
    runtime.spawn(ConnectionMonitor::new(client.clone(), interval).run(sender.clone()));

    let mut app = TuiApp::new(session, client.endpoint());
    info!(endpoint = client.endpoint(), "workbench started");

    loop {
        app.session.drain(&mut receiver);
        let size = terminal.size()?;
        app.resize(Rect::new(0, 0, size.width, size.height));
        terminal.draw(|frame| view::render(frame, &app))?;

        if event::poll(TICK_RATE)? {
            let msg = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    map_key_event(key, app.session.focus())
                }
                Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                    Some(Msg::Click {
                        column: mouse.column,
                        row: mouse.row,
                    })
                }
                _ => None,
            };
            if let Some(command) = msg.and_then(|msg| app.handle(msg, Instant::now())) {
                let prefix = app.session.config().export_prefix.clone();
                dispatch(runtime, client, &sender, command, &options.export_dir, prefix);
            }
        }

        if app.should_quit {
            break;
        }
    }

    info!("workbench closed");
    Ok(())
}

fn dispatch<T>(
    runtime: &Runtime,
    client: &QueryClient<T>,
    sender: &EventSender,
    command: Command,
    export_dir: &Path,
    export_prefix: String,
) where
    T: QueryTransport + Clone + 'static,
{
    let sender = sender.clone();
    match command {
        Command::RunQuery(pending) => {
            let client = client.clone();
            debug!(generation = pending.generation, "dispatching query");
            runtime.spawn(async move {
                let result = client.execute(&pending.query).await;
                let _ = sender.send(pending.completed(result));
            });
        }
        Command::Export(rows) => {
            let export_dir = export_dir.to_path_buf();
            runtime.spawn_blocking(move || {
                let result =
                    export_results(&export_dir, &export_prefix, &rows, Utc::now().timestamp())
                        .map_err(ExportFailure::from);
                let _ = sender.send(SessionEvent::ExportFinished(result));
            });
        }
    }
}

fn map_key_event(key: KeyEvent, pane: Pane) -> Option<Msg> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('q')) => return Some(Msg::Quit),
        (KeyModifiers::CONTROL, KeyCode::Char('e')) => return Some(Msg::Export),
        (_, KeyCode::Tab) => return Some(Msg::NextPane),
        _ => {}
    }

    match pane {
        Pane::Editor => match (key.modifiers, key.code) {
            (KeyModifiers::ALT, KeyCode::Enter) => Some(Msg::Newline),
            (_, KeyCode::Enter) => Some(Msg::Submit),
            (_, KeyCode::Backspace) => Some(Msg::Backspace),
            (modifiers, KeyCode::Char(ch))
                if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                Some(Msg::Insert(ch))
            }
            _ => None,
        },
        Pane::History => match key.code {
            KeyCode::Enter => Some(Msg::Submit),
            KeyCode::Char('d' | 'D') | KeyCode::Delete => Some(Msg::DeleteHistoryEntry),
            KeyCode::Up | KeyCode::Char('k') => Some(Msg::Move(ScrollDirection::Up)),
            KeyCode::Down | KeyCode::Char('j') => Some(Msg::Move(ScrollDirection::Down)),
            _ => None,
        },
        Pane::Results => match key.code {
            KeyCode::Enter | KeyCode::Char('s') => Some(Msg::Sort),
            KeyCode::Up | KeyCode::Char('k') => Some(Msg::Move(ScrollDirection::Up)),
            KeyCode::Down | KeyCode::Char('j') => Some(Msg::Move(ScrollDirection::Down)),
            KeyCode::PageUp => Some(Msg::Page(ScrollDirection::Up)),
            KeyCode::PageDown => Some(Msg::Page(ScrollDirection::Down)),
            KeyCode::Left | KeyCode::Char('h') => Some(Msg::Column { forward: false }),
            KeyCode::Right | KeyCode::Char('l') => Some(Msg::Column { forward: true }),
            _ => None,
        },
        Pane::Detail | Pane::Raw => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Msg::Move(ScrollDirection::Up)),
            KeyCode::Down | KeyCode::Char('j') => Some(Msg::Move(ScrollDirection::Down)),
            KeyCode::PageUp => Some(Msg::Page(ScrollDirection::Up)),
            KeyCode::PageDown => Some(Msg::Page(ScrollDirection::Down)),
            _ => None,
        },
    }
}
