use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::WorkbenchConfig;
use crate::connection::ConnectionStatus;
use crate::focus::{FocusRing, Pane};
use crate::history::{FileHistoryStore, History, HistoryEntry};
use crate::query_client::TransportError;
use crate::render::DetailLine;
use crate::response::{QueryOutcome, ResponsePayload, Row};
use crate::result_model::ResultModel;
use crate::scroll::{ScrollAccelerator, ScrollDirection};

pub const HISTORY_LIST_LIMIT: usize = 101;

pub const HELP_TEXT: &str =
    "Shortcuts: Enter Run  Tab Cycle  D Delete  Ctrl-E Export  Ctrl-Q Quit";

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

#[must_use]
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug)]
pub enum SessionEvent {
    QueryCompleted {
        generation: u64,
        result: Result<QueryOutcome, TransportError>,
    },
    ConnectionChanged(ConnectionStatus),
    ExportFinished(Result<ExportSummary, ExportFailure>),
}

pub type ExportFailure = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub file_name: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub generation: u64,
    pub query: String,
}

impl PendingQuery {
    #[must_use]
    pub fn completed(self, result: Result<QueryOutcome, TransportError>) -> SessionEvent {
        SessionEvent::QueryCompleted {
            generation: self.generation,
            result,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailView {
    Row {
        position: usize,
        total: usize,
        lines: Vec<DetailLine>,
    },
    Message(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPreview {
    pub time: String,
    pub query: String,
}

#[derive(Debug)]
pub struct SessionController {
    config: WorkbenchConfig,
    history_store: FileHistoryStore,
    history: History,
    history_cursor: usize,
    editor: String,
    focus: FocusRing,
    model: Option<ResultModel>,
    selected_row: Option<usize>,
    selected_column: usize,
    placeholder: &'static str,
    raw: String,
    status: StatusMessage,
    connection: ConnectionStatus,
    scroll: ScrollAccelerator,
    last_generation: u64,
}

impl SessionController {
    #[must_use]
    pub fn new(config: WorkbenchConfig, history_store: FileHistoryStore) -> Self {
        let mut status = StatusMessage {
            level: StatusLevel::Info,
            text: HELP_TEXT.to_string(),
        };
        let history = match history_store.load() {
            Ok(mut history) => {
                history.truncate(config.max_history_entries);
                history
            }
            Err(error) => {
                warn!(%error, "failed to load history");
                status = StatusMessage {
                    level: StatusLevel::Error,
                    text: format!("Failed to load history: {error}"),
                };
                History::new()
            }
        };

        Self {
            scroll: ScrollAccelerator::from_config(&config),
            config,
            history_store,
            history,
            history_cursor: 0,
            editor: String::new(),
            focus: FocusRing::new(),
            model: None,
            selected_row: None,
            selected_column: 0,
            placeholder: "No results",
            raw: String::new(),
            status,
            connection: ConnectionStatus::Unknown,
            last_generation: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn history_path(&self) -> &Path {
        self.history_store.path()
    }

    #[must_use]
    pub fn focus(&self) -> Pane {
        self.focus.current()
    }

    #[must_use]
    pub fn editor_text(&self) -> &str {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut String {
        &mut self.editor
    }

    #[must_use]
    pub fn model(&self) -> Option<&ResultModel> {
        self.model.as_ref()
    }

    #[must_use]
    pub fn selected_row(&self) -> Option<usize> {
        self.selected_row
    }

    #[must_use]
    pub fn selected_column(&self) -> usize {
        self.selected_column
    }

    #[must_use]
    pub fn raw_output(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn status(&self) -> &StatusMessage {
        &self.status
    }

    #[must_use]
    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    fn set_status(&mut self, level: StatusLevel, text: impl Into<String>) {
        self.status = StatusMessage {
            level,
            text: text.into(),
        };
    }

    pub fn cycle_focus(&mut self) -> Pane {
        self.focus.advance()
    }

    pub fn focus_pane(&mut self, pane: Pane) {
        self.focus.focus(pane);
    }

    pub fn submit_editor(&mut self, now: DateTime<Utc>) -> Option<PendingQuery> {
        let query = self.editor.clone();
        self.submit_query(&query, now)
    }

    pub fn submit_query(&mut self, query: &str, now: DateTime<Utc>) -> Option<PendingQuery> {
        if query.trim().is_empty() {
            self.set_status(StatusLevel::Warning, "Enter a query to run");
            return None;
        }

        self.set_status(StatusLevel::Info, "Running query...");
        self.history
            .append(query, self.config.max_history_entries, now);
        self.history_cursor = 0;
        self.persist_history();

        self.focus.focus(Pane::Results);
        self.model = None;
        self.selected_row = None;
        self.selected_column = 0;
        self.placeholder = "Running query...";

        self.last_generation += 1;
        debug!(generation = self.last_generation, query, "query submitted");
        Some(PendingQuery {
            generation: self.last_generation,
            query: query.to_string(),
        })
    }

    fn persist_history(&mut self) -> bool {
        match self.history_store.save(&self.history) {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "failed to save history");
                self.set_status(
                    StatusLevel::Warning,
                    format!("Failed to save history: {error}"),
                );
                false
            }
        }
    }

    pub fn drain(&mut self, receiver: &mut EventReceiver) -> usize {
        let mut applied = 0;
        while let Ok(event) = receiver.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Results land in completion order: whichever query finishes last
    /// replaces the model, even if it was submitted earlier.
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ConnectionChanged(status) => self.connection = status,
            SessionEvent::ExportFinished(result) => self.export_finished(result),
            SessionEvent::QueryCompleted { generation, result } => {
                if generation < self.last_generation {
                    info!(
                        generation,
                        latest = self.last_generation,
                        "result of an earlier submission replaces the current view"
                    );
                }
                match result {
                    Ok(outcome) => self.install_outcome(outcome),
                    Err(error) => self.install_failure(&error),
                }
            }
        }
    }

    fn install_failure(&mut self, error: &TransportError) {
        warn!(%error, "query failed");
        self.model = None;
        self.selected_row = None;
        self.placeholder = "Query failed (see raw output)";
        self.raw = format!("Error: {error}");
        self.set_status(StatusLevel::Error, format!("Error: {error}"));
    }

    fn install_outcome(&mut self, outcome: QueryOutcome) {
        self.raw = outcome.raw;
        self.selected_column = 0;
        self.model = ResultModel::project(&outcome.payload, self.config.max_column_width);

        if let Some(model) = &self.model {
            let rows = model.len();
            self.selected_row = (rows > 0).then_some(0);
            self.placeholder = "No results";
            info!(rows, status = outcome.status, "query completed");
            self.set_status(StatusLevel::Success, format!("Fetched {rows} rows"));
            return;
        }

        self.selected_row = None;
        let (placeholder, status) = match &outcome.payload {
            ResponsePayload::Structured(Value::Array(_)) => {
                ("JSON result (non-tabular)", "JSON result (non-tabular)")
            }
            ResponsePayload::Structured(_) => ("JSON result (see raw output)", "JSON result"),
            ResponsePayload::TabularRows(_) | ResponsePayload::Text(_) => {
                ("Text result (see raw output)", "Text result")
            }
        };
        info!(shape = ?outcome.payload.shape(), status = outcome.status, "query completed");
        self.placeholder = placeholder;
        self.set_status(StatusLevel::Success, status);
    }

    pub fn sort_by_column(&mut self, column: usize) -> bool {
        let Some(model) = self.model.as_mut() else {
            return false;
        };
        if model.is_empty() || !model.sort_by_column(column) {
            return false;
        }
        self.selected_column = column;
        self.selected_row = Some(0);
        true
    }

    pub fn sort_by_selected_column(&mut self) -> bool {
        self.sort_by_column(self.selected_column)
    }

    pub fn select_row(&mut self, index: usize) {
        let rows = self.row_count();
        if rows > 0 {
            self.selected_row = Some(index.min(rows - 1));
        }
    }

    pub fn select_column(&mut self, index: usize) {
        let columns = self.model.as_ref().map_or(0, |model| model.columns().len());
        if columns > 0 {
            self.selected_column = index.min(columns - 1);
        }
    }

    pub fn move_column(&mut self, forward: bool) {
        let next = if forward {
            self.selected_column.saturating_add(1)
        } else {
            self.selected_column.saturating_sub(1)
        };
        self.select_column(next);
    }

    pub fn scroll_rows(&mut self, direction: ScrollDirection, now: Instant) {
        let step = self.scroll.step(direction, now);
        self.move_rows(direction, step);
    }

    pub fn page_rows(&mut self, direction: ScrollDirection) {
        self.move_rows(direction, self.config.page_scroll_step);
    }

    fn move_rows(&mut self, direction: ScrollDirection, step: usize) {
        let Some(current) = self.selected_row else {
            return;
        };
        let target = match direction {
            ScrollDirection::Up => current.saturating_sub(step),
            ScrollDirection::Down => current.saturating_add(step),
        };
        self.select_row(target);
    }

    fn row_count(&self) -> usize {
        self.model.as_ref().map_or(0, ResultModel::len)
    }

    #[must_use]
    pub fn results_title(&self) -> String {
        self.model
            .as_ref()
            .map_or_else(|| "Results".to_string(), ResultModel::title)
    }

    #[must_use]
    pub fn detail_view(&self) -> DetailView {
        let selected = self.model.as_ref().zip(self.selected_row);
        match selected.and_then(|(model, index)| Some((model.len(), index, model.detail(index)?)))
        {
            Some((total, index, lines)) => DetailView::Row {
                position: index + 1,
                total,
                lines,
            },
            None => DetailView::Message(self.placeholder),
        }
    }

    pub fn rows_for_export(&mut self) -> Option<Vec<Row>> {
        match self.model.as_ref().filter(|model| !model.is_empty()) {
            Some(model) => Some(model.rows().to_vec()),
            None => {
                self.set_status(StatusLevel::Warning, "No results to export");
                None
            }
        }
    }

    pub fn export_finished(&mut self, result: Result<ExportSummary, ExportFailure>) {
        match result {
            Ok(summary) => {
                info!(rows = summary.rows, path = %summary.path.display(), "exported results");
                self.set_status(
                    StatusLevel::Success,
                    format!("Exported {} rows to {}", summary.rows, summary.file_name),
                );
            }
            Err(error) => {
                warn!(%error, "export failed");
                self.set_status(StatusLevel::Error, format!("Failed to export: {error}"));
            }
        }
    }

    #[must_use]
    pub fn visible_history(&self) -> &[HistoryEntry] {
        let entries = self.history.entries();
        &entries[..entries.len().min(HISTORY_LIST_LIMIT)]
    }

    #[must_use]
    pub fn history_cursor(&self) -> usize {
        self.history_cursor
    }

    pub fn set_history_cursor(&mut self, index: usize) {
        let visible = self.visible_history().len();
        self.history_cursor = index.min(visible.saturating_sub(1));
    }

    pub fn move_history_cursor(&mut self, direction: ScrollDirection) {
        let target = match direction {
            ScrollDirection::Up => self.history_cursor.saturating_sub(1),
            ScrollDirection::Down => self.history_cursor.saturating_add(1),
        };
        self.set_history_cursor(target);
    }

    #[must_use]
    pub fn history_preview(&self) -> Option<HistoryPreview> {
        self.visible_history()
            .get(self.history_cursor)
            .map(|entry| HistoryPreview {
                time: entry.display_time(),
                query: entry.query.clone(),
            })
    }

    pub fn activate_history_entry(&mut self, index: usize) -> bool {
        let Some(entry) = self.visible_history().get(index) else {
            return false;
        };
        self.editor = entry.query.clone();
        self.history_cursor = index;
        self.focus.focus(Pane::Editor);
        true
    }

    pub fn delete_history_entry(&mut self, index: usize) -> bool {
        if self.history.delete(index).is_none() {
            return false;
        }
        if self.persist_history() {
            self.set_status(StatusLevel::Success, "History entry deleted");
        }
        let remaining = self.visible_history().len();
        if self.history_cursor >= remaining {
            self.history_cursor = remaining.saturating_sub(1);
        }
        true
    }
}
