use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::cli::{deadline_after, parse_duration};
use crate::error::Result;
use crate::model::{ColumnType, Task, TaskColumn};
use crate::storage::Storage;
use crate::store::TaskStore;
use crate::ticker::Ticker;

use super::view;

const EVENT_POLL_MS: u64 = 250;
const MIN_POLL_MS: u64 = 10;
const WATCH_DEBOUNCE_MS: u64 = 200;
const DEFAULT_WITHIN: &str = "1d";

enum UiMsg {
    StoreChanged,
    WatchError(String),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum StatusKind {
    Error,
    Info,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum InputField {
    Text,
    Within,
}

/// The add-task form
#[derive(Debug, Clone)]
pub(crate) struct AddTaskInput {
    pub(crate) text: String,
    pub(crate) kind: ColumnType,
    pub(crate) within: String,
    pub(crate) field: InputField,
}

impl AddTaskInput {
    fn new(kind: ColumnType) -> Self {
        Self {
            text: String::new(),
            kind,
            within: DEFAULT_WITHIN.to_string(),
            field: InputField::Text,
        }
    }

    fn active_buffer(&mut self) -> &mut String {
        match self.field {
            InputField::Text => &mut self.text,
            InputField::Within => &mut self.within,
        }
    }

    fn cycle_kind(&mut self) {
        let index = ColumnType::ALL
            .iter()
            .position(|kind| *kind == self.kind)
            .unwrap_or(0);
        self.kind = ColumnType::ALL[(index + 1) % ColumnType::ALL.len()];
    }
}

pub(crate) struct DeleteConfirmState {
    pub(crate) task_id: String,
    pub(crate) column_id: String,
    pub(crate) text: String,
}

pub struct AppState {
    pub(crate) store: TaskStore,
    pub(crate) column: usize,
    pub(crate) row: usize,
    pub(crate) input: Option<AddTaskInput>,
    pub(crate) delete_confirm: Option<DeleteConfirmState>,
    pub(crate) show_help: bool,
    status: Option<(String, StatusKind)>,
    watch_error: Option<String>,
}

impl AppState {
    pub(crate) fn new(store: TaskStore) -> Self {
        Self {
            store,
            column: 0,
            row: 0,
            input: None,
            delete_confirm: None,
            show_help: false,
            status: None,
            watch_error: None,
        }
    }

    pub(crate) fn columns(&self) -> &[TaskColumn] {
        self.store.columns()
    }

    pub(crate) fn selected_column(&self) -> Option<&TaskColumn> {
        self.store.columns().get(self.column)
    }

    pub(crate) fn selected_task(&self) -> Option<(&TaskColumn, &Task)> {
        let column = self.selected_column()?;
        column.tasks.get(self.row).map(|task| (column, task))
    }

    pub(crate) fn status_line(&self) -> Option<(&str, StatusKind)> {
        if let Some(error) = self.watch_error.as_deref() {
            return Some((error, StatusKind::Error));
        }
        self.status
            .as_ref()
            .map(|(message, kind)| (message.as_str(), *kind))
    }

    pub(crate) fn footer_hint(&self) -> &'static str {
        if self.input.is_some() {
            "type  tab next field  ctrl-t column  enter add  esc cancel"
        } else if self.delete_confirm.is_some() {
            "y delete  n cancel"
        } else {
            "←→ column  ↑↓ task  space click  a add  d delete  < > move  u restore  ? help  q quit"
        }
    }

    fn set_info(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), StatusKind::Info));
    }

    fn set_error(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), StatusKind::Error));
    }

    /// Keep the cursor on an existing column and row after the board changed.
    fn clamp_selection(&mut self) {
        let columns = self.store.columns().len();
        if columns == 0 {
            self.column = 0;
            self.row = 0;
            return;
        }
        self.column = self.column.min(columns - 1);
        let rows = self.store.columns()[self.column].tasks.len();
        self.row = self.row.min(rows.saturating_sub(1));
    }

    fn select_task(&mut self, task_id: &str) {
        for (column_index, column) in self.store.columns().iter().enumerate() {
            if let Some(row) = column.tasks.iter().position(|task| task.id == task_id) {
                self.column = column_index;
                self.row = row;
                return;
            }
        }
        self.clamp_selection();
    }

    fn handle_ui_msg(&mut self, msg: UiMsg) {
        match msg {
            UiMsg::StoreChanged => {
                if self.store.reload() {
                    self.clamp_selection();
                    self.set_info("board changed on disk; reloaded");
                }
            }
            UiMsg::WatchError(err) => {
                self.watch_error = Some(format!("watch error: {err}"));
            }
        }
    }

    /// Apply one key press. Returns `true` when the board should close.
    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        if self.input.is_some() {
            self.handle_input_key(key);
            return false;
        }

        if let Some(confirm) = self.delete_confirm.take() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    match self.store.delete_task(&confirm.task_id, &confirm.column_id) {
                        Some(archived) => self.set_info(format!("deleted: {}", archived.text)),
                        None => self.set_error("task is gone"),
                    }
                    self.clamp_selection();
                }
                KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
                    self.set_info("cancelled");
                }
                _ => self.delete_confirm = Some(confirm),
            }
            return false;
        }

        if self.show_help {
            self.show_help = false;
            return false;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Left | KeyCode::Char('h') => {
                self.column = self.column.saturating_sub(1);
                self.clamp_selection();
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.column += 1;
                self.clamp_selection();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.row = self.row.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.row += 1;
                self.clamp_selection();
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.click_selected(),
            KeyCode::Char('a') => {
                let kind = self
                    .selected_column()
                    .map(|column| column.kind)
                    .unwrap_or(ColumnType::Short);
                self.input = Some(AddTaskInput::new(kind));
            }
            KeyCode::Char('d') => {
                if let Some((column, task)) = self.selected_task() {
                    self.delete_confirm = Some(DeleteConfirmState {
                        task_id: task.id.clone(),
                        column_id: column.id.clone(),
                        text: task.text.clone(),
                    });
                }
            }
            KeyCode::Char('>') => self.move_selected(1),
            KeyCode::Char('<') => self.move_selected(-1),
            KeyCode::Char('u') => self.restore_latest(),
            KeyCode::Char('r') => {
                if self.store.reload() {
                    self.clamp_selection();
                    self.set_info("reloaded");
                } else {
                    self.set_info("nothing new on disk");
                }
            }
            _ => {}
        }
        false
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let Some(input) = self.input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.input = None;
                self.set_info("cancelled");
            }
            KeyCode::Tab => {
                input.field = match input.field {
                    InputField::Text => InputField::Within,
                    InputField::Within => InputField::Text,
                };
            }
            KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                input.cycle_kind();
            }
            KeyCode::Backspace => {
                input.active_buffer().pop();
            }
            KeyCode::Char(ch) => input.active_buffer().push(ch),
            KeyCode::Enter => self.submit_input(),
            _ => {}
        }
    }

    fn submit_input(&mut self) {
        let Some(input) = self.input.clone() else {
            return;
        };
        let deadline = if input.kind.is_daily() {
            None
        } else {
            let now = self.store.now();
            match parse_duration(&input.within).and_then(|delta| deadline_after(now, delta)) {
                Ok(deadline) => Some(deadline),
                Err(err) => {
                    self.set_error(err.to_string());
                    return;
                }
            }
        };

        match self.store.add_task(&input.text, input.kind, deadline) {
            Ok(Some(task)) => {
                self.input = None;
                self.select_task(&task.id);
                self.set_info(format!("added: {}", task.text));
            }
            Ok(None) => {
                self.input = None;
                self.set_error(format!("no {} column on this board", input.kind));
            }
            // Keep the form open so the text can be fixed.
            Err(err) => self.set_error(err.to_string()),
        }
    }

    fn click_selected(&mut self) {
        let Some((column_id, task_id)) = self
            .selected_task()
            .map(|(column, task)| (column.id.clone(), task.id.clone()))
        else {
            return;
        };
        if let Some(status) = self.store.click(&task_id, &column_id) {
            self.set_info(format!("status: {status}"));
        }
    }

    fn move_selected(&mut self, step: isize) {
        let Some((from, task_id)) = self
            .selected_task()
            .map(|(column, task)| (column.id.clone(), task.id.clone()))
        else {
            return;
        };
        let target = self.column as isize + step;
        let Some(to) = usize::try_from(target)
            .ok()
            .and_then(|index| self.store.columns().get(index))
            .map(|column| column.id.clone())
        else {
            return;
        };
        if self.store.move_task(&task_id, &from, &to) {
            self.select_task(&task_id);
        }
    }

    fn restore_latest(&mut self) {
        let Some(latest) = self
            .store
            .deleted_tasks()
            .iter()
            .max_by_key(|entry| entry.deleted_at)
            .map(|entry| entry.id.clone())
        else {
            self.set_info("archive is empty");
            return;
        };
        match self.store.restore_task(&latest) {
            Some(task) => {
                self.select_task(&task.id);
                self.set_info(format!("restored: {}", task.text));
            }
            None => self.set_error("no column to restore into"),
        }
    }
}

pub fn run(store: TaskStore, storage: Storage) -> Result<()> {
    let (ui_tx, ui_rx) = mpsc::channel();
    spawn_watch(storage.store_file(), ui_tx);

    let ticker = Ticker::for_board(&store.config().ticks, store.now());
    let mut app = AppState::new(store);
    run_terminal(&mut app, ticker, ui_rx)
}

fn run_terminal(app: &mut AppState, ticker: Ticker, ui_rx: Receiver<UiMsg>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app, ticker, ui_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Edits made in the last debounce window still reach disk.
    let flushed = app.store.flush();
    result?;
    flushed?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    mut ticker: Ticker,
    ui_rx: Receiver<UiMsg>,
) -> Result<()> {
    let mut dirty = true;
    loop {
        while let Ok(msg) = ui_rx.try_recv() {
            app.handle_ui_msg(msg);
            dirty = true;
        }

        let now = app.store.now();
        for tick in ticker.poll(now) {
            if app.store.handle_tick(tick) {
                app.clamp_selection();
                dirty = true;
            }
        }
        if let Err(err) = app.store.poll() {
            app.set_error(format!("save failed: {err}"));
            dirty = true;
        }

        if dirty {
            terminal.draw(|frame| view::render(frame, app))?;
            dirty = false;
        }

        if event::poll(poll_timeout(&ticker, now))? {
            match event::read()? {
                Event::Key(key) => {
                    if app.handle_key(key) {
                        break;
                    }
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
    }
    Ok(())
}

/// Wait for input no longer than the next tick.
fn poll_timeout(ticker: &Ticker, now: chrono::DateTime<chrono::Utc>) -> Duration {
    let cap = Duration::from_millis(EVENT_POLL_MS);
    let until_tick = ticker
        .next_due()
        .map(|due| (due - now).to_std().unwrap_or(Duration::ZERO))
        .unwrap_or(cap);
    until_tick.clamp(Duration::from_millis(MIN_POLL_MS), cap)
}

fn spawn_watch(store_file: PathBuf, ui_tx: Sender<UiMsg>) {
    let Some(data_dir) = store_file.parent().map(|dir| dir.to_path_buf()) else {
        return;
    };
    let Some(file_name) = store_file.file_name().map(|name| name.to_os_string()) else {
        return;
    };
    if !data_dir.exists() {
        return;
    }

    thread::spawn(move || {
        let (event_tx, event_rx) = mpsc::channel();
        let watcher: notify::Result<RecommendedWatcher> = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        });

        let mut watcher = match watcher {
            Ok(watcher) => watcher,
            Err(err) => {
                let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                return;
            }
        };
        if let Err(err) = watcher.watch(&data_dir, RecursiveMode::NonRecursive) {
            let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
            return;
        }

        let debounce = Duration::from_millis(WATCH_DEBOUNCE_MS);
        let mut pending: Option<Instant> = None;

        loop {
            let timeout = pending
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(Duration::from_secs(3600));
            match event_rx.recv_timeout(timeout) {
                Ok(Ok(event)) => {
                    let touches_store = event
                        .paths
                        .iter()
                        .any(|path| path.file_name() == Some(file_name.as_os_str()));
                    if touches_store {
                        pending = Some(Instant::now() + debounce);
                    }
                }
                Ok(Err(err)) => {
                    let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if pending.take().is_some() && ui_tx.send(UiMsg::StoreChanged).is_err() {
                        break;
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    });
}
