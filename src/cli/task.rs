//! Task commands
//!
//! Implements `tb add`, `tb list`, `tb click`, `tb status`, `tb delete`,
//! `tb move`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::context::{open_board, push_load_notes, short_id, GlobalOptions};
use crate::error::{Error, Result};
use crate::model::{ColumnType, TaskStatus};
use crate::output::{emit_success, Report};
use crate::store::{TaskStore, TaskView};

/// Options for `tb add`
pub struct AddOptions {
    pub text: String,
    pub column: String,
    pub deadline: Option<String>,
    pub within: Option<String>,
    pub globals: GlobalOptions,
}

/// Options for `tb list`
pub struct ListOptions {
    pub column: Option<String>,
    pub globals: GlobalOptions,
}

/// Options for `tb click`
pub struct ClickOptions {
    pub id: String,
    pub globals: GlobalOptions,
}

/// Options for `tb status`
pub struct StatusOptions {
    pub id: String,
    pub status: String,
    pub globals: GlobalOptions,
}

/// Options for `tb delete`
pub struct DeleteOptions {
    pub id: String,
    pub globals: GlobalOptions,
}

/// Options for `tb move`
pub struct MoveOptions {
    pub id: String,
    pub to: String,
    pub globals: GlobalOptions,
}

#[derive(Debug, Serialize)]
struct ColumnListing {
    id: String,
    title: String,
    #[serde(rename = "type")]
    kind: ColumnType,
    total: usize,
    completed: usize,
    tasks: Vec<TaskView>,
}

#[derive(Debug, Serialize)]
struct TaskListOutput {
    total: usize,
    columns: Vec<ColumnListing>,
}

#[derive(Debug, Serialize)]
struct StatusChangeOutput {
    id: String,
    column_id: String,
    from: TaskStatus,
    to: TaskStatus,
}

#[derive(Debug, Serialize)]
struct MoveOutput {
    id: String,
    from_column_id: String,
    to_column_id: String,
    moved: bool,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut ctx = open_board(&options.globals)?;
    let kind: ColumnType = options.column.parse()?;
    let now = ctx.store.now();
    let deadline = parse_deadline(options.deadline.as_deref(), options.within.as_deref(), now)?;

    let task = ctx
        .store
        .add_task(&options.text, kind, deadline)?
        .ok_or_else(|| Error::OperationFailed(format!("board has no {kind} column")))?;
    // New tasks start at 0 until the next progress tick; run it now.
    ctx.store.refresh_progress();
    ctx.finish()?;

    let view = ctx
        .store
        .find_task(&task.id)
        .map(|(column, task)| ctx.store.task_view(column, task))
        .ok_or_else(|| Error::OperationFailed("task vanished after add".to_string()))?;

    let mut human = Report::new(format!("Task added: {}", task.text));
    push_load_notes(&mut human, &ctx.store);
    human.field("ID", task.id.clone());
    human.field("Column", kind.to_string());
    human.field("Deadline", task.deadline.to_rfc3339());
    human.field("Time left", view.time_left.clone());
    human.hint(format!("tb click {}", short_id(&task.id)));

    emit_success(options.globals.output(), "add", &view, Some(&human))
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let mut ctx = open_board(&options.globals)?;
    let filter = options
        .column
        .as_deref()
        .map(str::parse::<ColumnType>)
        .transpose()?;
    ctx.finish()?;

    let store = &ctx.store;
    let columns: Vec<ColumnListing> = store
        .columns()
        .iter()
        .filter(|column| filter.map_or(true, |kind| column.kind == kind))
        .map(|column| ColumnListing {
            id: column.id.clone(),
            title: column.title.clone(),
            kind: column.kind,
            total: column.tasks.len(),
            completed: column.completed(),
            tasks: column
                .tasks
                .iter()
                .map(|task| store.task_view(column, task))
                .collect(),
        })
        .collect();
    let total: usize = columns.iter().map(|column| column.total).sum();

    let mut human = Report::new("Tasks");
    push_load_notes(&mut human, store);
    human.field("Total", total.to_string());
    for column in &columns {
        human.line(format!(
            "{} ({}/{})",
            column.title, column.completed, column.total
        ));
        for view in &column.tasks {
            human.line(format_task_line(view));
        }
    }
    if total == 0 {
        human.hint("tb add \"...\" --in 1d");
    }

    let output = TaskListOutput { total, columns };
    emit_success(options.globals.output(), "list", &output, Some(&human))
}

pub fn run_click(options: ClickOptions) -> Result<()> {
    let mut ctx = open_board(&options.globals)?;
    let (id, column_id, from) = locate(&ctx.store, &options.id)?;
    let to = ctx
        .store
        .click(&id, &column_id)
        .ok_or_else(|| Error::TaskNotFound(options.id.clone()))?;
    ctx.finish()?;
    report_status_change(&options.globals, "click", &ctx.store, id, column_id, from, to)
}

pub fn run_status(options: StatusOptions) -> Result<()> {
    let mut ctx = open_board(&options.globals)?;
    let to: TaskStatus = options.status.parse()?;
    let (id, column_id, from) = locate(&ctx.store, &options.id)?;
    ctx.store.change_status(&id, to, &column_id);
    ctx.finish()?;
    report_status_change(&options.globals, "status", &ctx.store, id, column_id, from, to)
}

pub fn run_delete(options: DeleteOptions) -> Result<()> {
    let mut ctx = open_board(&options.globals)?;
    let (id, column_id, _) = locate(&ctx.store, &options.id)?;
    let archived = ctx
        .store
        .delete_task(&id, &column_id)
        .ok_or_else(|| Error::TaskNotFound(options.id.clone()))?;
    ctx.finish()?;

    let mut human = Report::new(format!("Task deleted: {}", archived.text));
    push_load_notes(&mut human, &ctx.store);
    human.field("ID", archived.id.clone());
    human.field("Archived from", archived.column_type.to_string());
    human.hint(format!("tb restore {}", short_id(&archived.id)));

    emit_success(options.globals.output(), "delete", &archived, Some(&human))
}

pub fn run_move(options: MoveOptions) -> Result<()> {
    let mut ctx = open_board(&options.globals)?;
    let (id, from_column_id, _) = locate(&ctx.store, &options.id)?;
    let to_column_id = resolve_column(&ctx.store, &options.to)?;

    let moved = ctx.store.move_task(&id, &from_column_id, &to_column_id);
    ctx.finish()?;

    let mut human = Report::new(if moved { "Task moved" } else { "Task not moved" });
    push_load_notes(&mut human, &ctx.store);
    human.field("ID", id.clone());
    human.field("From", from_column_id.clone());
    human.field("To", to_column_id.clone());

    let output = MoveOutput {
        id,
        from_column_id,
        to_column_id,
        moved,
    };
    emit_success(options.globals.output(), "move", &output, Some(&human))
}

/// `--deadline` wins over `--in`; neither yields `None`.
pub fn parse_deadline(
    deadline: Option<&str>,
    within: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    if let Some(value) = deadline {
        let parsed = DateTime::parse_from_rfc3339(value.trim()).map_err(|err| {
            Error::InvalidArgument(format!("invalid deadline timestamp '{value}': {err}"))
        })?;
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    match within {
        Some(value) => deadline_after(now, parse_duration(value)?).map(Some),
        None => Ok(None),
    }
}

/// `90s`, `45m`, `2h`, `3d`, `1w`; a bare number is minutes.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::InvalidArgument("Duration cannot be empty".to_string()));
    }

    let (num_str, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => (&s[..pos], &s[pos..]),
        None => (s, "m"),
    };

    let num: i64 = num_str
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("Invalid duration number: {num_str}")))?;

    let duration = match unit.trim().to_lowercase().as_str() {
        "s" | "sec" | "second" | "seconds" => Duration::try_seconds(num),
        "m" | "min" | "minute" | "minutes" => Duration::try_minutes(num),
        "h" | "hr" | "hour" | "hours" => Duration::try_hours(num),
        "d" | "day" | "days" => Duration::try_days(num),
        "w" | "week" | "weeks" => Duration::try_weeks(num),
        _ => {
            return Err(Error::InvalidArgument(format!(
                "Invalid duration unit '{unit}'. Expected: s, m, h, d, w"
            )));
        }
    };

    duration.ok_or_else(|| Error::InvalidArgument(format!("Duration out of range: {s}")))
}

/// `now + delta`, rejecting results chrono cannot represent.
pub fn deadline_after(now: DateTime<Utc>, delta: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(delta)
        .ok_or_else(|| Error::InvalidArgument("Deadline is too far in the future".to_string()))
}

/// Resolve an id prefix to `(id, column id, status)`.
fn locate(store: &TaskStore, input: &str) -> Result<(String, String, TaskStatus)> {
    let id = store.resolve_task_id(input)?;
    let (column, task) = store
        .find_task(&id)
        .ok_or_else(|| Error::TaskNotFound(input.to_string()))?;
    Ok((id.clone(), column.id.clone(), task.status))
}

/// A column type picks the first column of that type; anything else must
/// be an existing column id.
fn resolve_column(store: &TaskStore, input: &str) -> Result<String> {
    if let Ok(kind) = input.parse::<ColumnType>() {
        if let Some(column) = store.state().column_of_type(kind) {
            return Ok(column.id.clone());
        }
    }
    store
        .state()
        .column(input.trim())
        .map(|column| column.id.clone())
        .ok_or_else(|| Error::InvalidArgument(format!("no such column: {input}")))
}

fn report_status_change(
    globals: &GlobalOptions,
    command: &str,
    store: &TaskStore,
    id: String,
    column_id: String,
    from: TaskStatus,
    to: TaskStatus,
) -> Result<()> {
    let text = store
        .find_task(&id)
        .map(|(_, task)| task.text.clone())
        .unwrap_or_default();
    let mut human = Report::new(format!("{text}: {from} -> {to}"));
    push_load_notes(&mut human, store);
    human.field("ID", id.clone());

    let output = StatusChangeOutput {
        id,
        column_id,
        from,
        to,
    };
    emit_success(globals.output(), command, &output, Some(&human))
}

fn format_task_line(view: &TaskView) -> String {
    let mut line = format!(
        "[{}] {} {} ({})",
        status_glyph(view.status),
        short_id(&view.id),
        view.text,
        view.time_left
    );
    if view.show_progress {
        line.push_str(&format!(" {:.0}% {}", view.progress, view.urgency.as_str()));
    }
    line
}

fn status_glyph(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Idle => " ",
        TaskStatus::InProgress => "~",
        TaskStatus::Done => "x",
    }
}
