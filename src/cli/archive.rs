//! Archive commands
//!
//! Implements `tb restore`, `tb archive list`, `tb archive clear`.

use serde::Serialize;

use super::context::{open_board, push_load_notes, short_id, GlobalOptions};
use crate::error::{Error, Result};
use crate::model::DeletedTask;
use crate::output::{emit_success, Report};

/// Options for `tb restore`
pub struct RestoreOptions {
    pub id: String,
    pub globals: GlobalOptions,
}

#[derive(Debug, Serialize)]
struct ArchiveListOutput<'a> {
    total: usize,
    tasks: &'a [DeletedTask],
}

#[derive(Debug, Serialize)]
struct ArchiveClearOutput {
    cleared: usize,
}

pub fn run_restore(options: RestoreOptions) -> Result<()> {
    let mut ctx = open_board(&options.globals)?;
    let id = ctx.store.resolve_deleted_id(&options.id)?;
    let task = ctx.store.restore_task(&id).ok_or_else(|| {
        Error::OperationFailed(format!(
            "no column left to restore {} into",
            short_id(&id)
        ))
    })?;
    ctx.finish()?;

    let view = ctx
        .store
        .find_task(&task.id)
        .map(|(column, task)| ctx.store.task_view(column, task))
        .ok_or_else(|| Error::OperationFailed("task vanished after restore".to_string()))?;

    let mut human = Report::new(format!("Task restored: {}", task.text));
    push_load_notes(&mut human, &ctx.store);
    human.field("ID", task.id.clone());
    human.field("Column", view.column_type.to_string());
    human.field("Time left", view.time_left.clone());

    emit_success(options.globals.output(), "restore", &view, Some(&human))
}

pub fn run_list(globals: GlobalOptions) -> Result<()> {
    let mut ctx = open_board(&globals)?;
    ctx.finish()?;

    let tasks = ctx.store.deleted_tasks();
    let mut human = Report::new("Archived tasks");
    push_load_notes(&mut human, &ctx.store);
    human.field("Total", tasks.len().to_string());
    for entry in tasks {
        human.line(format!(
            "[{}] {} {} (deleted {})",
            entry.column_type,
            short_id(&entry.id),
            entry.text,
            entry.deleted_at.format("%Y-%m-%d %H:%M")
        ));
    }
    if !tasks.is_empty() {
        human.hint("tb restore <id>");
    }

    let output = ArchiveListOutput {
        total: tasks.len(),
        tasks,
    };
    emit_success(globals.output(), "archive list", &output, Some(&human))
}

pub fn run_clear(globals: GlobalOptions) -> Result<()> {
    let mut ctx = open_board(&globals)?;
    let cleared = ctx.store.clear_deleted_tasks();
    ctx.finish()?;

    let mut human = Report::new("Archive cleared");
    push_load_notes(&mut human, &ctx.store);
    human.field("Removed", cleared.to_string());

    emit_success(
        globals.output(),
        "archive clear",
        &ArchiveClearOutput { cleared },
        Some(&human),
    )
}
