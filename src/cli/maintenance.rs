//! Board-wide commands
//!
//! Implements `tb reset`, `tb stats`, `tb reconcile`.

use serde::Serialize;

use super::context::{open_board, push_load_notes, GlobalOptions};
use crate::error::Result;
use crate::output::{emit_success, Report};
use crate::reconcile::RolloverReport;

/// Options for `tb reset`
pub struct ResetOptions {
    pub hard: bool,
    pub globals: GlobalOptions,
}

#[derive(Debug, Serialize)]
struct ResetOutput {
    hard: bool,
    removed_tasks: usize,
    removed_archived: usize,
    columns: usize,
}

pub fn run_reset(options: ResetOptions) -> Result<()> {
    let mut ctx = open_board(&options.globals)?;
    let removed_tasks = ctx.store.state().task_count();
    let removed_archived = ctx.store.deleted_tasks().len();

    if options.hard {
        ctx.store.wipe()?;
    } else {
        ctx.store.reset_to_default();
    }
    ctx.finish()?;

    let mut human = Report::new(if options.hard {
        "Storage wiped"
    } else {
        "Board reset"
    });
    human.field("Tasks removed", removed_tasks.to_string());
    human.field("Archived removed", removed_archived.to_string());
    human.field("Store", ctx.storage.store_file().display().to_string());

    let output = ResetOutput {
        hard: options.hard,
        removed_tasks,
        removed_archived,
        columns: ctx.store.columns().len(),
    };
    emit_success(options.globals.output(), "reset", &output, Some(&human))
}

pub fn run_stats(globals: GlobalOptions) -> Result<()> {
    let mut ctx = open_board(&globals)?;
    ctx.finish()?;
    let stats = ctx.store.stats();

    let mut human = Report::new("Statistics");
    push_load_notes(&mut human, &ctx.store);
    human.field(
        "Completed",
        format!("{} of {} ({}%)", stats.completed, stats.total, stats.completed_percent),
    );
    human.field(
        "Short",
        format!(
            "{} of {} ({}%)",
            stats.short_completed, stats.short_total, stats.short_percent
        ),
    );
    human.field(
        "Daily",
        format!(
            "{} of {} ({}%)",
            stats.daily_completed, stats.daily_total, stats.daily_percent
        ),
    );
    human.field(
        "Overdue",
        format!("{} ({}%)", stats.overdue, stats.overdue_percent),
    );
    human.field(
        "Day",
        format!(
            "{}% elapsed, {} left",
            stats.day.elapsed_percent, stats.day.remaining_hms
        ),
    );
    human.field(
        "Year",
        format!(
            "{}% elapsed, {} left",
            stats.year.elapsed_percent, stats.year.remaining_label
        ),
    );
    for column in &stats.columns {
        human.line(format!(
            "{}: {}/{} ({}%)",
            column.title, column.completed, column.total, column.percent
        ));
    }

    emit_success(globals.output(), "stats", &stats, Some(&human))
}

#[derive(Debug, Serialize)]
struct ReconcileOutput {
    last_check_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(flatten)]
    report: RolloverReport,
}

/// The day check already runs when the board opens; this reports that pass
/// and runs another in case the clock crossed midnight since.
pub fn run_reconcile(globals: GlobalOptions) -> Result<()> {
    let mut ctx = open_board(&globals)?;
    let now_report = ctx.store.reconcile_now();
    let report = if now_report.rolled_over {
        now_report
    } else {
        ctx.store.last_rollover().clone()
    };
    ctx.finish()?;

    let mut human = Report::new(if report.rolled_over {
        "New day: board reconciled"
    } else {
        "Same day: nothing to reconcile"
    });
    human.field("Daily reset", report.reset.len().to_string());
    human.field("Finished cleared", report.purged.len().to_string());

    let output = ReconcileOutput {
        last_check_date: ctx.store.state().last_check_date,
        report,
    };
    emit_success(globals.output(), "reconcile", &output, Some(&human))
}
