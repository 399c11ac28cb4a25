//! Day-boundary reconciliation.
//!
//! When the local calendar day changes, daily tasks go back to idle and
//! finished tasks in every other column are dropped. Dropped tasks are not
//! archived. Only "is today different from the last recorded check" is
//! evaluated, so several skipped days produce a single pass.
//!
//! Task fields other than `status` are never edited here. A daily task's
//! countdown always runs over the current local day; see
//! [`crate::progress::task_window`].

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::clock::local_date;
use crate::model::{PersistedState, TaskStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RolloverReport {
    pub rolled_over: bool,
    /// Daily tasks whose status was reset
    pub reset: Vec<String>,
    /// Done tasks removed from non-daily columns
    pub purged: Vec<String>,
}

/// True when no check was ever recorded or it happened on another local day.
pub fn is_new_day(
    last_check: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> bool {
    match last_check {
        None => true,
        Some(last) => local_date(last, offset) != local_date(now, offset),
    }
}

/// Reset daily tasks and purge done tasks elsewhere. Does not touch the
/// day marker.
pub fn apply_rollover(state: &mut PersistedState) -> RolloverReport {
    let mut report = RolloverReport {
        rolled_over: true,
        ..RolloverReport::default()
    };

    for column in &mut state.columns {
        if column.kind.is_daily() {
            for task in &mut column.tasks {
                if task.status != TaskStatus::Idle {
                    report.reset.push(task.id.clone());
                }
                task.status = TaskStatus::Idle;
            }
        } else {
            column.tasks.retain(|task| {
                if task.status == TaskStatus::Done {
                    report.purged.push(task.id.clone());
                    false
                } else {
                    true
                }
            });
        }
    }

    for id in &report.purged {
        state.tasks_progress.remove(id);
        state.created_at.remove(id);
    }

    report
}

/// Run the check and, on rollover, the pass; records `now` as the marker
/// whenever a pass ran.
pub fn reconcile(
    state: &mut PersistedState,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> RolloverReport {
    if !is_new_day(state.last_check_date, now, offset) {
        return RolloverReport::default();
    }
    let report = apply_rollover(state);
    state.last_check_date = Some(now);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnsConfig;
    use crate::model::{ColumnType, Task};
    use chrono::{Duration, Offset};

    fn ts(value: &str) -> DateTime<Utc> {
        value.parse().unwrap()
    }

    fn task(id: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            text: format!("task {id}"),
            status,
            deadline: ts("2026-10-20T00:00:00Z"),
            kind: None,
        }
    }

    fn board() -> PersistedState {
        let mut state = PersistedState::default_board(&ColumnsConfig::default());
        for column in &mut state.columns {
            match column.kind {
                ColumnType::Daily => {
                    column.tasks.push(task("d-done", TaskStatus::Done));
                    column.tasks.push(task("d-wip", TaskStatus::InProgress));
                }
                ColumnType::Short => {
                    column.tasks.push(task("s-done", TaskStatus::Done));
                    column.tasks.push(task("s-idle", TaskStatus::Idle));
                }
                ColumnType::Long => column.tasks.push(task("l-done", TaskStatus::Done)),
                ColumnType::Medium => {}
            }
        }
        state.tasks_progress.insert("s-done".to_string(), 12.0);
        state
            .created_at
            .insert("s-done".to_string(), ts("2026-10-16T09:00:00Z"));
        state
    }

    #[test]
    fn first_check_always_rolls_over() {
        assert!(is_new_day(None, ts("2026-10-17T10:00:00Z"), Utc.fix()));
    }

    #[test]
    fn same_local_day_is_quiet() {
        let last = ts("2026-10-17T00:00:01Z");
        assert!(!is_new_day(Some(last), ts("2026-10-17T23:59:59Z"), Utc.fix()));
    }

    #[test]
    fn same_day_of_month_in_another_month_still_rolls() {
        let last = ts("2026-09-17T12:00:00Z");
        assert!(is_new_day(Some(last), ts("2026-10-17T12:00:00Z"), Utc.fix()));
    }

    #[test]
    fn local_offset_decides_the_day() {
        let plus3 = FixedOffset::east_opt(3 * 3600).unwrap();
        let last = ts("2026-10-17T20:00:00Z"); // 23:00 local
        let now = ts("2026-10-17T21:30:00Z"); // 00:30 local, next day
        assert!(is_new_day(Some(last), now, plus3));
        assert!(!is_new_day(Some(last), now, Utc.fix()));
    }

    #[test]
    fn rollover_resets_daily_and_purges_done() {
        let mut state = board();
        let now = ts("2026-10-18T08:00:00Z");
        state.last_check_date = Some(now - Duration::days(3));

        let report = reconcile(&mut state, now, Utc.fix());

        assert!(report.rolled_over);
        assert_eq!(report.reset, vec!["d-done", "d-wip"]);
        assert_eq!(report.purged, vec!["s-done", "l-done"]);
        assert!(state.deleted_tasks.is_empty());
        assert!(!state.tasks_progress.contains_key("s-done"));
        assert!(!state.created_at.contains_key("s-done"));
        assert_eq!(state.last_check_date, Some(now));

        let daily = state.column_of_type(ColumnType::Daily).unwrap();
        assert!(daily.tasks.iter().all(|t| t.status == TaskStatus::Idle));
        assert!(daily
            .tasks
            .iter()
            .all(|t| t.deadline == ts("2026-10-20T00:00:00Z")));
        let short = state.column_of_type(ColumnType::Short).unwrap();
        assert_eq!(short.tasks.len(), 1);
        assert_eq!(short.tasks[0].id, "s-idle");
    }

    #[test]
    fn second_check_same_day_changes_nothing() {
        let mut state = board();
        let now = ts("2026-10-18T08:00:00Z");
        reconcile(&mut state, now, Utc.fix());
        let snapshot = state.clone();

        let report = reconcile(&mut state, now + Duration::hours(2), Utc.fix());
        assert!(!report.rolled_over);
        assert_eq!(state, snapshot);
    }
}
