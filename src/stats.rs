//! Aggregate board statistics and the day/year clocks.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;

use crate::clock::{end_of_day, start_of_day, year_bounds};
use crate::model::{ColumnType, PersistedState, TaskStatus};
use crate::progress::task_window;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column_id: String,
    pub title: String,
    pub column_type: ColumnType,
    pub total: usize,
    pub completed: usize,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayClock {
    /// Share of the local day already gone, rounded
    pub elapsed_percent: u8,
    /// `HH:MM:SS` until 23:59:59.999
    pub remaining_hms: String,
    /// `Xч Yм Zс`, or `Xд Yч Zм` for spans over a day
    pub remaining_label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearClock {
    pub elapsed_percent: u8,
    pub remaining_label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardStats {
    pub total: usize,
    pub completed: usize,
    pub completed_percent: u8,
    pub short_total: usize,
    pub short_completed: usize,
    pub short_percent: u8,
    pub daily_total: usize,
    pub daily_completed: usize,
    pub daily_percent: u8,
    /// Unfinished tasks whose deadline has passed
    pub overdue: usize,
    pub overdue_percent: u8,
    pub archived: usize,
    pub columns: Vec<ColumnStats>,
    pub day: DayClock,
    pub year: YearClock,
}

pub fn compute(state: &PersistedState, now: DateTime<Utc>, offset: FixedOffset) -> BoardStats {
    let total = state.task_count();
    let completed: usize = state.columns.iter().map(|column| column.completed()).sum();

    let (short_total, short_completed) = first_of_type(state, ColumnType::Short);
    let (daily_total, daily_completed) = first_of_type(state, ColumnType::Daily);

    let overdue = state
        .all_tasks()
        .filter(|(column, task)| {
            let created_at = state.created_at.get(&task.id).copied();
            let (_, end) = task_window(column.kind, created_at, task.deadline, now, offset);
            end < now && task.status != TaskStatus::Done
        })
        .count();

    let columns = state
        .columns
        .iter()
        .map(|column| ColumnStats {
            column_id: column.id.clone(),
            title: column.title.clone(),
            column_type: column.kind,
            total: column.tasks.len(),
            completed: column.completed(),
            percent: percent(column.completed(), column.tasks.len()),
        })
        .collect();

    BoardStats {
        total,
        completed,
        completed_percent: percent(completed, total),
        short_total,
        short_completed,
        short_percent: percent(short_completed, short_total),
        daily_total,
        daily_completed,
        daily_percent: percent(daily_completed, daily_total),
        overdue,
        overdue_percent: percent(overdue, total),
        archived: state.deleted_tasks.len(),
        columns,
        day: day_clock(now, offset),
        year: year_clock(now, offset),
    }
}

pub fn day_clock(now: DateTime<Utc>, offset: FixedOffset) -> DayClock {
    let start = start_of_day(now, offset);
    let end = end_of_day(now, offset);
    let elapsed_percent = span_percent(start, end, now);
    let remaining = end - now;
    DayClock {
        elapsed_percent,
        remaining_hms: format_hms(remaining),
        remaining_label: format_remaining(remaining),
        color: dynamic_color(elapsed_percent),
    }
}

pub fn year_clock(now: DateTime<Utc>, offset: FixedOffset) -> YearClock {
    let (start, end) = year_bounds(now, offset);
    let elapsed_percent = span_percent(start, end, now);
    YearClock {
        elapsed_percent,
        remaining_label: format_remaining(end - now),
        color: dynamic_color(elapsed_percent),
    }
}

/// Green at 0, red at 100.
pub fn dynamic_color(progress: u8) -> String {
    let (red, green, blue) = dynamic_rgb(progress);
    format!("rgb({red}, {green}, {blue})")
}

pub fn dynamic_rgb(progress: u8) -> (u8, u8, u8) {
    let ratio = f64::from(progress.min(100)) / 100.0;
    let red = (255.0 * ratio).round() as u8;
    let green = (255.0 * (1.0 - ratio)).round() as u8;
    (red, green, 0)
}

/// `HH:MM:SS`, hours not wrapped
pub fn format_hms(delta: Duration) -> String {
    let secs = delta.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

pub fn format_remaining(delta: Duration) -> String {
    let secs = delta.num_seconds().max(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if days > 0 {
        format!("{days}д {hours}ч {minutes}м")
    } else {
        format!("{hours}ч {minutes}м {seconds}с")
    }
}

fn first_of_type(state: &PersistedState, kind: ColumnType) -> (usize, usize) {
    state
        .column_of_type(kind)
        .map(|column| (column.tasks.len(), column.completed()))
        .unwrap_or((0, 0))
}

fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round().clamp(0.0, 100.0) as u8
}

fn span_percent(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> u8 {
    let total = (end - start).num_milliseconds();
    if total <= 0 {
        return 0;
    }
    let elapsed = (now - start).num_milliseconds();
    ((elapsed as f64 / total as f64) * 100.0)
        .round()
        .clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnsConfig;
    use crate::model::Task;
    use chrono::Offset;

    fn ts(value: &str) -> DateTime<Utc> {
        value.parse().unwrap()
    }

    fn task(id: &str, status: TaskStatus, deadline: &str) -> Task {
        Task {
            id: id.to_string(),
            text: format!("task {id}"),
            status,
            deadline: ts(deadline),
            kind: None,
        }
    }

    #[test]
    fn counts_and_percentages() {
        let mut state = PersistedState::default_board(&ColumnsConfig::default());
        for column in &mut state.columns {
            match column.kind {
                ColumnType::Daily => {
                    column.tasks.push(task("d1", TaskStatus::Done, "2026-10-17T23:59:59Z"));
                    // Stored deadline from an earlier day; dailies run on today's window.
                    column.tasks.push(task("d2", TaskStatus::Idle, "2026-10-15T23:59:59Z"));
                    column.tasks.push(task("d3", TaskStatus::Idle, "2026-10-17T23:59:59Z"));
                    column.tasks.push(task("d4", TaskStatus::Idle, "2026-10-17T23:59:59Z"));
                }
                ColumnType::Short => {
                    column.tasks.push(task("s1", TaskStatus::Done, "2026-10-10T00:00:00Z"));
                    column.tasks.push(task("s2", TaskStatus::InProgress, "2026-10-10T00:00:00Z"));
                }
                _ => {}
            }
        }

        let stats = compute(&state, ts("2026-10-17T12:00:00Z"), Utc.fix());
        assert_eq!((stats.total, stats.completed), (6, 2));
        assert_eq!(stats.completed_percent, 33);
        assert_eq!(stats.short_percent, 50);
        assert_eq!((stats.daily_total, stats.daily_completed), (4, 1));
        assert_eq!(stats.daily_percent, 25);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.overdue_percent, 17);
        assert_eq!(stats.columns[0].percent, 25);
        assert_eq!(stats.columns[2].percent, 0);
    }

    #[test]
    fn empty_board_is_all_zeroes() {
        let state = PersistedState::default_board(&ColumnsConfig::default());
        let stats = compute(&state, ts("2026-10-17T12:00:00Z"), Utc.fix());
        assert_eq!(stats.completed_percent, 0);
        assert_eq!(stats.daily_percent, 0);
        assert_eq!(stats.overdue_percent, 0);
    }

    #[test]
    fn day_clock_at_noon() {
        let clock = day_clock(ts("2026-10-17T12:00:00Z"), Utc.fix());
        assert_eq!(clock.elapsed_percent, 50);
        assert_eq!(clock.remaining_hms, "11:59:59");
        assert_eq!(clock.remaining_label, "11ч 59м 59с");
        assert_eq!(clock.color, "rgb(128, 128, 0)");
    }

    #[test]
    fn long_spans_switch_to_days() {
        let delta = Duration::days(3) + Duration::hours(26) + Duration::minutes(5);
        assert_eq!(format_remaining(delta), "4д 2ч 5м");
        assert_eq!(format_hms(Duration::hours(30)), "30:00:00");
    }

    #[test]
    fn colour_runs_green_to_red() {
        assert_eq!(dynamic_color(0), "rgb(0, 255, 0)");
        assert_eq!(dynamic_color(100), "rgb(255, 0, 0)");
        assert_eq!(dynamic_rgb(200), (255, 0, 0));
    }

    #[test]
    fn year_clock_midyear() {
        let clock = year_clock(ts("2026-07-02T12:00:00Z"), Utc.fix());
        assert_eq!(clock.elapsed_percent, 50);
    }
}
