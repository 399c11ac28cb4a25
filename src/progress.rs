//! Deadline progress and time-left formatting.
//!
//! Progress here counts DOWN: a task created just now reads 100, a task
//! halfway to its deadline reads 50. Once the deadline has passed the
//! calculator returns 100 again as an "elapsed" sentinel rather than
//! decaying below zero, so there is a deliberate jump at the deadline
//! instant. Callers that render bars treat the sentinel as "hide".

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;

use crate::clock::{end_of_day, start_of_day};
use crate::config::UrgencyConfig;
use crate::model::ColumnType;

/// Label shown once a deadline has passed
pub const EXPIRED_MARKER: &str = "expired";

const MS_PER_SECOND: i64 = 1000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Remaining share of the task's window, 0..=100.
pub fn calculate_progress(
    created_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let remaining = (deadline - now).num_milliseconds();
    if remaining <= 0 {
        return 100.0;
    }

    let total = (deadline - created_at).num_milliseconds();
    if total == 0 {
        return 0.0;
    }

    (remaining as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

/// `2д 3ч 15м 40с`, `45м 12с`, `7с`, or [`EXPIRED_MARKER`].
pub fn format_time_left(deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = deadline - now;
    if diff.num_milliseconds() <= 0 {
        return EXPIRED_MARKER.to_string();
    }
    format_countdown(diff)
}

/// Days/hours/minutes/seconds with leading zero units dropped; seconds are
/// always present.
pub fn format_countdown(delta: Duration) -> String {
    let ms = delta.num_milliseconds().max(0);
    let days = ms / MS_PER_DAY;
    let hours = (ms % MS_PER_DAY) / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{days}д"));
    }
    if hours > 0 || days > 0 {
        parts.push(format!("{hours}ч"));
    }
    if minutes > 0 || hours > 0 || days > 0 {
        parts.push(format!("{minutes}м"));
    }
    parts.push(format!("{seconds}с"));
    parts.join(" ")
}

/// Colour band of a cached progress value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// Window used up; bar hidden, label red
    Expired,
    /// Plenty of time left (green)
    Relaxed,
    /// Middle band (yellow)
    Approaching,
    /// Little time left (red)
    Urgent,
}

impl Urgency {
    pub fn classify(progress: f64, thresholds: &UrgencyConfig) -> Urgency {
        if progress == 0.0 {
            Urgency::Expired
        } else if progress > thresholds.relaxed_above {
            Urgency::Relaxed
        } else if progress >= thresholds.urgent_below {
            Urgency::Approaching
        } else {
            Urgency::Urgent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Expired => "expired",
            Urgency::Relaxed => "relaxed",
            Urgency::Approaching => "approaching",
            Urgency::Urgent => "urgent",
        }
    }
}

/// Countdown window `(start, end)` of a task in a column of `kind`.
///
/// Daily tasks count down over the current local day whatever deadline was
/// stored when they were created; other tasks run from creation to their
/// deadline. A missing creation time counts as `now`.
pub fn task_window(
    kind: ColumnType,
    created_at: Option<DateTime<Utc>>,
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> (DateTime<Utc>, DateTime<Utc>) {
    if kind.is_daily() {
        (start_of_day(now, offset), end_of_day(now, offset))
    } else {
        (created_at.unwrap_or(now), deadline)
    }
}

/// Value to cache after a periodic refresh: the elapsed sentinel is stored
/// as 0 so the bar disappears.
pub fn cached_progress(
    created_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    if deadline <= now {
        return 0.0;
    }
    calculate_progress(created_at, deadline, now)
}
