//! Wall-clock access and local calendar helpers.
//!
//! The board reasons in UTC instants and converts to the user's local offset
//! only where a calendar boundary matters (midnight, year start).

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, Offset, TimeZone, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Local offset in effect at `at`
    fn offset_at(&self, at: DateTime<Utc>) -> FixedOffset;
}

/// The machine's clock and time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset_at(&self, at: DateTime<Utc>) -> FixedOffset {
        at.with_timezone(&Local).offset().fix()
    }
}

/// Settable clock for tests and replays. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
    offset: FixedOffset,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_offset(start, Utc.fix())
    }

    pub fn with_offset(start: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
            offset,
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.now.set(at);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn offset_at(&self, _at: DateTime<Utc>) -> FixedOffset {
        self.offset
    }
}

pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// 00:00:00.000 local time on the day containing `at`
pub fn start_of_day(at: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let date = local_date(at, offset);
    local_to_utc(date.and_hms_milli_opt(0, 0, 0, 0), offset, at)
}

/// 23:59:59.999 local time on the day containing `at`
pub fn end_of_day(at: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let date = local_date(at, offset);
    local_to_utc(date.and_hms_milli_opt(23, 59, 59, 999), offset, at)
}

/// Jan 1 00:00:00.000 and Dec 31 23:59:59.999 local time of `at`'s year
pub fn year_bounds(at: DateTime<Utc>, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let year = local_date(at, offset).year();
    let start = NaiveDate::from_ymd_opt(year, 1, 1).and_then(|d| d.and_hms_milli_opt(0, 0, 0, 0));
    let end = NaiveDate::from_ymd_opt(year, 12, 31)
        .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999));
    (
        local_to_utc(start, offset, at),
        local_to_utc(end, offset, at),
    )
}

fn local_to_utc(
    naive: Option<chrono::NaiveDateTime>,
    offset: FixedOffset,
    fallback: DateTime<Utc>,
) -> DateTime<Utc> {
    // A fixed offset maps every naive time to exactly one instant, so the
    // fallback only covers out-of-range dates.
    naive
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or(fallback)
}
