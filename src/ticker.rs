//! Single periodic driver for everything the board refreshes on a clock.
//!
//! Subscribers register a [`TickKind`] with a period; the owner feeds the
//! ticker the current time and gets back the kinds that came due, in
//! subscription order. A long pause (suspended laptop, blocked terminal)
//! yields each kind once rather than a backlog.

use chrono::{DateTime, Duration, Utc};

use crate::config::TicksConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickKind {
    /// Redraw countdown labels and the day clock
    TimeLeft,
    /// Recompute cached deadline progress
    Progress,
    /// Look for a calendar-day rollover
    DayCheck,
}

#[derive(Debug, Clone)]
struct Subscription {
    kind: TickKind,
    period: Duration,
    next_due: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct Ticker {
    subscriptions: Vec<Subscription>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The board's standard schedule. Day checks ride on the time-left
    /// cadence.
    pub fn for_board(config: &TicksConfig, now: DateTime<Utc>) -> Self {
        let mut ticker = Self::new();
        let time_left = Duration::milliseconds(config.time_left_ms as i64);
        ticker.subscribe(TickKind::TimeLeft, time_left, now);
        ticker.subscribe(TickKind::DayCheck, time_left, now);
        ticker.subscribe(
            TickKind::Progress,
            Duration::milliseconds(config.progress_ms as i64),
            now,
        );
        ticker
    }

    /// First tick lands one period after `now`. Re-subscribing a kind
    /// replaces its period.
    pub fn subscribe(&mut self, kind: TickKind, period: Duration, now: DateTime<Utc>) {
        let next_due = now + period;
        if let Some(existing) = self.subscriptions.iter_mut().find(|s| s.kind == kind) {
            existing.period = period;
            existing.next_due = next_due;
            return;
        }
        self.subscriptions.push(Subscription {
            kind,
            period,
            next_due,
        });
    }

    /// Kinds due at `now`; each is rescheduled one period after `now`.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<TickKind> {
        let mut due = Vec::new();
        for subscription in &mut self.subscriptions {
            if now >= subscription.next_due {
                due.push(subscription.kind);
                subscription.next_due = now + subscription.period;
            }
        }
        due
    }

    /// Earliest upcoming tick, for sizing the input poll timeout
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.subscriptions.iter().map(|s| s.next_due).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2026-10-17T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn board_schedule_fires_in_subscription_order() {
        let mut ticker = Ticker::for_board(&TicksConfig::default(), t0());

        assert!(ticker.poll(t0() + Duration::milliseconds(999)).is_empty());
        assert_eq!(
            ticker.poll(t0() + Duration::seconds(1)),
            vec![TickKind::TimeLeft, TickKind::DayCheck]
        );
        assert_eq!(
            ticker.poll(t0() + Duration::seconds(60)),
            vec![TickKind::TimeLeft, TickKind::DayCheck, TickKind::Progress]
        );
    }

    #[test]
    fn long_gap_collapses_to_one_tick() {
        let mut ticker = Ticker::new();
        ticker.subscribe(TickKind::Progress, Duration::seconds(60), t0());

        let later = t0() + Duration::hours(5);
        assert_eq!(ticker.poll(later), vec![TickKind::Progress]);
        assert!(ticker.poll(later + Duration::seconds(59)).is_empty());
        assert_eq!(ticker.next_due(), Some(later + Duration::seconds(60)));
    }
}
