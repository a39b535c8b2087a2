use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use serde::Serialize;

use portal_types::models::CREDITS_PER_COPY;

/// Copy windows close daily at 08:00 Philippine time (UTC+8).
const RESET_UTC_OFFSET_HOURS: i64 = 8;
const RESET_HOUR: i64 = 8;

/// First reset strictly after `t`. A copy made exactly at the reset
/// belongs to the following day's window.
pub fn next_reset_after(t: DateTime<Utc>) -> DateTime<Utc> {
    let offset = TimeDelta::hours(RESET_UTC_OFFSET_HOURS);
    let local = t.naive_utc() + offset;
    let mut reset = local.date().and_time(NaiveTime::MIN) + TimeDelta::hours(RESET_HOUR);
    if local >= reset {
        reset += TimeDelta::days(1);
    }
    (reset - offset).and_utc()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub next_reset_at: DateTime<Utc>,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub total_ms: i64,
}

pub fn countdown(now: DateTime<Utc>) -> Countdown {
    let next_reset_at = next_reset_after(now);
    let remaining = next_reset_at - now;
    Countdown {
        next_reset_at,
        hours: remaining.num_hours(),
        minutes: remaining.num_minutes() % 60,
        seconds: remaining.num_seconds() % 60,
        total_ms: remaining.num_milliseconds(),
    }
}

/// True while `now` is still before the first reset following the copy.
pub fn copy_window_active(last_copied_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    last_copied_at.is_some_and(|copied| now < next_reset_after(copied))
}

/// Monthly credits after one copy: one step up, capped at `max`, never lower
/// than the current balance.
pub fn next_monthly_credits(current: i64, max: i64) -> i64 {
    current.max(current.saturating_add(CREDITS_PER_COPY).min(max))
}
