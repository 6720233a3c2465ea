//! Cron-like schedule descriptors
//!
//! Two descriptor shapes drive the scheduler:
//! - a six-field cron string (`sec min hour dom month dow`) for the shared
//!   recurring cadence, supporting fixed values, `*`, ranges `a-b`, and
//!   stepped ranges `a-b/n` or `*/n` per field
//! - a plain `"HH:MM"` daily slot for per-account timers
//!
//! Matching is wall-clock local time at minute/second granularity. Lists,
//! month/day names, and other extended syntax are rejected at parse time;
//! callers that only estimate upcoming fires treat a parse error as "no
//! estimate" instead of failing.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike};

use super::error::{SchedulerError, SchedulerResult};

/// Search horizon for the next matching instant. A leap cycle is enough to
/// satisfy even a spec pinned to February 29th.
const MAX_SEARCH_DAYS: i64 = 1466;

/// One parsed cron field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CronField {
    All,
    Value(u32),
    Range(u32, u32),
    Step { start: u32, end: u32, step: u32 },
}

impl CronField {
    fn parse(raw: &str, min: u32, max: u32) -> Result<Self, String> {
        if raw == "*" {
            return Ok(Self::All);
        }

        if let Some((body, step_raw)) = raw.split_once('/') {
            let step: u32 = step_raw
                .parse()
                .map_err(|_| format!("invalid step '{}'", step_raw))?;
            if step == 0 {
                return Err("step must be at least 1".to_string());
            }
            let (start, end) = if body == "*" {
                (min, max)
            } else if let Some((a, b)) = body.split_once('-') {
                (
                    Self::parse_value(a, min, max)?,
                    Self::parse_value(b, min, max)?,
                )
            } else {
                return Err(format!("step base '{}' must be '*' or a range", body));
            };
            if start > end {
                return Err(format!("range {}-{} is inverted", start, end));
            }
            return Ok(Self::Step { start, end, step });
        }

        if let Some((a, b)) = raw.split_once('-') {
            let start = Self::parse_value(a, min, max)?;
            let end = Self::parse_value(b, min, max)?;
            if start > end {
                return Err(format!("range {}-{} is inverted", start, end));
            }
            return Ok(Self::Range(start, end));
        }

        Ok(Self::Value(Self::parse_value(raw, min, max)?))
    }

    fn parse_value(raw: &str, min: u32, max: u32) -> Result<u32, String> {
        let value: u32 = raw
            .parse()
            .map_err(|_| format!("unsupported field syntax '{}'", raw))?;
        if value < min || value > max {
            return Err(format!("value {} outside {}-{}", value, min, max));
        }
        Ok(value)
    }

    fn matches(&self, value: u32) -> bool {
        match self {
            Self::All => true,
            Self::Value(v) => value == *v,
            Self::Range(a, b) => value >= *a && value <= *b,
            Self::Step { start, end, step } => {
                value >= *start && value <= *end && (value - start) % step == 0
            }
        }
    }

    fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// Parsed six-field cron descriptor
#[derive(Debug, Clone)]
pub struct CronSpec {
    expr: String,
    sec: CronField,
    minute: CronField,
    hour: CronField,
    dom: CronField,
    month: CronField,
    dow: CronField,
}

impl CronSpec {
    /// Parse a six-field descriptor: seconds, minutes, hours, day-of-month,
    /// month, day-of-week (0 = Sunday)
    pub fn parse(expr: &str) -> SchedulerResult<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(SchedulerError::invalid_cron(
                expr,
                format!("expected 6 fields, got {}", fields.len()),
            ));
        }

        let field = |raw: &str, min: u32, max: u32, name: &str| {
            CronField::parse(raw, min, max)
                .map_err(|reason| SchedulerError::invalid_cron(expr, format!("{}: {}", name, reason)))
        };

        Ok(Self {
            expr: expr.to_string(),
            sec: field(fields[0], 0, 59, "seconds")?,
            minute: field(fields[1], 0, 59, "minutes")?,
            hour: field(fields[2], 0, 23, "hours")?,
            dom: field(fields[3], 1, 31, "day of month")?,
            month: field(fields[4], 1, 12, "month")?,
            dow: field(fields[5], 0, 6, "day of week")?,
        })
    }

    /// The descriptor string this spec was parsed from
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Classic cron day rule: when both day fields are restricted, either
    /// matching day fires
    fn day_matches(&self, t: &NaiveDateTime) -> bool {
        let dom_hit = self.dom.matches(t.day());
        let dow_hit = self.dow.matches(t.weekday().num_days_from_sunday());
        match (self.dom.is_all(), self.dow.is_all()) {
            (true, true) => true,
            (true, false) => dow_hit,
            (false, true) => dom_hit,
            (false, false) => dom_hit || dow_hit,
        }
    }

    fn minute_matches(&self, t: &NaiveDateTime) -> bool {
        self.month.matches(t.month())
            && self.day_matches(t)
            && self.hour.matches(t.hour())
            && self.minute.matches(t.minute())
    }

    /// Next matching instant strictly after `after`, if any exists inside
    /// the search horizon
    pub fn next_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let horizon = after + Duration::days(MAX_SEARCH_DAYS);
        let mut cursor = (after + Duration::seconds(1)).with_nanosecond(0)?;

        while cursor <= horizon {
            if self.minute_matches(&cursor) {
                let from_sec = cursor.second();
                if let Some(sec) = (from_sec..60).find(|s| self.sec.matches(*s)) {
                    return cursor.with_second(sec);
                }
            }
            cursor = (cursor + Duration::minutes(1)).with_second(0)?;
        }
        None
    }

    /// Best-effort expansion of the next `n` fire times from `from`
    pub fn upcoming(&self, n: usize, from: NaiveDateTime) -> Vec<NaiveDateTime> {
        let mut fires = Vec::with_capacity(n);
        let mut cursor = from;
        while fires.len() < n {
            match self.next_after(cursor) {
                Some(next) => {
                    cursor = next;
                    fires.push(next);
                }
                None => break,
            }
        }
        fires
    }
}

/// A fixed "HH:MM" time of day for per-account daily slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTime {
    raw: String,
    time: NaiveTime,
}

impl DailyTime {
    pub fn parse(raw: &str) -> SchedulerResult<Self> {
        let trimmed = raw.trim();
        let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
            .map_err(|e| SchedulerError::invalid_time_of_day(raw, e.to_string()))?;
        Ok(Self {
            raw: trimmed.to_string(),
            time,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// Next occurrence of this slot: later today if still ahead, otherwise
    /// the same time tomorrow
    pub fn next_occurrence(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today_target = now.date().and_time(self.time);
        if now < today_target {
            today_target
        } else {
            (now.date() + Duration::days(1)).and_time(self.time)
        }
    }

    /// Wall-clock wait from `now` until the next occurrence
    pub fn duration_until(&self, now: NaiveDateTime) -> Duration {
        self.next_occurrence(now) - now
    }
}

impl std::fmt::Display for DailyTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}
