//! Medication course timing.
//!
//! Turns the free-form duration a prescriber typed ("7 days", "2 weeks",
//! "1 month", "as needed") plus a start date into an inclusive end date and
//! a remaining-days count. Display only: nothing here authorises or blocks
//! a lifecycle action, and the course status is never derived from dates.
//!
//! Every function is pure and total. Unparseable input yields `None`,
//! which callers render as "—".

use std::sync::LazyLock;

use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, TimeZone};
use regex::Regex;
use serde::Serialize;

pub const DAYS_PER_WEEK: u32 = 7;
/// Fixed approximation, not calendar-accurate.
pub const DAYS_PER_MONTH: u32 = 30;

/// Entries that describe an open-ended course. These never expire.
const INDEFINITE_MARKERS: &[&str] = &["until further notice", "indefinite", "as needed"];

static FIRST_INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

// Unit tokens may touch the number ("3m", "7d") but not other letters
// ("mg", "daily", "weekly").
static WEEK_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^a-z])(?:weeks?|w)(?:[^a-z]|$)").unwrap());
static MONTH_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^a-z])(?:months?|mo|m)(?:[^a-z]|$)").unwrap());

// ═══════════════════════════════════════════
// Duration parsing
// ═══════════════════════════════════════════

/// Parse a human-entered course length into whole days.
///
/// Takes the first integer in the text and scales it by the unit found,
/// checking week, then month, then day. A bare number counts as days.
/// Open-ended entries ("as needed", "prn", "until further notice") and
/// zero, negative or oversized values return `None`.
pub fn parse_duration_to_days(text: &str) -> Option<u32> {
    let duration = text.trim().to_lowercase();
    if duration.is_empty() {
        return None;
    }

    if duration == "prn" || INDEFINITE_MARKERS.iter().any(|m| duration.contains(m)) {
        return None;
    }

    let number = FIRST_INTEGER.find(&duration)?;
    if duration[..number.start()].ends_with('-') {
        return None;
    }
    let n: u32 = number.as_str().parse().ok()?;
    if n == 0 {
        return None;
    }

    let multiplier = if WEEK_UNIT.is_match(&duration) {
        DAYS_PER_WEEK
    } else if MONTH_UNIT.is_match(&duration) {
        DAYS_PER_MONTH
    } else {
        1
    };

    n.checked_mul(multiplier)
}

/// Parse a start date given as `YYYY-MM-DD` or a full timestamp.
///
/// Date-only strings are calendar dates. Timestamps with an offset are
/// converted to the local calendar day; timestamps without one are read as
/// local time.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Local).date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.date())
}

// ═══════════════════════════════════════════
// End date + remaining days
// ═══════════════════════════════════════════

/// Inclusive end date: the start day counts as day one.
pub fn compute_end_date(start_date: &str, duration: &str) -> Option<NaiveDate> {
    let total_days = parse_duration_to_days(duration)?;
    let start = parse_calendar_date(start_date)?;
    start.checked_add_days(Days::new(u64::from(total_days) - 1))
}

/// Derived, read-only timing fields for one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationTiming {
    /// Parsed course length; `None` when the duration can't be parsed.
    pub total_days: Option<u32>,
    /// Inclusive last day of the course.
    pub end_date: Option<NaiveDate>,
    /// Whole days left including today, floored at zero.
    pub days_remaining: Option<u32>,
    /// True once the end date is before today.
    pub is_expired: Option<bool>,
}

impl MedicationTiming {
    const UNKNOWN: &'static str = "—";

    /// Short label for cards: "—", "Expired", "Last day", "5 days left".
    pub fn remaining_label(&self) -> String {
        match (self.is_expired, self.days_remaining) {
            (Some(true), _) => "Expired".to_string(),
            (Some(false), Some(1)) => "Last day".to_string(),
            (Some(false), Some(days)) => format!("{days} days left"),
            _ => Self::UNKNOWN.to_string(),
        }
    }

    pub fn end_date_label(&self) -> String {
        self.end_date
            .map(|d| d.format("%b %-d, %Y").to_string())
            .unwrap_or_else(|| Self::UNKNOWN.to_string())
    }
}

/// Timing relative to the local calendar day of `now`.
pub fn get_timing<Tz: TimeZone>(start_date: &str, duration: &str, now: DateTime<Tz>) -> MedicationTiming {
    get_timing_on(start_date, duration, now.with_timezone(&Local).date_naive())
}

/// Timing relative to an explicit calendar day.
pub fn get_timing_on(start_date: &str, duration: &str, today: NaiveDate) -> MedicationTiming {
    let total_days = parse_duration_to_days(duration);
    let end_date = compute_end_date(start_date, duration);

    let Some(end) = end_date else {
        return MedicationTiming {
            total_days,
            end_date,
            days_remaining: None,
            is_expired: None,
        };
    };

    let remaining = (end - today).num_days() + 1;
    MedicationTiming {
        total_days,
        end_date,
        days_remaining: Some(u32::try_from(remaining.max(0)).unwrap_or(u32::MAX)),
        is_expired: Some(remaining <= 0),
    }
}

/// Timing as of right now.
pub fn timing_today(start_date: &str, duration: &str) -> MedicationTiming {
    get_timing(start_date, duration, Local::now())
}

// ═══════════════════════════════════════════
// Expiry buckets (doctor dashboard)
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryBucket {
    Expired,
    Today,
    Within3Days,
    Within7Days,
    Later,
    NoExpiry,
}

impl ExpiryBucket {
    pub fn for_end_date(end_date: Option<NaiveDate>, today: NaiveDate) -> Self {
        let Some(end) = end_date else {
            return Self::NoExpiry;
        };
        match (end - today).num_days() {
            d if d < 0 => Self::Expired,
            0 => Self::Today,
            1..=3 => Self::Within3Days,
            4..=7 => Self::Within7Days,
            _ => Self::Later,
        }
    }
}

/// Counts per urgent bucket, as shown in the expiring-medications banner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirySummary {
    pub expired: u32,
    pub expiring_today: u32,
    pub expiring_in_3_days: u32,
    pub expiring_in_7_days: u32,
}

impl ExpirySummary {
    pub fn from_end_dates<I>(end_dates: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = Option<NaiveDate>>,
    {
        let mut summary = Self::default();
        for end in end_dates {
            match ExpiryBucket::for_end_date(end, today) {
                ExpiryBucket::Expired => summary.expired += 1,
                ExpiryBucket::Today => summary.expiring_today += 1,
                ExpiryBucket::Within3Days => summary.expiring_in_3_days += 1,
                ExpiryBucket::Within7Days => summary.expiring_in_7_days += 1,
                ExpiryBucket::Later | ExpiryBucket::NoExpiry => {}
            }
        }
        summary
    }

    /// Expired, today and three-day buckets need attention now.
    pub fn urgent(&self) -> u32 {
        self.expired + self.expiring_today + self.expiring_in_3_days
    }
}
