//! Calendar keys - compact year-month integers (`YYYYMM`)
//!
//! Global invariants enforced:
//! - A key always holds exactly 4 year digits and a month in 01..=12
//! - Integer order equals chronological order
//! - Ranges step by calendar month, never by integer increment

use crate::error::{LoadgridError, Result};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Months shown by default after the current month
pub const DEFAULT_HORIZON_MONTHS: u32 = 18;

const MIN_KEY: u32 = 100_000;
const MAX_KEY: u32 = 999_999;

fn display_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{4}) (\d{2})$").expect("static regex"))
}

/// A year and month encoded as `year * 100 + month`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarKey(u32);

impl CalendarKey {
    /// Validate a raw `YYYYMM` integer
    pub fn new(raw: u32) -> Result<Self> {
        if !(MIN_KEY..=MAX_KEY).contains(&raw) {
            return Err(LoadgridError::format(format!(
                "\"{}\" is not a YYYYMM key (expected 6 digits)",
                raw
            )));
        }
        let month = raw % 100;
        if !(1..=12).contains(&month) {
            return Err(LoadgridError::format(format!(
                "invalid month {:02} in key {}",
                month, raw
            )));
        }
        Ok(CalendarKey(raw))
    }

    /// Build a key from a 4-digit year and a 1-based month
    pub fn from_parts(year: i32, month: u32) -> Result<Self> {
        if !(1000..=9999).contains(&year) {
            return Err(LoadgridError::format(format!(
                "year {} does not have exactly 4 digits",
                year
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(LoadgridError::format(format!(
                "invalid month {} for year {}",
                month, year
            )));
        }
        Self::new(year as u32 * 100 + month)
    }

    /// Key of the month containing `date`
    pub fn from_date(date: NaiveDate) -> Result<Self> {
        Self::from_parts(date.year(), date.month())
    }

    /// First day of the month
    pub fn to_date(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year(), self.month(), 1)
            .expect("validated key always names a real month")
    }

    /// Parse a `"YYYY MM"` display string, trimming surrounding whitespace
    pub fn from_display_string(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let caps = display_pattern().captures(trimmed).ok_or_else(|| {
            LoadgridError::format(format!("\"{}\" is not in \"YYYY MM\" form", trimmed))
        })?;
        let year: u32 = caps[1]
            .parse()
            .map_err(|_| LoadgridError::format(format!("invalid year \"{}\"", &caps[1])))?;
        let month: u32 = caps[2]
            .parse()
            .map_err(|_| LoadgridError::format(format!("invalid month \"{}\"", &caps[2])))?;
        if !(1..=12).contains(&month) {
            return Err(LoadgridError::format(format!("invalid month \"{}\"", &caps[2])));
        }
        Self::new(year * 100 + month)
    }

    /// Render as `"YYYY MM"`
    pub fn to_display_string(self) -> String {
        format!("{:04} {:02}", self.year(), self.month())
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn year(self) -> i32 {
        (self.0 / 100) as i32
    }

    pub fn month(self) -> u32 {
        self.0 % 100
    }

    /// Shift by a signed number of calendar months
    ///
    /// Returns `None` when the result leaves the 4-digit year range.
    pub fn offset(self, months: i32) -> Option<Self> {
        let index = self.year() as i64 * 12 + (self.month() as i64 - 1) + months as i64;
        let year = index.div_euclid(12);
        let month = index.rem_euclid(12) + 1;
        if !(1000..=9999).contains(&year) {
            return None;
        }
        Some(CalendarKey(year as u32 * 100 + month as u32))
    }

    pub fn next(self) -> Option<Self> {
        self.offset(1)
    }

    pub fn previous(self) -> Option<Self> {
        self.offset(-1)
    }
}

/// Every month from `start` to `end` inclusive, in chronological order
///
/// An inverted range yields an empty list.
pub fn range(start: CalendarKey, end: CalendarKey) -> Vec<CalendarKey> {
    let mut months = Vec::new();
    if start > end {
        return months;
    }
    let mut current = start;
    loop {
        months.push(current);
        if current == end {
            break;
        }
        match current.next() {
            Some(next) => current = next,
            None => break,
        }
    }
    months
}

/// Months offered in range pickers: one year back to two years ahead of `today`
pub fn selectable_months(today: NaiveDate) -> Result<Vec<CalendarKey>> {
    let current = CalendarKey::from_date(today)?;
    let start = current.offset(-12).unwrap_or(current);
    let end = current.offset(24).unwrap_or(current);
    Ok(range(start, end))
}

/// Default display window: the current month through `horizon` months later
pub fn default_display_range(
    today: NaiveDate,
    horizon: u32,
) -> Result<(CalendarKey, CalendarKey)> {
    let start = CalendarKey::from_date(today)?;
    let end = start.offset(horizon as i32).ok_or_else(|| {
        LoadgridError::format(format!(
            "display horizon of {} months from {} leaves the supported years",
            horizon, start
        ))
    })?;
    Ok((start, end))
}

impl fmt::Display for CalendarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04} {:02}", self.year(), self.month())
    }
}

impl FromStr for CalendarKey {
    type Err = LoadgridError;

    /// Accepts both `YYYYMM` and `YYYY MM`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.contains(' ') {
            return Self::from_display_string(trimmed);
        }
        if trimmed.len() != 6 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LoadgridError::format(format!(
                "\"{}\" is not a YYYYMM key (expected 6 digits)",
                trimmed
            )));
        }
        let raw: u32 = trimmed
            .parse()
            .map_err(|_| LoadgridError::format(format!("\"{}\" is not a number", trimmed)))?;
        Self::new(raw)
    }
}

impl TryFrom<u32> for CalendarKey {
    type Error = LoadgridError;

    fn try_from(raw: u32) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<CalendarKey> for u32 {
    fn from(key: CalendarKey) -> u32 {
        key.0
    }
}

impl Serialize for CalendarKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for CalendarKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => CalendarKey::new(n).map_err(serde::de::Error::custom),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
