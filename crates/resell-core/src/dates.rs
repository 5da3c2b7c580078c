//! # Dates
//!
//! Business dates are stored as text. Records written by this crate use
//! ISO `YYYY-MM-DD`; data carried over from the embedded client store uses
//! `DD/MM/YYYY`; some rows hold full RFC 3339 timestamps or `"N/A"`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "15/03/2026"            ──┐                                            │
//! │  "2026-03-15"            ──┼──► parse_date ──► Some(2026-03-15)        │
//! │  "2026-03-15T10:00:00Z"  ──┘                                            │
//! │  "N/A", "", "31/02/2026" ─────► parse_date ──► None (row is skipped)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here reads the clock. Callers pass `today`.

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

const ISO_FORMAT: &str = "%Y-%m-%d";
const DMY_FORMAT: &str = "%d/%m/%Y";

// =============================================================================
// Parsing
// =============================================================================

/// Parses a stored business date in any of the accepted layouts.
///
/// Returns `None` for blank, `"N/A"` or malformed input instead of failing,
/// so one bad row never breaks a report.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use resell_core::dates::parse_date;
///
/// let expected = NaiveDate::from_ymd_opt(2026, 3, 15);
/// assert_eq!(parse_date("15/03/2026"), expected);
/// assert_eq!(parse_date("2026-03-15"), expected);
/// assert_eq!(parse_date("N/A"), None);
/// ```
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("n/a") {
        return None;
    }

    NaiveDate::parse_from_str(text, ISO_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(text, DMY_FORMAT))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Formats a date the way new records store it (`YYYY-MM-DD`).
pub fn format_iso(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

/// Whole days from `from` to `to`; negative if `to` is earlier.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

// =============================================================================
// Date Range
// =============================================================================

/// Report window selector.
///
/// Relative windows are anchored at `today` and include both ends:
/// `week` is the last seven days plus today, `month` and `year` reach back
/// one and twelve calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum DateRange {
    Today,
    Week,
    Month,
    Year,
    Custom {
        #[ts(as = "String")]
        start: NaiveDate,
        #[ts(as = "String")]
        end: NaiveDate,
    },
}

impl DateRange {
    /// Inclusive `(start, end)` bounds of the window.
    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match *self {
            DateRange::Today => (today, today),
            DateRange::Week => (today - chrono::Duration::days(7), today),
            DateRange::Month => (months_back(today, 1), today),
            DateRange::Year => (months_back(today, 12), today),
            DateRange::Custom { start, end } => (start, end),
        }
    }

    /// True if `date` falls inside the window.
    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        let (start, end) = self.bounds(today);
        start <= date && date <= end
    }

    /// Parses `text` and tests it; unparsable dates are outside every window.
    pub fn contains_text(&self, text: &str, today: NaiveDate) -> bool {
        parse_date(text).is_some_and(|date| self.contains(date, today))
    }
}

// Month arithmetic clamps to the last valid day (31 Mar - 1 month = 28/29 Feb).
fn months_back(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

// =============================================================================
// Unit Tests
// =============================================================================
