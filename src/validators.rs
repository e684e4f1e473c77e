//! Field Validators
//!
//! Stateless predicates for the format checks shared by every intake step.
//! None of these touch configuration or storage; callers pass the date format
//! and reference date explicitly.

use chrono::format::{Fixed, Item, Numeric, StrftimeItems};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

// =============================================================================
// PATTERNS
// =============================================================================

/// `local@domain.tld` with no `@` in any of the three parts
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").unwrap());

/// Optional leading `+`, then 7-15 digits, spaces or hyphens
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[0-9 \-]{7,15}$").unwrap());

/// Default calendar format for dates entered on intake forms
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Raised when a date string does not parse under the expected format
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{input}' does not match date format {}", display_date_format(.format))]
pub struct DateFormatError {
    pub input: String,
    pub format: String,
}

// =============================================================================
// PREDICATES
// =============================================================================

/// Check for a basic `local@domain.tld` email shape
pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

/// Check for a permissive phone shape (digits, optional `+`, spaces, hyphens)
pub fn is_valid_phone(s: &str) -> bool {
    PHONE_RE.is_match(s)
}

/// Parse a calendar date under a chrono format string
pub fn parse_date(s: &str, format: &str) -> Result<NaiveDate, DateFormatError> {
    NaiveDate::parse_from_str(s, format).map_err(|_| DateFormatError {
        input: s.to_string(),
        format: format.to_string(),
    })
}

/// True if `s` is a date strictly after `today`.
///
/// Unparseable input also yields `true`: a value that cannot be read as a
/// date is treated as not acceptable as a past date.
pub fn is_future_date(s: &str, format: &str, today: NaiveDate) -> bool {
    match parse_date(s, format) {
        Ok(date) => date > today,
        Err(_) => true,
    }
}

/// Render a chrono format as the placeholder users see, e.g. `%Y-%m-%d` as `YYYY-MM-DD`.
///
/// Specifiers with no date meaning render as `?`; no `%` sequence survives.
pub fn display_date_format(format: &str) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    for item in StrftimeItems::new(format) {
        match item {
            Item::Literal(s) | Item::Space(s) => out.push_str(s),
            Item::Numeric(numeric, _) => out.push_str(numeric_placeholder(&numeric)),
            Item::Fixed(Fixed::ShortMonthName) => out.push_str("Mon"),
            Item::Fixed(Fixed::LongMonthName) => out.push_str("Month"),
            Item::Fixed(Fixed::ShortWeekdayName) => out.push_str("Ddd"),
            Item::Fixed(Fixed::LongWeekdayName) => out.push_str("Weekday"),
            _ => out.push('?'),
        }
    }
    out
}

fn numeric_placeholder(numeric: &Numeric) -> &'static str {
    match numeric {
        Numeric::Year | Numeric::IsoYear => "YYYY",
        Numeric::YearMod100 | Numeric::IsoYearMod100 => "YY",
        Numeric::YearDiv100 | Numeric::IsoYearDiv100 => "CC",
        Numeric::Month => "MM",
        Numeric::Day => "DD",
        Numeric::Ordinal => "DDD",
        Numeric::WeekFromSun | Numeric::WeekFromMon | Numeric::IsoWeek => "WW",
        Numeric::NumDaysFromSun | Numeric::WeekdayFromMon => "D",
        _ => "?",
    }
}
