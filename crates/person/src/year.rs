// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! `year_joined` normalization
//!
//! Callers submit the year a person joined the band as a bare year, either as a
//! string (`"1969"`) or a number (`1969`). Internally it is stored as a full UTC
//! instant at January 1st of that year.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use regex::Regex;
use serde_json::{Number, Value};

static FOUR_DIGIT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}$").expect("year regex is valid"));

/// Result of normalizing a raw `year_joined` input
#[derive(Debug, Clone, PartialEq)]
pub enum YearJoined {
    /// No value was submitted (missing or `null`)
    Absent,
    /// The value was cast to an instant
    Date(DateTime<Utc>),
    /// The value could not be cast and is kept as submitted
    Uncastable(Value),
}

impl YearJoined {
    /// Returns the instant if the value was castable
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(date) => Some(*date),
            Self::Absent | Self::Uncastable(_) => None,
        }
    }

    /// Whether any value, castable or not, was submitted
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// Normalize a raw `year_joined` input
///
/// A four digit year, given as a string (surrounding whitespace ignored) or as a
/// number, becomes January 1st of that year at midnight UTC. RFC 3339 timestamps
/// are accepted as-is. Every other input is passed through untouched so that
/// validation can reject it.
pub fn normalize_year_joined(value: Option<&Value>) -> YearJoined {
    match value {
        None | Some(Value::Null) => YearJoined::Absent,
        Some(Value::String(raw)) => {
            let trimmed = raw.trim();
            if let Some(date) = start_of_year(trimmed) {
                return YearJoined::Date(date);
            }
            DateTime::parse_from_rfc3339(trimmed).map_or_else(
                |_| YearJoined::Uncastable(Value::String(raw.clone())),
                |date| YearJoined::Date(date.with_timezone(&Utc)),
            )
        }
        Some(Value::Number(number)) => whole_number(number)
            .and_then(|whole| start_of_year(&whole.to_string()))
            .map_or_else(
                || YearJoined::Uncastable(Value::Number(number.clone())),
                YearJoined::Date,
            ),
        Some(other) => YearJoined::Uncastable(other.clone()),
    }
}

/// Render a stored instant back to the bare year exposed to callers
pub fn year_of(date: DateTime<Utc>) -> i32 {
    date.year()
}

/// Integer value of a number without a fractional part (`1969.0` is `1969`)
#[allow(clippy::cast_possible_truncation)]
fn whole_number(number: &Number) -> Option<i64> {
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|value| value.fract() == 0.0 && value.abs() < 1e15)
            .map(|value| value as i64)
    })
}

fn start_of_year(candidate: &str) -> Option<DateTime<Utc>> {
    if !FOUR_DIGIT_YEAR.is_match(candidate) {
        return None;
    }
    let year: i32 = candidate.parse().ok()?;
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()
}
