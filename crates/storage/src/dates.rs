// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule date normalization.

use chrono::NaiveDate;

/// Normalize a schedule date to ISO `YYYY-MM-DD`.
///
/// Accepts ISO dates, RFC 3339 timestamps (date part kept), and the
/// `M/D/YYYY` form seen in spreadsheet-era data. Unrecognized but
/// non-empty input is kept as-is after trimming; empty input is `None`.
pub fn normalize_date(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    if let Ok(stamp) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(stamp.date_naive().format("%Y-%m-%d").to_string());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%m/%d/%Y") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
#[path = "dates_tests.rs"]
mod tests;
