// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Calendar date for listings, e.g. "2024-01-15".
pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Timestamped file name for downloads, e.g. "scans-20240115T103000Z.json".
pub fn export_file_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}.json", prefix, now.format("%Y%m%dT%H%M%SZ"))
}
