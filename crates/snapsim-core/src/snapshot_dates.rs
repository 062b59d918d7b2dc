//! Snapshot name <-> timestamp conversion.
//!
//! Snapshot names are parsed with a strftime-style pattern. Ingestion is
//! best effort: lines that do not match the pattern are skipped, so a raw
//! listing with headers or unrelated entries can be piped in unchanged.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::error::ConfigError;

/// Default snapshot name pattern, also used for the `NOW` banner.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d_%H.%M.%S";

/// Check that `fmt` is a pattern chrono can both parse and render.
///
/// Offset items (`%z`, `%Z`) parse but cannot be rendered for a naive
/// timestamp, so a sample instant is formatted as well.
pub fn validate_format(fmt: &str) -> Result<(), ConfigError> {
    if fmt.is_empty() || StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::InvalidDateFormat(fmt.to_string()));
    }
    format_snapshot_date(&NaiveDateTime::default(), fmt)?;
    Ok(())
}

/// Parse one snapshot name. The whole (trimmed) name must match `fmt`.
///
/// Patterns without a time component resolve to midnight.
#[must_use]
pub fn parse_snapshot_date(name: &str, fmt: &str) -> Option<NaiveDateTime> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(name, fmt)
        .or_else(|_| NaiveDate::parse_from_str(name, fmt).map(|d| d.and_time(NaiveTime::MIN)))
        .ok()
}

/// Parse every name that matches `fmt`, preserving input order.
pub fn parse_snapshot_dates<I, S>(names: I, fmt: &str) -> Vec<NaiveDateTime>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut skipped = 0_usize;
    let dates: Vec<_> = names
        .into_iter()
        .filter_map(|name| {
            let name = name.as_ref();
            let parsed = parse_snapshot_date(name, fmt);
            if parsed.is_none() && !name.trim().is_empty() {
                skipped += 1;
                debug!(name = name.trim(), format = fmt, "Skipping non-matching snapshot name");
            }
            parsed
        })
        .collect();
    debug!(parsed = dates.len(), skipped, "Parsed snapshot names");
    dates
}

/// Render a timestamp with `fmt`.
pub fn format_snapshot_date(ts: &NaiveDateTime, fmt: &str) -> Result<String, ConfigError> {
    let mut out = String::new();
    write!(out, "{}", ts.format(fmt))
        .map_err(|_| ConfigError::InvalidDateFormat(fmt.to_string()))?;
    Ok(out)
}
