//! Retention specification parsing.
//!
//! A specification is written as comma-separated `interval:count` entries,
//! e.g. `hour:24,day:7,week:4,4week:13`. Rules keep the order they were
//! written in; duplicates are kept as separate rules.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::SpecError;
use crate::interval::Interval;

/// Keep at most one snapshot from each of the `count` most recent buckets
/// of `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetentionRule {
    pub interval: Interval,
    pub count: u32,
}

impl RetentionRule {
    #[must_use]
    pub const fn new(interval: Interval, count: u32) -> Self {
        Self { interval, count }
    }
}

impl fmt::Display for RetentionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.interval, self.count)
    }
}

/// Parsed retention specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RetentionSpec {
    pub rules: Vec<RetentionRule>,
}

impl RetentionSpec {
    #[must_use]
    pub fn new(rules: Vec<RetentionRule>) -> Self {
        Self { rules }
    }

    /// Parse the textual `interval:count,...` form.
    ///
    /// Blank entries are ignored, so an empty string yields an empty spec.
    pub fn parse(text: &str) -> Result<Self, SpecError> {
        let mut rules = Vec::new();
        for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, count) =
                entry
                    .split_once(':')
                    .ok_or_else(|| SpecError::MissingSeparator {
                        entry: entry.to_string(),
                    })?;
            let interval: Interval = name.parse().map_err(|_| SpecError::UnknownInterval {
                name: name.trim().to_string(),
            })?;
            let count = count
                .trim()
                .parse::<u32>()
                .map_err(|_| SpecError::InvalidCount {
                    entry: entry.to_string(),
                    value: count.trim().to_string(),
                })?;
            rules.push(RetentionRule { interval, count });
        }
        Ok(Self { rules })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Shortest configured bucket duration, zero-count rules included.
    #[must_use]
    pub fn min_duration(&self) -> Option<Duration> {
        self.rules
            .iter()
            .map(|rule| rule.interval.seconds())
            .min()
            .map(Duration::seconds)
    }
}

impl fmt::Display for RetentionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{rule}")?;
        }
        Ok(())
    }
}

impl FromStr for RetentionSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RetentionSpec {
    type Error = SpecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RetentionSpec> for String {
    fn from(spec: RetentionSpec) -> Self {
        spec.to_string()
    }
}
