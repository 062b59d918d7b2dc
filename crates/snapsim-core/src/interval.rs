//! Valid retention intervals (bucket granularities).
//!
//! Every rule in a retention specification names one of these intervals.
//! The set is fixed: parsing an unknown name is an error, so the filter only
//! ever sees durations from this table.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// A bucket granularity with a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    Minute,
    Hour,
    Day,
    Week,
    /// Four weeks (28 days), not a calendar month.
    FourWeek,
    /// Thirty days.
    Month,
    /// 365 days.
    Year,
}

impl Interval {
    /// All valid intervals, shortest first.
    pub const ALL: [Self; 7] = [
        Self::Minute,
        Self::Hour,
        Self::Day,
        Self::Week,
        Self::FourWeek,
        Self::Month,
        Self::Year,
    ];

    /// Canonical name as written in a retention specification.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::FourWeek => "4week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Bucket length in seconds.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Minute => MINUTE,
            Self::Hour => HOUR,
            Self::Day => DAY,
            Self::Week => WEEK,
            Self::FourWeek => 4 * WEEK,
            Self::Month => 30 * DAY,
            Self::Year => 365 * DAY,
        }
    }

    #[must_use]
    pub fn duration(self) -> Duration {
        Duration::seconds(self.seconds())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a name is not in the interval table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown interval '{0}'")]
pub struct UnknownInterval(pub String);

impl FromStr for Interval {
    type Err = UnknownInterval;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|interval| interval.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownInterval(wanted.to_string()))
    }
}

impl TryFrom<String> for Interval {
    type Error = UnknownInterval;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> Self {
        interval.name().to_string()
    }
}

/// Render the interval table, one `name<TAB>seconds` line per interval.
#[must_use]
pub fn list_valid_intervals() -> String {
    Interval::ALL
        .iter()
        .map(|interval| format!("{}\t{}", interval.name(), interval.seconds()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_match_table() {
        assert_eq!(Interval::Hour.seconds(), 3_600);
        assert_eq!(Interval::Day.seconds(), 86_400);
        assert_eq!(Interval::Week.seconds(), 604_800);
        assert_eq!(Interval::FourWeek.seconds(), 4 * 604_800);
        assert_eq!(Interval::Month.seconds(), 2_592_000);
        assert_eq!(Interval::Year.seconds(), 31_536_000);
        assert_eq!(Interval::Minute.duration(), Duration::minutes(1));
    }

    #[test]
    fn all_is_sorted_by_duration() {
        for pair in Interval::ALL.windows(2) {
            assert!(pair[0].seconds() < pair[1].seconds(), "{pair:?}");
        }
    }

    #[test]
    fn parse_canonical_names() {
        for interval in Interval::ALL {
            assert_eq!(interval.name().parse::<Interval>().unwrap(), interval);
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(" Hour ".parse::<Interval>().unwrap(), Interval::Hour);
        assert_eq!("4WEEK".parse::<Interval>().unwrap(), Interval::FourWeek);
    }

    #[test]
    fn parse_unknown_name_fails() {
        let err = "fortnight".parse::<Interval>().unwrap_err();
        assert_eq!(err, UnknownInterval("fortnight".to_string()));
        assert_eq!(err.to_string(), "unknown interval 'fortnight'");
        assert!("hours".parse::<Interval>().is_err());
        assert!("".parse::<Interval>().is_err());
    }

    #[test]
    fn listing_has_one_line_per_interval() {
        let listing = list_valid_intervals();
        let lines: Vec<_> = listing.lines().collect();
        assert_eq!(lines.len(), Interval::ALL.len());
        assert_eq!(lines[1], "hour\t3600");
        assert!(lines.contains(&"4week\t2419200"));
    }

    #[test]
    fn serde_uses_canonical_name() {
        let json = serde_json::to_string(&Interval::FourWeek).unwrap();
        assert_eq!(json, "\"4week\"");
        let back: Interval = serde_json::from_str("\"day\"").unwrap();
        assert_eq!(back, Interval::Day);
        assert!(serde_json::from_str::<Interval>("\"decade\"").is_err());
    }
}
