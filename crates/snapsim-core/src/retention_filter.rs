//! Bucketed snapshot retention.
//!
//! Given a set of snapshot timestamps, a [`RetentionSpec`] and a reference
//! `now`, decide which snapshots survive.
//!
//! # Pipeline
//!
//! ```text
//! snapshots ──► sort newest first ──┬─► classify(rule 0) ──► select(rule 0) ──┐
//!                                   ├─► classify(rule 1) ──► select(rule 1) ──┼─► union ──► verdicts
//!                                   └─► keep_latest / keep_younger ───────────┘
//! ```
//!
//! For each rule, every snapshot falls into bucket `floor(age / duration)`.
//! The newest snapshot in a bucket represents it, and the representatives of
//! the `count` most recent buckets are kept. A snapshot survives if any rule
//! or override keeps it.
//!
//! The filter is pure: identical inputs always give identical output.

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::interval::Interval;
use crate::retention_spec::{RetentionRule, RetentionSpec};

// =============================================================================
// Options and results
// =============================================================================

/// Which side of the partition [`filter`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Snapshots the policy retains.
    #[default]
    Keep,
    /// Snapshots the policy would delete.
    Discard,
}

/// Overrides applied on top of the bucket rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterOptions {
    /// Always keep the single most recent snapshot.
    pub keep_latest: bool,
    /// Always keep snapshots younger than the shortest configured interval.
    pub keep_younger: bool,
}

/// Why a snapshot was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepReason {
    /// Representative of a selected bucket. `rule` is the rule's position in
    /// the spec, which tells duplicate intervals apart.
    Bucket {
        rule: usize,
        interval: Interval,
        bucket: i64,
    },
    Latest,
    Younger,
}

/// Outcome for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub timestamp: NaiveDateTime,
    pub reasons: Vec<KeepReason>,
}

impl Verdict {
    fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            reasons: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_kept(&self) -> bool {
        !self.reasons.is_empty()
    }
}

/// One occupied bucket of a rule and the snapshot representing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub index: i64,
    pub representative: NaiveDateTime,
}

// =============================================================================
// Classify / select
// =============================================================================

/// Bucket index of `ts` for `interval`, counted back from `now`.
///
/// Snapshots newer than `now` get negative indices and rank ahead of bucket 0.
/// Sub-second ages are floored, so a snapshot 0.5s in the future is in -1.
#[must_use]
pub fn bucket_index(ts: NaiveDateTime, now: NaiveDateTime, interval: Interval) -> i64 {
    let age = now.signed_duration_since(ts);
    // num_seconds() truncates toward zero.
    let mut secs = age.num_seconds();
    if Duration::try_seconds(secs).is_some_and(|whole| age < whole) {
        secs -= 1;
    }
    secs.div_euclid(interval.seconds())
}

/// Group snapshots into buckets of `interval`, most recent bucket first.
///
/// `newest_first` must be sorted newest first; the first snapshot seen for a
/// bucket becomes its representative.
#[must_use]
pub fn classify(interval: Interval, newest_first: &[NaiveDateTime], now: NaiveDateTime) -> Vec<Bucket> {
    debug_assert!(newest_first.windows(2).all(|w| w[0] >= w[1]));

    let mut buckets: Vec<Bucket> = Vec::new();
    for &ts in newest_first {
        let index = bucket_index(ts, now, interval);
        // Ages only grow along the slice, so a repeat bucket is always the last one.
        if buckets.last().is_some_and(|b| b.index == index) {
            continue;
        }
        buckets.push(Bucket {
            index,
            representative: ts,
        });
    }
    buckets
}

/// The buckets `rule` keeps: the first `count` of them.
#[must_use]
pub fn select<'a>(rule: &RetentionRule, buckets: &'a [Bucket]) -> &'a [Bucket] {
    let count = usize::try_from(rule.count).unwrap_or(usize::MAX);
    &buckets[..buckets.len().min(count)]
}

// =============================================================================
// Evaluation
// =============================================================================

/// Explain the policy for every distinct snapshot, newest first.
#[must_use]
pub fn evaluate(
    snapshots: &[NaiveDateTime],
    spec: &RetentionSpec,
    now: NaiveDateTime,
    options: FilterOptions,
) -> Vec<Verdict> {
    let mut newest_first = snapshots.to_vec();
    newest_first.sort_by(|a, b| b.cmp(a));
    newest_first.dedup();

    let mut verdicts: Vec<Verdict> = newest_first.iter().copied().map(Verdict::new).collect();
    let position = |ts: &NaiveDateTime| newest_first.binary_search_by(|other| ts.cmp(other));

    for (rule_idx, rule) in spec.rules.iter().enumerate() {
        if rule.count == 0 {
            continue;
        }
        let buckets = classify(rule.interval, &newest_first, now);
        for bucket in select(rule, &buckets) {
            if let Ok(pos) = position(&bucket.representative) {
                verdicts[pos].reasons.push(KeepReason::Bucket {
                    rule: rule_idx,
                    interval: rule.interval,
                    bucket: bucket.index,
                });
            }
        }
    }

    if options.keep_latest {
        if let Some(latest) = verdicts.first_mut() {
            latest.reasons.push(KeepReason::Latest);
        }
    }

    if options.keep_younger {
        if let Some(min) = spec.min_duration() {
            for verdict in &mut verdicts {
                if now.signed_duration_since(verdict.timestamp) < min {
                    verdict.reasons.push(KeepReason::Younger);
                }
            }
        }
    }

    let kept = verdicts.iter().filter(|v| v.is_kept()).count();
    debug!(
        snapshots = verdicts.len(),
        kept,
        discarded = verdicts.len() - kept,
        spec = %spec,
        now = %now,
        "Evaluated retention policy"
    );

    verdicts
}

/// Return the kept (or, with [`FilterMode::Discard`], the dropped)
/// snapshots in ascending chronological order.
#[must_use]
pub fn filter(
    mode: FilterMode,
    snapshots: &[NaiveDateTime],
    spec: &RetentionSpec,
    now: NaiveDateTime,
    options: FilterOptions,
) -> Vec<NaiveDateTime> {
    let want_kept = mode == FilterMode::Keep;
    let mut selected: Vec<_> = evaluate(snapshots, spec, now, options)
        .into_iter()
        .filter(|verdict| verdict.is_kept() == want_kept)
        .map(|verdict| verdict.timestamp)
        .collect();
    selected.reverse();
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn ago(secs: i64) -> NaiveDateTime {
        now() - Duration::seconds(secs)
    }

    fn spec(text: &str) -> RetentionSpec {
        RetentionSpec::parse(text).unwrap()
    }

    fn sample() -> Vec<NaiveDateTime> {
        vec![ago(10), ago(3_600), ago(7_200), ago(90_000)]
    }

    const NO_FLAGS: FilterOptions = FilterOptions {
        keep_latest: false,
        keep_younger: false,
    };

    #[test]
    fn hourly_quota_keeps_two_most_recent_buckets() {
        let kept = filter(FilterMode::Keep, &sample(), &spec("hour:2"), now(), NO_FLAGS);
        assert_eq!(kept, vec![ago(3_600), ago(10)]);
    }

    #[test]
    fn discard_mode_returns_complement() {
        let dropped = filter(FilterMode::Discard, &sample(), &spec("hour:2"), now(), NO_FLAGS);
        assert_eq!(dropped, vec![ago(90_000), ago(7_200)]);
    }

    #[test]
    fn empty_spec_with_keep_latest_keeps_only_latest() {
        let options = FilterOptions {
            keep_latest: true,
            ..NO_FLAGS
        };
        let kept = filter(FilterMode::Keep, &sample(), &spec(""), now(), options);
        assert_eq!(kept, vec![ago(10)]);
    }

    #[test]
    fn empty_spec_without_flags_keeps_nothing() {
        assert!(filter(FilterMode::Keep, &sample(), &spec(""), now(), NO_FLAGS).is_empty());
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let options = FilterOptions {
            keep_latest: true,
            keep_younger: true,
        };
        assert!(filter(FilterMode::Keep, &[], &spec("hour:24,day:7"), now(), options).is_empty());
        assert!(evaluate(&[], &spec(""), now(), options).is_empty());
    }

    #[test]
    fn zero_count_rule_keeps_nothing() {
        let kept = filter(FilterMode::Keep, &sample(), &spec("hour:0"), now(), NO_FLAGS);
        assert!(kept.is_empty());
    }

    #[test]
    fn newest_snapshot_in_bucket_is_representative() {
        // Both fall in hour bucket 1; the 1h-old one is newer.
        let snaps = vec![ago(5_000), ago(3_600)];
        let kept = filter(FilterMode::Keep, &snaps, &spec("hour:1"), now(), NO_FLAGS);
        assert_eq!(kept, vec![ago(3_600)]);
    }

    #[test]
    fn empty_buckets_are_not_counted() {
        // Buckets 0 and 5 are occupied; a quota of 2 reaches back past the gap.
        let snaps = vec![ago(10), ago(5 * 3_600 + 1)];
        let kept = filter(FilterMode::Keep, &snaps, &spec("hour:2"), now(), NO_FLAGS);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn granularities_are_unioned() {
        let kept = filter(FilterMode::Keep, &sample(), &spec("hour:1,day:2"), now(), NO_FLAGS);
        // hour bucket 0 -> ago(10); day buckets 0 and 1 -> ago(10), ago(90_000)
        assert_eq!(kept, vec![ago(90_000), ago(10)]);
    }

    #[test]
    fn snapshot_at_now_is_bucket_zero_for_every_interval() {
        for interval in Interval::ALL {
            assert_eq!(bucket_index(now(), now(), interval), 0);
        }
        let verdicts = evaluate(&[now()], &spec("minute:1,year:1"), now(), NO_FLAGS);
        assert_eq!(verdicts[0].reasons.len(), 2);
    }

    #[test]
    fn future_snapshots_get_negative_buckets() {
        assert_eq!(bucket_index(now() + Duration::seconds(1), now(), Interval::Hour), -1);
        let snaps = vec![now() + Duration::seconds(30), ago(10)];
        let kept = filter(FilterMode::Keep, &snaps, &spec("hour:1"), now(), NO_FLAGS);
        assert_eq!(kept, vec![now() + Duration::seconds(30)]);
    }

    #[test]
    fn keep_younger_uses_shortest_interval() {
        let options = FilterOptions {
            keep_younger: true,
            ..NO_FLAGS
        };
        // Shortest interval is an hour, even though its count is zero.
        let kept = filter(FilterMode::Keep, &sample(), &spec("day:0,hour:0"), now(), options);
        assert_eq!(kept, vec![ago(10)]);
    }

    #[test]
    fn keep_younger_without_rules_is_inert() {
        let options = FilterOptions {
            keep_younger: true,
            ..NO_FLAGS
        };
        assert!(filter(FilterMode::Keep, &sample(), &spec(""), now(), options).is_empty());
    }

    #[test]
    fn duplicate_rules_select_independently() {
        let verdicts = evaluate(&sample(), &spec("hour:1,hour:1"), now(), NO_FLAGS);
        assert_eq!(
            verdicts[0].reasons,
            vec![
                KeepReason::Bucket {
                    rule: 0,
                    interval: Interval::Hour,
                    bucket: 0
                },
                KeepReason::Bucket {
                    rule: 1,
                    interval: Interval::Hour,
                    bucket: 0
                },
            ]
        );
        assert!(verdicts[1..].iter().all(|v| !v.is_kept()));
    }

    #[test]
    fn duplicate_inputs_collapse() {
        let snaps = vec![ago(10), ago(10), ago(3_600)];
        let verdicts = evaluate(&snaps, &spec("hour:5"), now(), NO_FLAGS);
        assert_eq!(verdicts.len(), 2);
        let kept = filter(FilterMode::Keep, &snaps, &spec("hour:5"), now(), NO_FLAGS);
        assert_eq!(kept, vec![ago(3_600), ago(10)]);
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut shuffled = sample();
        shuffled.reverse();
        shuffled.swap(0, 2);
        let spec = spec("hour:2,day:1");
        assert_eq!(
            filter(FilterMode::Keep, &shuffled, &spec, now(), NO_FLAGS),
            filter(FilterMode::Keep, &sample(), &spec, now(), NO_FLAGS)
        );
    }

    #[test]
    fn classify_groups_and_orders_buckets() {
        let newest_first = vec![ago(10), ago(20), ago(3_700), ago(9_000)];
        let buckets = classify(Interval::Hour, &newest_first, now());
        let indices: Vec<_> = buckets.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(buckets[0].representative, ago(10));
    }

    #[test]
    fn select_caps_at_count() {
        let newest_first = vec![ago(10), ago(3_700), ago(9_000)];
        let buckets = classify(Interval::Hour, &newest_first, now());
        assert_eq!(select(&RetentionRule::new(Interval::Hour, 2), &buckets).len(), 2);
        assert_eq!(select(&RetentionRule::new(Interval::Hour, 9), &buckets).len(), 3);
        assert!(select(&RetentionRule::new(Interval::Hour, 0), &buckets).is_empty());
    }

    #[test]
    fn sub_second_ages_are_floored() {
        let half = Duration::milliseconds(500);
        assert_eq!(bucket_index(now() + half, now(), Interval::Hour), -1);
        assert_eq!(bucket_index(now() - half, now(), Interval::Hour), 0);
        assert_eq!(bucket_index(now() - Duration::milliseconds(3_600_500), now(), Interval::Hour), 1);
        assert_eq!(bucket_index(now() + Duration::milliseconds(3_600_500), now(), Interval::Hour), -2);
    }

    #[test]
    fn future_snapshot_under_a_second_ahead_has_its_own_bucket() {
        let snaps = vec![now() + Duration::milliseconds(500), now()];
        let kept = filter(FilterMode::Keep, &snaps, &spec("hour:2"), now(), NO_FLAGS);
        assert_eq!(kept, vec![now(), now() + Duration::milliseconds(500)]);
    }

    #[test]
    fn verdict_records_every_reason() {
        let options = FilterOptions {
            keep_latest: true,
            keep_younger: true,
        };
        let verdicts = evaluate(&[ago(10)], &spec("hour:1"), now(), options);
        assert_eq!(
            verdicts[0].reasons,
            vec![
                KeepReason::Bucket {
                    rule: 0,
                    interval: Interval::Hour,
                    bucket: 0
                },
                KeepReason::Latest,
                KeepReason::Younger,
            ]
        );
    }
}
