// crates/core/src/overlap.rs
//! Pairwise co-presence over closed session records.
//!
//! Two users were co-present whenever two of their sessions share a
//! channel and their time intervals intersect. The total of all such
//! intersections is the pair's "duo time".

use crate::types::{ChannelId, SessionRecord};
use std::collections::HashMap;

/// Overlap in seconds between two records; zero unless they share a
/// channel.
pub fn record_overlap(a: &SessionRecord, b: &SessionRecord) -> i64 {
    if a.channel_id != b.channel_id {
        return 0;
    }
    let start = a.started_at.max(b.started_at);
    let end = a.ended_at.min(b.ended_at);
    (end - start).max(0)
}

/// How duo time is computed from two users' session lists.
///
/// Implementations must return the same sum for the same input; they may
/// only differ in which provably-zero pairs they skip. `BruteForce` is the
/// executable definition, `ChannelIndexed` the default.
pub trait OverlapStrategy: Send + Sync {
    /// Total overlap in seconds across every channel-matched record pair.
    fn total_overlap(&self, a: &[SessionRecord], b: &[SessionRecord]) -> i64;

    /// Strategy name for logging.
    fn name(&self) -> &'static str;
}

/// Examines every record pair. Quadratic, but the unambiguous reference
/// the faster strategies are property-tested against.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForce;

impl OverlapStrategy for BruteForce {
    fn total_overlap(&self, a: &[SessionRecord], b: &[SessionRecord]) -> i64 {
        let mut total = 0i64;
        for ra in a {
            for rb in b {
                total += record_overlap(ra, rb);
            }
        }
        total
    }

    fn name(&self) -> &'static str {
        "brute-force"
    }
}

/// Buckets one side by channel and sorts each bucket by start time, so the
/// inner scan stops at the first record starting after the outer record
/// ends. Every skipped pair has zero overlap, so the sum is identical to
/// [`BruteForce`] on all inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelIndexed;

impl OverlapStrategy for ChannelIndexed {
    fn total_overlap(&self, a: &[SessionRecord], b: &[SessionRecord]) -> i64 {
        let mut by_channel: HashMap<ChannelId, Vec<&SessionRecord>> = HashMap::new();
        for rb in b {
            by_channel.entry(rb.channel_id).or_default().push(rb);
        }
        for bucket in by_channel.values_mut() {
            bucket.sort_by_key(|r| r.started_at);
        }

        let mut total = 0i64;
        for ra in a {
            let Some(bucket) = by_channel.get(&ra.channel_id) else {
                continue;
            };
            for rb in bucket {
                if rb.started_at >= ra.ended_at {
                    // Sorted by start: nothing later in the bucket can
                    // overlap `ra` either.
                    break;
                }
                total += record_overlap(ra, rb);
            }
        }
        total
    }

    fn name(&self) -> &'static str {
        "channel-indexed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use pretty_assertions::assert_eq;

    fn record(channel: u64, started_at: i64, ended_at: i64) -> SessionRecord {
        SessionRecord {
            user_id: UserId(1),
            username: "u".into(),
            channel_id: ChannelId(channel),
            channel_name: format!("ch-{channel}"),
            started_at,
            ended_at,
            duration_secs: ended_at - started_at,
        }
    }

    #[test]
    fn partial_overlap_in_shared_channel() {
        // 10:00-10:30 against 10:15-10:45 overlaps for 15 minutes.
        let a = [record(1, 36_000, 37_800)];
        let b = [record(1, 36_900, 38_700)];

        assert_eq!(BruteForce.total_overlap(&a, &b), 900);
        assert_eq!(ChannelIndexed.total_overlap(&a, &b), 900);
    }

    #[test]
    fn different_channels_never_overlap() {
        let a = [record(1, 0, 1_000)];
        let b = [record(2, 0, 1_000)];

        assert_eq!(BruteForce.total_overlap(&a, &b), 0);
        assert_eq!(ChannelIndexed.total_overlap(&a, &b), 0);
    }

    #[test]
    fn touching_intervals_count_zero() {
        let a = [record(1, 0, 100)];
        let b = [record(1, 100, 200)];

        assert_eq!(BruteForce.total_overlap(&a, &b), 0);
        assert_eq!(ChannelIndexed.total_overlap(&a, &b), 0);
    }

    #[test]
    fn containment_counts_the_inner_interval() {
        let a = [record(1, 0, 1_000)];
        let b = [record(1, 200, 300)];

        assert_eq!(BruteForce.total_overlap(&a, &b), 100);
        assert_eq!(ChannelIndexed.total_overlap(&a, &b), 100);
    }

    #[test]
    fn repeated_identical_intervals_all_pair_up() {
        // Two copies on each side make four overlapping pairs; any
        // strategy that merges or dedupes a side would undercount.
        let a = [record(1, 0, 10), record(1, 0, 10)];
        let b = [record(1, 0, 10), record(1, 0, 10)];

        assert_eq!(BruteForce.total_overlap(&a, &b), 40);
        assert_eq!(ChannelIndexed.total_overlap(&a, &b), 40);
    }

    #[test]
    fn multiple_channels_sum_independently() {
        let a = [record(1, 0, 100), record(2, 0, 100)];
        let b = [record(1, 50, 150), record(2, 90, 200), record(3, 0, 100)];

        // Channel 1 overlaps 50s, channel 2 overlaps 10s, channel 3 is
        // one-sided.
        assert_eq!(BruteForce.total_overlap(&a, &b), 60);
        assert_eq!(ChannelIndexed.total_overlap(&a, &b), 60);
    }

    #[test]
    fn empty_sides_are_zero() {
        let a = [record(1, 0, 100)];
        assert_eq!(BruteForce.total_overlap(&a, &[]), 0);
        assert_eq!(BruteForce.total_overlap(&[], &a), 0);
        assert_eq!(ChannelIndexed.total_overlap(&[], &[]), 0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::types::UserId;
    use proptest::prelude::*;

    fn arb_records() -> impl Strategy<Value = Vec<SessionRecord>> {
        prop::collection::vec(
            (0u64..4, 0i64..2_000, 0i64..500).prop_map(|(channel, start, len)| SessionRecord {
                user_id: UserId(9),
                username: "p".into(),
                channel_id: ChannelId(channel),
                channel_name: format!("ch-{channel}"),
                started_at: start,
                ended_at: start + len,
                duration_secs: len,
            }),
            0..12,
        )
    }

    proptest! {
        #[test]
        fn indexed_matches_brute_force(a in arb_records(), b in arb_records()) {
            prop_assert_eq!(
                ChannelIndexed.total_overlap(&a, &b),
                BruteForce.total_overlap(&a, &b)
            );
        }

        #[test]
        fn overlap_is_symmetric(a in arb_records(), b in arb_records()) {
            prop_assert_eq!(
                BruteForce.total_overlap(&a, &b),
                BruteForce.total_overlap(&b, &a)
            );
            prop_assert_eq!(
                ChannelIndexed.total_overlap(&a, &b),
                ChannelIndexed.total_overlap(&b, &a)
            );
        }

        #[test]
        fn overlap_never_exceeds_either_side(a in arb_records(), b in arb_records()) {
            let total = BruteForce.total_overlap(&a, &b);
            prop_assert!(total >= 0);
            // Each pair contributes at most the shorter record, so the sum
            // is bounded by each side's duration multiplied by the other
            // side's record count.
            let a_secs: i64 = a.iter().map(|r| r.duration_secs).sum();
            let b_secs: i64 = b.iter().map(|r| r.duration_secs).sum();
            prop_assert!(total <= a_secs * b.len().max(1) as i64);
            prop_assert!(total <= b_secs * a.len().max(1) as i64);
        }
    }
}
