//! Day-bucket counting of activity records.
//!
//! Days are calendar days in a fixed UTC offset, keyed `YYYY-MM-DD`.

use chrono::{DateTime, FixedOffset, Utc};
use vcs_activity_common::{ActivityRecord, DayCounts};

const DAY_FORMAT: &str = "%Y-%m-%d";

pub fn day_key(timestamp: &DateTime<Utc>, offset: &FixedOffset) -> String {
    timestamp.with_timezone(offset).format(DAY_FORMAT).to_string()
}

/// Counts the records of `event_type` per day. Records of other types are ignored.
pub fn count_by_day(
    records: &[ActivityRecord],
    event_type: &str,
    offset: &FixedOffset,
) -> DayCounts {
    let mut counts = DayCounts::new();
    for record in records.iter().filter(|r| r.is(event_type)) {
        *counts
            .entry(day_key(&record.timestamp(), offset))
            .or_insert(0) += 1;
    }
    counts
}

/// Bucket-wise sum of two count maps.
pub fn merge_counts(mut a: DayCounts, b: DayCounts) -> DayCounts {
    for (day, count) in b {
        *a.entry(day).or_insert(0) += count;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use vcs_activity_common::event_type;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn record(kind: &str, y: i32, m: u32, d: u32, h: u32) -> ActivityRecord {
        ActivityRecord::new(
            Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
            kind,
            "dev",
            "repo",
            "main",
            "Success",
        )
    }

    fn sample() -> Vec<ActivityRecord> {
        vec![
            record(event_type::COMMIT, 2024, 1, 1, 9),
            record(event_type::COMMIT, 2024, 1, 1, 12),
            record(event_type::PULL_REQUEST, 2024, 1, 1, 13),
            record(event_type::COMMIT, 2024, 1, 1, 23),
            record(event_type::COMMIT, 2024, 1, 2, 0),
            record(event_type::BRANCH_CREATION, 2024, 1, 2, 5),
        ]
    }

    #[test]
    fn counts_commits_per_day() {
        let counts = count_by_day(&sample(), event_type::COMMIT, &utc());
        let expected: DayCounts = [("2024-01-01".to_string(), 3), ("2024-01-02".to_string(), 1)]
            .into_iter()
            .collect();
        assert_eq!(counts, expected);
    }

    #[test]
    fn other_event_types_are_ignored() {
        let counts = count_by_day(&sample(), event_type::PULL_REQUEST, &utc());
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["2024-01-01"], 1);
        assert!(count_by_day(&sample(), "Release", &utc()).is_empty());
    }

    #[test]
    fn empty_input_gives_empty_map() {
        assert!(count_by_day(&[], event_type::COMMIT, &utc()).is_empty());
    }

    #[test]
    fn order_does_not_matter() {
        let forward = sample();
        let mut backward = sample();
        backward.reverse();
        assert_eq!(
            count_by_day(&forward, event_type::COMMIT, &utc()),
            count_by_day(&backward, event_type::COMMIT, &utc())
        );
    }

    #[test]
    fn counting_is_additive_over_disjoint_sets() {
        let all = sample();
        let (a, b) = all.split_at(3);
        let merged = merge_counts(
            count_by_day(a, event_type::COMMIT, &utc()),
            count_by_day(b, event_type::COMMIT, &utc()),
        );
        assert_eq!(merged, count_by_day(&all, event_type::COMMIT, &utc()));
    }

    #[test]
    fn offset_moves_late_evening_into_next_day() {
        let late = record(event_type::COMMIT, 2024, 1, 1, 23);
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();

        assert_eq!(day_key(&late.timestamp(), &utc()), "2024-01-01");
        assert_eq!(day_key(&late.timestamp(), &plus_two), "2024-01-02");

        let early = record(event_type::COMMIT, 2024, 1, 2, 2);
        assert_eq!(day_key(&early.timestamp(), &minus_five), "2024-01-01");

        let counts = count_by_day(&sample(), event_type::COMMIT, &plus_two);
        assert_eq!(counts["2024-01-01"], 2);
        assert_eq!(counts["2024-01-02"], 2);
    }
}
