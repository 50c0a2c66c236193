//! Pure aggregation over already-fetched behavior records. Nothing here
//! touches the store.

use std::collections::HashSet;

use uuid::Uuid;

/// A unit as the aggregator sees it: its id and whether it carries a video.
#[derive(Debug, Clone, Copy)]
pub struct UnitTag {
    pub unit_id: Uuid,
    pub has_video: bool,
}

/// One behavior value attached to a unit (seconds spent, or a scroll
/// percentage).
#[derive(Debug, Clone, Copy)]
pub struct UnitSample {
    pub unit_id: Uuid,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitAverages {
    pub video: f64,
    pub non_video: f64,
}

/// Mean of the samples matched to each partition of the unit list.
///
/// Units are partitioned by their own video flag; each unit contributes at
/// most one sample (the first with its id). Units with no sample are left
/// out of the mean entirely. An empty partition or a partition with no
/// matched samples averages to exactly 0.
pub fn split_averages(units: &[UnitTag], samples: &[UnitSample]) -> SplitAverages {
    SplitAverages {
        video: partition_mean(units, samples, true),
        non_video: partition_mean(units, samples, false),
    }
}

fn partition_mean(units: &[UnitTag], samples: &[UnitSample], has_video: bool) -> f64 {
    let mut sum = 0.0;
    let mut count = 0u64;
    for unit in units.iter().filter(|u| u.has_video == has_video) {
        if let Some(sample) = samples.iter().find(|s| s.unit_id == unit.unit_id) {
            sum += sample.value;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Share of a course's units the user has viewed, as a rounded percentage.
/// Viewed ids outside the course are ignored; a course with no units
/// reports 0.
pub fn progress_percent(course_unit_ids: &[Uuid], viewed_unit_ids: &[Uuid]) -> i64 {
    if course_unit_ids.is_empty() {
        return 0;
    }
    let course: HashSet<Uuid> = course_unit_ids.iter().copied().collect();
    let viewed: HashSet<Uuid> = viewed_unit_ids
        .iter()
        .filter(|id| course.contains(id))
        .copied()
        .collect();
    (100.0 * viewed.len() as f64 / course.len() as f64).round() as i64
}

/// Which scroll rows to delete so that only the maximum survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollPruning {
    pub keep: Uuid,
    pub delete: Vec<Uuid>,
}

/// Plans the consolidation of duplicate scroll rows for one
/// (user, course, unit) key. Input order is the tie-break: among equal
/// maxima the first row encountered survives. Returns `None` when there is
/// nothing to delete, which makes a repeated run a no-op.
pub fn plan_scroll_pruning(rows: &[(Uuid, f64)]) -> Option<ScrollPruning> {
    if rows.len() < 2 {
        return None;
    }
    let mut keep = 0;
    for (idx, row) in rows.iter().enumerate().skip(1) {
        if row.1 > rows[keep].1 {
            keep = idx;
        }
    }
    Some(ScrollPruning {
        keep: rows[keep].0,
        delete: rows
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != keep)
            .map(|(_, row)| row.0)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(unit_id: Uuid, has_video: bool) -> UnitTag {
        UnitTag { unit_id, has_video }
    }

    fn sample(unit_id: Uuid, value: f64) -> UnitSample {
        UnitSample { unit_id, value }
    }

    #[test]
    fn mean_covers_exactly_the_matched_units() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let units = [tag(a, true), tag(b, true), tag(c, true)];
        // c has no sample and must not count as zero
        let samples = [sample(a, 30.0), sample(b, 60.0)];

        let averages = split_averages(&units, &samples);
        assert_eq!(averages.video, 45.0);
        assert_eq!(averages.non_video, 0.0);
    }

    #[test]
    fn empty_partition_averages_to_zero_not_nan() {
        let averages = split_averages(&[], &[]);
        assert_eq!(averages.video, 0.0);
        assert_eq!(averages.non_video, 0.0);
    }

    #[test]
    fn partition_follows_the_unit_flag() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let units = [tag(a, true), tag(b, false)];
        let samples = [sample(a, 80.0), sample(b, 20.0)];

        let averages = split_averages(&units, &samples);
        assert_eq!(averages.video, 80.0);
        assert_eq!(averages.non_video, 20.0);
    }

    #[test]
    fn at_most_one_sample_per_unit_is_used() {
        let a = Uuid::new_v4();
        let units = [tag(a, false)];
        let samples = [sample(a, 40.0), sample(a, 90.0)];

        let averages = split_averages(&units, &samples);
        assert_eq!(averages.non_video, 40.0);
    }

    #[test]
    fn progress_counts_distinct_viewed_units() {
        let units: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        // three distinct views, one of them duplicated
        let viewed = vec![units[0], units[1], units[1], units[2]];
        assert_eq!(progress_percent(&units, &viewed), 75);
    }

    #[test]
    fn progress_ignores_units_outside_the_course() {
        let units: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let viewed = vec![units[0], Uuid::new_v4()];
        assert_eq!(progress_percent(&units, &viewed), 50);
    }

    #[test]
    fn progress_of_an_empty_course_is_zero() {
        assert_eq!(progress_percent(&[], &[Uuid::new_v4()]), 0);
    }

    #[test]
    fn pruning_keeps_the_maximum_row() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let rows = [(ids[0], 40.0), (ids[1], 90.0), (ids[2], 60.0)];

        let plan = plan_scroll_pruning(&rows).unwrap();
        assert_eq!(plan.keep, ids[1]);
        assert_eq!(plan.delete, vec![ids[0], ids[2]]);
    }

    #[test]
    fn pruning_a_single_row_is_a_noop() {
        assert_eq!(plan_scroll_pruning(&[(Uuid::new_v4(), 55.0)]), None);
        assert_eq!(plan_scroll_pruning(&[]), None);
    }

    #[test]
    fn pruning_tie_keeps_the_first_row_encountered() {
        let ids: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let rows = [(ids[0], 70.0), (ids[1], 70.0)];

        let plan = plan_scroll_pruning(&rows).unwrap();
        assert_eq!(plan.keep, ids[0]);
        assert_eq!(plan.delete, vec![ids[1]]);
    }
}
