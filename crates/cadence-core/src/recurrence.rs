//! Expansion of a task's recurrence window into concrete occurrences.
//!
//! Windows start at the task's start time and advance by the repeat interval
//! while the cursor has not passed the task's end time. A batch is accepted
//! whole or not at all: one overlapping candidate rejects every member.

use chrono::{DateTime, Duration, Utc};

use crate::error::CoreError;
use crate::models::{NewOccurrence, Task};
use crate::overlap::{BatchOverlapChecker, OverlapChecker};

/// Hard cap on the occurrences a single task may expand into.
pub const MAX_OCCURRENCES_PER_TASK: usize = 10_000;

/// Iterator over the candidate `[start, end)` windows of a task.
///
/// The upper bound is inclusive: a cursor landing exactly on `task.end_time`
/// still yields one final occurrence, even though that occurrence then runs
/// past the task window. A repeat interval of 0 yields exactly one window.
#[derive(Debug, Clone)]
pub struct CandidateWindows {
    cursor: DateTime<Utc>,
    last_start: DateTime<Utc>,
    duration: Duration,
    step: Option<Duration>,
    exhausted: bool,
}

impl CandidateWindows {
    /// # Errors
    /// * `Validation` - the duration or repeat interval leaves the representable date range
    pub fn new(task: &Task) -> Result<Self, CoreError> {
        let (duration, step) = task.spans()?;
        Ok(Self {
            cursor: task.start_time,
            last_start: task.end_time,
            duration,
            step,
            exhausted: false,
        })
    }
}

impl Iterator for CandidateWindows {
    type Item = (DateTime<Utc>, DateTime<Utc>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted || self.cursor > self.last_start {
            return None;
        }

        let end = self.cursor.checked_add_signed(self.duration)?;
        let window = (self.cursor, end);
        match self.step.and_then(|step| self.cursor.checked_add_signed(step)) {
            Some(next) => self.cursor = next,
            None => self.exhausted = true,
        }
        Some(window)
    }
}

/// OccurrenceGenerator: expands a task's recurrence window into concrete occurrences.
///
/// Every candidate is checked against the committed occurrences and against the
/// members of the batch accepted so far. A single collision aborts the whole
/// batch; nothing is returned for partial persistence.
#[derive(Debug, Default, Clone, Copy)]
pub struct OccurrenceGenerator;

impl OccurrenceGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Candidate windows without any overlap checking.
    pub fn windows(&self, task: &Task) -> Result<CandidateWindows, CoreError> {
        CandidateWindows::new(task)
    }

    /// Generates the ordered occurrence batch for `task`.
    ///
    /// # Errors
    /// * `OverlapConflict` - a candidate intersects a stored occurrence or an
    ///   earlier member of the same batch
    /// * `Validation` - the task expands into more than [`MAX_OCCURRENCES_PER_TASK`],
    ///   or its windows leave the representable date range
    pub async fn generate(
        &self,
        task: &Task,
        committed: &dyn OverlapChecker,
    ) -> Result<Vec<NewOccurrence>, CoreError> {
        let mut batch = BatchOverlapChecker::new(committed);
        let mut occurrences = Vec::new();

        for (start, end) in self.windows(task)? {
            if occurrences.len() >= MAX_OCCURRENCES_PER_TASK {
                return Err(CoreError::Validation(format!(
                    "Task expands into more than {} occurrences",
                    MAX_OCCURRENCES_PER_TASK
                )));
            }

            if batch.overlaps(start, end).await? {
                tracing::debug!(task_id = %task.id, %start, %end, "candidate occurrence overlaps");
                return Err(CoreError::OverlapConflict { start, end });
            }

            batch.accept(start, end);
            occurrences.push(NewOccurrence {
                name: task.name.clone(),
                start_time: start,
                end_time: end,
                duration_minutes: task.duration_minutes,
            });
        }

        Ok(occurrences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::intervals_overlap;
    use crate::overlap::tests::FixedIntervals;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rstest::rstest;
    use uuid::Uuid;

    fn task(start: DateTime<Utc>, end: DateTime<Utc>, duration: i64, repeat: i64) -> Task {
        Task {
            id: Uuid::now_v7(),
            name: "Standup".to_string(),
            start_time: start,
            end_time: end,
            duration_minutes: duration,
            repeat_every_days: repeat,
            created_at: Utc::now(),
        }
    }

    fn jan(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
    }

    mod window_tests {
        use super::*;

        #[test]
        fn test_daily_window_is_boundary_inclusive() {
            let t = task(jan(1, 9, 0), jan(3, 9, 0), 60, 1);
            let windows: Vec<_> = CandidateWindows::new(&t).unwrap().collect();

            assert_eq!(
                windows,
                vec![
                    (jan(1, 9, 0), jan(1, 10, 0)),
                    (jan(2, 9, 0), jan(2, 10, 0)),
                    (jan(3, 9, 0), jan(3, 10, 0)),
                ]
            );
        }

        #[test]
        fn test_zero_repeat_yields_single_window() {
            let t = task(jan(1, 9, 0), jan(20, 9, 0), 30, 0);
            let windows: Vec<_> = CandidateWindows::new(&t).unwrap().collect();
            assert_eq!(windows, vec![(jan(1, 9, 0), jan(1, 9, 30))]);
        }

        #[rstest]
        #[case(jan(3, 8, 59), 2)] // end just before the third cursor
        #[case(jan(3, 9, 0), 3)] // end exactly on the third cursor
        #[case(jan(3, 9, 1), 3)]
        fn test_window_count_around_boundary(#[case] end: DateTime<Utc>, #[case] expected: usize) {
            let t = task(jan(1, 9, 0), end, 60, 1);
            assert_eq!(CandidateWindows::new(&t).unwrap().count(), expected);
        }

        #[rstest]
        #[case(30, 100_000_000)]
        #[case(i64::MAX, 0)]
        #[case(i64::MAX / 60_000, 1)]
        fn test_out_of_range_task_is_rejected(#[case] duration: i64, #[case] repeat: i64) {
            let t = task(jan(1, 9, 0), jan(3, 9, 0), duration, repeat);
            assert!(matches!(CandidateWindows::new(&t), Err(CoreError::Validation(_))));
        }

        #[test]
        fn test_window_near_the_last_representable_date() {
            let last = DateTime::<Utc>::MAX_UTC - Duration::days(3);
            let t = task(last, last, 60, 1);
            let windows: Vec<_> = CandidateWindows::new(&t).unwrap().collect();
            assert_eq!(windows, vec![(last, last + Duration::hours(1))]);
        }

        #[test]
        fn test_multi_day_interval() {
            let t = task(jan(1, 9, 0), jan(10, 9, 0), 15, 3);
            let starts: Vec<_> = CandidateWindows::new(&t).unwrap().map(|(s, _)| s).collect();
            assert_eq!(starts, vec![jan(1, 9, 0), jan(4, 9, 0), jan(7, 9, 0), jan(10, 9, 0)]);
        }
    }

    mod generate_tests {
        use super::*;

        #[tokio::test]
        async fn test_generate_copies_name_and_duration() {
            let t = task(jan(1, 9, 0), jan(3, 9, 0), 60, 1);
            let committed = FixedIntervals(vec![]);
            let occurrences = OccurrenceGenerator::new().generate(&t, &committed).await.unwrap();

            assert_eq!(occurrences.len(), 3);
            assert!(occurrences.iter().all(|o| o.name == "Standup" && o.duration_minutes == 60));
        }

        #[tokio::test]
        async fn test_generate_conflicts_with_committed() {
            let t = task(jan(1, 9, 0), jan(3, 9, 0), 60, 1);
            let committed = FixedIntervals(vec![(jan(2, 9, 30), jan(2, 10, 0))]);
            let result = OccurrenceGenerator::new().generate(&t, &committed).await;

            match result {
                Err(CoreError::OverlapConflict { start, end }) => {
                    assert_eq!(start, jan(2, 9, 0));
                    assert_eq!(end, jan(2, 10, 0));
                }
                other => panic!("Expected overlap conflict, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_generate_conflicts_with_own_batch() {
            // 25 hour occurrences repeating daily collide with their successor
            let t = task(jan(1, 9, 0), jan(3, 9, 0), 25 * 60, 1);
            let committed = FixedIntervals(vec![]);
            let result = OccurrenceGenerator::new().generate(&t, &committed).await;

            assert!(matches!(result, Err(CoreError::OverlapConflict { .. })));
        }

        #[tokio::test]
        async fn test_generate_allows_touching_intervals() {
            let t = task(jan(1, 10, 0), jan(1, 10, 0), 30, 0);
            let committed = FixedIntervals(vec![(jan(1, 9, 0), jan(1, 10, 0))]);
            let occurrences = OccurrenceGenerator::new().generate(&t, &committed).await;
            assert_eq!(occurrences.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_generate_rejects_out_of_range_repeat() {
            let t = task(jan(1, 9, 0), jan(3, 9, 0), 60, 100_000_000);
            let committed = FixedIntervals(vec![]);
            let result = OccurrenceGenerator::new().generate(&t, &committed).await;
            assert!(matches!(result, Err(CoreError::Validation(_))));
        }

        #[tokio::test]
        async fn test_generate_rejects_runaway_expansion() {
            let start = jan(1, 0, 0);
            let t = task(start, start + Duration::days(MAX_OCCURRENCES_PER_TASK as i64 + 5), 1, 1);
            let committed = FixedIntervals(vec![]);
            let result = OccurrenceGenerator::new().generate(&t, &committed).await;
            assert!(matches!(result, Err(CoreError::Validation(_))));
        }
    }

    proptest! {
        #[test]
        fn prop_generated_sequence_is_ordered_and_disjoint(
            duration in 1i64..=1440,
            repeat in 1i64..=14,
            span_days in 0i64..=90,
        ) {
            let start = jan(1, 9, 0);
            let t = task(start, start + Duration::days(span_days), duration, repeat);
            let committed = FixedIntervals(vec![]);
            let occurrences = tokio_test::block_on(OccurrenceGenerator::new().generate(&t, &committed)).unwrap();

            prop_assert!(!occurrences.is_empty());
            for o in &occurrences {
                prop_assert_eq!(o.duration_minutes, duration);
                prop_assert_eq!(o.end_time - o.start_time, Duration::minutes(duration));
                prop_assert!(o.start_time <= t.end_time);
            }
            for pair in occurrences.windows(2) {
                prop_assert!(pair[0].start_time < pair[1].start_time);
                prop_assert!(!intervals_overlap(pair[0].start_time, pair[0].end_time, pair[1].start_time, pair[1].end_time));
            }
        }
    }
}
