//! Interval overlap checks.
//!
//! All intervals are half-open `[start, end)`: an interval ending exactly when
//! another starts does not overlap it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::repository::OccurrenceRepository;

/// Half-open interval intersection test.
#[inline]
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Answers whether a candidate interval collides with anything already known.
#[async_trait]
pub trait OverlapChecker: Send + Sync {
    async fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<bool, CoreError>;
}

/// Checks candidates against every persisted occurrence.
pub struct StoreOverlapChecker<'a, S: OccurrenceRepository + ?Sized> {
    store: &'a S,
}

impl<'a, S: OccurrenceRepository + ?Sized> StoreOverlapChecker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<'a, S: OccurrenceRepository + ?Sized> OverlapChecker for StoreOverlapChecker<'a, S> {
    async fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<bool, CoreError> {
        let hits = self.store.find_occurrences_overlapping(start, end).await?;
        Ok(!hits.is_empty())
    }
}

/// Layers a working set of accepted-but-uncommitted intervals over another
/// checker, so one generation batch sees its own earlier members.
pub struct BatchOverlapChecker<'a> {
    committed: &'a dyn OverlapChecker,
    pending: Vec<(DateTime<Utc>, DateTime<Utc>)>,
}

impl<'a> BatchOverlapChecker<'a> {
    pub fn new(committed: &'a dyn OverlapChecker) -> Self {
        Self {
            committed,
            pending: Vec::new(),
        }
    }

    /// Records an interval as part of the current batch.
    pub fn accept(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.pending.push((start, end));
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub async fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<bool, CoreError> {
        if self
            .pending
            .iter()
            .any(|&(s, e)| intervals_overlap(start, end, s, e))
        {
            return Ok(true);
        }
        self.committed.overlaps(start, end).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    /// Fixed set of intervals standing in for the store.
    pub(crate) struct FixedIntervals(pub Vec<(DateTime<Utc>, DateTime<Utc>)>);

    #[async_trait]
    impl OverlapChecker for FixedIntervals {
        async fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<bool, CoreError> {
            Ok(self.0.iter().any(|&(s, e)| intervals_overlap(start, end, s, e)))
        }
    }

    fn nine() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    #[rstest]
    #[case(0, 60, 30, 90, true)] // partial overlap
    #[case(0, 60, 10, 20, true)] // containment
    #[case(0, 60, 60, 120, false)] // touching at end
    #[case(60, 120, 0, 60, false)] // touching at start
    #[case(0, 60, 120, 180, false)] // disjoint
    #[case(0, 60, 0, 60, true)] // identical
    fn test_intervals_overlap(
        #[case] a_start: i64,
        #[case] a_end: i64,
        #[case] b_start: i64,
        #[case] b_end: i64,
        #[case] expected: bool,
    ) {
        let m = |mins| nine() + Duration::minutes(mins);
        assert_eq!(intervals_overlap(m(a_start), m(a_end), m(b_start), m(b_end)), expected);
        // symmetric
        assert_eq!(intervals_overlap(m(b_start), m(b_end), m(a_start), m(a_end)), expected);
    }

    #[tokio::test]
    async fn test_batch_checker_sees_pending_intervals() {
        let committed = FixedIntervals(vec![]);
        let mut batch = BatchOverlapChecker::new(&committed);

        let start = nine();
        let end = start + Duration::hours(1);
        assert!(!batch.overlaps(start, end).await.unwrap());

        batch.accept(start, end);
        assert_eq!(batch.pending_len(), 1);
        assert!(batch.overlaps(start + Duration::minutes(30), end + Duration::minutes(30)).await.unwrap());
        assert!(!batch.overlaps(end, end + Duration::hours(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_batch_checker_consults_committed() {
        let start = nine();
        let committed = FixedIntervals(vec![(start, start + Duration::hours(1))]);
        let batch = BatchOverlapChecker::new(&committed);

        assert!(batch.overlaps(start + Duration::minutes(30), start + Duration::hours(2)).await.unwrap());
    }
}
