//! Per-base identity profiles
//!
//! Folding a record stream over a reference of length `L` yields, for every
//! base, the arithmetic mean identity of all records covering it together with
//! the number of covering records. Keeping the hit count makes "covered at 0%
//! identity" distinguishable from "not covered".

use crate::error::BenchError;
use crate::tabular::AlignmentRecord;

/// Accumulates identity sums and hit counts, one slot per reference base
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    sums: Vec<f64>,
    hits: Vec<u32>,
    records: usize,
}

impl ProfileBuilder {
    pub fn new(reference_length: usize) -> Self {
        ProfileBuilder {
            sums: vec![0.0; reference_length],
            hits: vec![0; reference_length],
            records: 0,
        }
    }

    pub fn reference_length(&self) -> usize {
        self.sums.len()
    }

    /// Add one record's identity to every base of its interval
    pub fn add(&mut self, record: &AlignmentRecord) -> Result<(), BenchError> {
        let len = self.sums.len();
        if record.end > len as u64 || record.start > record.end {
            return Err(BenchError::Range {
                start: record.start,
                end: record.end,
                reference_length: len,
            });
        }
        self.records += 1;

        let (start, end) = (record.start as usize, record.end as usize);
        for sum in &mut self.sums[start..end] {
            *sum += record.identity;
        }
        for hit in &mut self.hits[start..end] {
            *hit += 1;
        }
        Ok(())
    }

    /// Divide each covered base's sum by its hit count
    pub fn finish(self) -> IdentityProfile {
        let ProfileBuilder {
            mut sums,
            hits,
            records,
        } = self;
        for (sum, &count) in sums.iter_mut().zip(&hits) {
            if count > 0 {
                *sum /= count as f64;
            }
        }
        IdentityProfile {
            identity: sums,
            hits,
            records,
        }
    }
}

/// Mean identity and coverage depth per reference base
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityProfile {
    identity: Vec<f64>,
    hits: Vec<u32>,
    records: usize,
}

impl IdentityProfile {
    /// Fold already-parsed records
    pub fn build<'a, I>(records: I, reference_length: usize) -> Result<Self, BenchError>
    where
        I: IntoIterator<Item = &'a AlignmentRecord>,
    {
        let mut builder = ProfileBuilder::new(reference_length);
        for record in records {
            builder.add(record)?;
        }
        Ok(builder.finish())
    }

    /// Fold a lazy record stream, stopping at the first parse or range error
    pub fn fold<I>(records: I, reference_length: usize) -> Result<Self, BenchError>
    where
        I: IntoIterator<Item = Result<AlignmentRecord, BenchError>>,
    {
        let mut builder = ProfileBuilder::new(reference_length);
        for record in records {
            builder.add(&record?)?;
        }
        Ok(builder.finish())
    }

    pub fn len(&self) -> usize {
        self.identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identity.is_empty()
    }

    /// Dense identity vector, 0 where uncovered
    pub fn identity(&self) -> &[f64] {
        &self.identity
    }

    pub fn hits(&self) -> &[u32] {
        &self.hits
    }

    /// Number of records folded into this profile
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn is_covered(&self, pos: usize) -> bool {
        self.hits[pos] > 0
    }

    pub fn covered_bases(&self) -> usize {
        self.hits.iter().filter(|&&h| h > 0).count()
    }

    /// Covered bases as a percentage of the reference
    pub fn coverage(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.covered_bases() as f64 * 100.0 / self.len() as f64
        }
    }

    /// Per-base `(mean identity, covered)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (f64, bool)> + '_ {
        self.identity
            .iter()
            .zip(&self.hits)
            .map(|(&id, &h)| (id, h > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rec(start: u64, end: u64, identity: f64) -> AlignmentRecord {
        AlignmentRecord { start, end, identity }
    }

    #[test]
    fn test_overlapping_records_are_averaged() {
        let records = [rec(1, 5, 80.0), rec(3, 7, 100.0)];
        let profile = IdentityProfile::build(&records, 10).unwrap();
        assert_eq!(
            profile.identity(),
            &[0.0, 80.0, 80.0, 90.0, 90.0, 100.0, 100.0, 0.0, 0.0, 0.0]
        );
        assert_eq!(profile.hits(), &[0, 1, 1, 2, 2, 1, 1, 0, 0, 0]);
        assert_eq!(profile.records(), 2);
    }

    #[test]
    fn test_overlap_from_raw_coordinates() {
        let records = [
            AlignmentRecord::from_subject_coords(1, 4, 80.0),
            AlignmentRecord::from_subject_coords(6, 3, 100.0),
        ];
        let profile = IdentityProfile::build(&records, 10).unwrap();
        assert_eq!(
            profile.identity(),
            &[80.0, 80.0, 90.0, 90.0, 100.0, 100.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_three_way_mean() {
        let records = [rec(0, 1, 90.0), rec(0, 1, 95.0), rec(0, 1, 100.0)];
        let profile = IdentityProfile::build(&records, 1).unwrap();
        assert!((profile.identity()[0] - 95.0).abs() < 1e-12);
        assert_eq!(profile.hits(), &[3]);
    }

    #[test]
    fn test_zero_identity_is_still_covered() {
        let profile = IdentityProfile::build(&[rec(2, 4, 0.0)], 5).unwrap();
        assert_eq!(profile.identity(), &[0.0; 5]);
        assert!(profile.is_covered(2));
        assert!(!profile.is_covered(4));
        assert_eq!(profile.covered_bases(), 2);
        assert!((profile.coverage() - 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_interval_contributes_nothing() {
        let mut builder = ProfileBuilder::new(4);
        builder.add(&rec(2, 2, 99.0)).unwrap();
        let profile = builder.finish();
        assert_eq!(profile.covered_bases(), 0);
        assert_eq!(profile.records(), 1);
    }

    #[test]
    fn test_interval_past_reference_end_is_range_error() {
        let err = IdentityProfile::build(&[rec(5, 11, 90.0)], 10).unwrap_err();
        match err {
            BenchError::Range {
                start,
                end,
                reference_length,
            } => assert_eq!((start, end, reference_length), (5, 11, 10)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_interval_ending_at_reference_end_is_allowed() {
        let profile = IdentityProfile::build(&[rec(5, 10, 90.0)], 10).unwrap();
        assert!(profile.is_covered(9));
    }

    #[test]
    fn test_fold_propagates_stream_errors() {
        let stream = vec![
            Ok(rec(0, 2, 50.0)),
            Err(BenchError::MissingField {
                line: 2,
                field: "subject end",
            }),
        ];
        assert!(IdentityProfile::fold(stream, 4).is_err());
    }

    #[test]
    fn test_empty_reference() {
        let profile = IdentityProfile::build(&Vec::<AlignmentRecord>::new(), 0).unwrap();
        assert!(profile.is_empty());
        assert_eq!(profile.coverage(), 0.0);
        assert!(IdentityProfile::build(&[rec(0, 1, 1.0)], 0).is_err());
    }
}
