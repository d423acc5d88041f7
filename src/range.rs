use crate::error::{MigrateError, Result};
use crate::history::ChangesetRecord;

/// Inclusive changeset bounds. Both ends are required together and must name
/// changesets that actually exist in the source history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
	pub start: u64,
	pub end: u64,
}

impl Range {
	pub fn from_bounds(start: Option<u64>, end: Option<u64>) -> Result<Option<Self>> {
		match (start, end) {
			(None, None) => Ok(None),
			(Some(_), None) => Err(MigrateError::InvalidRange(
				"start bound given without an end bound".into(),
			)),
			(None, Some(_)) => Err(MigrateError::InvalidRange(
				"end bound given without a start bound".into(),
			)),
			(Some(start), Some(end)) if end <= start => Err(MigrateError::InvalidRange(
				format!("end {end} must be strictly greater than start {start}"),
			)),
			(Some(start), Some(end)) => Ok(Some(Self { start, end })),
		}
	}

	/// Keeps only records inside the bounds. Both bounds must be present
	/// verbatim in the input; the error names whichever is missing.
	pub fn apply(self, records: Vec<ChangesetRecord>) -> Result<Vec<ChangesetRecord>> {
		let has_start = records.iter().any(|r| r.id == self.start);
		let has_end = records.iter().any(|r| r.id == self.end);
		match (has_start, has_end) {
			(false, false) => {
				return Err(MigrateError::RangeNotFound(format!(
					"neither start {} nor end {} is a changeset in the source history",
					self.start, self.end
				)));
			}
			(false, true) => {
				return Err(MigrateError::RangeNotFound(format!(
					"start {} is not a changeset in the source history",
					self.start
				)));
			}
			(true, false) => {
				return Err(MigrateError::RangeNotFound(format!(
					"end {} is not a changeset in the source history",
					self.end
				)));
			}
			(true, true) => {}
		}

		Ok(records
			.into_iter()
			.filter(|r| self.start <= r.id && r.id <= self.end)
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use chrono::{FixedOffset, TimeZone};

	use super::*;

	fn record(id: u64) -> ChangesetRecord {
		ChangesetRecord {
			id,
			timestamp: FixedOffset::east_opt(0)
				.unwrap()
				.with_ymd_and_hms(2015, 1, 5, 0, 0, 0)
				.unwrap(),
			author: "alice".into(),
			message: String::new(),
		}
	}

	fn history(ids: &[u64]) -> Vec<ChangesetRecord> {
		ids.iter().copied().map(record).collect()
	}

	#[test]
	fn neither_bound_means_no_range() {
		assert_eq!(Range::from_bounds(None, None).unwrap(), None);
	}

	#[test]
	fn one_sided_bounds_are_rejected() {
		assert!(matches!(
			Range::from_bounds(Some(10), None),
			Err(MigrateError::InvalidRange(_))
		));
		assert!(matches!(
			Range::from_bounds(None, Some(10)),
			Err(MigrateError::InvalidRange(_))
		));
	}

	#[test]
	fn equal_and_inverted_bounds_are_rejected() {
		assert!(matches!(
			Range::from_bounds(Some(10), Some(10)),
			Err(MigrateError::InvalidRange(_))
		));
		assert!(matches!(
			Range::from_bounds(Some(20), Some(10)),
			Err(MigrateError::InvalidRange(_))
		));
	}

	#[test]
	fn selection_is_an_ascending_inclusive_subsequence() {
		let range = Range::from_bounds(Some(20), Some(30)).unwrap().unwrap();
		let kept = range.apply(history(&[10, 20, 30, 40])).unwrap();
		let ids: Vec<u64> = kept.iter().map(|r| r.id).collect();
		assert_eq!(ids, vec![20, 30]);
	}

	#[test]
	fn missing_bounds_are_named() {
		let range = Range::from_bounds(Some(15), Some(30)).unwrap().unwrap();
		let err = range.apply(history(&[10, 20, 30])).unwrap_err();
		assert!(err.to_string().contains("start 15"));

		let range = Range::from_bounds(Some(10), Some(35)).unwrap().unwrap();
		let err = range.apply(history(&[10, 20, 30])).unwrap_err();
		assert!(err.to_string().contains("end 35"));

		let range = Range::from_bounds(Some(15), Some(35)).unwrap().unwrap();
		let err = range.apply(history(&[10, 20, 30])).unwrap_err();
		assert!(matches!(err, MigrateError::RangeNotFound(_)));
	}

	#[test]
	fn endpoints_are_never_invented() {
		let range = Range::from_bounds(Some(10), Some(30)).unwrap().unwrap();
		let kept = range.apply(history(&[10, 20, 30])).unwrap();
		assert_eq!(kept.len(), 3);
	}
}
