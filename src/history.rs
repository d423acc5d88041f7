use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};

use crate::error::{MigrateError, Result};

/// One changeset as recorded by the source system.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangesetRecord {
	pub id: u64,
	pub timestamp: DateTime<FixedOffset>,
	pub author: String,
	pub message: String,
}

/// Parses the detailed history listing into records, ascending by changeset id.
///
/// The listing is a sequence of blocks separated by dashed delimiter lines.
/// A block missing its changeset id or date is fatal: a silently skipped id
/// would corrupt the replay downstream.
pub fn parse_history(text: &str) -> Result<Vec<ChangesetRecord>> {
	let mut records = Vec::new();
	let mut block: Vec<&str> = Vec::new();

	for line in text.lines() {
		if is_delimiter(line) {
			flush_block(&mut block, &mut records)?;
		} else {
			block.push(line);
		}
	}
	flush_block(&mut block, &mut records)?;

	records.sort_by_key(|r| r.id);
	Ok(records)
}

fn flush_block(block: &mut Vec<&str>, records: &mut Vec<ChangesetRecord>) -> Result<()> {
	if block.iter().any(|l| !l.trim().is_empty()) {
		records.push(parse_block(block)?);
	}
	block.clear();
	Ok(())
}

fn is_delimiter(line: &str) -> bool {
	line.len() >= 10 && line.bytes().all(|b| b == b'-')
}

fn parse_block(lines: &[&str]) -> Result<ChangesetRecord> {
	let mut id = None;
	let mut timestamp = None;
	let mut author = String::new();
	let mut comment: Vec<&str> = Vec::new();
	let mut in_comment = false;

	for line in lines {
		if in_comment {
			if line.trim_start().starts_with("Items:") {
				in_comment = false;
			} else {
				comment.push(line.strip_prefix("  ").unwrap_or(line));
			}
			continue;
		}

		if let Some(rest) = line.strip_prefix("Changeset:") {
			let rest = rest.trim();
			id = Some(rest.parse::<u64>().map_err(|_| {
				MigrateError::MalformedHistory(format!("bad changeset id `{rest}`"))
			})?);
		} else if let Some(rest) = line.strip_prefix("User:") {
			author = strip_domain(rest.trim()).to_string();
		} else if let Some(rest) = line.strip_prefix("Date:") {
			timestamp = Some(parse_timestamp(rest.trim())?);
		} else if let Some(rest) = line.strip_prefix("Comment:") {
			in_comment = true;
			if !rest.trim().is_empty() {
				comment.push(rest.trim_start());
			}
		}
	}

	let id = id.ok_or_else(|| {
		MigrateError::MalformedHistory("record without a changeset id".into())
	})?;
	let timestamp = timestamp.ok_or_else(|| {
		MigrateError::MalformedHistory(format!("changeset {id} has no date"))
	})?;

	Ok(ChangesetRecord {
		id,
		timestamp,
		author,
		message: comment.join("\n").trim().to_string(),
	})
}

/// Keeps the bare account name: `CORP\alice` becomes `alice`.
pub fn strip_domain(raw: &str) -> &str {
	raw.rsplit('\\').next().unwrap_or(raw)
}

// The date line format depends on the client; these cover the layouts the
// detailed listing is known to emit.
const NAIVE_FORMATS: &[&str] = &[
	"%A, %B %d, %Y %I:%M:%S %p",
	"%m/%d/%Y %I:%M:%S %p",
	"%d %B %Y %H:%M:%S",
	"%Y-%m-%d %H:%M:%S",
];

fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
	if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
		return Ok(dt);
	}
	if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
		return Ok(dt);
	}
	for format in NAIVE_FORMATS {
		if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
			// No offset in the listing; interpret as the local zone.
			if let Some(dt) = Local.from_local_datetime(&naive).earliest() {
				return Ok(dt.fixed_offset());
			}
		}
	}
	Err(MigrateError::MalformedHistory(format!("unparseable date `{raw}`")))
}
