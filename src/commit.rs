use chrono::{DateTime, FixedOffset};
use git2::{IndexAddOption, ObjectType, Oid, Repository, Signature};
use tracing::warn;

use crate::error::{MigrateError, Result};
use crate::history::ChangesetRecord;

/// Stages the full working-tree state and commits it with the changeset's
/// original metadata. Returns `None` when the changeset produced no tree
/// change: the commit is skipped with a warning instead of aborting the run.
pub fn write(repo: &Repository, record: &ChangesetRecord, identity: &str) -> Result<Option<Oid>> {
	let mut index = repo.index().map_err(|e| commit_failed(record.id, &e))?;

	// Stage everything, deletions included. add_all alone would leave stale
	// index entries for files the changeset removed.
	index
		.add_all(["*"], IndexAddOption::DEFAULT, None)
		.map_err(|e| commit_failed(record.id, &e))?;
	index
		.update_all(["*"], None)
		.map_err(|e| commit_failed(record.id, &e))?;
	index.write().map_err(|e| commit_failed(record.id, &e))?;

	let tree_oid = index.write_tree().map_err(|e| commit_failed(record.id, &e))?;
	let tree = repo.find_tree(tree_oid).map_err(|e| commit_failed(record.id, &e))?;

	let parent = repo
		.head()
		.ok()
		.and_then(|head| head.peel_to_commit().ok());

	// No tree change relative to the parent means nothing to commit.
	let unchanged = match &parent {
		Some(parent) => parent.tree_id() == tree_oid,
		None => tree.is_empty(),
	};
	if unchanged {
		warn!(changeset = record.id, "changeset produced no tree change, skipping");
		return Ok(None);
	}

	let (name, email) = split_identity(identity);
	let when = to_git_time(&record.timestamp);
	let author =
		Signature::new(name, email, &when).map_err(|e| commit_failed(record.id, &e))?;
	let committer = author.clone();

	let parent_refs: Vec<&git2::Commit> = parent.iter().collect();
	let oid = repo
		.commit(
			Some("HEAD"),
			&author,
			&committer,
			&message_for(record),
			&tree,
			&parent_refs,
		)
		.map_err(|e| commit_failed(record.id, &e))?;

	Ok(Some(oid))
}

/// Lightweight tag on an existing commit, used for the import markers.
pub fn tag(repo: &Repository, name: &str, oid: Oid) -> Result<()> {
	let object = repo.find_object(oid, Some(ObjectType::Commit))?;
	repo.tag_lightweight(name, &object, true)?;
	Ok(())
}

/// The original comment plus a trailer tying the commit back to its source
/// changeset. An empty comment leaves just the trailer.
pub fn message_for(record: &ChangesetRecord) -> String {
	if record.message.is_empty() {
		format!("Changeset: {}", record.id)
	} else {
		format!("{}\n\nChangeset: {}", record.message, record.id)
	}
}

/// `Display Name <email>` splits into its parts; anything else is used as
/// both name and email, so an unmapped bare account still commits cleanly.
pub fn split_identity(identity: &str) -> (&str, &str) {
	if let (Some(open), Some(close)) = (identity.find('<'), identity.rfind('>')) {
		if open < close {
			let name = identity[..open].trim();
			let email = identity[open + 1..close].trim();
			if !name.is_empty() && !email.is_empty() {
				return (name, email);
			}
		}
	}
	(identity, identity)
}

fn to_git_time(date: &DateTime<FixedOffset>) -> git2::Time {
	// Seconds since epoch plus the original offset in minutes
	git2::Time::new(date.timestamp(), date.offset().local_minus_utc() / 60)
}

fn commit_failed(id: u64, source: &dyn std::fmt::Display) -> MigrateError {
	MigrateError::CommitFailed { id, reason: source.to_string() }
}

#[cfg(test)]
mod tests {
	use std::fs;

	use chrono::TimeZone;

	use super::*;

	fn record(id: u64, message: &str) -> ChangesetRecord {
		ChangesetRecord {
			id,
			timestamp: FixedOffset::east_opt(3600)
				.unwrap()
				.with_ymd_and_hms(2015, 1, 5, 10, 23, 45)
				.unwrap(),
			author: "alice".into(),
			message: message.into(),
		}
	}

	fn scratch_repo() -> (tempfile::TempDir, Repository) {
		let dir = tempfile::tempdir().unwrap();
		let repo = Repository::init(dir.path()).unwrap();
		(dir, repo)
	}

	#[test]
	fn splits_display_identity() {
		assert_eq!(
			split_identity("Alice A <a@x.com>"),
			("Alice A", "a@x.com")
		);
	}

	#[test]
	fn bare_account_is_name_and_email() {
		assert_eq!(split_identity("bob"), ("bob", "bob"));
	}

	#[test]
	fn degenerate_brackets_fall_back() {
		assert_eq!(split_identity("<>"), ("<>", "<>"));
		assert_eq!(split_identity("> odd <"), ("> odd <", "> odd <"));
	}

	#[test]
	fn message_carries_changeset_trailer() {
		assert_eq!(
			message_for(&record(42, "Fixed the thing")),
			"Fixed the thing\n\nChangeset: 42"
		);
		assert_eq!(message_for(&record(42, "")), "Changeset: 42");
	}

	#[test]
	fn commit_preserves_identity_and_timestamp() {
		let (dir, repo) = scratch_repo();
		fs::write(dir.path().join("a.txt"), "hello").unwrap();

		let oid = write(&repo, &record(10, "first"), "Alice A <a@x.com>")
			.unwrap()
			.unwrap();
		let commit = repo.find_commit(oid).unwrap();

		assert_eq!(commit.author().name(), Some("Alice A"));
		assert_eq!(commit.author().email(), Some("a@x.com"));
		assert_eq!(commit.time().seconds(), 1420449825);
		assert_eq!(commit.time().offset_minutes(), 60);
		assert_eq!(commit.message(), Some("first\n\nChangeset: 10"));
	}

	#[test]
	fn deletions_are_staged() {
		let (dir, repo) = scratch_repo();
		fs::write(dir.path().join("a.txt"), "a").unwrap();
		fs::write(dir.path().join("b.txt"), "b").unwrap();
		write(&repo, &record(10, "add both"), "alice").unwrap().unwrap();

		fs::remove_file(dir.path().join("b.txt")).unwrap();
		let oid = write(&repo, &record(20, "drop b"), "alice").unwrap().unwrap();

		let tree = repo.find_commit(oid).unwrap().tree().unwrap();
		assert!(tree.get_name("a.txt").is_some());
		assert!(tree.get_name("b.txt").is_none());
	}

	#[test]
	fn unchanged_tree_is_skipped() {
		let (dir, repo) = scratch_repo();
		fs::write(dir.path().join("a.txt"), "a").unwrap();
		write(&repo, &record(10, "first"), "alice").unwrap().unwrap();

		assert!(write(&repo, &record(20, "no-op"), "alice").unwrap().is_none());
	}

	#[test]
	fn empty_tree_with_no_parent_is_skipped() {
		let (_dir, repo) = scratch_repo();
		assert!(write(&repo, &record(10, "nothing"), "alice").unwrap().is_none());
	}

	#[test]
	fn tags_land_on_the_commit() {
		let (dir, repo) = scratch_repo();
		fs::write(dir.path().join("a.txt"), "a").unwrap();
		let oid = write(&repo, &record(10, "first"), "alice").unwrap().unwrap();

		tag(&repo, "import-start", oid).unwrap();
		let reference = repo.find_reference("refs/tags/import-start").unwrap();
		assert_eq!(reference.target(), Some(oid));
	}
}
