use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;
use crate::source::Source;

/// First materialization establishes the complete baseline snapshot; after
/// that only deltas are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TreeState {
	Uninitialized,
	Populated,
}

/// Updates the working tree to exactly one changeset's contents per call.
/// Calls must happen in strictly ascending changeset order, with no other
/// writer touching the tree in between.
pub struct Materializer {
	state: TreeState,
}

impl Materializer {
	pub fn new() -> Self {
		Self { state: TreeState::Uninitialized }
	}

	pub fn materialize<S: Source>(
		&mut self,
		source: &mut S,
		workdir: &Path,
		id: u64,
	) -> Result<()> {
		match self.state {
			TreeState::Uninitialized => {
				// The baseline must be a true snapshot of this changeset;
				// anything already in the tree is not part of it.
				clear_tree(workdir)?;
				source.fetch_full(workdir, id)?;
				self.state = TreeState::Populated;
			}
			TreeState::Populated => source.fetch_delta(workdir, id)?,
		}
		scrub_source_metadata(workdir)
	}
}

impl Default for Materializer {
	fn default() -> Self {
		Self::new()
	}
}

/// Empties the working tree without touching a `.git` directory.
fn clear_tree(workdir: &Path) -> Result<()> {
	for entry in fs::read_dir(workdir)? {
		let entry = entry?;
		let path = entry.path();

		if path.file_name() == Some(".git".as_ref()) {
			continue;
		}

		if path.is_dir() {
			fs::remove_dir_all(&path)?;
		} else {
			fs::remove_file(&path)?;
		}
	}
	Ok(())
}

/// The source client drops `$tf` housekeeping directories into the mapped
/// tree; they are not part of any changeset and must never be staged.
fn scrub_source_metadata(workdir: &Path) -> Result<()> {
	let mut doomed: Vec<PathBuf> = Vec::new();
	for entry in WalkDir::new(workdir)
		.into_iter()
		.filter_entry(|e| e.file_name() != ".git")
	{
		let entry = entry.map_err(std::io::Error::from)?;
		if entry.file_type().is_dir() && entry.file_name() == "$tf" {
			doomed.push(entry.into_path());
		}
	}
	for path in doomed {
		if path.exists() {
			fs::remove_dir_all(&path)?;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::history::ChangesetRecord;

	#[derive(Default)]
	struct RecordingSource {
		full: Vec<u64>,
		delta: Vec<u64>,
	}

	impl Source for RecordingSource {
		fn prepare_workspace(&mut self, _workdir: &Path) -> Result<()> {
			Ok(())
		}

		fn release_workspace(&mut self) -> Result<()> {
			Ok(())
		}

		fn history(&mut self) -> Result<Vec<ChangesetRecord>> {
			Ok(Vec::new())
		}

		fn fetch_full(&mut self, _workdir: &Path, id: u64) -> Result<()> {
			self.full.push(id);
			Ok(())
		}

		fn fetch_delta(&mut self, _workdir: &Path, id: u64) -> Result<()> {
			self.delta.push(id);
			Ok(())
		}
	}

	#[test]
	fn first_call_is_full_rest_are_deltas() {
		let dir = tempfile::tempdir().unwrap();
		let mut source = RecordingSource::default();
		let mut materializer = Materializer::new();

		for id in [10, 20, 30] {
			materializer.materialize(&mut source, dir.path(), id).unwrap();
		}

		assert_eq!(source.full, vec![10]);
		assert_eq!(source.delta, vec![20, 30]);
	}

	#[test]
	fn first_materialization_discards_prior_content() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("stale.txt"), "leftover").unwrap();
		fs::create_dir_all(dir.path().join(".git")).unwrap();
		fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/master").unwrap();

		let mut source = RecordingSource::default();
		Materializer::new()
			.materialize(&mut source, dir.path(), 10)
			.unwrap();

		assert!(!dir.path().join("stale.txt").exists());
		assert!(dir.path().join(".git/HEAD").exists());
	}

	#[test]
	fn source_metadata_directories_are_scrubbed() {
		let dir = tempfile::tempdir().unwrap();

		struct MetadataSource;
		impl Source for MetadataSource {
			fn prepare_workspace(&mut self, _workdir: &Path) -> Result<()> {
				Ok(())
			}
			fn release_workspace(&mut self) -> Result<()> {
				Ok(())
			}
			fn history(&mut self) -> Result<Vec<ChangesetRecord>> {
				Ok(Vec::new())
			}
			fn fetch_full(&mut self, workdir: &Path, _id: u64) -> Result<()> {
				fs::create_dir_all(workdir.join("$tf"))?;
				fs::write(workdir.join("$tf/properties.tf1"), "x")?;
				fs::create_dir_all(workdir.join("sub/$tf"))?;
				fs::write(workdir.join("a.txt"), "a")?;
				Ok(())
			}
			fn fetch_delta(&mut self, _workdir: &Path, _id: u64) -> Result<()> {
				Ok(())
			}
		}

		Materializer::new()
			.materialize(&mut MetadataSource, dir.path(), 10)
			.unwrap();

		assert!(!dir.path().join("$tf").exists());
		assert!(!dir.path().join("sub/$tf").exists());
		assert!(dir.path().join("a.txt").exists());
	}
}
