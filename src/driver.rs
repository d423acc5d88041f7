use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{Oid, Repository};
use tracing::{info, warn};

use crate::bindings;
use crate::commit;
use crate::error::Result;
use crate::history::ChangesetRecord;
use crate::identity::IdentityMap;
use crate::materialize::Materializer;
use crate::range::Range;
use crate::source::Source;

pub const START_TAG: &str = "import-start";
pub const END_TAG: &str = "import-end";

/// Run phases, strictly sequential. A failure in any phase aborts the run;
/// there is no resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
	Idle,
	WorkspacePrepared,
	HistoryLoaded,
	RangeApplied,
	Replaying,
	Finalizing,
	Done,
}

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
	pub range: Option<Range>,
	/// Tag the first and last replayed commits.
	pub mark_bounds: bool,
	/// Scrub source-control bindings from solution/project files per changeset.
	pub strip_bindings: bool,
	/// Repack the finished repository with `git gc`.
	pub compact: bool,
	pub bare_clone: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ReplaySummary {
	/// (changeset id, commit) pairs in replay order.
	pub commits: Vec<(u64, Oid)>,
	/// Changesets skipped because they produced no tree change.
	pub skipped: Vec<u64>,
}

/// Orchestrates one full migration run. Owns the working tree and the target
/// repository exclusively for the run's duration.
pub struct Driver<S: Source> {
	source: S,
	identities: IdentityMap,
	workdir: PathBuf,
	target: PathBuf,
	options: ReplayOptions,
	phase: Phase,
}

impl<S: Source> Driver<S> {
	pub fn new(
		source: S,
		identities: IdentityMap,
		workdir: impl Into<PathBuf>,
		target: impl Into<PathBuf>,
		options: ReplayOptions,
	) -> Self {
		Self {
			source,
			identities,
			workdir: workdir.into(),
			target: target.into(),
			options,
			phase: Phase::Idle,
		}
	}

	/// Single pass over the selected history. Not idempotent: the working
	/// tree and target repository are re-created from scratch every run.
	pub fn run(mut self) -> Result<ReplaySummary> {
		let repo = self.prepare()?;
		let history = self.load_history()?;
		let history = self.apply_range(history)?;
		let summary = self.replay(&repo, &history)?;
		self.finalize(&repo, &summary)?;
		self.phase = Phase::Done;
		info!(
			commits = summary.commits.len(),
			skipped = summary.skipped.len(),
			"migration finished"
		);
		Ok(summary)
	}

	fn prepare(&mut self) -> Result<Repository> {
		debug_assert_eq!(self.phase, Phase::Idle);

		// Fresh working tree and empty target, whatever was there before.
		if self.workdir.exists() {
			fs::remove_dir_all(&self.workdir)?;
		}
		fs::create_dir_all(&self.workdir)?;
		if self.target.exists() {
			fs::remove_dir_all(&self.target)?;
		}

		let repo = Repository::init(&self.target)?;
		// Commits snapshot the working tree, not the target directory.
		repo.set_workdir(&self.workdir, false)?;

		self.source.prepare_workspace(&self.workdir)?;
		self.phase = Phase::WorkspacePrepared;
		info!(workdir = %self.workdir.display(), target = %self.target.display(), "workspace prepared");
		Ok(repo)
	}

	fn load_history(&mut self) -> Result<Vec<ChangesetRecord>> {
		debug_assert_eq!(self.phase, Phase::WorkspacePrepared);
		let history = self.source.history()?;
		self.phase = Phase::HistoryLoaded;
		info!(changesets = history.len(), "history loaded");
		Ok(history)
	}

	fn apply_range(&mut self, history: Vec<ChangesetRecord>) -> Result<Vec<ChangesetRecord>> {
		let history = match self.options.range {
			Some(range) => {
				let kept = range.apply(history)?;
				info!(start = range.start, end = range.end, kept = kept.len(), "range applied");
				kept
			}
			None => history,
		};
		self.phase = Phase::RangeApplied;
		Ok(history)
	}

	fn replay(&mut self, repo: &Repository, history: &[ChangesetRecord]) -> Result<ReplaySummary> {
		self.phase = Phase::Replaying;
		let mut materializer = Materializer::new();
		let mut summary = ReplaySummary::default();

		for record in history {
			materializer.materialize(&mut self.source, &self.workdir, record.id)?;
			if self.options.strip_bindings {
				bindings::strip_tree(&self.workdir)?;
			}

			let identity = self.identities.resolve(&record.author);
			match commit::write(repo, record, identity)? {
				Some(oid) => {
					info!(changeset = record.id, commit = %oid, author = identity, "replayed");
					if summary.commits.is_empty() && self.options.mark_bounds {
						commit::tag(repo, START_TAG, oid)?;
					}
					summary.commits.push((record.id, oid));
				}
				None => summary.skipped.push(record.id),
			}
		}

		Ok(summary)
	}

	fn finalize(&mut self, repo: &Repository, summary: &ReplaySummary) -> Result<()> {
		self.phase = Phase::Finalizing;

		if self.options.mark_bounds {
			if let Some(&(_, oid)) = summary.commits.last() {
				commit::tag(repo, END_TAG, oid)?;
			}
		}

		if self.options.compact {
			compact(&self.target)?;
		}

		if let Some(bare) = self.options.bare_clone.clone() {
			self.export_bare(&bare)?;
		}

		self.source.release_workspace()?;

		// The working tree is transient; only the repository survives the run.
		if self.workdir.exists() {
			fs::remove_dir_all(&self.workdir)?;
		}
		Ok(())
	}

	fn export_bare(&self, dst: &Path) -> Result<()> {
		if dst.exists() {
			fs::remove_dir_all(dst)?;
		}
		git2::build::RepoBuilder::new()
			.bare(true)
			.clone(&self.target.to_string_lossy(), dst)?;
		info!(path = %dst.display(), "bare clone exported");
		Ok(())
	}
}

/// Repacks the finished repository. libgit2 has no gc, so this shells out to
/// the git binary probed at startup.
fn compact(target: &Path) -> Result<()> {
	let out = Command::new("git")
		.arg("-C")
		.arg(target)
		.args(["gc", "--quiet"])
		.output()?;
	if !out.status.success() {
		warn!(
			stderr = %String::from_utf8_lossy(&out.stderr).trim(),
			"git gc failed, repository left unpacked"
		);
	}
	Ok(())
}
