use std::io;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::history::{self, ChangesetRecord};

/// Narrow interface to the source version-control client. The replay engine
/// only ever talks to the source through this trait.
pub trait Source {
	fn prepare_workspace(&mut self, workdir: &Path) -> Result<()>;
	fn release_workspace(&mut self) -> Result<()>;

	/// Full history of the source path, ascending by changeset id.
	fn history(&mut self) -> Result<Vec<ChangesetRecord>>;

	/// Forced recursive checkout of the changeset's complete tree.
	fn fetch_full(&mut self, workdir: &Path, id: u64) -> Result<()>;

	/// Delta from the previously fetched changeset to this one. Only valid
	/// when fetches happen in ascending order with no id skipped.
	fn fetch_delta(&mut self, workdir: &Path, id: u64) -> Result<()>;
}

impl<S: Source + ?Sized> Source for &mut S {
	fn prepare_workspace(&mut self, workdir: &Path) -> Result<()> {
		(**self).prepare_workspace(workdir)
	}

	fn release_workspace(&mut self) -> Result<()> {
		(**self).release_workspace()
	}

	fn history(&mut self) -> Result<Vec<ChangesetRecord>> {
		(**self).history()
	}

	fn fetch_full(&mut self, workdir: &Path, id: u64) -> Result<()> {
		(**self).fetch_full(workdir, id)
	}

	fn fetch_delta(&mut self, workdir: &Path, id: u64) -> Result<()> {
		(**self).fetch_delta(workdir, id)
	}
}

/// Checked once at startup, before any other work touches the source or the
/// target.
pub fn ensure_tool(name: &str) -> Result<()> {
	match Command::new(name)
		.arg("help")
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
	{
		Ok(_) => Ok(()),
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			Err(MigrateError::ToolNotFound(name.to_string()))
		}
		Err(e) => Err(e.into()),
	}
}

/// Source client backed by the `tf` command-line tool.
pub struct TfClient {
	source_path: String,
	workspace: String,
	collection: Option<String>,
}

impl TfClient {
	pub fn new(source_path: &str, workspace: &str, collection: Option<&str>) -> Self {
		Self {
			source_path: source_path.to_string(),
			workspace: workspace.to_string(),
			collection: collection.map(str::to_string),
		}
	}

	fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<Output> {
		let mut cmd = Command::new("tf");
		cmd.args(args);
		if let Some(collection) = &self.collection {
			cmd.arg(format!("/collection:{collection}"));
		}
		if let Some(cwd) = cwd {
			cmd.current_dir(cwd);
		}
		debug!(?args, "running tf");
		cmd.output().map_err(|e| {
			if e.kind() == io::ErrorKind::NotFound {
				MigrateError::ToolNotFound("tf".into())
			} else {
				MigrateError::Io(e)
			}
		})
	}

	fn run_checked(&self, args: &[&str], cwd: Option<&Path>, what: &str) -> Result<Output> {
		let out = self.run(args, cwd)?;
		if !out.status.success() {
			return Err(MigrateError::SourceQueryFailed(format!(
				"{what} failed: {}",
				String::from_utf8_lossy(&out.stderr).trim()
			)));
		}
		Ok(out)
	}
}

impl Source for TfClient {
	fn prepare_workspace(&mut self, workdir: &Path) -> Result<()> {
		let workspace_arg = format!("/workspace:{}", self.workspace);
		self.run_checked(
			&["workspace", "/new", &self.workspace, "/noprompt"],
			None,
			"workspace creation",
		)?;
		self.run_checked(
			&[
				"workfold",
				"/map",
				&self.source_path,
				&workdir.to_string_lossy(),
				&workspace_arg,
			],
			None,
			"workspace mapping",
		)?;
		Ok(())
	}

	fn release_workspace(&mut self) -> Result<()> {
		self.run_checked(
			&["workspace", "/delete", &self.workspace, "/noprompt"],
			None,
			"workspace deletion",
		)?;
		Ok(())
	}

	fn history(&mut self) -> Result<Vec<ChangesetRecord>> {
		let out = self.run(
			&[
				"history",
				&self.source_path,
				"/recursive",
				"/format:detailed",
				"/noprompt",
			],
			None,
		)?;
		if !out.status.success() {
			return Err(MigrateError::SourceQueryFailed(
				String::from_utf8_lossy(&out.stderr).trim().to_string(),
			));
		}
		history::parse_history(&String::from_utf8_lossy(&out.stdout))
	}

	fn fetch_full(&mut self, workdir: &Path, id: u64) -> Result<()> {
		let version = format!("/version:C{id}");
		let out = self.run(
			&[
				"get",
				&self.source_path,
				&version,
				"/recursive",
				"/force",
				"/all",
				"/noprompt",
			],
			Some(workdir),
		)?;
		if !out.status.success() {
			return Err(MigrateError::MaterializeFailed {
				id,
				reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
			});
		}
		Ok(())
	}

	fn fetch_delta(&mut self, workdir: &Path, id: u64) -> Result<()> {
		let version = format!("/version:C{id}");
		let out = self.run(
			&["get", &self.source_path, &version, "/recursive", "/noprompt"],
			Some(workdir),
		)?;
		if !out.status.success() {
			return Err(MigrateError::MaterializeFailed {
				id,
				reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
			});
		}
		Ok(())
	}
}
