use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;

const SOLUTION_SECTION: &str = "GlobalSection(TeamFoundationVersionControl)";
const PROJECT_EXTENSIONS: &[&str] = &["csproj", "vbproj", "vcxproj", "fsproj", "proj"];

/// Removes source-control binding metadata from solution and project files in
/// the working tree, so the migrated history does not carry dead references
/// to the old server.
pub fn strip_tree(workdir: &Path) -> Result<()> {
	for entry in WalkDir::new(workdir)
		.into_iter()
		.filter_entry(|e| e.file_name() != ".git")
	{
		let entry = entry.map_err(std::io::Error::from)?;
		if !entry.file_type().is_file() {
			continue;
		}
		let path = entry.path();
		let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
			continue;
		};

		let stripped = if ext.eq_ignore_ascii_case("sln") {
			strip_solution(&fs::read_to_string(path)?)
		} else if PROJECT_EXTENSIONS.iter().any(|p| ext.eq_ignore_ascii_case(p)) {
			strip_project(&fs::read_to_string(path)?)
		} else {
			None
		};

		if let Some(text) = stripped {
			debug!(path = %path.display(), "stripped source-control bindings");
			fs::write(path, text)?;
		}
	}
	Ok(())
}

/// Drops the version-control GlobalSection block. Returns `None` when the
/// file had no bindings.
fn strip_solution(text: &str) -> Option<String> {
	let mut out = String::with_capacity(text.len());
	let mut in_section = false;
	let mut changed = false;

	for line in text.lines() {
		if in_section {
			if line.trim_start().starts_with("EndGlobalSection") {
				in_section = false;
			}
			continue;
		}
		if line.trim_start().starts_with(SOLUTION_SECTION) {
			in_section = true;
			changed = true;
			continue;
		}
		out.push_str(line);
		out.push('\n');
	}

	changed.then_some(out)
}

/// Drops `<Scc*>` elements from an MSBuild project file.
fn strip_project(text: &str) -> Option<String> {
	let mut out = String::with_capacity(text.len());
	let mut changed = false;

	for line in text.lines() {
		if line.trim_start().starts_with("<Scc") {
			changed = true;
			continue;
		}
		out.push_str(line);
		out.push('\n');
	}

	changed.then_some(out)
}
