use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a TFS changeset history into a fresh git repository")]
pub struct Args {
	/// Source server path to migrate (e.g. $/Project/Main)
	pub source: String,

	/// Directory the new git repository is created in
	#[arg(short, long, default_value = "migrated")]
	pub target: PathBuf,

	/// Scratch working directory each changeset is materialized into
	#[arg(long, default_value = "tfs2git-work")]
	pub workdir: PathBuf,

	/// Name of the transient source workspace
	#[arg(long, default_value = "tfs2git")]
	pub workspace: String,

	/// Project collection URL passed to every tf invocation
	#[arg(long)]
	pub collection: Option<String>,

	/// First changeset to replay (requires --to)
	#[arg(long)]
	pub from: Option<u64>,

	/// Last changeset to replay (requires --from)
	#[arg(long)]
	pub to: Option<u64>,

	/// Identity mapping file, one `account=Display Name <email>` per line
	#[arg(long)]
	pub identity_map: Option<PathBuf>,

	/// Tag the first and last replayed commits with import markers
	#[arg(long)]
	pub mark_bounds: bool,

	/// Strip TFS source-control bindings from solution and project files
	#[arg(long)]
	pub strip_bindings: bool,

	/// Export a bare clone of the finished repository to this path
	#[arg(long)]
	pub bare_clone: Option<PathBuf>,
}
