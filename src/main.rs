mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tfs2git::{Driver, IdentityMap, Range, ReplayOptions, TfClient, source};

use cli::Args;

fn main() -> Result<()> {
	let args = Args::parse();
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	// Both clients must exist before anything else happens.
	source::ensure_tool("tf")?;
	source::ensure_tool("git")?;

	let range = Range::from_bounds(args.from, args.to)?;
	let identities = IdentityMap::load(args.identity_map.as_deref())?;

	let tf = TfClient::new(&args.source, &args.workspace, args.collection.as_deref());
	let options = ReplayOptions {
		range,
		mark_bounds: args.mark_bounds,
		strip_bindings: args.strip_bindings,
		compact: true,
		bare_clone: args.bare_clone,
	};

	let driver = Driver::new(tf, identities, args.workdir, args.target, options);
	driver.run()?;
	Ok(())
}
