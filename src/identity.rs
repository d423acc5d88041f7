use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::Result;

/// Maps bare source account names to git commit identities
/// (`Display Name <email>`). Loaded once before replay, immutable after.
#[derive(Debug, Default, Clone)]
pub struct IdentityMap {
	entries: HashMap<String, String>,
}

impl IdentityMap {
	/// Missing path or no path at all means an empty map, not an error.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let Some(path) = path else {
			return Ok(Self::default());
		};
		if !path.is_file() {
			return Ok(Self::default());
		}
		let map = Self::parse(&fs::read_to_string(path)?);
		for (account, identity) in &map.entries {
			info!(account, identity, "identity mapping loaded");
		}
		Ok(map)
	}

	/// `account=Display Name <email>`, one per line. `#` starts a comment;
	/// blank and malformed lines are ignored. A duplicate key keeps the
	/// later line's value.
	pub fn parse(text: &str) -> Self {
		let mut entries = HashMap::new();
		for line in text.lines() {
			let line = line.trim();
			if line.is_empty() || line.starts_with('#') {
				continue;
			}
			let Some((key, value)) = line.split_once('=') else {
				continue;
			};
			let (key, value) = (key.trim(), value.trim());
			if key.is_empty() || value.is_empty() {
				continue;
			}
			entries.insert(key.to_string(), value.to_string());
		}
		Self { entries }
	}

	/// Total lookup: an unmapped author resolves to itself.
	pub fn resolve<'a>(&'a self, raw_author: &'a str) -> &'a str {
		self.entries
			.get(raw_author)
			.map(String::as_str)
			.unwrap_or(raw_author)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
