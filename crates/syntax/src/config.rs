//! Loader configuration.
//!
//! ```toml
//! grammar_dirs = ["~/.config/tmrules/grammars", "/usr/share/tmrules/grammars"]
//! extensions = ["json"]
//! recursive = true
//! compact_after_load = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Where and how grammar files are discovered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
	/// Directories scanned in order.
	pub grammar_dirs: Vec<PathBuf>,
	/// File name suffixes (without the dot) accepted as grammars.
	pub extensions: Vec<String>,
	/// Descend into subdirectories.
	pub recursive: bool,
	/// Drop the rule id table once a batch finishes.
	pub compact_after_load: bool,
}

impl Default for LoaderConfig {
	fn default() -> Self {
		Self {
			grammar_dirs: Vec::new(),
			extensions: vec!["json".to_owned()],
			recursive: false,
			compact_after_load: true,
		}
	}
}

impl LoaderConfig {
	/// Parses a TOML config string. Missing fields take their defaults.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(input)?)
	}

	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&content)
	}

	/// Returns `true` if `path` has one of the configured suffixes.
	pub fn matches(&self, path: &Path) -> bool {
		let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
			return false;
		};
		self.extensions.iter().any(|ext| {
			let Some(stem_len) = name.len().checked_sub(ext.len() + 1) else {
				return false;
			};
			stem_len > 0
				&& name
					.get(stem_len..)
					.is_some_and(|tail| tail.starts_with('.') && tail[1..].eq_ignore_ascii_case(ext))
		})
	}
}
