//! Errors for loading grammars from disk.
//!
//! The table itself never fails; these only cover reading and decoding files.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading a grammar file.
#[derive(Debug, Error)]
pub enum LoadError {
	#[error("failed to read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to decode {path}: {source}")]
	Decode {
		path: PathBuf,
		#[source]
		source: tmrules_plist::PlistError,
	},
}

/// Errors from loading a [`crate::LoaderConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config: {0}")]
	Toml(#[from] toml::de::Error),
}

/// Result type for grammar loading.
pub type Result<T> = std::result::Result<T, LoadError>;
