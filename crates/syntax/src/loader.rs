//! Grammar file loading.
//!
//! Reads `.tmLanguage.json` style files into a [`SyntaxTable`]. Batch loading
//! never stops at a bad file; failures are collected in a [`GrammarLoadReport`].

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tmrules_intern::{IStr, Interner};
use tmrules_plist::Plist;

use crate::config::LoaderConfig;
use crate::error::{LoadError, Result};
use crate::table::SyntaxTable;

/// Aggregate result of loading a batch of grammar files.
#[derive(Debug, Default)]
pub struct GrammarLoadReport {
	/// Scope names registered, in load order.
	pub scopes: Vec<IStr>,
	/// Files loaded without a root scope name.
	pub unnamed: Vec<PathBuf>,
	/// Read or decode errors keyed by source path.
	pub errors: Vec<(PathBuf, String)>,
}

impl GrammarLoadReport {
	pub fn is_ok(&self) -> bool {
		self.errors.is_empty()
	}

	fn record(&mut self, path: PathBuf, result: Result<Option<IStr>>) {
		match result {
			Ok(Some(scope)) => self.scopes.push(scope),
			Ok(None) => self.unnamed.push(path),
			Err(error) => {
				tracing::warn!(path = %path.display(), %error, "Failed to load grammar");
				self.errors.push((path, error.to_string()));
			}
		}
	}
}

/// Reads, decodes and registers one grammar file.
pub fn load_grammar_file(table: &SyntaxTable, interner: &Interner, path: &Path) -> Result<Option<IStr>> {
	let file = File::open(path).map_err(|source| LoadError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	let document = Plist::from_reader(BufReader::new(file)).map_err(|source| LoadError::Decode {
		path: path.to_path_buf(),
		source,
	})?;
	Ok(table.add_syntax(&document, interner))
}

/// Loads every matching file in `dir`, in file name order.
pub fn load_grammar_dir(table: &SyntaxTable, interner: &Interner, dir: &Path, config: &LoaderConfig) -> GrammarLoadReport {
	let mut report = GrammarLoadReport::default();
	load_dir_into(&mut report, table, interner, dir, config);
	report
}

/// Loads every configured directory, then compacts the table if configured.
pub fn load_from_config(table: &SyntaxTable, interner: &Interner, config: &LoaderConfig) -> GrammarLoadReport {
	let mut report = GrammarLoadReport::default();
	for dir in &config.grammar_dirs {
		if !dir.is_dir() {
			tracing::debug!(dir = %dir.display(), "Skipping missing grammar directory");
			continue;
		}
		load_dir_into(&mut report, table, interner, dir, config);
	}
	if config.compact_after_load {
		table.compact();
	}
	tracing::debug!(loaded = report.scopes.len(), failed = report.errors.len(), "Finished loading grammars");
	report
}

fn load_dir_into(report: &mut GrammarLoadReport, table: &SyntaxTable, interner: &Interner, dir: &Path, config: &LoaderConfig) {
	let entries = match std::fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(source) => {
			report.record(
				dir.to_path_buf(),
				Err(LoadError::Io {
					path: dir.to_path_buf(),
					source,
				}),
			);
			return;
		}
	};

	let mut paths: Vec<PathBuf> = entries.filter_map(|entry| entry.ok().map(|e| e.path())).collect();
	paths.sort();

	for path in paths {
		if path.is_dir() {
			if config.recursive {
				load_dir_into(report, table, interner, &path, config);
			}
		} else if config.matches(&path) {
			let result = load_grammar_file(table, interner, &path);
			report.record(path, result);
		}
	}
}
