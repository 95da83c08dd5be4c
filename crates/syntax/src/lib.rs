//! TextMate-style grammar rule table.
//!
//! Compiles grammar documents (one per language scope) into rule trees and
//! resolves the references between them, so a tokenizer can walk from a scope
//! name to the rules that classify text.
//!
//! # Architecture
//!
//! * [`table`]: scope-name registry; `add_syntax` / `get_syntax` / `clear` / `compact`.
//! * [`node`]: frozen rule nodes, captures, injections, and the uniform [`SyntaxNode`] view.
//! * [`proxy`]: deferred `#name`, `$self`/`$base` and cross-grammar references.
//! * [`rule_ids`]: repository entry name → id interning.
//! * [`keys`]: the recognized document vocabulary.
//! * [`loader`] / [`config`]: reading grammar files from disk.
//!
//! Regex execution, tokenization and theming live elsewhere.

mod compile;
pub mod config;
pub mod error;
pub mod keys;
pub mod loader;
pub mod node;
pub mod proxy;
pub mod rule_ids;
pub mod table;

pub use compile::MAX_CAPTURE_INDEX;
pub use config::LoaderConfig;
pub use error::{ConfigError, LoadError};
pub use keys::{CaptureKey, StringKey};
pub use loader::{GrammarLoadReport, load_from_config, load_grammar_dir, load_grammar_file};
pub use node::{Capture, Captures, Injection, MAX_PROXY_HOPS, RuleNode, SyntaxNode};
pub use proxy::{RuleIdProxy, ScopeProxy, SelfProxy};
pub use rule_ids::{RuleId, RuleIdInterner};
pub use table::SyntaxTable;
pub use tmrules_intern::{IStr, Interner};
pub use tmrules_plist::{Plist, PlistError, PlistValue};
