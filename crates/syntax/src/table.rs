//! Scope-name → grammar root registry.
//!
//! # Purpose
//!
//! Own every compiled grammar and answer "which rules apply to scope X" for
//! loaders and tokenizers running on arbitrary threads.
//!
//! # Mental model
//!
//! * [`SyntaxTable`] is a cheap handle; clones share one registry.
//! * Loading compiles a document into a frozen [`RuleNode`] tree and publishes
//!   every node carrying a scope name, in document pre-order. A nested node
//!   repeating an outer scope name therefore wins.
//! * Each published entry holds its document root, so a sub-scope keeps its
//!   ancestors (and their repositories) alive even if the root itself has no
//!   scope name or was replaced by a later load.
//! * Lookups never fail. A miss answers [`RuleNode::empty`], which a tokenizer
//!   treats as "no rules apply".
//!
//! # Concurrency & ordering
//!
//! * `rules_by_scope` sits behind an `RwLock`; lookups and loads may
//!   interleave freely. A document's scopes are published under one write
//!   lock. A racing double registration of one scope keeps the last writer.
//! * Rule id allocation is serialized by [`RuleIdInterner`].
//! * References resolve against whatever the table holds at that moment, so a
//!   grammar loaded after its dependents still becomes reachable from them.
//!
//! # Lifecycle
//!
//! * [`SyntaxTable::clear`] forgets every grammar. Readers in flight keep the
//!   nodes they already hold; their next lookup may miss.
//! * [`SyntaxTable::compact`] discards the rule id table once loading is done.
//!   Ids are never reused (see [`crate::rule_ids`]), so references compiled
//!   before a compaction can miss entries compiled after it, but never hit the
//!   wrong one.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tmrules_intern::{IStr, Interner};
use tmrules_plist::Plist;

use crate::compile::{CompiledGrammar, Compiler};
use crate::node::RuleNode;
use crate::rule_ids::{RuleId, RuleIdInterner};

struct ScopeEntry {
	node: Arc<RuleNode>,
	/// Keeps the parent chain of `node` alive.
	_root: Arc<RuleNode>,
}

#[derive(Default)]
pub(crate) struct TableInner {
	rules_by_scope: RwLock<FxHashMap<IStr, ScopeEntry>>,
	rule_ids: RuleIdInterner,
}

impl TableInner {
	pub(crate) fn get_syntax(&self, scope_name: &str) -> Arc<RuleNode> {
		match self.rules_by_scope.read().get(scope_name) {
			Some(entry) => entry.node.clone(),
			None => {
				tracing::debug!(scope = scope_name, "No syntax node registered for scope");
				RuleNode::empty()
			}
		}
	}

	fn publish(&self, grammar: CompiledGrammar) {
		let mut rules = self.rules_by_scope.write();
		for (scope_name, node) in grammar.scopes {
			let entry = ScopeEntry {
				node,
				_root: grammar.root.clone(),
			};
			if rules.insert(scope_name.clone(), entry).is_some() {
				tracing::debug!(scope = %scope_name, "Replaced syntax node for scope");
			} else {
				tracing::trace!(scope = %scope_name, "Registered syntax node");
			}
		}
	}

	pub(crate) fn rule_id(&self, name: &str) -> RuleId {
		self.rule_ids.id_for(name)
	}
}

/// Table of grammar rules keyed by scope name.
#[derive(Clone, Default)]
pub struct SyntaxTable {
	inner: Arc<TableInner>,
}

impl SyntaxTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Compiles `document` and registers its root under its scope name.
	///
	/// Returns the root scope name, or `None` if the document declares none
	/// (the rules are still compiled, and any named sub-scopes registered).
	pub fn add_syntax(&self, document: &Plist, interner: &Interner) -> Option<IStr> {
		let grammar = Compiler::new(self, interner).compile_root(document);
		let scope = grammar.root.scope_name().cloned();
		let (children, published) = (grammar.root.children().len(), grammar.scopes.len());
		self.inner.publish(grammar);
		match &scope {
			Some(scope) => tracing::debug!(%scope, children, published, "Loaded grammar"),
			None => tracing::debug!(published, "Loaded grammar without a scope name"),
		}
		scope
	}

	/// Returns the root registered for `scope_name`, or the shared empty node.
	pub fn get_syntax(&self, scope_name: &str) -> Arc<RuleNode> {
		self.inner.get_syntax(scope_name)
	}

	pub fn contains_scope(&self, scope_name: &str) -> bool {
		self.inner.rules_by_scope.read().contains_key(scope_name)
	}

	/// Registered scope names in sorted order.
	pub fn scope_names(&self) -> Vec<IStr> {
		let mut names: Vec<IStr> = self.inner.rules_by_scope.read().keys().cloned().collect();
		names.sort();
		names
	}

	pub fn len(&self) -> usize {
		self.inner.rules_by_scope.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.rules_by_scope.read().is_empty()
	}

	/// Id for a repository entry name in the current loading session.
	pub fn rule_id(&self, name: &str) -> RuleId {
		self.inner.rule_id(name)
	}

	/// Forgets every registered grammar.
	pub fn clear(&self) {
		let mut rules = self.inner.rules_by_scope.write();
		let removed = rules.len();
		rules.clear();
		tracing::debug!(removed, "Cleared syntax table");
	}

	/// Drops the rule id table to reclaim memory after loading.
	pub fn compact(&self) {
		self.inner.rule_ids.compact();
	}

	pub(crate) fn inner(&self) -> &TableInner {
		&self.inner
	}

	pub(crate) fn downgrade(&self) -> Weak<TableInner> {
		Arc::downgrade(&self.inner)
	}
}

impl fmt::Debug for SyntaxTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SyntaxTable")
			.field("scopes", &self.scope_names())
			.field("rule_ids", &self.inner.rule_ids)
			.finish()
	}
}
