//! Deferred references between rules.
//!
//! An `include` directive is not resolved while a grammar is compiled: the
//! referenced entry may sit further down the same document, in an enclosing
//! repository, or in a grammar that has not been loaded yet. Each directive
//! instead becomes one of the placeholders below, resolved by
//! [`SyntaxNode::resolve`] every time the tokenizer walks past it.
//!
//! All placeholders hold weak links only. Their anchor is the node that
//! contained the `include`, which already owns the placeholder.

use std::fmt;
use std::sync::{Arc, Weak};

use tmrules_intern::IStr;

use crate::node::{RuleNode, SyntaxNode};
use crate::rule_ids::RuleId;
use crate::table::TableInner;

/// `#name`: searches the anchor's repository, then each ancestor's.
#[derive(Clone)]
pub struct RuleIdProxy {
	rule_id: RuleId,
	anchor: Weak<RuleNode>,
}

impl RuleIdProxy {
	pub fn new(rule_id: RuleId, anchor: Weak<RuleNode>) -> Self {
		Self { rule_id, anchor }
	}

	pub fn rule_id(&self) -> RuleId {
		self.rule_id
	}

	pub fn anchor(&self) -> Option<Arc<RuleNode>> {
		self.anchor.upgrade()
	}

	/// The nearest enclosing repository entry for the id, or the empty node.
	pub fn target(&self) -> SyntaxNode {
		let mut current = self.anchor.upgrade();
		while let Some(node) = current {
			if let Some(found) = node.find_in_repository(self.rule_id) {
				return found.clone();
			}
			current = node.parent();
		}
		SyntaxNode::Rule(RuleNode::empty())
	}
}

impl fmt::Debug for RuleIdProxy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RuleIdProxy").field("rule_id", &self.rule_id).finish_non_exhaustive()
	}
}

/// `$self` / `$base`: the outermost ancestor of the anchor.
#[derive(Clone)]
pub struct SelfProxy {
	anchor: Weak<RuleNode>,
}

impl SelfProxy {
	pub fn new(anchor: Weak<RuleNode>) -> Self {
		Self { anchor }
	}

	pub fn anchor(&self) -> Option<Arc<RuleNode>> {
		self.anchor.upgrade()
	}

	pub fn target(&self) -> SyntaxNode {
		let root = self.anchor.upgrade().map_or_else(RuleNode::empty, |anchor| anchor.root());
		SyntaxNode::Rule(root)
	}
}

impl fmt::Debug for SelfProxy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SelfProxy").finish_non_exhaustive()
	}
}

/// `scope` or `scope#name`: a root, or one of its repository entries, from
/// another grammar.
///
/// Keeps a weak handle to the table; once the table is dropped the reference
/// resolves to the empty node.
#[derive(Clone)]
pub struct ScopeProxy {
	scope: IStr,
	rule_id: Option<RuleId>,
	table: Weak<TableInner>,
	anchor: Weak<RuleNode>,
}

impl ScopeProxy {
	pub(crate) fn new(scope: IStr, rule_id: Option<RuleId>, table: Weak<TableInner>, anchor: Weak<RuleNode>) -> Self {
		Self {
			scope,
			rule_id,
			table,
			anchor,
		}
	}

	pub fn scope(&self) -> &IStr {
		&self.scope
	}

	pub fn rule_id(&self) -> Option<RuleId> {
		self.rule_id
	}

	pub fn anchor(&self) -> Option<Arc<RuleNode>> {
		self.anchor.upgrade()
	}

	/// Re-queries the table; a foreign rule id is looked up directly in the
	/// foreign root's repository, without climbing.
	pub fn target(&self) -> SyntaxNode {
		let Some(table) = self.table.upgrade() else {
			return SyntaxNode::Rule(RuleNode::empty());
		};
		let root = table.get_syntax(&self.scope);
		match self.rule_id {
			None => SyntaxNode::Rule(root),
			Some(id) => root
				.find_in_repository(id)
				.cloned()
				.unwrap_or_else(|| SyntaxNode::Rule(RuleNode::empty())),
		}
	}
}

impl fmt::Debug for ScopeProxy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScopeProxy")
			.field("scope", &self.scope)
			.field("rule_id", &self.rule_id)
			.finish_non_exhaustive()
	}
}
