//! Document → rule tree compilation.
//!
//! Compilation is best-effort: values of the wrong kind are skipped, capture
//! keys that are not group numbers are dropped, and every `include` becomes a
//! deferred reference. A document therefore always compiles to a consistent tree.
//!
//! Nodes carrying a scope name are collected in document pre-order (a node
//! before its descendants) and published by the table once the whole tree is
//! built, so a nested node repeating an outer scope name replaces it.

use std::cell::RefCell;
use std::sync::{Arc, Weak};

use tmrules_intern::{IStr, Interner};
use tmrules_plist::{Plist, PlistValue};

use crate::keys::{self, CaptureKey, INCLUDE_KEY, INJECTIONS_KEY, NAME_KEY, PATTERNS_KEY, REPOSITORY_KEY, StringKey};
use crate::node::{Capture, Captures, Injection, RuleNode, RuleNodeBuilder, SyntaxNode};
use crate::proxy::{RuleIdProxy, ScopeProxy, SelfProxy};
use crate::table::SyntaxTable;

/// Highest capture group index accepted from a document.
pub const MAX_CAPTURE_INDEX: usize = u16::MAX as usize;

/// A compiled document, ready to be published.
pub(crate) struct CompiledGrammar {
	pub(crate) root: Arc<RuleNode>,
	/// Scoped nodes in document pre-order.
	pub(crate) scopes: Vec<(IStr, Arc<RuleNode>)>,
}

pub(crate) struct Compiler<'a> {
	table: &'a SyntaxTable,
	interner: &'a Interner,
	/// Pre-order slots; a slot is reserved on entry and filled once its node is built.
	scoped: RefCell<Vec<(IStr, Option<Arc<RuleNode>>)>>,
}

impl<'a> Compiler<'a> {
	pub(crate) fn new(table: &'a SyntaxTable, interner: &'a Interner) -> Self {
		Self {
			table,
			interner,
			scoped: RefCell::new(Vec::new()),
		}
	}

	pub(crate) fn compile_root(self, document: &Plist) -> CompiledGrammar {
		let root = self.compile_rule(document, Weak::new());
		let scopes = self
			.scoped
			.into_inner()
			.into_iter()
			.filter_map(|(scope, node)| Some((scope, node?)))
			.collect();
		CompiledGrammar { root, scopes }
	}

	/// Builds a reference for `include` documents and a real node otherwise.
	fn compile_nested(&self, document: &Plist, parent: &Weak<RuleNode>) -> SyntaxNode {
		if document.contains(INCLUDE_KEY) {
			self.compile_reference(document, parent)
		} else {
			SyntaxNode::Rule(self.compile_rule(document, parent.clone()))
		}
	}

	fn compile_rule(&self, document: &Plist, parent: Weak<RuleNode>) -> Arc<RuleNode> {
		let scope_name = document.get_str(StringKey::ScopeName.as_ref()).map(|s| self.interner.intern(s));
		let slot = scope_name.as_ref().map(|scope| {
			let mut scoped = self.scoped.borrow_mut();
			scoped.push((scope.clone(), None));
			scoped.len() - 1
		});

		let node = Arc::new_cyclic(|this: &Weak<RuleNode>| {
			let mut builder = RuleNodeBuilder::new(scope_name.clone(), parent);
			for (key, value) in document.entries() {
				if let Ok(string_key) = key.parse::<StringKey>() {
					if let Some(s) = value.as_str() {
						builder.set_attribute(string_key, self.interner.intern(s));
					}
					continue;
				}
				if let Ok(capture_key) = key.parse::<CaptureKey>() {
					if let Some(captures) = value.as_dict() {
						builder.set_captures(capture_key, self.compile_captures(captures, this));
					}
					continue;
				}
				if key.eq_ignore_ascii_case(REPOSITORY_KEY) {
					self.compile_repository(&mut builder, value, this);
				} else if key.eq_ignore_ascii_case(PATTERNS_KEY) {
					self.compile_patterns(&mut builder, value, this);
				} else if key.eq_ignore_ascii_case(INJECTIONS_KEY) {
					self.compile_injections(&mut builder, value, this);
				}
			}
			builder.compact()
		});

		if let Some(slot) = slot {
			self.scoped.borrow_mut()[slot].1 = Some(node.clone());
		}
		node
	}

	fn compile_captures(&self, captures: &Plist, parent: &Weak<RuleNode>) -> Option<Captures> {
		let mut groups: Vec<(usize, Capture)> = Vec::with_capacity(captures.len());
		for (key, value) in captures.entries() {
			let index = match key.parse::<usize>() {
				Ok(index) if index <= MAX_CAPTURE_INDEX => index,
				_ => {
					tracing::trace!(key, "Skipping capture entry without a usable group index");
					continue;
				}
			};
			let Some(entry) = value.as_dict() else {
				continue;
			};
			let capture = match entry.get_str(NAME_KEY) {
				Some(name) => Capture::Name(self.interner.intern(name)),
				None => Capture::Rule(self.compile_rule(entry, parent.clone())),
			};
			groups.push((index, capture));
		}

		let len = groups.iter().map(|(index, _)| index + 1).max()?;
		let mut table: Vec<Option<Capture>> = std::iter::repeat_with(|| None).take(len).collect();
		for (index, capture) in groups {
			table[index] = Some(capture);
		}
		Some(table.into_boxed_slice())
	}

	fn compile_patterns(&self, builder: &mut RuleNodeBuilder, value: &PlistValue, parent: &Weak<RuleNode>) {
		for pattern in value.as_array().unwrap_or_default() {
			if let Some(pattern) = pattern.as_dict() {
				builder.add_child(self.compile_nested(pattern, parent));
			}
		}
	}

	fn compile_repository(&self, builder: &mut RuleNodeBuilder, value: &PlistValue, parent: &Weak<RuleNode>) {
		let Some(repository) = value.as_dict() else {
			return;
		};
		for (name, entry) in repository.entries() {
			if let Some(entry) = entry.as_dict() {
				builder.append_repository(self.table.inner().rule_id(name), self.compile_nested(entry, parent));
			}
		}
	}

	fn compile_injections(&self, builder: &mut RuleNodeBuilder, value: &PlistValue, parent: &Weak<RuleNode>) {
		let Some(injections) = value.as_dict() else {
			return;
		};
		for (selector, entry) in injections.entries() {
			if let Some(entry) = entry.as_dict() {
				builder.add_injection(Injection {
					selector: self.interner.intern(selector),
					node: self.compile_rule(entry, parent.clone()),
				});
			}
		}
	}

	/// `#name` → repository reference, `$self`/`$base` → root reference,
	/// anything else → `scope[#name]` in another grammar.
	fn compile_reference(&self, document: &Plist, parent: &Weak<RuleNode>) -> SyntaxNode {
		let include = document.get_str(INCLUDE_KEY).unwrap_or_default();
		if let Some(name) = include.strip_prefix('#') {
			return SyntaxNode::RuleRef(RuleIdProxy::new(self.table.inner().rule_id(name), parent.clone()));
		}
		if keys::is_self_reference(include) {
			return SyntaxNode::SelfRef(SelfProxy::new(parent.clone()));
		}

		let (scope, rule) = include.split_once('#').unwrap_or((include, ""));
		let rule_id = (!rule.is_empty()).then(|| self.table.inner().rule_id(rule));
		let scope: IStr = self.interner.intern(scope);
		SyntaxNode::ScopeRef(ScopeProxy::new(scope, rule_id, self.table.downgrade(), parent.clone()))
	}
}
