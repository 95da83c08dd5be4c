//! Compiled rule nodes.
//!
//! A grammar compiles into a tree of [`RuleNode`]s owned top-down: a node owns
//! its children, repository entries, capture rules and injections. Each node
//! also keeps a weak link to its parent, used only to resolve `$self` and
//! `#name` references, so ownership stays acyclic.
//!
//! Children and repository entries are [`SyntaxNode`]s: either a real node or
//! one of the reference variants from [`crate::proxy`]. Traversal code calls
//! [`SyntaxNode::resolve`] and then reads the real node, whatever the variant.
//!
//! # Invariants
//!
//! * A node is frozen once built; [`RuleNodeBuilder::compact`] is the only way
//!   to obtain one, and nothing mutates it afterwards.
//! * Child order is match priority order and is preserved from the document.
//! * Reference variants never own structural content.

use std::sync::{Arc, LazyLock, Weak};

use rustc_hash::FxHashMap;
use tmrules_intern::IStr;

use crate::keys::{CaptureKey, StringKey};
use crate::proxy::{RuleIdProxy, ScopeProxy, SelfProxy};
use crate::rule_ids::RuleId;

/// Proxy chains longer than this are treated as cycles.
pub const MAX_PROXY_HOPS: usize = 64;

static EMPTY_NODE: LazyLock<Arc<RuleNode>> = LazyLock::new(|| RuleNodeBuilder::new(None, Weak::new()).compact().into());

/// Metadata for one match group.
#[derive(Debug, Clone)]
pub enum Capture {
	/// Scope label applied to the captured text.
	Name(IStr),
	/// Rule applied recursively inside the captured text.
	Rule(Arc<RuleNode>),
}

/// Dense capture table indexed by group number; absent groups are `None`.
pub type Captures = Box<[Option<Capture>]>;

/// A rule tried independently of normal nesting, selected by `selector`.
#[derive(Debug, Clone)]
pub struct Injection {
	pub selector: IStr,
	pub node: Arc<RuleNode>,
}

/// A compiled grammar rule.
#[derive(Debug)]
pub struct RuleNode {
	scope_name: Option<IStr>,
	parent: Weak<RuleNode>,
	attributes: Box<[(StringKey, IStr)]>,
	captures: Box<[(CaptureKey, Captures)]>,
	children: Box<[SyntaxNode]>,
	repository: FxHashMap<RuleId, SyntaxNode>,
	injections: Box<[Injection]>,
}

impl RuleNode {
	/// The shared, childless node answered whenever a lookup misses.
	pub fn empty() -> Arc<RuleNode> {
		EMPTY_NODE.clone()
	}

	/// Returns `true` if `node` is the shared empty node.
	pub fn is_empty_node(node: &Arc<RuleNode>) -> bool {
		Arc::ptr_eq(node, &EMPTY_NODE)
	}

	/// Scope name, present on grammar roots and named sub-scopes.
	pub fn scope_name(&self) -> Option<&IStr> {
		self.scope_name.as_ref()
	}

	/// The enclosing node, or `None` for a grammar root.
	pub fn parent(&self) -> Option<Arc<RuleNode>> {
		self.parent.upgrade()
	}

	pub fn string_attribute(&self, key: StringKey) -> Option<&IStr> {
		self.attributes.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
	}

	pub fn attributes(&self) -> impl Iterator<Item = (StringKey, &IStr)> {
		self.attributes.iter().map(|(k, v)| (*k, v))
	}

	/// Capture table for `key`, or `None` if the document had no usable entries.
	pub fn captures(&self, key: CaptureKey) -> Option<&[Option<Capture>]> {
		self.captures.iter().find(|(k, _)| *k == key).map(|(_, v)| &**v)
	}

	/// Nested rules in match priority order.
	pub fn children(&self) -> &[SyntaxNode] {
		&self.children
	}

	/// Direct repository lookup; does not consult ancestors.
	pub fn find_in_repository(&self, id: RuleId) -> Option<&SyntaxNode> {
		self.repository.get(&id)
	}

	pub fn repository(&self) -> impl Iterator<Item = (RuleId, &SyntaxNode)> {
		self.repository.iter().map(|(id, node)| (*id, node))
	}

	pub fn injections(&self) -> &[Injection] {
		&self.injections
	}

	/// Climbs parent links to the outermost ancestor.
	pub fn root(self: &Arc<Self>) -> Arc<RuleNode> {
		let mut current = self.clone();
		while let Some(parent) = current.parent() {
			current = parent;
		}
		current
	}
}

/// Mutable form of a [`RuleNode`] used while a document is compiled.
#[derive(Debug)]
pub struct RuleNodeBuilder {
	scope_name: Option<IStr>,
	parent: Weak<RuleNode>,
	attributes: Vec<(StringKey, IStr)>,
	captures: Vec<(CaptureKey, Captures)>,
	children: Vec<SyntaxNode>,
	repository: FxHashMap<RuleId, SyntaxNode>,
	injections: Vec<Injection>,
}

impl RuleNodeBuilder {
	pub fn new(scope_name: Option<IStr>, parent: Weak<RuleNode>) -> Self {
		Self {
			scope_name,
			parent,
			attributes: Vec::new(),
			captures: Vec::new(),
			children: Vec::new(),
			repository: FxHashMap::default(),
			injections: Vec::new(),
		}
	}

	/// Sets `key`, replacing an earlier value.
	pub fn set_attribute(&mut self, key: StringKey, value: IStr) {
		match self.attributes.iter_mut().find(|(k, _)| *k == key) {
			Some(slot) => slot.1 = value,
			None => self.attributes.push((key, value)),
		}
	}

	/// Sets or clears the capture table for `key`.
	pub fn set_captures(&mut self, key: CaptureKey, captures: Option<Captures>) {
		self.captures.retain(|(k, _)| *k != key);
		if let Some(captures) = captures {
			self.captures.push((key, captures));
		}
	}

	pub fn add_child(&mut self, child: SyntaxNode) {
		self.children.push(child);
	}

	/// Stores a repository entry; a later entry with the same id wins.
	pub fn append_repository(&mut self, id: RuleId, node: SyntaxNode) {
		self.repository.insert(id, node);
	}

	pub fn add_injection(&mut self, injection: Injection) {
		self.injections.push(injection);
	}

	/// Freezes the builder into an immutable node.
	pub fn compact(self) -> RuleNode {
		let mut repository = self.repository;
		repository.shrink_to_fit();
		RuleNode {
			scope_name: self.scope_name,
			parent: self.parent,
			attributes: self.attributes.into_boxed_slice(),
			captures: self.captures.into_boxed_slice(),
			children: self.children.into_boxed_slice(),
			repository,
			injections: self.injections.into_boxed_slice(),
		}
	}
}

/// A child or repository entry: a real rule or a deferred reference.
#[derive(Debug, Clone)]
pub enum SyntaxNode {
	Rule(Arc<RuleNode>),
	/// `#name`: nearest enclosing repository entry.
	RuleRef(RuleIdProxy),
	/// `$self` / `$base`: the enclosing grammar root.
	SelfRef(SelfProxy),
	/// `scope` or `scope#name`: another grammar, looked up through the table.
	ScopeRef(ScopeProxy),
}

impl SyntaxNode {
	pub fn is_proxy(&self) -> bool {
		!matches!(self, SyntaxNode::Rule(_))
	}

	/// Follows references until a real node is reached.
	///
	/// Resolution reads the current table state on every call and is never
	/// cached, so grammars loaded later become visible to existing references.
	/// Unresolvable references and reference cycles yield [`RuleNode::empty`].
	pub fn resolve(&self) -> Arc<RuleNode> {
		let mut node = self.clone();
		for _ in 0..MAX_PROXY_HOPS {
			node = match node {
				SyntaxNode::Rule(rule) => return rule,
				SyntaxNode::RuleRef(proxy) => proxy.target(),
				SyntaxNode::SelfRef(proxy) => proxy.target(),
				SyntaxNode::ScopeRef(proxy) => proxy.target(),
			};
		}
		match node {
			SyntaxNode::Rule(rule) => rule,
			unresolved => {
				tracing::warn!(node = ?unresolved, hops = MAX_PROXY_HOPS, "Reference chain did not reach a rule");
				RuleNode::empty()
			}
		}
	}

	pub fn scope_name(&self) -> Option<IStr> {
		self.resolve().scope_name().cloned()
	}

	pub fn string_attribute(&self, key: StringKey) -> Option<IStr> {
		self.resolve().string_attribute(key).cloned()
	}

	/// The node this entry was compiled under. For references this is the
	/// node that contained the `include`, not the resolved target's parent.
	pub fn parent(&self) -> Option<Arc<RuleNode>> {
		match self {
			SyntaxNode::Rule(rule) => rule.parent(),
			SyntaxNode::RuleRef(proxy) => proxy.anchor(),
			SyntaxNode::SelfRef(proxy) => proxy.anchor(),
			SyntaxNode::ScopeRef(proxy) => proxy.anchor(),
		}
	}
}

impl From<Arc<RuleNode>> for SyntaxNode {
	fn from(rule: Arc<RuleNode>) -> Self {
		SyntaxNode::Rule(rule)
	}
}
