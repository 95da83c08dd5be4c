#![allow(unused_crate_dependencies)]

//! Table-level behavior: registration, fallback, reference resolution.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tmrules_syntax::{CaptureKey, Interner, Plist, RuleNode, StringKey, SyntaxNode, SyntaxTable};

fn doc(value: serde_json::Value) -> Plist {
	Plist::from_json_value(value).expect("test document is an object")
}

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

#[test]
fn registered_scope_round_trips() {
	let table = SyntaxTable::new();
	let interner = Interner::new();

	let scope = table.add_syntax(&doc(json!({ "scopeName": "source.demo", "patterns": [{ "match": "x" }] })), &interner);

	assert_eq!(scope.as_deref(), Some("source.demo"));
	let root = table.get_syntax("source.demo");
	assert!(!RuleNode::is_empty_node(&root));
	assert_eq!(root.children().len(), 1);
	assert!(table.contains_scope("source.demo"));
}

#[test]
fn unknown_scope_falls_back_to_empty_node() {
	init_tracing();
	let table = SyntaxTable::new();
	let node = table.get_syntax("nonexistent.scope");

	assert!(RuleNode::is_empty_node(&node));
	assert!(node.children().is_empty());
	assert_eq!(node.repository().count(), 0);
	for key in [CaptureKey::Captures, CaptureKey::BeginCaptures, CaptureKey::EndCaptures, CaptureKey::WhileCaptures] {
		assert!(node.captures(key).is_none());
	}
}

#[test]
fn document_without_scope_name_is_not_registered() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	assert_eq!(table.add_syntax(&doc(json!({ "patterns": [] })), &interner), None);
	assert!(table.is_empty());
}

#[test]
fn self_reference_resolves_to_registered_root() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(
		&doc(json!({
			"scopeName": "source.recursive",
			"patterns": [{
				"begin": "\\(",
				"end": "\\)",
				"patterns": [{ "include": "$self" }, { "include": "$base" }]
			}]
		})),
		&interner,
	);

	let root = table.get_syntax("source.recursive");
	let group = root.children()[0].resolve();
	for reference in group.children() {
		assert!(matches!(reference, SyntaxNode::SelfRef(_)));
		assert!(Arc::ptr_eq(&reference.resolve(), &root));
	}
}

#[test]
fn repository_lookup_prefers_nearest_enclosing_entry() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(
		&doc(json!({
			"scopeName": "source.shadow",
			"patterns": [
				{ "include": "#x" },
				{
					"begin": "b",
					"end": "e",
					"patterns": [{ "include": "#x" }],
					"repository": { "x": { "match": "inner", "name": "x2" } }
				}
			],
			"repository": { "x": { "match": "outer", "name": "x1" } }
		})),
		&interner,
	);

	let root = table.get_syntax("source.shadow");
	let outer_ref = &root.children()[0];
	let block = root.children()[1].resolve();
	let inner_ref = &block.children()[0];

	assert_eq!(outer_ref.string_attribute(StringKey::Name).as_deref(), Some("x1"));
	assert_eq!(inner_ref.string_attribute(StringKey::Name).as_deref(), Some("x2"));
}

#[test]
fn repository_lookup_climbs_to_ancestors() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(
		&doc(json!({
			"scopeName": "source.climb",
			"patterns": [{
				"begin": "a",
				"end": "b",
				"patterns": [{ "begin": "c", "end": "d", "patterns": [{ "include": "#top" }] }]
			}],
			"repository": { "top": { "match": "t", "name": "found" } }
		})),
		&interner,
	);

	let root = table.get_syntax("source.climb");
	let outer = root.children()[0].resolve();
	let inner = outer.children()[0].resolve();
	let deep = &inner.children()[0];
	assert_eq!(deep.string_attribute(StringKey::Name).as_deref(), Some("found"));
}

#[test]
fn repository_entries_chain_through_references() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(
		&doc(json!({
			"scopeName": "source.chain",
			"patterns": [{ "include": "#a" }],
			"repository": {
				"a": { "include": "#b" },
				"b": { "match": "b", "name": "target" }
			}
		})),
		&interner,
	);

	let root = table.get_syntax("source.chain");
	assert_eq!(root.children()[0].string_attribute(StringKey::Name).as_deref(), Some("target"));
}

#[test]
fn missing_repository_entry_resolves_to_empty_node() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(&doc(json!({ "scopeName": "source.missing", "patterns": [{ "include": "#nowhere" }] })), &interner);

	let root = table.get_syntax("source.missing");
	assert!(RuleNode::is_empty_node(&root.children()[0].resolve()));
}

#[test]
fn self_including_repository_entry_terminates() {
	init_tracing();
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(
		&doc(json!({
			"scopeName": "source.loop",
			"patterns": [{ "include": "#a" }],
			"repository": { "a": { "include": "#a" } }
		})),
		&interner,
	);

	let root = table.get_syntax("source.loop");
	assert!(RuleNode::is_empty_node(&root.children()[0].resolve()));
}

#[test]
fn foreign_scope_resolves_once_loaded() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(
		&doc(json!({
			"scopeName": "text.host",
			"patterns": [{ "include": "source.guest" }, { "include": "source.guest#strings" }]
		})),
		&interner,
	);

	let host = table.get_syntax("text.host");
	let whole = host.children()[0].clone();
	let entry = host.children()[1].clone();
	assert!(RuleNode::is_empty_node(&whole.resolve()));
	assert!(RuleNode::is_empty_node(&entry.resolve()));

	table.add_syntax(
		&doc(json!({
			"scopeName": "source.guest",
			"patterns": [{ "include": "#strings" }],
			"repository": { "strings": { "begin": "\"", "end": "\"", "name": "string.quoted" } }
		})),
		&interner,
	);

	let guest = table.get_syntax("source.guest");
	assert!(Arc::ptr_eq(&whole.resolve(), &guest));
	assert_eq!(entry.string_attribute(StringKey::Name).as_deref(), Some("string.quoted"));
}

#[test]
fn foreign_rule_lookup_does_not_climb() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(
		&doc(json!({
			"scopeName": "source.nested",
			"patterns": [{ "begin": "a", "end": "b", "repository": { "deep": { "match": "d" } } }]
		})),
		&interner,
	);
	table.add_syntax(&doc(json!({ "scopeName": "source.user", "patterns": [{ "include": "source.nested#deep" }] })), &interner);

	let user = table.get_syntax("source.user");
	assert!(RuleNode::is_empty_node(&user.children()[0].resolve()));
}

#[test]
fn reference_parent_is_the_including_node() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(
		&doc(json!({ "scopeName": "source.p", "patterns": [{ "include": "$self" }, { "include": "source.q" }] })),
		&interner,
	);

	let root = table.get_syntax("source.p");
	for child in root.children() {
		assert!(child.is_proxy());
		assert!(Arc::ptr_eq(&child.parent().unwrap(), &root));
	}
}

#[test]
fn nested_scope_names_are_registered() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(
		&doc(json!({
			"scopeName": "text.html",
			"patterns": [{ "scopeName": "source.css.embedded", "patterns": [] }]
		})),
		&interner,
	);

	let names: Vec<String> = table.scope_names().iter().map(ToString::to_string).collect();
	assert_eq!(names, vec!["source.css.embedded".to_owned(), "text.html".to_owned()]);
	let embedded = table.get_syntax("source.css.embedded");
	assert!(Arc::ptr_eq(&embedded.parent().unwrap(), &table.get_syntax("text.html")));
}

#[test]
fn document_order_survives_decoding() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	let document = Plist::from_json_str(
		r##"{
			"scopeName": "source.ordered",
			"injections": {
				"R:z": { "patterns": [{ "match": "z" }] },
				"L:a": { "patterns": [{ "match": "a" }] },
				"L:m": { "patterns": [{ "match": "m" }] }
			},
			"repository": {
				"zeta": { "match": "z" },
				"alpha": { "match": "a" }
			},
			"patterns": [{ "include": "#zeta" }]
		}"##,
	)
	.unwrap();
	table.add_syntax(&document, &interner);

	let root = table.get_syntax("source.ordered");
	let selectors: Vec<&str> = root.injections().iter().map(|i| i.selector.as_str()).collect();
	assert_eq!(selectors, ["R:z", "L:a", "L:m"]);
	assert!(table.rule_id("zeta") < table.rule_id("alpha"));
	assert_eq!(root.children()[0].string_attribute(StringKey::Match).as_deref(), Some("z"));
}

#[test]
fn sub_scope_of_unnamed_document_keeps_its_ancestors() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	let scope = table.add_syntax(
		&doc(json!({
			"patterns": [{ "scopeName": "source.embedded", "patterns": [{ "include": "#x" }, { "include": "$self" }] }],
			"repository": { "x": { "match": "x", "name": "found" } }
		})),
		&interner,
	);
	assert_eq!(scope, None);

	let embedded = table.get_syntax("source.embedded");
	let root = embedded.parent().expect("enclosing root stays alive");
	assert!(root.scope_name().is_none());
	assert_eq!(embedded.children()[0].string_attribute(StringKey::Name).as_deref(), Some("found"));
	assert!(Arc::ptr_eq(&embedded.children()[1].resolve(), &root));
}

#[test]
fn sub_scope_survives_reload_of_its_root() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(
		&doc(json!({
			"scopeName": "text.outer",
			"patterns": [{ "scopeName": "source.inner", "patterns": [{ "include": "#x" }] }],
			"repository": { "x": { "match": "x", "name": "old" } }
		})),
		&interner,
	);
	let first_outer = table.get_syntax("text.outer");
	table.add_syntax(&doc(json!({ "scopeName": "text.outer", "patterns": [] })), &interner);
	drop(first_outer);

	let inner = table.get_syntax("source.inner");
	let old_root = inner.parent().expect("replaced root stays alive for its sub-scope");
	assert!(!Arc::ptr_eq(&old_root, &table.get_syntax("text.outer")));
	assert_eq!(inner.children()[0].string_attribute(StringKey::Name).as_deref(), Some("old"));

	table.clear();
	assert!(RuleNode::is_empty_node(&table.get_syntax("source.inner")));
}

#[test]
fn nested_scope_repeating_the_root_name_wins() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(
		&doc(json!({
			"scopeName": "source.dup",
			"name": "root",
			"patterns": [{ "scopeName": "source.dup", "name": "nested" }]
		})),
		&interner,
	);

	let registered = table.get_syntax("source.dup");
	assert_eq!(registered.string_attribute(StringKey::Name).map(|s| s.as_str()), Some("nested"));
	assert_eq!(registered.parent().and_then(|p| p.string_attribute(StringKey::Name).cloned()).as_deref(), Some("root"));
	assert_eq!(table.len(), 1);
}

#[test]
fn reloading_a_scope_replaces_it() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(&doc(json!({ "scopeName": "source.v", "patterns": [] })), &interner);
	let first = table.get_syntax("source.v");
	table.add_syntax(&doc(json!({ "scopeName": "source.v", "patterns": [{ "match": "new" }] })), &interner);

	let second = table.get_syntax("source.v");
	assert!(!Arc::ptr_eq(&first, &second));
	assert_eq!(second.children().len(), 1);
	assert_eq!(table.len(), 1);
}

#[test]
fn clear_is_idempotent() {
	let table = SyntaxTable::new();
	table.clear();
	assert!(table.is_empty());
	assert!(RuleNode::is_empty_node(&table.get_syntax("source.any")));

	let interner = Interner::new();
	table.add_syntax(&doc(json!({ "scopeName": "source.any" })), &interner);
	table.clear();
	table.clear();
	assert!(table.is_empty());
	assert!(RuleNode::is_empty_node(&table.get_syntax("source.any")));
}

#[test]
fn rule_ids_are_stable_until_compaction() {
	let table = SyntaxTable::new();
	let first = table.rule_id("expression");
	assert_eq!(table.rule_id("expression"), first);

	table.compact();
	assert_ne!(table.rule_id("expression"), first);
}

#[test]
fn compaction_keeps_loaded_grammars_resolvable() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	table.add_syntax(
		&doc(json!({
			"scopeName": "source.kept",
			"patterns": [{ "include": "#entry" }],
			"repository": { "entry": { "match": "e", "name": "kept" } }
		})),
		&interner,
	);
	table.compact();
	table.rule_id("unrelated");

	let root = table.get_syntax("source.kept");
	assert_eq!(root.children()[0].string_attribute(StringKey::Name).as_deref(), Some("kept"));
}

#[test]
fn dropped_table_resolves_foreign_scopes_to_empty() {
	let interner = Interner::new();
	let root = {
		let table = SyntaxTable::new();
		table.add_syntax(&doc(json!({ "scopeName": "source.a", "patterns": [{ "include": "source.a" }] })), &interner);
		table.get_syntax("source.a")
	};
	assert!(RuleNode::is_empty_node(&root.children()[0].resolve()));
}

#[test]
fn concurrent_loading_and_lookup() {
	let table = SyntaxTable::new();
	let interner = Interner::new();
	let scopes: Vec<String> = (0..16).map(|i| format!("source.lang{i}")).collect();

	std::thread::scope(|s| {
		for scope in &scopes {
			let table = table.clone();
			let interner = &interner;
			s.spawn(move || {
				table.add_syntax(
					&doc(json!({
						"scopeName": scope,
						"patterns": [{ "include": "#shared" }, { "include": "source.lang0" }],
						"repository": { "shared": { "match": "s", "name": "shared" } }
					})),
					interner,
				);
			});
		}
		for _ in 0..4 {
			let table = table.clone();
			s.spawn(move || {
				for _ in 0..100 {
					let node = table.get_syntax("source.lang0");
					for child in node.children() {
						let _ = child.resolve();
					}
				}
			});
		}
	});

	assert_eq!(table.len(), scopes.len());
	for scope in &scopes {
		let root = table.get_syntax(scope);
		assert_eq!(root.children()[0].string_attribute(StringKey::Name).as_deref(), Some("shared"));
		assert!(Arc::ptr_eq(&root.children()[1].resolve(), &table.get_syntax("source.lang0")));
	}
}
