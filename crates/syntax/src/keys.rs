//! Recognized grammar document keys.

use strum_macros::{AsRefStr, EnumIter, EnumString};

/// Key of a nested rule list.
pub const PATTERNS_KEY: &str = "patterns";
/// Key of the named sub-rule dictionary.
pub const REPOSITORY_KEY: &str = "repository";
/// Key of the selector → rule dictionary.
pub const INJECTIONS_KEY: &str = "injections";
/// Key whose presence turns a rule into a reference.
pub const INCLUDE_KEY: &str = "include";
/// Key of a capture entry's scope label.
pub const NAME_KEY: &str = "name";

pub const INCLUDE_SELF_VALUE: &str = "$self";
pub const INCLUDE_BASE_VALUE: &str = "$base";

/// Flat string attributes stored on a rule node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, AsRefStr, EnumIter)]
pub enum StringKey {
	#[strum(serialize = "name")]
	Name,
	#[strum(serialize = "contentName")]
	ContentName,
	#[strum(serialize = "match")]
	Match,
	#[strum(serialize = "begin")]
	Begin,
	#[strum(serialize = "end")]
	End,
	#[strum(serialize = "while")]
	While,
	#[strum(serialize = "scopeName")]
	ScopeName,
	#[strum(serialize = "firstLineMatch")]
	FirstLineMatch,
	#[strum(serialize = "foldingStartMarker")]
	FoldingStartMarker,
	#[strum(serialize = "foldingStopMarker")]
	FoldingStopMarker,
	#[strum(serialize = "comment")]
	Comment,
}

/// Capture dictionaries, keyed by the pattern they apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, AsRefStr, EnumIter)]
pub enum CaptureKey {
	#[strum(serialize = "captures")]
	Captures,
	#[strum(serialize = "beginCaptures")]
	BeginCaptures,
	#[strum(serialize = "endCaptures")]
	EndCaptures,
	#[strum(serialize = "whileCaptures")]
	WhileCaptures,
}

/// Returns `true` if `include` names the enclosing grammar root.
pub fn is_self_reference(include: &str) -> bool {
	include.eq_ignore_ascii_case(INCLUDE_SELF_VALUE) || include.eq_ignore_ascii_case(INCLUDE_BASE_VALUE)
}
