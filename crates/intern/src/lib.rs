//! String interning for grammar data.
//!
//! Scope names and attribute strings repeat heavily across grammars
//! (`punctuation.definition.string.begin` appears in nearly every bundle).
//! [`Interner`] hands out [`IStr`] handles so that equal strings share one
//! allocation and equality checks on interned values reduce to a pointer
//! comparison.
//!
//! # Concurrency
//!
//! * [`Interner::intern`] takes `&self`; the dedup set is guarded by a single mutex.
//! * [`IStr`] is `Send + Sync` and immutable.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

/// An interned, immutable string.
///
/// Equality checks pointer identity first and falls back to content, so an
/// `IStr` produced by a different interner (or by [`IStr::from`]) still
/// compares equal to one with the same text. Hashing is by content, which
/// keeps `IStr` consistent with its [`Borrow<str>`] impl.
#[derive(Clone)]
pub struct IStr(Arc<str>);

impl IStr {
	/// Returns the underlying string slice.
	#[inline]
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns `true` if both handles point at the same allocation.
	#[inline]
	pub fn ptr_eq(a: &IStr, b: &IStr) -> bool {
		Arc::ptr_eq(&a.0, &b.0)
	}
}

impl Deref for IStr {
	type Target = str;

	#[inline]
	fn deref(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for IStr {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl Borrow<str> for IStr {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl PartialEq for IStr {
	#[inline]
	fn eq(&self, other: &Self) -> bool {
		IStr::ptr_eq(self, other) || *self.0 == *other.0
	}
}

impl Eq for IStr {}

impl PartialEq<str> for IStr {
	fn eq(&self, other: &str) -> bool {
		&*self.0 == other
	}
}

impl PartialEq<&str> for IStr {
	fn eq(&self, other: &&str) -> bool {
		&*self.0 == *other
	}
}

impl Hash for IStr {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.hash(state);
	}
}

impl PartialOrd for IStr {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for IStr {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.0.cmp(&other.0)
	}
}

impl From<&str> for IStr {
	/// Wraps a string without deduplication.
	fn from(value: &str) -> Self {
		Self(Arc::from(value))
	}
}

impl fmt::Debug for IStr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl fmt::Display for IStr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Thread-safe string interner.
#[derive(Default)]
pub struct Interner {
	strings: Mutex<FxHashSet<Arc<str>>>,
}

impl Interner {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the shared handle for `value`, allocating it on first use.
	pub fn intern(&self, value: &str) -> IStr {
		let mut strings = self.strings.lock();
		if let Some(existing) = strings.get(value) {
			return IStr(existing.clone());
		}
		let arc: Arc<str> = Arc::from(value);
		strings.insert(arc.clone());
		IStr(arc)
	}

	/// Number of distinct strings currently held.
	pub fn len(&self) -> usize {
		self.strings.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.strings.lock().is_empty()
	}

	/// Drops the dedup table. Handles already given out remain valid, but
	/// strings interned afterwards no longer share their allocation.
	pub fn clear(&self) {
		let mut strings = self.strings.lock();
		strings.clear();
		strings.shrink_to_fit();
	}
}

impl fmt::Debug for Interner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Interner").field("len", &self.len()).finish()
	}
}
