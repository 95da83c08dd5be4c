//! Repository entry name → small integer id mapping.
//!
//! Repositories store their entries under [`RuleId`] rather than by name, so
//! `#name` references compare integers at traversal time. Ids are allocated
//! lazily, one per distinct name, by [`RuleIdInterner::id_for`].
//!
//! # Invariants
//!
//! * Within one session (between two [`RuleIdInterner::compact`] calls) a name
//!   always maps to the same id, even when requested from several threads at once.
//! * Ids are never reused. Compaction drops the name table but not the
//!   allocation counter, so a name re-interned afterwards gets a fresh id and a
//!   stale id held by an older reference can only miss, never alias another rule.

use std::fmt;
use std::num::NonZeroU32;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Id of a repository entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(NonZeroU32);

impl RuleId {
	#[inline]
	pub fn get(self) -> u32 {
		self.0.get()
	}
}

impl fmt::Debug for RuleId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "RuleId({})", self.0)
	}
}

#[derive(Default)]
struct RuleIdState {
	ids: Option<FxHashMap<Box<str>, RuleId>>,
	allocated: u32,
}

/// Thread-safe, clearable repository name interner.
#[derive(Default)]
pub struct RuleIdInterner {
	state: Mutex<RuleIdState>,
}

impl RuleIdInterner {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the id for `name`, allocating the next one on first sight.
	pub fn id_for(&self, name: &str) -> RuleId {
		let mut state = self.state.lock();
		let RuleIdState { ids, allocated } = &mut *state;
		let ids = ids.get_or_insert_with(FxHashMap::default);
		if let Some(&id) = ids.get(name) {
			return id;
		}
		let id = RuleId(NonZeroU32::MIN.saturating_add(*allocated));
		*allocated = id.get();
		ids.insert(Box::from(name), id);
		id
	}

	/// Looks up `name` without allocating.
	pub fn get(&self, name: &str) -> Option<RuleId> {
		self.state.lock().ids.as_ref()?.get(name).copied()
	}

	/// Number of names interned in the current session.
	pub fn len(&self) -> usize {
		self.state.lock().ids.as_ref().map_or(0, FxHashMap::len)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Drops the name table. The next [`Self::id_for`] starts a new session.
	pub fn compact(&self) {
		let mut state = self.state.lock();
		let dropped = state.ids.take().map_or(0, |ids| ids.len());
		tracing::debug!(dropped, allocated = state.allocated, "Compacted rule id table");
	}
}

impl fmt::Debug for RuleIdInterner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RuleIdInterner").field("len", &self.len()).finish()
	}
}
