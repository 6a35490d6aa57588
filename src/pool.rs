//! Dense, index-addressed registry with free-list recycling.
//!
//! Mirrors the shape the teacher crate uses for its own per-object
//! registries (`Vec<Option<T>>` with holes left behind by removal): inserts
//! prefer a recycled free index before growing the backing vector, and
//! removal never shifts later entries, so indices stay stable for the
//! lifetime of the entry they name.

/// A dense array of optional values addressed by a recycled index.
///
/// `insert` and `remove` are O(1). Removing an index clears its slot and
/// makes it available to a later `insert`; no generation counter is kept,
/// so a stale index silently refers to whatever was inserted at that slot
/// next (callers that need to detect this should keep their own
/// generation tag alongside `T`).
#[derive(Debug)]
pub struct Pool<T> {
	slots: Vec<Option<T>>,
	free: Vec<usize>,
}

impl<T> Pool<T> {
	pub fn new() -> Self {
		Self { slots: Vec::new(), free: Vec::new() }
	}

	/// Insert `value`, reusing a free index when one exists.
	pub fn insert(&mut self, value: T) -> usize {
		match self.free.pop() {
			Some(index) => {
				debug_assert!(self.slots[index].is_none(), "free index {index} was not empty");
				self.slots[index] = Some(value);
				index
			},
			None => {
				self.slots.push(Some(value));
				self.slots.len() - 1
			},
		}
	}

	/// Clear the slot at `index` and return its value.
	///
	/// # Panics
	///
	/// Panics if `index` is out of bounds or already empty — removing an
	/// index that isn't occupied is a programmer error, not a recoverable
	/// condition.
	pub fn remove(&mut self, index: usize) -> T {
		let slot = self.slots.get_mut(index).unwrap_or_else(|| panic!("index {index} out of bounds"));
		let value = slot.take().unwrap_or_else(|| panic!("index {index} is already empty"));
		self.free.push(index);
		value
	}

	/// Read-only view of every slot, in insertion order, with holes as `None`.
	pub fn slots(&self) -> &[Option<T>] {
		&self.slots
	}

	/// Read-only view of currently-free indices.
	pub fn free_indices(&self) -> &[usize] {
		&self.free
	}
}

impl<T> Default for Pool<T> {
	fn default() -> Self {
		Self::new()
	}
}
