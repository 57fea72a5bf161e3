#![forbid(unsafe_code)]

//! Keyboard navigation over a filtered list.
//!
//! [`NavIndex`] maps every row of a filtered list to a slot. Group headers
//! and disabled items (or members of disabled groups) are skip slots; every
//! other row is navigable. `next`/`prev` step over skip slots and wrap
//! around at either end.
//!
//! # Invariants
//!
//! 1. `next(last) == first` and `prev(first) == last` whenever any row is
//!    navigable.
//! 2. Traversal is a bounded loop over the slots; a list with no navigable
//!    row yields `None` instead of spinning.
//! 3. An option id appears in at most one slot.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Same id twice in the input | Panics (construction bug upstream) |
//! | `slot(i)` with `i >= len` | `IndexError::OutOfBounds` |
//! | `next`/`prev` from an out-of-range position | Wraps to `first`/`last` |

use std::fmt;

use ahash::AHashMap;

use crate::flatten::FlatEntry;
use crate::record::{OptionId, OptionSet};

/// Positional access outside the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexError {
    /// `index` is not below `len`.
    OutOfBounds { index: usize, len: usize },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for list of {len} rows")
            }
        }
    }
}

impl std::error::Error for IndexError {}

/// One row of the index map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Header or disabled row; never focused.
    Skip,
    /// A focusable option at this position.
    Item(OptionId),
}

impl Slot {
    #[must_use]
    pub fn is_navigable(self) -> bool {
        matches!(self, Self::Item(_))
    }
}

/// Navigable index over a filtered list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavIndex {
    slots: Vec<Slot>,
    positions: AHashMap<OptionId, usize>,
    first: Option<usize>,
    last: Option<usize>,
}

impl NavIndex {
    /// Build the index for `entries` (rows of a filtered list).
    ///
    /// # Panics
    ///
    /// Panics if an option id occurs in more than one row.
    #[must_use]
    pub fn build(set: &OptionSet, entries: &[FlatEntry]) -> Self {
        let mut slots = Vec::with_capacity(entries.len());
        let mut positions = AHashMap::with_capacity(entries.len());
        for (pos, entry) in entries.iter().enumerate() {
            let Some(id) = entry.id() else {
                slots.push(Slot::Skip);
                continue;
            };
            let previous = positions.insert(id, pos);
            assert!(
                previous.is_none(),
                "option {id:?} appears twice in the navigable list (rows {} and {pos})",
                previous.unwrap_or_default()
            );
            slots.push(if set.is_selectable(id) { Slot::Item(id) } else { Slot::Skip });
        }
        let first = slots.iter().position(|s| s.is_navigable());
        let last = slots.iter().rposition(|s| s.is_navigable());
        Self {
            slots,
            positions,
            first,
            last,
        }
    }

    /// Number of rows (navigable or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All slots in row order.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// The slot at `index`.
    pub fn slot(&self, index: usize) -> Result<Slot, IndexError> {
        self.slots.get(index).copied().ok_or(IndexError::OutOfBounds {
            index,
            len: self.slots.len(),
        })
    }

    /// First navigable row.
    #[must_use]
    pub fn first(&self) -> Option<usize> {
        self.first
    }

    /// Last navigable row.
    #[must_use]
    pub fn last(&self) -> Option<usize> {
        self.last
    }

    /// Number of navigable rows.
    #[must_use]
    pub fn navigable_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_navigable()).count()
    }

    /// Row of option `id`, navigable or not.
    #[must_use]
    pub fn position_of(&self, id: OptionId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Option focused at row `index`, if that row is navigable.
    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<OptionId> {
        match self.slots.get(index) {
            Some(Slot::Item(id)) => Some(*id),
            _ => None,
        }
    }

    /// Next navigable row after `current`, wrapping to [`first`](Self::first).
    #[must_use]
    pub fn next(&self, current: usize) -> Option<usize> {
        let start = current.saturating_add(1);
        let found = (start..self.slots.len()).find(|&i| self.slots[i].is_navigable());
        if found.is_none() {
            tracing::trace!(current, "index wrap to first");
        }
        found.or(self.first)
    }

    /// Previous navigable row before `current`, wrapping to
    /// [`last`](Self::last).
    #[must_use]
    pub fn prev(&self, current: usize) -> Option<usize> {
        if current > self.slots.len() {
            return self.last;
        }
        let found = (0..current).rev().find(|&i| self.slots[i].is_navigable());
        if found.is_none() {
            tracing::trace!(current, "index wrap to last");
        }
        found.or(self.last)
    }

    /// Row to focus after `key`, starting from `current` (no focus yet when
    /// `None`).
    #[must_use]
    pub fn navigate(&self, current: Option<usize>, key: NavKey) -> Option<usize> {
        match (key, current) {
            (NavKey::Down, Some(pos)) => self.next(pos),
            (NavKey::Down, None) | (NavKey::Home | NavKey::PageUp, _) => self.first,
            (NavKey::Up, Some(pos)) => self.prev(pos),
            (NavKey::Up, None) | (NavKey::End | NavKey::PageDown, _) => self.last,
        }
    }
}

/// Navigation keys understood by [`NavIndex::navigate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Up,
    Down,
    /// Jumps to the first row.
    Home,
    /// Jumps to the last row.
    End,
    /// Same as `Home`.
    PageUp,
    /// Same as `End`.
    PageDown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use serde_json::json;

    fn build(value: serde_json::Value) -> NavIndex {
        let set = OptionSet::from_json(&value);
        let flat = flatten(&set);
        NavIndex::build(&set, &flat.entries)
    }

    // ── Construction ────────────────────────────────────────────────

    #[test]
    fn headers_are_skip_slots() {
        let index = build(json!([
            {"label": "Fruit", "options": [{"id": 1, "text": "Apple"}, {"id": 2, "text": "Banana"}]}
        ]));
        assert_eq!(index.slot(0), Ok(Slot::Skip));
        assert_eq!(index.first(), Some(1));
        assert_eq!(index.last(), Some(2));
    }

    #[test]
    fn disabled_items_are_skip_slots_in_flat_lists() {
        let index = build(json!([
            {"id": 1, "isDisabled": true}, {"id": 2}, {"id": 3, "isDisabled": true}
        ]));
        assert_eq!(index.first(), Some(1));
        assert_eq!(index.last(), Some(1));
        assert_eq!(index.navigable_count(), 1);
    }

    #[test]
    fn disabled_group_members_are_skipped() {
        let index = build(json!([
            {"label": "Off", "isDisabled": true, "options": [{"id": 1}]},
            {"id": 2}
        ]));
        assert_eq!(index.slots(), &[Slot::Skip, Slot::Skip, Slot::Item(OptionId(1))]);
    }

    #[test]
    fn out_of_bounds_is_an_error() {
        let index = build(json!([{"id": 1}]));
        assert_eq!(index.slot(3), Err(IndexError::OutOfBounds { index: 3, len: 1 }));
        assert_eq!(
            IndexError::OutOfBounds { index: 3, len: 1 }.to_string(),
            "index 3 out of bounds for list of 1 rows"
        );
    }

    #[test]
    #[should_panic(expected = "appears twice")]
    fn duplicate_ids_panic() {
        let set = OptionSet::from_json(&json!([{"id": 1}]));
        let row = FlatEntry::Item { id: OptionId(0), group: None };
        let _ = NavIndex::build(&set, &[row.clone(), row]);
    }

    // ── Traversal ───────────────────────────────────────────────────

    #[test]
    fn next_and_prev_skip_and_wrap() {
        let index = build(json!([
            {"label": "A", "options": [{"id": 1}, {"id": 2, "isDisabled": true}]},
            {"label": "B", "options": [{"id": 3}]}
        ]));
        // rows: #A, 1, 2(disabled), #B, 3
        assert_eq!(index.next(1), Some(4));
        assert_eq!(index.next(4), Some(1));
        assert_eq!(index.prev(4), Some(1));
        assert_eq!(index.prev(1), Some(4));
    }

    #[test]
    fn all_skip_list_terminates() {
        let index = build(json!([
            {"id": 1, "isDisabled": true}, {"id": 2, "isDisabled": true}
        ]));
        assert_eq!(index.first(), None);
        assert_eq!(index.next(0), None);
        assert_eq!(index.prev(0), None);
        assert_eq!(NavIndex::default().next(0), None);
    }

    #[test]
    fn out_of_range_current_wraps() {
        let index = build(json!([{"id": 1}, {"id": 2}]));
        assert_eq!(index.next(usize::MAX), Some(0));
        assert_eq!(index.prev(10), Some(1));
    }

    #[test]
    fn navigate_keys() {
        let index = build(json!([
            {"label": "A", "options": [{"id": 1}, {"id": 2}, {"id": 3}]}
        ]));
        assert_eq!(index.navigate(None, NavKey::Down), Some(1));
        assert_eq!(index.navigate(None, NavKey::Up), Some(3));
        assert_eq!(index.navigate(Some(1), NavKey::Down), Some(2));
        assert_eq!(index.navigate(Some(1), NavKey::Up), Some(3));
        assert_eq!(index.navigate(Some(2), NavKey::PageDown), Some(3));
        assert_eq!(index.navigate(Some(2), NavKey::Home), Some(1));
    }

    #[test]
    fn position_lookup() {
        let index = build(json!([{"label": "A", "options": [{"id": 1}, {"id": 2}]}]));
        assert_eq!(index.position_of(OptionId(1)), Some(2));
        assert_eq!(index.id_at(2), Some(OptionId(1)));
        assert_eq!(index.id_at(0), None);
    }
}
