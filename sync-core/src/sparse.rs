//! Sparse, ordered item storage.
//!
//! A [`SparseList`] holds items at known positions of a server-side
//! collection whose full size may exceed what has been fetched. Positions that
//! have not been fetched yet are holes.
//!
//! Invariant: `count() <= total_item_count()`, and
//! `has_more_items() == (count() < total_item_count())`.

use std::ops::Range;
use thiserror::Error;

/// Errors for positional operations on a [`SparseList`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SparseError {
    /// The requested range does not lie within the local positions.
    #[error("range {start}..{end} out of bounds (count: {count})")]
    OutOfRange {
        /// Start of the requested range.
        start: usize,
        /// End of the requested range (exclusive).
        end: usize,
        /// Number of local positions.
        count: usize,
    },
}

/// Ordered storage with holes for unfetched positions.
#[derive(Debug, Clone)]
pub struct SparseList<T> {
    slots: Vec<Option<T>>,
    total: usize,
}

impl<T> Default for SparseList<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            total: 0,
        }
    }
}

impl<T> SparseList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of local positions, holes included.
    pub fn count(&self) -> usize {
        self.slots.len()
    }

    /// Number of positions holding an item.
    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Server-reported size of the collection.
    pub fn total_item_count(&self) -> usize {
        self.total
    }

    /// Record the server-reported size.
    ///
    /// Never drops below the local count.
    pub fn set_total_item_count(&mut self, total: usize) {
        self.total = total.max(self.slots.len());
    }

    /// Whether the server holds items past the local positions.
    pub fn has_more_items(&self) -> bool {
        self.slots.len() < self.total
    }

    /// Item at `index`, `None` for a hole or an index past the end.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Whether `index` holds an item.
    pub fn is_loaded(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Iterate positions in order, holes as `None`.
    pub fn iter(&self) -> impl Iterator<Item = Option<&T>> {
        self.slots.iter().map(Option::as_ref)
    }

    /// Iterate loaded items with their positions.
    pub fn loaded(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|item| (i, item)))
    }

    /// First hole at or after `from`, or the local count if there is none.
    pub fn next_unloaded(&self, from: usize) -> usize {
        (from..self.slots.len())
            .find(|&i| self.slots[i].is_none())
            .unwrap_or(self.slots.len().max(from))
    }

    /// Positions `[start, start + len)`, if they all lie within the list.
    pub fn checked_range(&self, start: usize, len: usize) -> Result<Range<usize>, SparseError> {
        match start.checked_add(len) {
            Some(end) if end <= self.slots.len() => Ok(start..end),
            end => Err(SparseError::OutOfRange {
                start,
                end: end.unwrap_or(usize::MAX),
                count: self.slots.len(),
            }),
        }
    }

    /// Fill positions `[offset, offset + items.len())`.
    ///
    /// Positions outside that range are untouched. The list grows with holes
    /// if `offset` lies past the current end.
    pub fn fill(&mut self, offset: usize, items: Vec<T>) -> Result<(), SparseError> {
        self.fill_partial(offset, items.into_iter().map(Some).collect())
    }

    /// Like [`fill`](Self::fill), but `None` entries leave their position as
    /// it was.
    ///
    /// Fails without touching the list if the range end overflows.
    pub fn fill_partial(
        &mut self,
        offset: usize,
        items: Vec<Option<T>>,
    ) -> Result<(), SparseError> {
        let end = offset.checked_add(items.len()).ok_or(SparseError::OutOfRange {
            start: offset,
            end: usize::MAX,
            count: self.slots.len(),
        })?;
        if self.slots.len() < end {
            self.slots.resize_with(end, || None);
        }
        for (slot, item) in self.slots[offset..end].iter_mut().zip(items) {
            if item.is_some() {
                *slot = item;
            }
        }
        self.total = self.total.max(self.slots.len());
        Ok(())
    }

    /// Insert items at `at`, shifting later positions.
    ///
    /// `at` is clamped to the local count. Returns the actual insertion index.
    pub fn insert(&mut self, at: usize, items: Vec<T>) -> usize {
        let at = at.min(self.slots.len());
        let added = items.len();
        self.slots.splice(at..at, items.into_iter().map(Some));
        self.total += added;
        at
    }

    /// Remove `len` positions starting at `at`.
    pub fn remove(&mut self, at: usize, len: usize) -> Result<Vec<Option<T>>, SparseError> {
        let range = self.checked_range(at, len)?;
        let removed: Vec<Option<T>> = self.slots.drain(range).collect();
        self.total = self.total.saturating_sub(len).max(self.slots.len());
        Ok(removed)
    }

    /// Move `len` positions starting at `from` so they start at `to`.
    ///
    /// `to` is an index into the list after the range has been taken out,
    /// clamped to its length. Returns the actual destination index.
    pub fn move_range(&mut self, from: usize, len: usize, to: usize) -> Result<usize, SparseError> {
        let range = self.checked_range(from, len)?;
        let moved: Vec<Option<T>> = self.slots.drain(range).collect();
        let to = to.min(self.slots.len());
        self.slots.splice(to..to, moved);
        Ok(to)
    }

    /// Drop every position and reset the total.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(list: &SparseList<u32>) -> Vec<Option<u32>> {
        list.iter().map(|v| v.copied()).collect()
    }

    #[test]
    fn starts_empty() {
        let list: SparseList<u32> = SparseList::new();
        assert_eq!(list.count(), 0);
        assert_eq!(list.total_item_count(), 0);
        assert!(!list.has_more_items());
    }

    #[test]
    fn fill_at_offset_leaves_holes_before() {
        let mut list = SparseList::new();
        list.fill(2, vec![20, 30]).unwrap();

        assert_eq!(values(&list), vec![None, None, Some(20), Some(30)]);
        assert_eq!(list.loaded_count(), 2);
        assert!(!list.is_loaded(0));
        assert!(list.is_loaded(2));
    }

    #[test]
    fn fill_does_not_disturb_outside_range() {
        let mut list = SparseList::new();
        list.fill(0, vec![1, 2, 3, 4]).unwrap();
        list.fill(1, vec![20, 30]).unwrap();

        assert_eq!(values(&list), vec![Some(1), Some(20), Some(30), Some(4)]);
    }

    #[test]
    fn partial_fill_keeps_unresolved_positions() {
        let mut list = SparseList::new();
        list.fill(0, vec![1, 2]).unwrap();
        list.fill_partial(1, vec![None, Some(3), None]).unwrap();

        assert_eq!(values(&list), vec![Some(1), Some(2), Some(3), None]);
        assert_eq!(list.count(), 4);
    }

    #[test]
    fn total_tracks_has_more() {
        let mut list = SparseList::new();
        list.set_total_item_count(10);
        list.fill(0, vec![1, 2, 3]).unwrap();

        assert_eq!(list.count(), 3);
        assert!(list.has_more_items());

        list.fill(3, (4..=10).collect()).unwrap();
        assert!(!list.has_more_items());
    }

    #[test]
    fn total_never_below_count() {
        let mut list = SparseList::new();
        list.fill(0, vec![1, 2, 3]).unwrap();
        list.set_total_item_count(1);
        assert_eq!(list.total_item_count(), 3);
    }

    #[test]
    fn insert_shifts_and_grows_total() {
        let mut list = SparseList::new();
        list.set_total_item_count(5);
        list.fill(0, vec![1, 2]).unwrap();

        let at = list.insert(1, vec![9, 8]);

        assert_eq!(at, 1);
        assert_eq!(values(&list), vec![Some(1), Some(9), Some(8), Some(2)]);
        assert_eq!(list.total_item_count(), 7);
    }

    #[test]
    fn insert_past_end_clamps() {
        let mut list = SparseList::new();
        list.fill(0, vec![1]).unwrap();
        assert_eq!(list.insert(10, vec![2]), 1);
    }

    #[test]
    fn remove_returns_slots() {
        let mut list = SparseList::new();
        list.fill(1, vec![2, 3]).unwrap();

        let removed = list.remove(0, 2).unwrap();

        assert_eq!(removed, vec![None, Some(2)]);
        assert_eq!(values(&list), vec![Some(3)]);
        assert_eq!(list.total_item_count(), 1);
    }

    #[test]
    fn remove_out_of_range_fails() {
        let mut list = SparseList::new();
        list.fill(0, vec![1]).unwrap();
        let err = list.remove(0, 2).unwrap_err();
        assert_eq!(
            err,
            SparseError::OutOfRange {
                start: 0,
                end: 2,
                count: 1
            }
        );
    }

    #[test]
    fn move_range_to_front() {
        let mut list = SparseList::new();
        list.fill(0, vec![1, 2, 3, 4]).unwrap();

        let to = list.move_range(2, 2, 0).unwrap();

        assert_eq!(to, 0);
        assert_eq!(values(&list), vec![Some(3), Some(4), Some(1), Some(2)]);
        assert_eq!(list.total_item_count(), 4);
    }

    #[test]
    fn overflowing_fill_is_rejected() {
        let mut list = SparseList::new();
        list.fill(0, vec![1]).unwrap();

        let err = list.fill(usize::MAX, vec![2, 3]).unwrap_err();

        assert_eq!(
            err,
            SparseError::OutOfRange {
                start: usize::MAX,
                end: usize::MAX,
                count: 1
            }
        );
        assert_eq!(values(&list), vec![Some(1)]);
    }

    #[test]
    fn overflowing_ranges_are_out_of_range() {
        let mut list = SparseList::new();
        list.fill(0, vec![1, 2]).unwrap();

        assert!(matches!(
            list.remove(1, usize::MAX),
            Err(SparseError::OutOfRange { start: 1, end: usize::MAX, count: 2 })
        ));
        assert!(matches!(
            list.move_range(usize::MAX, 2, 0),
            Err(SparseError::OutOfRange { .. })
        ));
        assert_eq!(values(&list), vec![Some(1), Some(2)]);
    }

    #[test]
    fn next_unloaded_finds_first_hole() {
        let mut list = SparseList::new();
        list.fill(0, vec![1, 2]).unwrap();
        list.fill(4, vec![5]).unwrap();

        assert_eq!(list.next_unloaded(0), 2);
        assert_eq!(list.next_unloaded(4), 5);
    }
}
