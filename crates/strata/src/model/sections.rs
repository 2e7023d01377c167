//! The sectioned list model value.
//!
//! `Sections<T>` is an ordered list of sections, each an ordered list of
//! items. It is an immutable-by-convention value: the pipeline shares it as
//! `Arc<Sections<T>>` and replaces it wholesale instead of editing in place.
//!
//! All accessors are bounds-safe. Views query row counts and items from
//! callbacks that may race a model swap, so out-of-range lookups return a
//! default (`0`, `None`, `false`) instead of panicking.

use super::position::Position;

/// An ordered sequence of sections, each an ordered sequence of items.
///
/// # Example
///
/// ```
/// use strata::model::{Position, Sections};
///
/// let model = Sections::from(vec![vec!["a", "b"], vec!["c"]]);
///
/// assert_eq!(model.section_count(), 2);
/// assert_eq!(model.row_count(0), 2);
/// assert_eq!(model.row_count(9), 0);
/// assert_eq!(model.get(Position::new(1, 0)), Some(&"c"));
/// assert_eq!(model.get(Position::new(1, 5)), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sections<T> {
    sections: Vec<Vec<T>>,
}

impl<T> Default for Sections<T> {
    /// A single empty section, the shape an unpopulated list view starts with.
    fn default() -> Self {
        Self {
            sections: vec![Vec::new()],
        }
    }
}

impl<T> Sections<T> {
    /// Creates a model from a list of sections.
    pub fn new(sections: Vec<Vec<T>>) -> Self {
        Self { sections }
    }

    /// Creates a model with no sections at all.
    pub fn empty() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    /// Creates a model with one section holding `rows`.
    pub fn single(rows: Vec<T>) -> Self {
        Self {
            sections: vec![rows],
        }
    }

    /// Returns the number of sections.
    #[inline]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Returns the number of rows in `section`, or 0 if there is no such section.
    #[inline]
    pub fn row_count(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, Vec::len)
    }

    /// Returns the number of rows across all sections.
    pub fn total_rows(&self) -> usize {
        self.sections.iter().map(Vec::len).sum()
    }

    /// Returns `true` if there are no rows in any section.
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(Vec::is_empty)
    }

    /// Returns the rows of `section`, or `None` if out of range.
    pub fn section(&self, section: usize) -> Option<&[T]> {
        self.sections.get(section).map(Vec::as_slice)
    }

    /// Returns the item at `position`, or `None` if out of range.
    #[inline]
    pub fn get(&self, position: Position) -> Option<&T> {
        self.sections.get(position.section)?.get(position.row)
    }

    /// Returns `true` if an item exists at `position`.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        position.row < self.row_count(position.section)
    }

    /// Iterates over the sections as slices.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[T]> {
        self.sections.iter().map(Vec::as_slice)
    }

    /// Returns the per-section row counts.
    pub fn shape(&self) -> Vec<usize> {
        self.sections.iter().map(Vec::len).collect()
    }

    /// Borrows the underlying sections.
    pub fn as_slice(&self) -> &[Vec<T>] {
        &self.sections
    }

    /// Consumes the model, returning the underlying sections.
    pub fn into_inner(self) -> Vec<Vec<T>> {
        self.sections
    }

    /// Returns `true` if `from -> to` is a valid single-row move.
    ///
    /// `from` must name an existing row. `to` is the row's final position:
    /// within the same section it must name an existing row, in another
    /// section it may also be one past the last row (append).
    pub fn can_move(&self, from: Position, to: Position) -> bool {
        if !self.contains(from) || to.section >= self.section_count() {
            return false;
        }
        if from.section == to.section {
            to.row < self.row_count(to.section)
        } else {
            to.row <= self.row_count(to.section)
        }
    }
}

impl<T: Clone> Sections<T> {
    /// Returns a copy with the row at `from` relocated to `to`.
    ///
    /// Returns `None` when the move is out of range (see [`can_move`](Self::can_move))
    /// or when `from == to`.
    pub fn moved(&self, from: Position, to: Position) -> Option<Self> {
        if from == to || !self.can_move(from, to) {
            return None;
        }
        let mut sections = self.sections.clone();
        let item = sections[from.section].remove(from.row);
        sections[to.section].insert(to.row, item);
        Some(Self { sections })
    }
}

impl<T> From<Vec<Vec<T>>> for Sections<T> {
    fn from(sections: Vec<Vec<T>>) -> Self {
        Self::new(sections)
    }
}

impl<T> FromIterator<Vec<T>> for Sections<T> {
    fn from_iter<I: IntoIterator<Item = Vec<T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> Sections<&'static str> {
        Sections::from(vec![vec!["a", "b", "c"], vec!["d"], vec![]])
    }

    #[test]
    fn test_default_is_one_empty_section() {
        let model = Sections::<i32>::default();
        assert_eq!(model.section_count(), 1);
        assert_eq!(model.row_count(0), 0);
        assert!(model.is_empty());
        assert_eq!(Sections::<i32>::empty().section_count(), 0);
    }

    #[test]
    fn test_bounds_safe_accessors() {
        let model = model();
        assert_eq!(model.row_count(0), 3);
        assert_eq!(model.row_count(2), 0);
        assert_eq!(model.row_count(3), 0);
        assert_eq!(model.get(Position::new(0, 2)), Some(&"c"));
        assert_eq!(model.get(Position::new(0, 3)), None);
        assert_eq!(model.get(Position::new(7, 0)), None);
        assert!(model.section(7).is_none());
        assert_eq!(model.total_rows(), 4);
        assert_eq!(model.shape(), vec![3, 1, 0]);
    }

    #[test]
    fn test_move_within_section() {
        let moved = model()
            .moved(Position::new(0, 0), Position::new(0, 2))
            .unwrap();
        assert_eq!(moved.section(0), Some(&["b", "c", "a"][..]));
    }

    #[test]
    fn test_move_across_sections_allows_append() {
        let moved = model()
            .moved(Position::new(0, 1), Position::new(2, 0))
            .unwrap();
        assert_eq!(moved.shape(), vec![2, 1, 1]);
        assert_eq!(moved.get(Position::new(2, 0)), Some(&"b"));

        let moved = model()
            .moved(Position::new(1, 0), Position::new(0, 3))
            .unwrap();
        assert_eq!(moved.section(0), Some(&["a", "b", "c", "d"][..]));
    }

    #[test]
    fn test_move_out_of_range_is_rejected() {
        let model = model();
        assert!(model.moved(Position::new(0, 5), Position::new(0, 0)).is_none());
        assert!(model.moved(Position::new(0, 0), Position::new(0, 3)).is_none());
        assert!(model.moved(Position::new(0, 0), Position::new(3, 0)).is_none());
        assert!(model.moved(Position::new(0, 0), Position::new(1, 2)).is_none());
        assert!(model.moved(Position::new(1, 0), Position::new(1, 0)).is_none());
    }

    #[test]
    fn test_collect() {
        let model: Sections<u8> = (0..3).map(|n| vec![n; n as usize]).collect();
        assert_eq!(model.shape(), vec![0, 1, 2]);
    }
}
