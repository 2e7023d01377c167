//! Two-level positional coordinates.

use std::fmt;

/// The location of a row inside a sectioned list.
///
/// Rows are identified purely by where they sit, not by what they contain:
/// two items are "the same slot" across model versions iff they have equal
/// positions. Positions order section-first, then by row, which is the order
/// views expect batched row operations in.
///
/// # Example
///
/// ```
/// use strata::model::Position;
///
/// let first = Position::new(0, 3);
/// let second = Position::new(1, 0);
/// assert!(first < second);
/// assert_eq!(first.to_string(), "(0, 3)");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Index of the section.
    pub section: usize,
    /// Index of the row within its section.
    pub row: usize,
}

impl Position {
    /// Creates a position from a section and a row index.
    #[inline]
    pub const fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }

    /// The first position of a section. Useful as a range bound.
    #[inline]
    pub const fn section_start(section: usize) -> Self {
        Self { section, row: 0 }
    }
}

impl From<(usize, usize)> for Position {
    fn from((section, row): (usize, usize)) -> Self {
        Self::new(section, row)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.section, self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_section_major() {
        let mut positions = vec![
            Position::new(1, 0),
            Position::new(0, 2),
            Position::new(0, 0),
            Position::new(2, 1),
        ];
        positions.sort();
        assert_eq!(
            positions,
            vec![
                Position::new(0, 0),
                Position::new(0, 2),
                Position::new(1, 0),
                Position::new(2, 1),
            ]
        );
    }

    #[test]
    fn test_from_tuple() {
        assert_eq!(Position::from((3, 4)), Position::new(3, 4));
        assert_eq!(Position::section_start(5), Position::new(5, 0));
    }
}
