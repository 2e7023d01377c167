//! Positional diff between two sectioned models.
//!
//! Computes the structural edit that turns an old [`Sections`] value into a
//! new one, expressed the way list views consume it: a section-level insert
//! or delete plus sets of row inserts, reloads, and deletes. This is a pure
//! algorithm module with no shared state and no I/O.
//!
//! # Algorithm
//!
//! 1. Compare section counts. Extra sections in `new` are a section insert
//!    (and every row in them a row insert); missing ones are a section delete
//!    (their rows are not listed individually).
//! 2. Pair the common sections by index. Within a pair, rows past the end of
//!    the new section are deletes, rows past the end of the old section are
//!    inserts, and rows present in both are updates when `matches` says they
//!    differ.
//!
//! # Known Limitation
//!
//! Slots are paired by index, never by content. Inserting or removing a row
//! in the middle of a section shifts every later row, which is reported as
//! a run of updates followed by one insert or delete at the tail, not as a
//! single interior insert/delete. Views still end up correct (they reload the
//! shifted rows); only the animation is coarser.
//!
//! # Complexity
//!
//! - Time: O(rows in old + rows in new)
//! - Space: O(size of the produced diff)

use std::collections::BTreeSet;
use std::ops::Range;

use strata_core::logging::targets;

use super::position::Position;
use super::sections::Sections;

// =============================================================================
// Public Types
// =============================================================================

/// The section-level part of a [`Diff`].
///
/// Section counts can only grow or shrink in a single comparison, so at most
/// one of insert/delete is ever produced. The range always covers the tail:
/// sections are appended or truncated, never inserted in the middle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum SectionChange {
    /// Same number of sections.
    #[default]
    None,
    /// Sections in the range were appended.
    Insert(Range<usize>),
    /// Sections in the range were removed.
    Delete(Range<usize>),
}

impl SectionChange {
    /// Returns `true` for [`SectionChange::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The number of sections inserted or deleted.
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Insert(range) | Self::Delete(range) => range.len(),
        }
    }
}

/// The structural edit between two models.
///
/// Positions in `updates` and `deletes` refer to the old model; positions in
/// `inserts` refer to the new one. Sets iterate in section-major order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Appended or truncated sections.
    pub section_change: SectionChange,
    /// Rows that exist only in the new model.
    pub inserts: BTreeSet<Position>,
    /// Rows present in both models whose items no longer match.
    pub updates: BTreeSet<Position>,
    /// Rows that exist only in the old model (outside deleted sections).
    pub deletes: BTreeSet<Position>,
}

impl Diff {
    /// Returns `true` if applying this diff would change nothing.
    pub fn is_empty(&self) -> bool {
        self.section_change.is_none()
            && self.inserts.is_empty()
            && self.updates.is_empty()
            && self.deletes.is_empty()
    }

    /// Total number of operations (sections plus rows).
    pub fn len(&self) -> usize {
        self.section_change.len() + self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    /// Checks that this diff turns a model shaped like `old` into one shaped
    /// like `new`.
    ///
    /// Only counts are compared, item contents are not. Used to catch a diff
    /// being applied against the wrong base model.
    pub fn maps<A, B>(&self, old: &Sections<A>, new: &Sections<B>) -> bool {
        let (old_count, new_count) = (old.section_count(), new.section_count());
        let sections_ok = match &self.section_change {
            SectionChange::None => old_count == new_count,
            SectionChange::Insert(range) => *range == (old_count..new_count),
            SectionChange::Delete(range) => *range == (new_count..old_count),
        };
        if !sections_ok {
            return false;
        }

        let common = old_count.min(new_count);
        let rows_ok = (0..common).all(|s| {
            let kept = old.row_count(s).checked_sub(count_in(&self.deletes, s));
            kept.map(|k| k + count_in(&self.inserts, s)) == Some(new.row_count(s))
        });
        let appended_ok = (common..new_count).all(|s| count_in(&self.inserts, s) == new.row_count(s));
        let updates_ok = self
            .updates
            .iter()
            .all(|p| p.section < common && old.contains(*p) && new.contains(*p));

        rows_ok && appended_ok && updates_ok
    }
}

fn count_in(set: &BTreeSet<Position>, section: usize) -> usize {
    set.range(Position::section_start(section)..Position::section_start(section + 1))
        .count()
}

// =============================================================================
// Diff Computation
// =============================================================================

/// Computes the positional diff from `old` to `new`.
///
/// `matches(new_item, old_item)` decides whether a slot present in both
/// models still holds "the same" item; when it returns `false` the slot is
/// reported as an update. It only affects update detection, never inserts or
/// deletes.
///
/// # Example
///
/// ```
/// use strata::model::{diff, Position, SectionChange, Sections};
///
/// let old = Sections::from(vec![vec!["x"]]);
/// let new = Sections::from(vec![vec!["y", "z"], vec!["w"]]);
///
/// let d = diff(&old, &new, |a, b| a == b);
/// assert_eq!(d.section_change, SectionChange::Insert(1..2));
/// assert!(d.updates.contains(&Position::new(0, 0)));
/// assert!(d.inserts.contains(&Position::new(0, 1)));
/// assert!(d.inserts.contains(&Position::new(1, 0)));
/// ```
#[tracing::instrument(skip_all, target = "strata::diff", level = "trace")]
pub fn diff<T, F>(old: &Sections<T>, new: &Sections<T>, matches: F) -> Diff
where
    F: Fn(&T, &T) -> bool,
{
    let mut result = Diff {
        section_change: section_change(old, new),
        ..Diff::default()
    };

    for (section, rows) in new.iter().enumerate().skip(old.section_count()) {
        result
            .inserts
            .extend((0..rows.len()).map(|row| Position::new(section, row)));
    }

    for (section, (old_rows, new_rows)) in old.iter().zip(new.iter()).enumerate() {
        let rows = diff_rows(section, old_rows, new_rows, &matches);
        result.deletes.extend(rows.deletes);
        result.inserts.extend(rows.inserts);
        result.updates.extend(rows.updates);
    }

    tracing::trace!(
        target: targets::DIFF,
        inserts = result.inserts.len(),
        updates = result.updates.len(),
        deletes = result.deletes.len(),
        sections = ?result.section_change,
        "diff computed"
    );
    result
}

/// Computes the positional diff using `==` as the match predicate.
pub fn diff_eq<T: PartialEq>(old: &Sections<T>, new: &Sections<T>) -> Diff {
    diff(old, new, |a, b| a == b)
}

/// Parallel variant of [`diff`]: common sections are compared on the rayon
/// pool. Produces exactly the same result.
#[cfg(feature = "parallel")]
pub fn diff_par<T, F>(old: &Sections<T>, new: &Sections<T>, matches: F) -> Diff
where
    T: Sync,
    F: Fn(&T, &T) -> bool + Sync,
{
    use rayon::prelude::*;

    let mut result = Diff {
        section_change: section_change(old, new),
        ..Diff::default()
    };

    for (section, rows) in new.iter().enumerate().skip(old.section_count()) {
        result
            .inserts
            .extend((0..rows.len()).map(|row| Position::new(section, row)));
    }

    let common = old.section_count().min(new.section_count());
    let per_section: Vec<RowChanges> = (0..common)
        .into_par_iter()
        .map(|section| {
            let old_rows = old.section(section).unwrap_or_default();
            let new_rows = new.section(section).unwrap_or_default();
            diff_rows(section, old_rows, new_rows, &matches)
        })
        .collect();

    for rows in per_section {
        result.deletes.extend(rows.deletes);
        result.inserts.extend(rows.inserts);
        result.updates.extend(rows.updates);
    }
    result
}

fn section_change<T>(old: &Sections<T>, new: &Sections<T>) -> SectionChange {
    let (old_count, new_count) = (old.section_count(), new.section_count());
    if new_count > old_count {
        SectionChange::Insert(old_count..new_count)
    } else if new_count < old_count {
        SectionChange::Delete(new_count..old_count)
    } else {
        SectionChange::None
    }
}

/// Row-level changes within one pair of sections.
#[derive(Default)]
struct RowChanges {
    inserts: Vec<Position>,
    updates: Vec<Position>,
    deletes: Vec<Position>,
}

fn diff_rows<T, F>(section: usize, old_rows: &[T], new_rows: &[T], matches: &F) -> RowChanges
where
    F: Fn(&T, &T) -> bool,
{
    let common = old_rows.len().min(new_rows.len());
    let at = |row| Position::new(section, row);

    RowChanges {
        deletes: (common..old_rows.len()).map(at).collect(),
        inserts: (common..new_rows.len()).map(at).collect(),
        updates: (0..common)
            .filter(|&row| !matches(&new_rows[row], &old_rows[row]))
            .map(at)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections(rows: &[&[&'static str]]) -> Sections<&'static str> {
        rows.iter().map(|s| s.to_vec()).collect()
    }

    fn positions(list: &[(usize, usize)]) -> BTreeSet<Position> {
        list.iter().copied().map(Position::from).collect()
    }

    #[test]
    fn test_identical_models_produce_empty_diff() {
        let model = sections(&[&["a", "b"], &[], &["c"]]);
        let d = diff_eq(&model, &model);
        assert!(d.is_empty());
        assert_eq!(d.len(), 0);
        assert_eq!(d.section_change, SectionChange::None);

        let empty = Sections::<&str>::empty();
        assert!(diff_eq(&empty, &empty).is_empty());
    }

    #[test]
    fn test_section_growth() {
        let d = diff_eq(&sections(&[&["a"]]), &sections(&[&["a"], &["b"]]));
        assert_eq!(d.section_change, SectionChange::Insert(1..2));
        assert_eq!(d.inserts, positions(&[(1, 0)]));
        assert!(d.updates.is_empty());
        assert!(d.deletes.is_empty());
    }

    #[test]
    fn test_section_shrink_does_not_list_rows() {
        let d = diff_eq(&sections(&[&["a"], &["b", "c"]]), &sections(&[&["a"]]));
        assert_eq!(d.section_change, SectionChange::Delete(1..2));
        assert!(d.deletes.is_empty());
        assert!(d.inserts.is_empty());
        assert!(d.updates.is_empty());
    }

    #[test]
    fn test_positional_update() {
        let d = diff_eq(&sections(&[&["x"]]), &sections(&[&["y"]]));
        assert_eq!(d.updates, positions(&[(0, 0)]));
        assert!(d.inserts.is_empty());
        assert!(d.deletes.is_empty());
    }

    #[test]
    fn test_row_insert_at_tail() {
        let d = diff_eq(&sections(&[&["x"]]), &sections(&[&["x", "y"]]));
        assert_eq!(d.inserts, positions(&[(0, 1)]));
        assert!(d.updates.is_empty());
        assert!(d.deletes.is_empty());
    }

    #[test]
    fn test_row_delete_at_tail() {
        let d = diff_eq(&sections(&[&["x", "y", "z"]]), &sections(&[&["x"]]));
        assert_eq!(d.deletes, positions(&[(0, 1), (0, 2)]));
        assert!(d.inserts.is_empty());
    }

    #[test]
    fn test_interior_insert_reports_shifted_updates() {
        let d = diff_eq(&sections(&[&["a", "c"]]), &sections(&[&["a", "b", "c"]]));
        assert_eq!(d.updates, positions(&[(0, 1)]));
        assert_eq!(d.inserts, positions(&[(0, 2)]));
    }

    #[test]
    fn test_custom_matcher_changes_only_updates() {
        let old = Sections::from(vec![vec![(1, "a"), (2, "b")]]);
        let new = Sections::from(vec![vec![(1, "A"), (2, "b"), (3, "c")]]);

        let by_value = diff(&old, &new, |a, b| a == b);
        assert_eq!(by_value.updates, positions(&[(0, 0)]));

        let by_id = diff(&old, &new, |a, b| a.0 == b.0);
        assert!(by_id.updates.is_empty());
        assert_eq!(by_id.inserts, by_value.inserts);
        assert_eq!(by_id.deletes, by_value.deletes);
    }

    #[test]
    fn test_matcher_argument_order_is_new_then_old() {
        let old = Sections::single(vec![1]);
        let new = Sections::single(vec![2]);
        let d = diff(&old, &new, |n, o| {
            assert_eq!((*n, *o), (2, 1));
            false
        });
        assert_eq!(d.updates.len(), 1);
    }

    #[test]
    fn test_mixed_changes() {
        let old = sections(&[&["a", "b", "c"], &["d"], &["gone"]]);
        let new = sections(&[&["a", "B"], &["d", "e", "f"]]);
        let d = diff_eq(&old, &new);

        assert_eq!(d.section_change, SectionChange::Delete(2..3));
        assert_eq!(d.updates, positions(&[(0, 1)]));
        assert_eq!(d.deletes, positions(&[(0, 2)]));
        assert_eq!(d.inserts, positions(&[(1, 1), (1, 2)]));
        assert_eq!(d.len(), 5);
        assert!(d.maps(&old, &new));
    }

    #[test]
    fn test_maps_detects_wrong_base() {
        let old = sections(&[&["a"]]);
        let new = sections(&[&["a", "b"]]);
        let d = diff_eq(&old, &new);

        assert!(d.maps(&old, &new));
        assert!(!d.maps(&new, &new));
        assert!(!d.maps(&sections(&[&["a"], &["z"]]), &new));
    }

    #[test]
    fn test_growth_from_nothing() {
        let d = diff_eq(&Sections::empty(), &sections(&[&["a", "b"], &[]]));
        assert_eq!(d.section_change, SectionChange::Insert(0..2));
        assert_eq!(d.inserts, positions(&[(0, 0), (0, 1)]));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let old: Sections<u32> = (0..50).map(|s| (0..s).collect()).collect();
        let new: Sections<u32> = (0..40).map(|s| (0..(s * 2) % 37).map(|r| r ^ 1).collect()).collect();
        assert_eq!(diff_par(&old, &new, |a, b| a == b), diff_eq(&old, &new));
    }
}
