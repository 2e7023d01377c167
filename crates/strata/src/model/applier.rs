//! UI-side application of finished diffs.
//!
//! [`ViewApplier`] owns the *rendered* model: the value the live view
//! currently reflects. It is only ever touched from the UI thread, so it
//! needs no lock. Each incoming [`ApplyRequest`] is gated by sequence number
//! and then either animated as one batch or degraded to a full reload.

use std::sync::Arc;

use strata_core::logging::{span_names, targets};

use super::diff::{Diff, SectionChange};
use super::position::Position;
use super::scheduler::ApplyRequest;
use super::sections::Sections;
use super::store::Versioned;
use super::view::{ListView, ViewOp};

/// What an apply call did to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyOutcome {
    /// The request was older than what is already displayed and was dropped.
    Stale,
    /// The rendered model advanced but the view needed no operations.
    Unchanged,
    /// One batch of incremental operations was issued.
    Animated,
    /// The view was fully reloaded (or no view is bound).
    Reloaded,
    /// A single move operation was issued.
    Moved,
}

/// Builds the operation batch for `diff` in the fixed apply order: section
/// change, row reloads, row deletes, row inserts. Empty groups are omitted.
pub fn batch_for(diff: &Diff) -> Vec<ViewOp> {
    let mut ops = Vec::with_capacity(4);
    match &diff.section_change {
        SectionChange::None => {}
        SectionChange::Insert(range) => ops.push(ViewOp::InsertSections(range.clone())),
        SectionChange::Delete(range) => ops.push(ViewOp::DeleteSections(range.clone())),
    }
    let groups: [(fn(Vec<Position>) -> ViewOp, _); 3] = [
        (ViewOp::ReloadRows, &diff.updates),
        (ViewOp::DeleteRows, &diff.deletes),
        (ViewOp::InsertRows, &diff.inserts),
    ];
    for (op, positions) in groups {
        if !positions.is_empty() {
            ops.push(op(positions.iter().copied().collect()));
        }
    }
    ops
}

/// Holds the rendered model and applies updates to a [`ListView`].
pub struct ViewApplier<T> {
    rendered: Arc<Sections<T>>,
    rendered_sequence: u64,
}

impl<T> ViewApplier<T> {
    /// Creates an applier whose view already shows `initial`.
    pub fn new(initial: Versioned<T>) -> Self {
        Self {
            rendered: initial.model,
            rendered_sequence: initial.sequence,
        }
    }

    /// The model the view currently reflects.
    pub fn rendered(&self) -> &Arc<Sections<T>> {
        &self.rendered
    }

    /// Sequence number of the rendered model.
    pub fn rendered_sequence(&self) -> u64 {
        self.rendered_sequence
    }

    /// Applies a finished diff.
    ///
    /// Requests at or below the rendered sequence are dropped. The diff is
    /// animated only when the view is presentable and the diff was computed
    /// against exactly the rendered model; every other case reloads.
    pub fn apply<V>(&mut self, view: Option<&mut V>, request: ApplyRequest<T>) -> ApplyOutcome
    where
        V: ListView<T> + ?Sized,
    {
        let _span = tracing::trace_span!(span_names::APPLY, sequence = request.sequence).entered();

        if request.sequence <= self.rendered_sequence {
            tracing::debug!(
                target: targets::APPLIER,
                sequence = request.sequence,
                rendered = self.rendered_sequence,
                "discarding stale diff"
            );
            return ApplyOutcome::Stale;
        }

        let Some(view) = view else {
            self.advance(request.sequence, request.model);
            return ApplyOutcome::Reloaded;
        };

        if !view.is_presentable() {
            tracing::debug!(target: targets::APPLIER, sequence = request.sequence, "view not presentable, reloading");
            return self.reload_view(view, request.sequence, request.model);
        }

        if request.base_sequence != self.rendered_sequence {
            tracing::debug!(
                target: targets::APPLIER,
                base = request.base_sequence,
                rendered = self.rendered_sequence,
                "diff base was never displayed, reloading"
            );
            return self.reload_view(view, request.sequence, request.model);
        }

        debug_assert!(
            request.diff.maps(&*self.rendered, &*request.model),
            "diff for sequence {} does not map the rendered model (sequence {}) onto the new one",
            request.sequence,
            self.rendered_sequence,
        );

        self.advance(request.sequence, request.model);
        if request.diff.is_empty() {
            return ApplyOutcome::Unchanged;
        }

        let ops = batch_for(&request.diff);
        tracing::trace!(target: targets::APPLIER, sequence = self.rendered_sequence, ops = ops.len(), "applying batch");
        view.perform_batch(&self.rendered, &ops);
        ApplyOutcome::Animated
    }

    /// Applies a committed move of one row.
    ///
    /// `base_sequence` is the committed sequence the move was derived from.
    /// When that is what the view shows and the view is presentable, a single
    /// [`ViewOp::MoveRow`] is issued; otherwise the view reloads `next`.
    pub fn apply_move<V>(
        &mut self,
        view: Option<&mut V>,
        base_sequence: u64,
        next: Versioned<T>,
        from: Position,
        to: Position,
    ) -> ApplyOutcome
    where
        V: ListView<T> + ?Sized,
    {
        if next.sequence <= self.rendered_sequence {
            return ApplyOutcome::Stale;
        }

        let Some(view) = view else {
            self.advance(next.sequence, next.model);
            return ApplyOutcome::Reloaded;
        };

        if !view.is_presentable() || base_sequence != self.rendered_sequence {
            tracing::debug!(
                target: targets::APPLIER,
                base = base_sequence,
                rendered = self.rendered_sequence,
                "move cannot be animated, reloading"
            );
            return self.reload_view(view, next.sequence, next.model);
        }

        self.advance(next.sequence, next.model);
        view.perform_batch(&self.rendered, &[ViewOp::MoveRow { from, to }]);
        ApplyOutcome::Moved
    }

    /// Unconditionally shows `latest`, reloading the view if one is bound.
    ///
    /// Does nothing if `latest` is not newer than the rendered model.
    pub fn resync<V>(&mut self, view: Option<&mut V>, latest: Versioned<T>) -> ApplyOutcome
    where
        V: ListView<T> + ?Sized,
    {
        if latest.sequence <= self.rendered_sequence {
            return ApplyOutcome::Stale;
        }
        match view {
            Some(view) => self.reload_view(view, latest.sequence, latest.model),
            None => {
                self.advance(latest.sequence, latest.model);
                ApplyOutcome::Reloaded
            }
        }
    }

    fn reload_view<V>(&mut self, view: &mut V, sequence: u64, model: Arc<Sections<T>>) -> ApplyOutcome
    where
        V: ListView<T> + ?Sized,
    {
        self.advance(sequence, model);
        view.reload_data(&self.rendered);
        ApplyOutcome::Reloaded
    }

    fn advance(&mut self, sequence: u64, model: Arc<Sections<T>>) {
        self.rendered = model;
        self.rendered_sequence = sequence;
    }
}

impl<T> std::fmt::Debug for ViewApplier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewApplier")
            .field("rendered_sequence", &self.rendered_sequence)
            .field("shape", &self.rendered.shape())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::diff::diff_eq;

    #[derive(Default)]
    struct Recorder {
        presentable: bool,
        reloads: Vec<Vec<usize>>,
        batches: Vec<Vec<ViewOp>>,
    }

    impl ListView<&'static str> for Recorder {
        fn is_presentable(&self) -> bool {
            self.presentable
        }

        fn reload_data(&mut self, model: &Sections<&'static str>) {
            self.reloads.push(model.shape());
        }

        fn perform_batch(&mut self, _model: &Sections<&'static str>, ops: &[ViewOp]) {
            self.batches.push(ops.to_vec());
        }
    }

    fn versioned(sequence: u64, model: Vec<Vec<&'static str>>) -> Versioned<&'static str> {
        Versioned {
            sequence,
            model: Arc::new(Sections::from(model)),
        }
    }

    fn request(base: &Versioned<&'static str>, next: &Versioned<&'static str>) -> ApplyRequest<&'static str> {
        ApplyRequest {
            sequence: next.sequence,
            base_sequence: base.sequence,
            model: next.model.clone(),
            diff: diff_eq(&base.model, &next.model),
        }
    }

    #[test]
    fn test_batch_order() {
        let old = Sections::from(vec![vec!["a", "b", "c"], vec!["x"]]);
        let new = Sections::from(vec![vec!["z"]]);
        let ops = batch_for(&diff_eq(&old, &new));
        let kinds: Vec<_> = ops.iter().map(ViewOp::kind).collect();
        assert_eq!(kinds, vec!["delete_sections", "reload_rows", "delete_rows"]);

        let old = Sections::from(vec![vec!["a", "b"]]);
        let new = Sections::from(vec![vec!["q"], vec!["r"]]);
        let ops = batch_for(&diff_eq(&old, &new));
        assert_eq!(
            ops,
            vec![
                ViewOp::InsertSections(1..2),
                ViewOp::ReloadRows(vec![Position::new(0, 0)]),
                ViewOp::DeleteRows(vec![Position::new(0, 1)]),
                ViewOp::InsertRows(vec![Position::new(1, 0)]),
            ]
        );
    }

    #[test]
    fn test_presentable_view_gets_one_batch() {
        let base = versioned(0, vec![vec!["x"]]);
        let next = versioned(1, vec![vec!["x", "y"]]);
        let mut applier = ViewApplier::new(base.clone());
        let mut view = Recorder {
            presentable: true,
            ..Default::default()
        };

        let outcome = applier.apply(Some(&mut view), request(&base, &next));
        assert_eq!(outcome, ApplyOutcome::Animated);
        assert_eq!(view.batches, vec![vec![ViewOp::InsertRows(vec![Position::new(0, 1)])]]);
        assert!(view.reloads.is_empty());
        assert_eq!(applier.rendered_sequence(), 1);
        assert_eq!(**applier.rendered(), *next.model);
    }

    #[test]
    fn test_hidden_view_reloads_once() {
        let base = versioned(0, vec![vec!["a", "b"], vec!["c"]]);
        let next = versioned(1, vec![vec!["b"], vec!["c", "d"], vec!["e"]]);
        let mut applier = ViewApplier::new(base.clone());
        let mut view = Recorder::default();

        let outcome = applier.apply(Some(&mut view), request(&base, &next));
        assert_eq!(outcome, ApplyOutcome::Reloaded);
        assert_eq!(view.reloads, vec![vec![1, 2, 1]]);
        assert!(view.batches.is_empty());
        assert_eq!(**applier.rendered(), *next.model);
    }

    #[test]
    fn test_stale_request_is_dropped() {
        let base = versioned(0, vec![vec!["a"]]);
        let first = versioned(1, vec![vec!["b"]]);
        let second = versioned(2, vec![vec!["c"]]);
        let mut applier = ViewApplier::new(base.clone());
        let mut view = Recorder {
            presentable: true,
            ..Default::default()
        };

        assert_eq!(applier.apply(Some(&mut view), request(&first, &second)), ApplyOutcome::Reloaded);
        assert_eq!(applier.apply(Some(&mut view), request(&base, &first)), ApplyOutcome::Stale);
        assert_eq!(**applier.rendered(), *second.model);
        assert_eq!(view.reloads.len(), 1);
    }

    #[test]
    fn test_base_mismatch_reloads() {
        // The diff for sequence 1 was coalesced away; sequence 2 was diffed
        // against it, so its diff cannot be animated from sequence 0.
        let base = versioned(0, vec![vec!["a"]]);
        let skipped = versioned(1, vec![vec!["a", "b", "c"]]);
        let next = versioned(2, vec![vec!["a", "b", "c", "d"]]);
        let mut applier = ViewApplier::new(base);
        let mut view = Recorder {
            presentable: true,
            ..Default::default()
        };

        assert_eq!(applier.apply(Some(&mut view), request(&skipped, &next)), ApplyOutcome::Reloaded);
        assert!(view.batches.is_empty());
        assert_eq!(view.reloads, vec![vec![4]]);
    }

    #[test]
    fn test_empty_diff_issues_nothing() {
        let base = versioned(0, vec![vec!["a"]]);
        let next = versioned(1, vec![vec!["a"]]);
        let mut applier = ViewApplier::new(base.clone());
        let mut view = Recorder {
            presentable: true,
            ..Default::default()
        };

        assert_eq!(applier.apply(Some(&mut view), request(&base, &next)), ApplyOutcome::Unchanged);
        assert!(view.batches.is_empty() && view.reloads.is_empty());
        assert_eq!(applier.rendered_sequence(), 1);
    }

    #[test]
    fn test_no_view_advances_rendered() {
        let base = versioned(0, vec![vec!["a"]]);
        let next = versioned(1, vec![vec!["b"]]);
        let mut applier = ViewApplier::new(base.clone());

        let outcome = applier.apply(None::<&mut Recorder>, request(&base, &next));
        assert_eq!(outcome, ApplyOutcome::Reloaded);
        assert_eq!(applier.rendered_sequence(), 1);
    }

    #[test]
    fn test_move_animates_or_reloads() {
        let base = versioned(0, vec![vec!["a", "b"]]);
        let moved = versioned(1, vec![vec!["b", "a"]]);
        let mut applier = ViewApplier::new(base);
        let mut view = Recorder {
            presentable: true,
            ..Default::default()
        };

        let (from, to) = (Position::new(0, 0), Position::new(0, 1));
        assert_eq!(applier.apply_move(Some(&mut view), 0, moved, from, to), ApplyOutcome::Moved);
        assert_eq!(view.batches, vec![vec![ViewOp::MoveRow { from, to }]]);

        view.presentable = false;
        let again = versioned(2, vec![vec!["a", "b"]]);
        assert_eq!(applier.apply_move(Some(&mut view), 1, again, to, from), ApplyOutcome::Reloaded);
        assert_eq!(view.reloads, vec![vec![2]]);
        assert_eq!(view.batches.len(), 1);
    }

    #[test]
    fn test_resync_only_moves_forward() {
        let mut applier = ViewApplier::new(versioned(3, vec![vec!["a"]]));
        let mut view = Recorder::default();
        assert_eq!(applier.resync(Some(&mut view), versioned(3, vec![])), ApplyOutcome::Stale);
        assert_eq!(applier.resync(Some(&mut view), versioned(4, vec![vec![]])), ApplyOutcome::Reloaded);
        assert_eq!(view.reloads, vec![vec![0]]);
    }
}
