//! The outbound interface to a live list view.
//!
//! The pipeline never draws anything itself. It drives a [`ListView`]
//! implementation, which adapts whatever toolkit widget sits underneath
//! (a table, a collection view, a terminal list), through two calls: a full
//! reload, or one batch of structural operations.

use std::ops::Range;

use super::position::Position;
use super::sections::Sections;

/// One structural operation in an update batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewOp {
    /// Insert the sections in the range.
    InsertSections(Range<usize>),
    /// Delete the sections in the range.
    DeleteSections(Range<usize>),
    /// Reload the rows at these (old-model) positions.
    ReloadRows(Vec<Position>),
    /// Delete the rows at these (old-model) positions.
    DeleteRows(Vec<Position>),
    /// Insert rows at these (new-model) positions.
    InsertRows(Vec<Position>),
    /// Move a single row.
    MoveRow {
        /// Position before the move.
        from: Position,
        /// Position after the move.
        to: Position,
    },
}

impl ViewOp {
    /// A short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsertSections(_) => "insert_sections",
            Self::DeleteSections(_) => "delete_sections",
            Self::ReloadRows(_) => "reload_rows",
            Self::DeleteRows(_) => "delete_rows",
            Self::InsertRows(_) => "insert_rows",
            Self::MoveRow { .. } => "move_row",
        }
    }
}

/// A list view the pipeline can update.
///
/// All methods are called on the UI thread that owns the binding. `model`
/// is the binding's rendered model, already updated to the new value, so
/// data-source callbacks made while handling the call see the new shape.
///
/// # Example
///
/// ```
/// use strata::model::{ListView, Sections, ViewOp};
///
/// #[derive(Default)]
/// struct LoggingView {
///     visible: bool,
///     log: Vec<String>,
/// }
///
/// impl ListView<String> for LoggingView {
///     fn is_presentable(&self) -> bool {
///         self.visible
///     }
///
///     fn reload_data(&mut self, model: &Sections<String>) {
///         self.log.push(format!("reload {} rows", model.total_rows()));
///     }
///
///     fn perform_batch(&mut self, _model: &Sections<String>, ops: &[ViewOp]) {
///         for op in ops {
///             self.log.push(op.kind().to_string());
///         }
///     }
/// }
/// ```
pub trait ListView<T> {
    /// Returns `true` if the view can take animated incremental updates,
    /// typically because it is attached to a visible window.
    ///
    /// When this returns `false` the pipeline only ever calls
    /// [`reload_data`](Self::reload_data).
    fn is_presentable(&self) -> bool;

    /// Discards all displayed state and re-reads everything from `model`.
    fn reload_data(&mut self, model: &Sections<T>);

    /// Applies `ops` as one atomic batch, in order.
    ///
    /// For diff-driven batches the order is always: section change, row
    /// reloads, row deletes, row inserts.
    fn perform_batch(&mut self, model: &Sections<T>, ops: &[ViewOp]);
}

impl<T, V: ListView<T> + ?Sized> ListView<T> for Box<V> {
    fn is_presentable(&self) -> bool {
        (**self).is_presentable()
    }

    fn reload_data(&mut self, model: &Sections<T>) {
        (**self).reload_data(model);
    }

    fn perform_batch(&mut self, model: &Sections<T>, ops: &[ViewOp]) {
        (**self).perform_batch(model, ops);
    }
}
