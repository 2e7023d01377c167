//! Strata - diff-driven updates for sectioned list views.
//!
//! A list view shows a model made of sections of rows. When the model is
//! replaced, Strata computes the positional difference on a background
//! thread and applies it to the view as one ordered batch of structural
//! operations, dropping results that a newer model has already overtaken.
//!
//! The threading primitives live in `strata-core` and are re-exported here.
//!
//! # Example
//!
//! ```
//! use strata::model::{diff_eq, Position, SectionChange, Sections};
//!
//! let old = Sections::from(vec![vec!["a"]]);
//! let new = Sections::from(vec![vec!["a"], vec!["b"]]);
//!
//! let d = diff_eq(&old, &new);
//! assert_eq!(d.section_change, SectionChange::Insert(1..2));
//! assert!(d.inserts.contains(&Position::new(1, 0)));
//! ```

pub use strata_core::*;

pub mod model;

pub use model::{
    BindingBuilder, BindingConfig, LifecycleEvent, ListBinding, ListView, ModelHandle, Position,
    Sections, ViewOp,
};
