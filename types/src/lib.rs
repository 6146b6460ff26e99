//! Core domain types for flint.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies: document snapshots, the line/column resolver that anchors
//! analyzer output to byte offsets, and the diagnostic record handed to the
//! host.

mod diagnostic;
mod document;
mod ids;
mod position;

pub use diagnostic::{Diagnostic, Severity};
pub use document::Document;
pub use ids::{DocumentId, RunId};
pub use position::{ColumnUnit, LineIndex};
