//! Single-flight external analyzer runs for open documents.
//!
//! [`CheckController`] launches one analyzer process per document, streams
//! the document snapshot to its stdin, and parses the captured report into
//! [`Diagnostic`](flint_types::Diagnostic)s with [`parse_report`]. Starting
//! a new check for a document kills the previous one; only the latest run's
//! callback ever fires.

pub mod report;
pub mod types;

pub(crate) mod run;

mod controller;

pub use controller::CheckController;
pub use report::parse_report;
pub use types::{CheckError, CheckerConfig, RunOutcome, RunState, find_project_root};
