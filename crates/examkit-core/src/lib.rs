//! examkit-core: assessment tests, sessions, grading and history.
//!
//! This crate defines the assessment data model, the pluggable grading
//! rules, the test-taking state machine, the fixed exam-processing pipeline,
//! metadata undo/redo, and grade aggregation. Persistence is reached only
//! through the [`traits::Store`] boundary.

pub mod aggregate;
pub mod error;
pub mod history;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod rules;
pub mod session;
pub mod traits;

pub use error::{AssessmentError, Result};
