//! examkit-store: file-backed collaborators for the assessment core.
//!
//! Provides a JSON implementation of the core's `Store` trait, TOML
//! configuration loading, and the TOML test-bank format used for authoring.

pub mod bank;
pub mod config;
pub mod json;

pub use config::{load_config, load_config_from, ExamkitConfig};
pub use json::JsonFileStore;
