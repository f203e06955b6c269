//! Shared data model, error taxonomy, and configuration for the voice
//! survey gateway. Every other crate in this workspace depends on this one;
//! it depends on nothing in the workspace.

pub mod config;
pub mod credential;
pub mod error;
pub mod prompt;
pub mod questionnaire;
pub mod rate_limit;
pub mod session;
pub mod tool;
pub mod upstream_connection;

pub use error::{Error, ErrorCode, Result};
