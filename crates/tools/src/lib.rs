//! Tool dispatcher.

pub mod handlers;
pub mod registry;
pub mod sanitize;
pub mod schema;

pub use registry::{DispatchOutcome, ToolDefinition, ToolHandler, ToolRegistry};
pub use schema::Schema;
