//! Tool module
//!
//! Callable capability descriptors, their invocations, and the registry
//! that grants them to agents.

mod model;
mod registry;

pub use model::*;
pub use registry::ToolRegistry;
