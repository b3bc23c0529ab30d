//! Agent module
//!
//! Agent definitions and the registry that creates them.

mod model;
mod registry;

pub use model::*;
pub use registry::AgentRegistry;
