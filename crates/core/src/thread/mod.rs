//! Thread module
//!
//! Conversations scoped to one agent, and their append-only message logs.

mod model;
mod store;

pub use model::*;
pub use store::ThreadStore;
