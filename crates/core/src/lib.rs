//! Core library for the PSScript agent runtime
//!
//! This crate contains the records and registries the run engine drives:
//! - Tool registration and per-agent enablement
//! - Agent definitions
//! - Conversation threads and their messages
//! - Run records and their lifecycle

pub mod agent;
pub mod error;
pub mod repository;
pub mod run;
pub mod thread;
pub mod tool;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Free-form key/value metadata attached to records
pub type Metadata = serde_json::Map<String, serde_json::Value>;
