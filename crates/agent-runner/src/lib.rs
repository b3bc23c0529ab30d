//! Agent Runner - asynchronous run engine for agent threads
//!
//! This crate turns a conversation thread into a tracked unit of work
//! against a language-model gateway: it composes the prompt, races the
//! gateway call against a timeout, writes the reply back into the thread
//! and keeps each run's credential alive only while that run is processed.

mod config;
mod credentials;
mod engine;
mod error;
mod event;
mod gateway;
mod orchestrator;
mod prompt;

pub use config::EngineConfig;
pub use credentials::{CredentialLease, CredentialVault};
pub use engine::RunEngine;
pub use error::{Result, RunnerError};
pub use event::{RunEvent, RunEventKind};
pub use gateway::{ChatMessage, ChatRole, GatewayError, ModelGateway, OpenAiConfig, OpenAiGateway};
pub use orchestrator::Orchestrator;
pub use prompt::{build_conversation, system_instruction, POWERSHELL_PREAMBLE};
