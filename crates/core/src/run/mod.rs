mod run_model;

pub use run_model::{Run, RunMetadata, RunStatus};
