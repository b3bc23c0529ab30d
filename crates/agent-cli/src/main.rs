//! Command line entry point for the PSScript agent runtime
//!
//! Sends one prompt to the PSScriptGPT agent and prints its answer.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use secrecy::SecretString;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_runner::{EngineConfig, OpenAiConfig, OpenAiGateway, Orchestrator};
use psscript_core::agent::NewAgent;
use psscript_core::run::RunStatus;
use psscript_core::thread::MessageRole;

/// Extra time granted on top of the run timeout before giving up on a run
const WAIT_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_cli=info,agent_runner=info,psscript_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        eprintln!("usage: agent-cli <prompt...>");
        return Ok(ExitCode::from(2));
    }

    let config = EngineConfig::from_env();
    let gateway = OpenAiGateway::new(OpenAiConfig::from_env());
    let orchestrator = Orchestrator::in_memory(Arc::new(gateway), config.clone());

    let agent = orchestrator
        .create_agent(
            NewAgent::named("PSScriptGPT")
                .with_description("A PowerShell scripting assistant.")
                .with_capability("script-analysis")
                .with_capability("security")
                .with_capability("documentation"),
        )
        .await
        .context("Failed to create agent")?;

    let thread = orchestrator
        .create_thread(agent.id, Some(prompt))
        .await
        .context("Failed to create thread")?;

    let credential = std::env::var("PSSCRIPT_RUN_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
        .map(SecretString::from);

    let run = orchestrator
        .create_run(thread.id, credential)
        .await
        .context("Failed to start run")?;
    tracing::info!("Run {} started on model {}", run.id, agent.model);

    let run = orchestrator
        .wait_for_run(run.id, config.run_timeout.saturating_add(WAIT_GRACE))
        .await
        .context("Run did not finish")?;

    let thread = orchestrator
        .get_thread(thread.id)
        .await?
        .context("Thread disappeared")?;
    if let Some(reply) = thread
        .last_message()
        .filter(|m| m.role == MessageRole::Assistant)
        .and_then(|m| m.text())
    {
        println!("{}", reply);
    }

    if run.status == RunStatus::Completed {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(
            "Run {} ended as {:?}: {}",
            run.id,
            run.status,
            run.error().unwrap_or("no error recorded")
        );
        Ok(ExitCode::FAILURE)
    }
}
