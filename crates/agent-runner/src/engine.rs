//! Run engine - processes runs against the model gateway
//!
//! A run is processed by a detached task. The task races the gateway call
//! against the run timeout and a cancellation signal, then finalizes in a
//! fixed order: the credential is released, the reply (or a failure notice)
//! is appended to the thread, and the terminal status is written last. A
//! reader that observes a terminal run therefore also observes its message
//! and never its credential.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use secrecy::SecretString;
use serde_json::json;
use tokio::sync::{broadcast, oneshot, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use psscript_core::agent::Agent;
use psscript_core::repository::{Repository, Stores};
use psscript_core::run::{Run, RunStatus};
use psscript_core::thread::{Message, ThreadStore};
use psscript_core::Error as CoreError;

use crate::config::EngineConfig;
use crate::credentials::{CredentialLease, CredentialVault};
use crate::error::{Result, RunnerError};
use crate::event::{RunEvent, RunEventKind};
use crate::gateway::ModelGateway;
use crate::prompt::build_conversation;

/// Minimum time `cancel_run` waits for a signalled run to settle
const CANCEL_SETTLE: Duration = Duration::from_secs(5);

/// Creates runs and drives them to a terminal state
#[derive(Clone)]
pub struct RunEngine {
    agents: Arc<dyn Repository<Agent>>,
    runs: Arc<dyn Repository<Run>>,
    threads: ThreadStore,
    gateway: Arc<dyn ModelGateway>,
    vault: Arc<CredentialVault>,
    /// Cancellation senders of runs still being processed
    aborts: Arc<RwLock<HashMap<Uuid, oneshot::Sender<()>>>>,
    events: broadcast::Sender<RunEvent>,
    config: EngineConfig,
}

impl RunEngine {
    pub fn new(stores: &Stores, gateway: Arc<dyn ModelGateway>, config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            agents: Arc::clone(&stores.agents),
            runs: Arc::clone(&stores.runs),
            threads: ThreadStore::new(Arc::clone(&stores.threads), Arc::clone(&stores.agents)),
            gateway,
            vault: Arc::new(CredentialVault::new()),
            aborts: Arc::new(RwLock::new(HashMap::new())),
            events,
            config,
        }
    }

    /// Start processing a thread
    ///
    /// Returns as soon as the run is recorded as in progress; the outcome is
    /// observable through [`get_run`](Self::get_run), the thread, or
    /// [`subscribe`](Self::subscribe).
    pub async fn create_run(&self, thread_id: Uuid, credential: Option<SecretString>) -> Result<Run> {
        let thread = self
            .threads
            .get_thread(thread_id)
            .await?
            .ok_or(CoreError::ThreadNotFound(thread_id))?;
        let agent = self
            .agents
            .get(thread.agent_id)
            .await?
            .ok_or(CoreError::AgentNotFound(thread.agent_id))?;

        let mut run = Run::new(thread.id, agent.id);
        run.metadata.model = Some(agent.model.clone());

        let lease = credential
            .map(|secret| self.vault.lease(run.id, secret))
            .transpose()?;

        run.mark_in_progress()?;
        let run = self.runs.put(run).await?;
        self.emit(RunEvent::status_changed(
            run.id,
            run.thread_id,
            RunStatus::Queued,
            RunStatus::InProgress,
        ));

        let (abort_tx, abort_rx) = oneshot::channel();
        self.aborts.write().await.insert(run.id, abort_tx);

        info!(
            "Starting run {} on thread {} with model {}",
            run.id, thread_id, agent.model
        );

        let engine = self.clone();
        let background = run.clone();
        tokio::spawn(async move {
            engine.process_run(background, lease, abort_rx).await;
        });

        Ok(run)
    }

    pub async fn get_run(&self, run_id: Uuid) -> Result<Option<Run>> {
        Ok(self.runs.get(run_id).await?)
    }

    /// Runs started on a thread, oldest first
    pub async fn list_runs(&self, thread_id: Uuid) -> Result<Vec<Run>> {
        let runs = self.runs.list().await?;
        Ok(runs.into_iter().filter(|r| r.thread_id == thread_id).collect())
    }

    /// Cancel a run that is still being processed
    ///
    /// The in-flight gateway call is dropped and the run ends `cancelled`
    /// without a message in the thread. A run that already finished, or
    /// whose reply arrived first, fails with an invalid transition.
    pub async fn cancel_run(&self, run_id: Uuid) -> Result<Run> {
        let run = self
            .get_run(run_id)
            .await?
            .ok_or(CoreError::RunNotFound(run_id))?;
        if run.is_terminal() {
            return Err(cancel_rejected(&run));
        }

        let abort = self.aborts.write().await.remove(&run_id);
        let delivered = match abort {
            Some(abort_tx) => abort_tx.send(()).is_ok(),
            None => false,
        };

        let settle = self.config.run_timeout.max(CANCEL_SETTLE);
        let run = self.wait_for_run(run_id, settle).await?;
        if delivered && run.status == RunStatus::Cancelled {
            Ok(run)
        } else {
            Err(cancel_rejected(&run))
        }
    }

    /// Poll until the run reaches a terminal state or `timeout` elapses
    ///
    /// A timeout too large to represent waits without a deadline.
    pub async fn wait_for_run(&self, run_id: Uuid, timeout: Duration) -> Result<Run> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let run = self
                .get_run(run_id)
                .await?
                .ok_or(CoreError::RunNotFound(run_id))?;
            if run.is_terminal() {
                return Ok(run);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(RunnerError::WaitTimeout {
                    run_id,
                    millis: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Receive events for every run processed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    /// Whether a credential is still held for `run_id`
    pub fn has_credential(&self, run_id: Uuid) -> bool {
        self.vault.contains(run_id)
    }

    async fn process_run(
        self,
        run: Run,
        lease: Option<CredentialLease>,
        abort_rx: oneshot::Receiver<()>,
    ) {
        let outcome = AssertUnwindSafe(self.execute(&run, lease.as_ref(), abort_rx))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(RunnerError::Panicked {
                    message: panic_message(panic.as_ref()),
                })
            });

        drop(lease);
        self.aborts.write().await.remove(&run.id);

        self.finish(&run, outcome).await;
    }

    async fn execute(
        &self,
        run: &Run,
        lease: Option<&CredentialLease>,
        abort_rx: oneshot::Receiver<()>,
    ) -> Result<String> {
        let thread = self
            .threads
            .get_thread(run.thread_id)
            .await?
            .ok_or(CoreError::ThreadNotFound(run.thread_id))?;
        let agent = self
            .agents
            .get(run.agent_id)
            .await?
            .ok_or(CoreError::AgentNotFound(run.agent_id))?;

        let conversation = build_conversation(&agent, &thread.messages);
        let secret = lease.and_then(CredentialLease::secret);
        let timeout = self.config.run_timeout;

        debug!(
            "Run {} sending {} messages to the gateway",
            run.id,
            conversation.len()
        );

        tokio::select! {
            biased;
            Ok(()) = abort_rx => Err(RunnerError::Cancelled),
            reply = self.gateway.complete(&agent.model, &conversation, secret.as_deref()) => {
                Ok(reply?)
            }
            _ = tokio::time::sleep(timeout) => Err(RunnerError::Timeout {
                millis: timeout.as_millis() as u64,
            }),
        }
    }

    async fn finish(&self, run: &Run, outcome: Result<String>) {
        match outcome {
            Ok(reply) => {
                let message = Message::assistant(run.thread_id, reply)
                    .with_metadata("run_id", json!(run.id));
                match self.threads.append(run.thread_id, message).await {
                    Ok(message) => {
                        self.emit_message(run, message.id);
                        self.transition(run, |r: &mut Run| r.mark_completed()).await;
                    }
                    Err(e) => {
                        warn!("Run {} could not store its reply: {}", run.id, e);
                        let error = e.to_string();
                        self.transition(run, move |r: &mut Run| r.mark_failed(error))
                            .await;
                    }
                }
            }
            Err(RunnerError::Cancelled) => {
                info!("Run {} cancelled", run.id);
                self.transition(run, |r: &mut Run| r.mark_cancelled()).await;
            }
            Err(e) => {
                let error = e.to_string();
                warn!("Run {} failed: {}", run.id, error);
                self.record_failure_message(run, &error).await;
                self.transition(run, move |r: &mut Run| r.mark_failed(error))
                    .await;
            }
        }
    }

    /// Mirror a failure into the thread so the conversation does not hang
    async fn record_failure_message(&self, run: &Run, error: &str) {
        let message = Message::assistant(
            run.thread_id,
            format!(
                "Sorry, this request failed and no answer was produced. Error: {}",
                error
            ),
        )
        .with_metadata("run_id", json!(run.id))
        .with_metadata("error", json!(true));

        match self.threads.append(run.thread_id, message).await {
            Ok(message) => self.emit_message(run, message.id),
            Err(e) => warn!("Dropped failure message for run {}: {}", run.id, e),
        }
    }

    async fn transition<F>(&self, run: &Run, change: F)
    where
        F: FnOnce(&mut Run) -> psscript_core::Result<()> + Send + 'static,
    {
        match self.runs.modify(run.id, Box::new(change)).await {
            Ok(Some(updated)) => {
                info!(
                    "Run {} finished with status {:?} in {:?} ms",
                    updated.id, updated.status, updated.metadata.duration_ms
                );
                self.emit(RunEvent::status_changed(
                    run.id,
                    run.thread_id,
                    run.status,
                    updated.status,
                ));
                self.emit(RunEvent::new(
                    run.id,
                    run.thread_id,
                    RunEventKind::Finished {
                        status: updated.status,
                        duration_ms: updated.metadata.duration_ms,
                    },
                ));
            }
            Ok(None) => warn!("Run {} disappeared before it was finalized", run.id),
            Err(e) => error!("Failed to finalize run {}: {}", run.id, e),
        }
    }

    fn emit_message(&self, run: &Run, message_id: Uuid) {
        self.emit(RunEvent::new(
            run.id,
            run.thread_id,
            RunEventKind::MessageAppended { message_id },
        ));
    }

    fn emit(&self, event: RunEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn cancel_rejected(run: &Run) -> RunnerError {
    CoreError::InvalidTransition {
        run_id: run.id,
        from: run.status,
        to: RunStatus::Cancelled,
    }
    .into()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
