//! Ephemeral per-run credentials
//!
//! A credential lives in the vault exactly as long as its
//! [`CredentialLease`]. The lease is held by the task processing the run,
//! so the entry disappears on every exit path, including panics and
//! aborted tasks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use secrecy::SecretString;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, RunnerError};

/// Run-id keyed credential store
#[derive(Default)]
pub struct CredentialVault {
    entries: Mutex<HashMap<Uuid, Arc<SecretString>>>,
}

impl CredentialVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `secret` for `run_id`
    ///
    /// Each run may hold at most one credential at a time.
    pub fn lease(self: &Arc<Self>, run_id: Uuid, secret: SecretString) -> Result<CredentialLease> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&run_id) {
            return Err(RunnerError::CredentialConflict { run_id });
        }
        entries.insert(run_id, Arc::new(secret));
        debug!("Stored credential for run {}", run_id);

        Ok(CredentialLease {
            vault: Arc::clone(self),
            run_id,
        })
    }

    /// Whether a credential is currently held for `run_id`
    pub fn contains(&self, run_id: Uuid) -> bool {
        self.entries.lock().contains_key(&run_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub(crate) fn get(&self, run_id: Uuid) -> Option<Arc<SecretString>> {
        self.entries.lock().get(&run_id).cloned()
    }

    fn remove(&self, run_id: Uuid) {
        if self.entries.lock().remove(&run_id).is_some() {
            debug!("Released credential for run {}", run_id);
        }
    }
}

/// Scoped ownership of one run's credential
pub struct CredentialLease {
    vault: Arc<CredentialVault>,
    run_id: Uuid,
}

impl CredentialLease {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The leased secret, while the lease is alive
    pub(crate) fn secret(&self) -> Option<Arc<SecretString>> {
        self.vault.get(self.run_id)
    }

    /// Remove the credential now instead of at end of scope
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for CredentialLease {
    fn drop(&mut self) {
        self.vault.remove(self.run_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn vault() -> Arc<CredentialVault> {
        Arc::new(CredentialVault::new())
    }

    #[test]
    fn test_lease_and_release() {
        let vault = vault();
        let run_id = Uuid::new_v4();

        let lease = vault.lease(run_id, SecretString::from("sk-test".to_string())).unwrap();
        assert_eq!(lease.run_id(), run_id);
        assert!(vault.contains(run_id));
        assert_eq!(lease.secret().unwrap().expose_secret(), "sk-test");

        lease.release();
        assert!(!vault.contains(run_id));
        assert!(vault.get(run_id).is_none());
    }

    #[test]
    fn test_second_lease_for_same_run_conflicts() {
        let vault = vault();
        let run_id = Uuid::new_v4();
        let _lease = vault.lease(run_id, SecretString::from("first".to_string())).unwrap();

        let result = vault.lease(run_id, SecretString::from("second".to_string()));

        assert!(matches!(result, Err(RunnerError::CredentialConflict { .. })));
        assert_eq!(vault.get(run_id).unwrap().expose_secret(), "first");
    }

    #[test]
    fn test_drop_releases() {
        let vault = vault();
        let run_id = Uuid::new_v4();
        {
            let _lease = vault.lease(run_id, SecretString::from("scoped".to_string())).unwrap();
            assert_eq!(vault.len(), 1);
        }
        assert!(vault.is_empty());
    }

    #[test]
    fn test_panic_releases() {
        let vault = vault();
        let run_id = Uuid::new_v4();
        let lease = vault.lease(run_id, SecretString::from("doomed".to_string())).unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _held = lease;
            panic!("processing blew up");
        }));

        assert!(result.is_err());
        assert!(!vault.contains(run_id));
    }

    #[test]
    fn test_leases_are_independent() {
        let vault = vault();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let lease_a = vault.lease(a, SecretString::from("a".to_string())).unwrap();
        let _lease_b = vault.lease(b, SecretString::from("b".to_string())).unwrap();

        lease_a.release();

        assert!(!vault.contains(a));
        assert!(vault.contains(b));
    }
}
