//! Serialises `respond` calls according to the configured [`LockPolicy`].

use sibyl_core::LockPolicy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Held for the duration of one top-level response. Dropping it releases
/// the gate.
#[derive(Debug)]
pub struct GateGuard {
    _guard: OwnedMutexGuard<()>,
}

pub struct RespondGate {
    policy: LockPolicy,
    global: Arc<Mutex<()>>,
    sessions: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RespondGate {
    pub fn new(policy: LockPolicy) -> Self {
        Self {
            policy,
            global: Arc::new(Mutex::new(())),
            sessions: StdMutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        match self.policy {
            LockPolicy::Global => self.global.clone(),
            LockPolicy::PerSession => self
                .sessions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(session_id.to_string())
                .or_default()
                .clone(),
        }
    }

    pub async fn acquire(&self, session_id: &str) -> GateGuard {
        let lock = self.lock_for(session_id);
        GateGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Drop the per-session lock of a deleted session. A response still
    /// holding it keeps its own `Arc` and finishes normally.
    pub fn forget(&self, session_id: &str) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
    }

    pub fn tracked_sessions(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn is_blocked(gate: &RespondGate, session_id: &str) -> bool {
        tokio::time::timeout(Duration::from_millis(20), gate.acquire(session_id))
            .await
            .is_err()
    }

    #[tokio::test]
    async fn test_global_gate_blocks_other_sessions() {
        let gate = RespondGate::new(LockPolicy::Global);
        let held = gate.acquire("alice").await;
        assert!(is_blocked(&gate, "bob").await);
        drop(held);
        assert!(!is_blocked(&gate, "bob").await);
        assert_eq!(gate.tracked_sessions(), 0);
    }

    #[tokio::test]
    async fn test_per_session_gate_only_blocks_same_session() {
        let gate = RespondGate::new(LockPolicy::PerSession);
        let _held = gate.acquire("alice").await;
        assert!(is_blocked(&gate, "alice").await);
        assert!(!is_blocked(&gate, "bob").await);
    }

    #[tokio::test]
    async fn test_forget_prunes_session_lock() {
        let gate = RespondGate::new(LockPolicy::PerSession);
        drop(gate.acquire("alice").await);
        drop(gate.acquire("bob").await);
        assert_eq!(gate.tracked_sessions(), 2);

        gate.forget("alice");
        assert_eq!(gate.tracked_sessions(), 1);
        assert!(!is_blocked(&gate, "alice").await);
    }
}
