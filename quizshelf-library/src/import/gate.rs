//! One-shot decision gates
//!
//! A gate pairs a [`Gate`] handle, published inside an [`ImportState`] for
//! observers to fire, with a [`GateWait`] held by the coordinator. Firing
//! resolves the wait exactly once. A gate whose handle is dropped without
//! firing never resolves, so it simply loses any race it is part of.
//!
//! [`ImportState`]: super::state::ImportState

use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Firing side; clones share the same one-shot signal
#[derive(Clone)]
pub struct Gate {
    trigger: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

/// Waiting side
pub struct GateWait {
    rx: oneshot::Receiver<()>,
}

/// Create a connected gate pair
pub fn gate() -> (Gate, GateWait) {
    let (tx, rx) = oneshot::channel();
    (
        Gate {
            trigger: Arc::new(Mutex::new(Some(tx))),
        },
        GateWait { rx },
    )
}

impl Gate {
    /// Fire the gate; returns false if it was already fired or abandoned
    pub fn fire(&self) -> bool {
        let sender = match self.trigger.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// True once fired (by any clone)
    pub fn is_spent(&self) -> bool {
        match self.trigger.lock() {
            Ok(slot) => slot.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("spent", &self.is_spent())
            .finish()
    }
}

impl GateWait {
    /// Resolve when the gate fires; pending forever if it never can
    pub async fn wait(self) {
        if self.rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Wait on an optional gate; an absent gate never resolves
pub async fn wait_optional(wait: Option<GateWait>) {
    match wait {
        Some(wait) => wait.wait().await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fire_resolves_wait_once() {
        let (gate, wait) = gate();
        let observer = gate.clone();

        assert!(observer.fire());
        assert!(!gate.fire());
        assert!(gate.is_spent());

        tokio::time::timeout(Duration::from_secs(1), wait.wait())
            .await
            .expect("fired gate should resolve");
    }

    #[tokio::test]
    async fn test_abandoned_gate_stays_pending() {
        let (gate, wait) = gate();
        drop(gate);

        let result = tokio::time::timeout(Duration::from_millis(50), wait.wait()).await;
        assert!(result.is_err(), "abandoned gate must not resolve");
    }

    #[tokio::test]
    async fn test_first_fired_gate_wins_race() {
        let (cancel, cancel_wait) = gate();
        let (skip, skip_wait) = gate();

        skip.fire();
        let winner = tokio::select! {
            _ = cancel_wait.wait() => "cancel",
            _ = wait_optional(Some(skip_wait)) => "skip",
        };
        assert_eq!(winner, "skip");
        assert!(!cancel.is_spent());
    }

    #[tokio::test]
    async fn test_fire_after_waiter_dropped() {
        let (gate, wait) = gate();
        drop(wait);
        assert!(!gate.fire());
    }
}
