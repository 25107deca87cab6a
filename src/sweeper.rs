//! Expiry sweeper: force-expires stale unpaid transactions on a fixed
//! cadence.
//!
//! The sweeper is owned by the composition root — `main` builds it with a
//! handle to the shared store and spawns [`ExpirySweeper::run`] as a
//! plain tokio task. There is no global timer state, no jitter, and no
//! retry: a tick that fails at the durable mirror just waits for the next
//! cycle. Ticks are idempotent, and the store re-checks status and
//! deadline under each entry's write lock, so a tick racing a buyer's
//! `mark_paid` resolves to exactly one winner per transaction.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::domain::TransactionStore;
use crate::persistence::SettlementPersistence;

/// Recurring background task that expires timed-out transactions.
#[derive(Debug)]
pub struct ExpirySweeper {
    store: Arc<TransactionStore>,
    persistence: Option<SettlementPersistence>,
    period: Duration,
}

impl ExpirySweeper {
    /// Creates a sweeper over the shared store, ticking every `period`.
    #[must_use]
    pub fn new(
        store: Arc<TransactionStore>,
        persistence: Option<SettlementPersistence>,
        period: Duration,
    ) -> Self {
        Self {
            store,
            persistence,
            period,
        }
    }

    /// Runs one sweep and returns how many transactions were expired.
    ///
    /// A zero-count sweep is a silent no-op.
    pub async fn tick(&self) -> usize {
        let now = Utc::now();
        let expired = self.store.expire_due(now).await;

        if let Some(persistence) = &self.persistence {
            match persistence.expire_due(now).await {
                Ok(rows) => {
                    if rows > 0 && expired.is_empty() {
                        tracing::debug!(rows, "mirror caught up on expired rows");
                    }
                }
                Err(err) => {
                    // Transient: the next cycle sweeps the same rows again.
                    tracing::warn!(error = %err, "mirror expiry failed, deferring to next tick");
                }
            }
        }

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired stale transactions");
        }
        expired.len()
    }

    /// Loops forever, sweeping once per period.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.period);
        // The first tick of a tokio interval fires immediately; an
        // immediate sweep of nothing is a harmless no-op.
        loop {
            interval.tick().await;
            let _ = self.tick().await;
        }
    }
}
