//! Concurrent transaction storage with per-transaction fine-grained locking.
//!
//! [`TransactionStore`] keeps every transaction in a `HashMap` where each
//! entry is individually protected by a [`tokio::sync::RwLock`]. The
//! lifecycle manager and the expiry sweeper share one store and race
//! freely: every state change runs as a closure under the entry's write
//! lock and re-validates its precondition (status, deadline) immediately
//! before mutating, so exactly one writer wins any given transition.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::transaction::{Transaction, TransactionStatus, TransactionSummary};
use super::TransactionId;
use crate::error::SettlementError;

/// Shared store for all transactions, open and terminal alike.
///
/// Terminal transactions are never removed: `Done` and `Expired` rows are
/// the audit trail.
#[derive(Debug, Default)]
pub struct TransactionStore {
    entries: RwLock<HashMap<TransactionId, Arc<RwLock<Transaction>>>>,
}

impl TransactionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::InvalidRequest`] if the ID already exists
    /// (cannot happen with freshly generated v4 IDs).
    pub async fn insert(&self, tx: Transaction) -> Result<TransactionId, SettlementError> {
        let id = tx.id;
        let mut map = self.entries.write().await;
        if map.contains_key(&id) {
            return Err(SettlementError::InvalidRequest(format!(
                "transaction {id} already exists"
            )));
        }
        map.insert(id, Arc::new(RwLock::new(tx)));
        Ok(id)
    }

    /// Returns a point-in-time snapshot of the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::TransactionNotFound`] if no such
    /// transaction exists.
    pub async fn get(&self, id: TransactionId) -> Result<Transaction, SettlementError> {
        let entry = self.entry(id).await?;
        let tx = entry.read().await;
        Ok(tx.clone())
    }

    /// Runs a fallible mutation under the transaction's write lock.
    ///
    /// This is the store's conditional-update primitive: the closure sees
    /// the current state and must re-check its own precondition before
    /// mutating. If it returns an error, any partial change it made is the
    /// closure's responsibility; the lifecycle manager only mutates after
    /// its checks pass (or performs the read-path expiry, which is itself
    /// a valid transition).
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::TransactionNotFound`] for an unknown ID,
    /// otherwise whatever the closure returns.
    pub async fn update<T, F>(&self, id: TransactionId, f: F) -> Result<T, SettlementError>
    where
        F: FnOnce(&mut Transaction) -> Result<T, SettlementError>,
    {
        let entry = self.entry(id).await?;
        let mut tx = entry.write().await;
        f(&mut tx)
    }

    /// Returns summaries of all transactions created by the buyer, most
    /// recently updated first.
    pub async fn list_for_buyer(&self, buyer_id: Uuid) -> Vec<TransactionSummary> {
        self.collect(|tx| tx.buyer_id == buyer_id).await
    }

    /// Returns summaries of transactions awaiting confirmation for any of
    /// the given events, most recently updated first.
    pub async fn list_pending_for_events(&self, event_ids: &[Uuid]) -> Vec<TransactionSummary> {
        self.collect(|tx| {
            tx.status == TransactionStatus::WaitingForConfirmation
                && event_ids.contains(&tx.event_id)
        })
        .await
    }

    /// Force-expires every `WaitingForPayment` transaction whose deadline
    /// has passed, re-checking both conditions under each entry's write
    /// lock. Returns the IDs transitioned. Idempotent: a second sweep with
    /// nothing newly expirable returns an empty list.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Vec<TransactionId> {
        let entries: Vec<Arc<RwLock<Transaction>>> = {
            let map = self.entries.read().await;
            map.values().cloned().collect()
        };

        let mut expired = Vec::new();
        for entry in entries {
            let mut tx = entry.write().await;
            if tx.status == TransactionStatus::WaitingForPayment && tx.deadline_passed(now) {
                tx.status = TransactionStatus::Expired;
                tx.updated_at = now;
                expired.push(tx.id);
            }
        }
        expired
    }

    /// Returns the number of stored transactions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if the store holds no transactions.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn entry(
        &self,
        id: TransactionId,
    ) -> Result<Arc<RwLock<Transaction>>, SettlementError> {
        let map = self.entries.read().await;
        map.get(&id)
            .cloned()
            .ok_or(SettlementError::TransactionNotFound(id))
    }

    async fn collect<P>(&self, predicate: P) -> Vec<TransactionSummary>
    where
        P: Fn(&Transaction) -> bool,
    {
        let entries: Vec<Arc<RwLock<Transaction>>> = {
            let map = self.entries.read().await;
            map.values().cloned().collect()
        };

        let mut summaries = Vec::new();
        for entry in entries {
            let tx = entry.read().await;
            if predicate(&tx) {
                summaries.push(TransactionSummary::from(&*tx));
            }
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }
}
