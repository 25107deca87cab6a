//! Transaction lifecycle manager.
//!
//! Owns the status machine and authorizes every transition. Each
//! state-changing method re-validates its precondition (current status and
//! payment deadline) under the store entry's write lock immediately before
//! mutating, so a buyer action and a sweeper tick racing on the same
//! transaction resolve to exactly one winner. The deadline check here is
//! authoritative: a stale transaction is refused (and expired on the spot)
//! even if the sweeper has not run yet.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::{
    pricing, AccountDirectory, Caller, EventCatalog, Role, Transaction, TransactionId,
    TransactionStatus, TransactionStore, TransactionSummary,
};
use crate::error::SettlementError;
use crate::persistence::SettlementPersistence;

/// Validated creation payload handed in by the request layer.
///
/// Shape validation (positive quantity, non-negative points) happens at
/// the boundary; this struct carries already-clean values.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Ticket type being purchased.
    pub ticket_type_id: Uuid,
    /// Number of tickets, positive.
    pub quantity: u32,
    /// Loyalty points to redeem, non-negative.
    pub points_used: i64,
    /// Optional voucher code, scoped to the ticket's event.
    pub voucher_code: Option<String>,
}

/// Orchestration layer for the transaction lifecycle.
///
/// Consults the account directory (point ledger) and the event catalog
/// (voucher tracker), invokes the price calculator, and drives the status
/// machine against the shared store. When a durable mirror is configured,
/// mutations are written through best-effort: a mirror failure is logged
/// and left for the next sweep or restart to reconcile, never surfaced to
/// the caller after the in-memory transition has committed.
#[derive(Debug, Clone)]
pub struct TransactionService {
    directory: Arc<AccountDirectory>,
    catalog: Arc<EventCatalog>,
    store: Arc<TransactionStore>,
    persistence: Option<SettlementPersistence>,
    payment_window: Duration,
}

impl TransactionService {
    /// Creates a new `TransactionService`.
    #[must_use]
    pub fn new(
        directory: Arc<AccountDirectory>,
        catalog: Arc<EventCatalog>,
        store: Arc<TransactionStore>,
        persistence: Option<SettlementPersistence>,
        payment_window: Duration,
    ) -> Self {
        Self {
            directory,
            catalog,
            store,
            persistence,
            payment_window,
        }
    }

    /// Returns a reference to the shared transaction store.
    #[must_use]
    pub fn store(&self) -> &Arc<TransactionStore> {
        &self.store
    }

    /// Creates a reservation in `WaitingForPayment`.
    ///
    /// Validates the voucher against the ticket's own event, guards the
    /// point redemption against the buyer's balance, computes the total,
    /// and applies debit, voucher consumption, and insert as one unit:
    /// if the voucher quota races to zero after the debit, the debit is
    /// compensated and the creation fails without a trace.
    ///
    /// # Errors
    ///
    /// [`SettlementError::AccessDenied`] unless the caller is a user;
    /// [`SettlementError::TicketTypeNotFound`] /
    /// [`SettlementError::EventNotFound`] for dangling references;
    /// [`SettlementError::InvalidVoucher`] when the voucher is missing for
    /// the event, outside its window, or exhausted;
    /// [`SettlementError::InsufficientPoints`] when the balance does not
    /// cover `points_used`.
    pub async fn create(
        &self,
        caller: Caller,
        request: NewTransaction,
    ) -> Result<Transaction, SettlementError> {
        if caller.role != Role::User {
            return Err(SettlementError::AccessDenied(
                "transaction creation requires the USER role",
            ));
        }

        let now = Utc::now();
        let (ticket, event) = self.catalog.ticket_type(request.ticket_type_id).await?;

        let discount = match &request.voucher_code {
            Some(code) => {
                self.catalog
                    .validate_voucher(event.id, code, now)
                    .await?
                    .discount
            }
            None => 0,
        };

        if request.points_used > 0 {
            self.directory
                .debit_points(caller.id, request.points_used)
                .await?;
        }

        if let Some(code) = &request.voucher_code
            && let Err(err) = self.catalog.consume_voucher(event.id, code).await
        {
            // The quota raced to zero between validate and consume:
            // hand the points back before failing.
            if request.points_used > 0
                && let Err(refund_err) = self
                    .directory
                    .credit_points(caller.id, request.points_used)
                    .await
            {
                tracing::warn!(buyer = %caller.id, points = request.points_used,
                    error = %refund_err, "point refund failed after losing voucher race");
            }
            return Err(err);
        }

        let total = pricing::total_due(
            ticket.price,
            request.quantity,
            discount,
            request.points_used,
        );

        let tx = Transaction::new(
            caller.id,
            event.id,
            ticket.id,
            request.quantity,
            request.points_used,
            request.voucher_code,
            total,
            now,
            self.payment_window,
        );
        self.store.insert(tx.clone()).await?;

        if let Some(persistence) = &self.persistence
            && let Err(err) = persistence.insert_transaction(&tx).await
        {
            tracing::warn!(id = %tx.id, error = %err, "transaction mirror insert failed");
        }

        tracing::info!(id = %tx.id, buyer = %caller.id, total, "transaction created");
        Ok(tx)
    }

    /// Buyer marks the transaction as paid.
    ///
    /// # Errors
    ///
    /// [`SettlementError::AccessDenied`] unless the caller is a user;
    /// [`SettlementError::Expired`] when the deadline has passed — the
    /// transaction is expired on the spot rather than waiting for the
    /// sweeper; [`SettlementError::InvalidState`] from any status other
    /// than `WaitingForPayment`.
    pub async fn mark_paid(
        &self,
        caller: Caller,
        id: TransactionId,
    ) -> Result<Transaction, SettlementError> {
        if caller.role != Role::User {
            return Err(SettlementError::AccessDenied(
                "payment actions require the USER role",
            ));
        }
        self.settle_payment(id, None).await
    }

    /// Buyer uploads a payment-proof reference.
    ///
    /// The reference URL comes from the file-storage collaborator and is
    /// stored verbatim.
    ///
    /// # Errors
    ///
    /// As [`Self::mark_paid`], plus [`SettlementError::AccessDenied`] when
    /// the transaction does not belong to the caller.
    pub async fn upload_proof(
        &self,
        caller: Caller,
        id: TransactionId,
        proof_ref: &str,
    ) -> Result<Transaction, SettlementError> {
        if caller.role != Role::User {
            return Err(SettlementError::AccessDenied(
                "payment actions require the USER role",
            ));
        }
        let snapshot = self.store.get(id).await?;
        if snapshot.buyer_id != caller.id {
            return Err(SettlementError::AccessDenied(
                "payment proof may only be uploaded by the transaction's buyer",
            ));
        }
        self.settle_payment(id, Some(proof_ref)).await
    }

    /// Organizer accepts a payment awaiting confirmation.
    ///
    /// # Errors
    ///
    /// [`SettlementError::AccessDenied`] unless the caller is an organizer
    /// who owns the transaction's event; [`SettlementError::InvalidState`]
    /// from any status other than `WaitingForConfirmation`.
    pub async fn accept(
        &self,
        caller: Caller,
        id: TransactionId,
    ) -> Result<Transaction, SettlementError> {
        if caller.role != Role::Organizer {
            return Err(SettlementError::AccessDenied(
                "payment confirmation requires the ORGANIZER role",
            ));
        }
        let snapshot = self.store.get(id).await?;
        let event = self.catalog.event(snapshot.event_id).await?;
        if event.organizer_id != caller.id {
            return Err(SettlementError::AccessDenied(
                "only the owning organizer may confirm this payment",
            ));
        }

        let now = Utc::now();
        let updated = self
            .store
            .update(id, |tx| match tx.status {
                TransactionStatus::WaitingForConfirmation => {
                    tx.status = TransactionStatus::Done;
                    tx.updated_at = now;
                    Ok(tx.clone())
                }
                other => Err(SettlementError::InvalidState {
                    id,
                    found: other.as_str(),
                }),
            })
            .await?;

        self.mirror_transition(
            id,
            TransactionStatus::WaitingForConfirmation,
            TransactionStatus::Done,
            None,
        )
        .await;

        tracing::info!(%id, organizer = %caller.id, "payment accepted");
        Ok(updated)
    }

    /// Returns a snapshot of one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::TransactionNotFound`] for an unknown ID.
    pub async fn get(&self, id: TransactionId) -> Result<Transaction, SettlementError> {
        self.store.get(id).await
    }

    /// Returns all of a buyer's transactions, most recently updated first.
    pub async fn list_for_buyer(&self, buyer_id: Uuid) -> Vec<TransactionSummary> {
        self.store.list_for_buyer(buyer_id).await
    }

    /// Returns transactions awaiting the calling organizer's confirmation,
    /// restricted to events the caller owns, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::AccessDenied`] unless the caller is an
    /// organizer.
    pub async fn list_pending_for_organizer(
        &self,
        caller: Caller,
    ) -> Result<Vec<TransactionSummary>, SettlementError> {
        if caller.role != Role::Organizer {
            return Err(SettlementError::AccessDenied(
                "the pending listing requires the ORGANIZER role",
            ));
        }
        let owned = self.catalog.events_owned_by(caller.id).await;
        Ok(self.store.list_pending_for_events(&owned).await)
    }

    /// Shared body of `mark_paid` and `upload_proof`: the
    /// `WaitingForPayment -> WaitingForConfirmation` transition with the
    /// authoritative deadline re-check.
    async fn settle_payment(
        &self,
        id: TransactionId,
        proof_ref: Option<&str>,
    ) -> Result<Transaction, SettlementError> {
        let now = Utc::now();
        let result = self
            .store
            .update(id, |tx| match tx.status {
                TransactionStatus::WaitingForPayment => {
                    if tx.deadline_passed(now) {
                        // Read-path expiry: the deadline decides, not the
                        // sweeper cadence.
                        tx.status = TransactionStatus::Expired;
                        tx.updated_at = now;
                        return Err(SettlementError::Expired(id));
                    }
                    tx.status = TransactionStatus::WaitingForConfirmation;
                    if let Some(proof) = proof_ref {
                        tx.payment_proof = Some(proof.to_string());
                    }
                    tx.updated_at = now;
                    Ok(tx.clone())
                }
                other => Err(SettlementError::InvalidState {
                    id,
                    found: other.as_str(),
                }),
            })
            .await;

        match &result {
            Ok(_) => {
                self.mirror_transition(
                    id,
                    TransactionStatus::WaitingForPayment,
                    TransactionStatus::WaitingForConfirmation,
                    proof_ref,
                )
                .await;
                tracing::info!(%id, proof = proof_ref.is_some(), "payment submitted");
            }
            Err(SettlementError::Expired(_)) => {
                self.mirror_transition(
                    id,
                    TransactionStatus::WaitingForPayment,
                    TransactionStatus::Expired,
                    None,
                )
                .await;
                tracing::info!(%id, "transaction expired on read path");
            }
            Err(_) => {}
        }
        result
    }

    /// Best-effort write-through of a committed transition to the durable
    /// mirror. The conditional update keeps the mirror monotonic even if
    /// ticks and transitions land out of order.
    async fn mirror_transition(
        &self,
        id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
        proof: Option<&str>,
    ) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        match persistence
            .update_status_if(id, expected, next, proof, Utc::now())
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(%id, from = expected.as_str(), to = next.as_str(),
                    "mirror row already advanced");
            }
            Err(err) => {
                tracing::warn!(%id, error = %err, "transaction mirror update failed");
            }
        }
    }
}
