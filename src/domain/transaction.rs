//! The transaction entity and its status machine.
//!
//! A [`Transaction`] is one buyer's reservation of tickets for an event,
//! tracked from creation through payment and organizer confirmation. The
//! status graph is:
//!
//! ```text
//! WaitingForPayment --mark_paid / upload_proof (before deadline)--> WaitingForConfirmation
//! WaitingForPayment --deadline elapsed--> Expired
//! WaitingForConfirmation --accept--> Done
//! Done, Expired: terminal
//! ```
//!
//! Transitions are monotonic: nothing moves backward, and terminal states
//! are retained forever as an audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TransactionId;

/// Settlement status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Created, awaiting the buyer's payment before the deadline.
    WaitingForPayment,
    /// Buyer has paid or uploaded proof; awaiting organizer confirmation.
    WaitingForConfirmation,
    /// Organizer accepted the payment. Terminal.
    Done,
    /// Payment deadline elapsed unpaid. Terminal.
    Expired,
}

impl TransactionStatus {
    /// Returns `true` for statuses that admit no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Expired)
    }

    /// Stable string form used in logs and database rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WaitingForPayment => "WAITING_FOR_PAYMENT",
            Self::WaitingForConfirmation => "WAITING_FOR_CONFIRMATION",
            Self::Done => "DONE",
            Self::Expired => "EXPIRED",
        }
    }

    /// Parses the stable string form back into a status.
    ///
    /// # Errors
    ///
    /// Returns the offending string if it names no known status.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "WAITING_FOR_PAYMENT" => Ok(Self::WaitingForPayment),
            "WAITING_FOR_CONFIRMATION" => Ok(Self::WaitingForConfirmation),
            "DONE" => Ok(Self::Done),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(other.to_string()),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One buyer's ticket reservation, the central entity of the core.
///
/// Everything except `status`, `payment_proof`, and `updated_at` is fixed
/// at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier.
    pub id: TransactionId,
    /// Buyer who created the reservation.
    pub buyer_id: Uuid,
    /// Event the tickets belong to.
    pub event_id: Uuid,
    /// Ticket type being purchased.
    pub ticket_type_id: Uuid,
    /// Number of tickets reserved.
    pub quantity: u32,
    /// Loyalty points redeemed against the price.
    pub points_used: i64,
    /// Voucher code applied, if any.
    pub voucher_code: Option<String>,
    /// Payable total in minor currency units, floored at zero.
    pub total_price: i64,
    /// Current settlement status.
    pub status: TransactionStatus,
    /// Reference URL of the uploaded payment proof, stored verbatim.
    pub payment_proof: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Payment deadline: `created_at` plus the configured window.
    pub expires_at: DateTime<Utc>,
    /// Timestamp of the last state mutation.
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a fresh transaction in `WaitingForPayment`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        buyer_id: Uuid,
        event_id: Uuid,
        ticket_type_id: Uuid,
        quantity: u32,
        points_used: i64,
        voucher_code: Option<String>,
        total_price: i64,
        now: DateTime<Utc>,
        payment_window: chrono::Duration,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            buyer_id,
            event_id,
            ticket_type_id,
            quantity,
            points_used,
            voucher_code,
            total_price,
            status: TransactionStatus::WaitingForPayment,
            payment_proof: None,
            created_at: now,
            expires_at: now + payment_window,
            updated_at: now,
        }
    }

    /// Returns `true` once the payment deadline has passed.
    #[must_use]
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Read-model projection of a transaction for list queries.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    /// Transaction identifier.
    pub id: TransactionId,
    /// Buyer who created the reservation.
    pub buyer_id: Uuid,
    /// Event the tickets belong to.
    pub event_id: Uuid,
    /// Payable total in minor currency units.
    pub total_price: i64,
    /// Current settlement status.
    pub status: TransactionStatus,
    /// Payment deadline.
    pub expires_at: DateTime<Utc>,
    /// Timestamp of the last state mutation.
    pub updated_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionSummary {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            buyer_id: tx.buyer_id,
            event_id: tx.event_id,
            total_price: tx.total_price,
            status: tx.status,
            expires_at: tx.expires_at,
            updated_at: tx.updated_at,
        }
    }
}
