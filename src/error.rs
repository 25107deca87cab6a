//! Settlement error types.
//!
//! [`SettlementError`] is the central error type of the lifecycle core.
//! Every failure is local and synchronous: it is surfaced directly to the
//! caller, and any retry policy belongs to the request layer, not here.

use uuid::Uuid;

use crate::domain::TransactionId;

/// Reason a voucher was rejected during validation or consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoucherIssue {
    /// No voucher with that code exists for the event.
    NotFound,
    /// The current time is outside the voucher's validity window.
    OutsideWindow,
    /// The voucher's redemption quota is used up.
    Exhausted,
}

impl std::fmt::Display for VoucherIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotFound => "not found for this event",
            Self::OutsideWindow => "outside its validity window",
            Self::Exhausted => "redemption quota exhausted",
        };
        f.write_str(s)
    }
}

/// Error enum covering every failure mode of the lifecycle core.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    /// Transaction with the given ID was not found.
    #[error("transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Ticket type with the given ID was not found.
    #[error("ticket type not found: {0}")]
    TicketTypeNotFound(Uuid),

    /// Event with the given ID was not found.
    #[error("event not found: {0}")]
    EventNotFound(Uuid),

    /// Account with the given ID was not found.
    #[error("account not found: {0}")]
    AccountNotFound(Uuid),

    /// Caller role or ownership does not permit the operation.
    #[error("access denied: {0}")]
    AccessDenied(&'static str),

    /// Transition attempted from a status that forbids it.
    #[error("invalid state: transaction {id} is {found}")]
    InvalidState {
        /// Transaction the transition was attempted on.
        id: TransactionId,
        /// Status the transaction was actually in.
        found: &'static str,
    },

    /// The payment deadline has passed.
    #[error("transaction {0} has passed its payment deadline")]
    Expired(TransactionId),

    /// Voucher rejected: not found, out of window, or exhausted.
    #[error("invalid voucher: {0}")]
    InvalidVoucher(VoucherIssue),

    /// Buyer's loyalty point balance does not cover the redemption.
    #[error("insufficient points: {requested} requested, {available} available")]
    InsufficientPoints {
        /// Points the buyer asked to redeem.
        requested: i64,
        /// Points currently on the buyer's balance.
        available: i64,
    },

    /// Request rejected before touching any state.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Persistence layer failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl SettlementError {
    /// Short machine-readable tag for log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TransactionNotFound(_) => "transaction_not_found",
            Self::TicketTypeNotFound(_) => "ticket_type_not_found",
            Self::EventNotFound(_) => "event_not_found",
            Self::AccountNotFound(_) => "account_not_found",
            Self::AccessDenied(_) => "access_denied",
            Self::InvalidState { .. } => "invalid_state",
            Self::Expired(_) => "expired",
            Self::InvalidVoucher(_) => "invalid_voucher",
            Self::InsufficientPoints { .. } => "insufficient_points",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Storage(_) => "storage",
        }
    }
}
