//! Row types for the persistence layer.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Transaction, TransactionId, TransactionStatus};
use crate::error::SettlementError;

/// Flat relational row for a transaction, one column per field.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRecord {
    /// Transaction ID.
    pub id: Uuid,
    /// Buyer account ID.
    pub buyer_id: Uuid,
    /// Event ID.
    pub event_id: Uuid,
    /// Ticket type ID.
    pub ticket_type_id: Uuid,
    /// Ticket quantity.
    pub quantity: i64,
    /// Loyalty points redeemed.
    pub points_used: i64,
    /// Applied voucher code, if any.
    pub voucher_code: Option<String>,
    /// Payable total in minor currency units.
    pub total_price: i64,
    /// Status in its stable string form.
    pub status: String,
    /// Payment proof reference URL, if uploaded.
    pub payment_proof: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Payment deadline.
    pub expires_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionRecord {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: *tx.id.as_uuid(),
            buyer_id: tx.buyer_id,
            event_id: tx.event_id,
            ticket_type_id: tx.ticket_type_id,
            quantity: i64::from(tx.quantity),
            points_used: tx.points_used,
            voucher_code: tx.voucher_code.clone(),
            total_price: tx.total_price,
            status: tx.status.as_str().to_string(),
            payment_proof: tx.payment_proof.clone(),
            created_at: tx.created_at,
            expires_at: tx.expires_at,
            updated_at: tx.updated_at,
        }
    }
}

impl TransactionRecord {
    /// Converts the row back into the domain entity.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::Storage`] when the stored status or
    /// quantity is out of range for the domain types.
    pub fn into_domain(self) -> Result<Transaction, SettlementError> {
        let status = TransactionStatus::parse(&self.status)
            .map_err(|s| SettlementError::Storage(format!("unknown status {s} in row")))?;
        let quantity = u32::try_from(self.quantity)
            .map_err(|_| SettlementError::Storage(format!("quantity {} out of range", self.quantity)))?;
        Ok(Transaction {
            id: TransactionId::from_uuid(self.id),
            buyer_id: self.buyer_id,
            event_id: self.event_id,
            ticket_type_id: self.ticket_type_id,
            quantity,
            points_used: self.points_used,
            voucher_code: self.voucher_code,
            total_price: self.total_price,
            status,
            payment_proof: self.payment_proof,
            created_at: self.created_at,
            expires_at: self.expires_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips_through_domain() {
        let now = Utc::now();
        let tx = Transaction::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            4,
            2_500,
            Some("SAVE".to_string()),
            197_500,
            now,
            chrono::Duration::minutes(120),
        );

        let record = TransactionRecord::from(&tx);
        assert_eq!(record.status, "WAITING_FOR_PAYMENT");

        let Ok(back) = record.into_domain() else {
            panic!("conversion failed");
        };
        assert_eq!(back.id, tx.id);
        assert_eq!(back.quantity, 4);
        assert_eq!(back.status, TransactionStatus::WaitingForPayment);
        assert_eq!(back.voucher_code.as_deref(), Some("SAVE"));
    }

    #[test]
    fn bad_status_is_a_storage_error() {
        let now = Utc::now();
        let tx = Transaction::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            1,
            0,
            None,
            10_000,
            now,
            chrono::Duration::minutes(120),
        );
        let mut record = TransactionRecord::from(&tx);
        record.status = "PAID".to_string();
        assert!(matches!(
            record.into_domain(),
            Err(SettlementError::Storage(_))
        ));
    }
}
