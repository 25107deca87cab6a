//! PostgreSQL implementation of the durable transaction mirror.
//!
//! Every write uses a conditional `UPDATE ... WHERE status = $expected`
//! so the durable copy obeys the same one-way status graph as the
//! in-memory store even under concurrent writers.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::TransactionRecord;
use crate::domain::{Transaction, TransactionId, TransactionStatus};
use crate::error::SettlementError;

/// PostgreSQL-backed persistence using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct SettlementPersistence {
    pool: PgPool,
}

impl SettlementPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a freshly created transaction row.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::Storage`] on database failure.
    pub async fn insert_transaction(&self, tx: &Transaction) -> Result<(), SettlementError> {
        let record = TransactionRecord::from(tx);
        sqlx::query(
            "INSERT INTO transactions \
             (id, buyer_id, event_id, ticket_type_id, quantity, points_used, voucher_code, \
              total_price, status, payment_proof, created_at, expires_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(record.id)
        .bind(record.buyer_id)
        .bind(record.event_id)
        .bind(record.ticket_type_id)
        .bind(record.quantity)
        .bind(record.points_used)
        .bind(record.voucher_code)
        .bind(record.total_price)
        .bind(record.status)
        .bind(record.payment_proof)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| SettlementError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Conditionally advances a row's status, optionally recording a
    /// payment proof. Returns `false` when the row was not in the expected
    /// status, which means a concurrent writer already won the transition.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::Storage`] on database failure.
    pub async fn update_status_if(
        &self,
        id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
        proof: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, SettlementError> {
        let result = sqlx::query(
            "UPDATE transactions \
             SET status = $3, payment_proof = COALESCE($4, payment_proof), updated_at = $5 \
             WHERE id = $1 AND status = $2",
        )
        .bind(*id.as_uuid())
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(proof)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| SettlementError::Storage(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Bulk-expires every unpaid row whose deadline has passed. Returns
    /// the number of rows transitioned.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::Storage`] on database failure.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64, SettlementError> {
        let result = sqlx::query(
            "UPDATE transactions SET status = 'EXPIRED', updated_at = $1 \
             WHERE status = 'WAITING_FOR_PAYMENT' AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| SettlementError::Storage(e.to_string()))?;
        Ok(result.rows_affected())
    }

    /// Loads every non-terminal transaction, used to rehydrate the
    /// in-memory store at startup.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::Storage`] on database failure or when a
    /// row fails domain conversion.
    pub async fn load_open(&self) -> Result<Vec<Transaction>, SettlementError> {
        let rows = sqlx::query_as::<_, TransactionRecord>(
            "SELECT id, buyer_id, event_id, ticket_type_id, quantity, points_used, \
                    voucher_code, total_price, status, payment_proof, created_at, \
                    expires_at, updated_at \
             FROM transactions \
             WHERE status IN ('WAITING_FOR_PAYMENT', 'WAITING_FOR_CONFIRMATION') \
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SettlementError::Storage(e.to_string()))?;

        rows.into_iter().map(TransactionRecord::into_domain).collect()
    }
}
