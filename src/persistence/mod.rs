//! Durable mirror of the transaction store (PostgreSQL via sqlx).

pub mod models;
pub mod postgres;

pub use models::TransactionRecord;
pub use postgres::SettlementPersistence;
