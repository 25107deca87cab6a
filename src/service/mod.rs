//! Service layer: the transaction lifecycle manager.

pub mod transaction_service;

pub use transaction_service::{NewTransaction, TransactionService};
