//! Domain layer: entities, the price calculator, and the concurrent
//! transaction store shared by the lifecycle manager and the sweeper.

pub mod account;
pub mod catalog;
pub mod pricing;
pub mod transaction;
pub mod transaction_id;
pub mod transaction_store;

pub use account::{Account, AccountDirectory, AccountKind, Caller, Role};
pub use catalog::{EventCatalog, EventDetails, TicketType, Voucher};
pub use transaction::{Transaction, TransactionStatus, TransactionSummary};
pub use transaction_id::TransactionId;
pub use transaction_store::TransactionStore;
