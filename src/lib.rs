//! # stagepass
//!
//! Transaction lifecycle and settlement core for event ticketing.
//!
//! A buyer reserves tickets, optionally applying loyalty points and an
//! event-scoped voucher, then has a fixed window to pay; an organizer
//! confirms the payment or a background sweeper expires the reservation.
//! HTTP routing, authentication, and file hosting live in outer layers —
//! this crate is the lifecycle core they call into with an
//! already-authenticated caller identity.
//!
//! ## Architecture
//!
//! ```text
//! Request layer (out of scope)
//!     │
//!     ├── TransactionService (service/)   lifecycle manager
//!     │       ├── AccountDirectory (domain/)   point ledger
//!     │       ├── EventCatalog (domain/)       voucher tracker
//!     │       └── pricing (domain/)            price calculator
//!     │
//!     ├── TransactionStore (domain/)      shared concurrent store
//!     ├── ExpirySweeper (sweeper)         periodic expiry task
//!     │
//!     └── PostgreSQL mirror (persistence/)
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod sweeper;
