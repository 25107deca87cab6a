//! Events, ticket types, and the voucher redemption tracker.
//!
//! The catalog is read-only from the lifecycle core's perspective except
//! for voucher quota, which is decremented once per successful transaction
//! creation. Capacity enforcement on ticket types belongs to the
//! ticket/event collaborator and is not duplicated here.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{SettlementError, VoucherIssue};

/// An event listing owned by one organizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetails {
    /// Unique event identifier.
    pub id: Uuid,
    /// Organizer account that owns the event.
    pub organizer_id: Uuid,
    /// Display title.
    pub title: String,
}

/// A priced ticket category within one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketType {
    /// Unique ticket type identifier.
    pub id: Uuid,
    /// Parent event.
    pub event_id: Uuid,
    /// Title, unique within the event.
    pub title: String,
    /// Unit price in minor currency units.
    pub price: i64,
    /// Remaining capacity counter, owned by the event collaborator.
    pub remaining: u32,
}

/// An event-scoped flat-amount discount code with a validity window and
/// a finite redemption quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    /// Event the voucher applies to.
    pub event_id: Uuid,
    /// Code, unique within the event.
    pub code: String,
    /// Flat discount in minor currency units.
    pub discount: i64,
    /// Start of the validity window, inclusive.
    pub starts_at: DateTime<Utc>,
    /// End of the validity window, inclusive.
    pub ends_at: DateTime<Utc>,
    /// Remaining redemptions.
    pub quota: u32,
}

impl Voucher {
    /// Returns `true` when `now` falls inside the validity window.
    #[must_use]
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        now >= self.starts_at && now <= self.ends_at
    }
}

#[derive(Debug, Default)]
struct CatalogInner {
    events: HashMap<Uuid, EventDetails>,
    ticket_types: HashMap<Uuid, TicketType>,
    vouchers: HashMap<(Uuid, String), Voucher>,
}

/// Shared catalog of events, ticket types, and vouchers.
#[derive(Debug, Default)]
pub struct EventCatalog {
    inner: RwLock<CatalogInner>,
}

impl EventCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an event owned by `organizer_id` and returns its ID.
    pub async fn add_event(&self, organizer_id: Uuid, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.write().await;
        inner.events.insert(
            id,
            EventDetails {
                id,
                organizer_id,
                title: title.to_string(),
            },
        );
        id
    }

    /// Adds a ticket type to an event and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::EventNotFound`] for an unknown event and
    /// [`SettlementError::InvalidRequest`] when the title collides with an
    /// existing ticket type of the same event.
    pub async fn add_ticket_type(
        &self,
        event_id: Uuid,
        title: &str,
        price: i64,
        remaining: u32,
    ) -> Result<Uuid, SettlementError> {
        let mut inner = self.inner.write().await;
        if !inner.events.contains_key(&event_id) {
            return Err(SettlementError::EventNotFound(event_id));
        }
        if inner
            .ticket_types
            .values()
            .any(|t| t.event_id == event_id && t.title == title)
        {
            return Err(SettlementError::InvalidRequest(format!(
                "ticket type {title} already exists for event {event_id}"
            )));
        }
        let id = Uuid::new_v4();
        inner.ticket_types.insert(
            id,
            TicketType {
                id,
                event_id,
                title: title.to_string(),
                price,
                remaining,
            },
        );
        Ok(id)
    }

    /// Adds a voucher, keyed by `(event_id, code)`.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::EventNotFound`] for an unknown event and
    /// [`SettlementError::InvalidRequest`] when the code already exists for
    /// the event.
    pub async fn add_voucher(&self, voucher: Voucher) -> Result<(), SettlementError> {
        let mut inner = self.inner.write().await;
        if !inner.events.contains_key(&voucher.event_id) {
            return Err(SettlementError::EventNotFound(voucher.event_id));
        }
        let key = (voucher.event_id, voucher.code.clone());
        if inner.vouchers.contains_key(&key) {
            return Err(SettlementError::InvalidRequest(format!(
                "voucher {} already exists for event {}",
                voucher.code, voucher.event_id
            )));
        }
        inner.vouchers.insert(key, voucher);
        Ok(())
    }

    /// Returns a snapshot of the event.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::EventNotFound`] if no such event exists.
    pub async fn event(&self, event_id: Uuid) -> Result<EventDetails, SettlementError> {
        let inner = self.inner.read().await;
        inner
            .events
            .get(&event_id)
            .cloned()
            .ok_or(SettlementError::EventNotFound(event_id))
    }

    /// Returns a snapshot of the ticket type together with its parent event.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::TicketTypeNotFound`] for an unknown ticket
    /// type and [`SettlementError::EventNotFound`] when its parent event is
    /// missing.
    pub async fn ticket_type(
        &self,
        ticket_type_id: Uuid,
    ) -> Result<(TicketType, EventDetails), SettlementError> {
        let inner = self.inner.read().await;
        let ticket = inner
            .ticket_types
            .get(&ticket_type_id)
            .cloned()
            .ok_or(SettlementError::TicketTypeNotFound(ticket_type_id))?;
        let event = inner
            .events
            .get(&ticket.event_id)
            .cloned()
            .ok_or(SettlementError::EventNotFound(ticket.event_id))?;
        Ok((ticket, event))
    }

    /// Returns the IDs of all events owned by the organizer.
    pub async fn events_owned_by(&self, organizer_id: Uuid) -> Vec<Uuid> {
        let inner = self.inner.read().await;
        inner
            .events
            .values()
            .filter(|e| e.organizer_id == organizer_id)
            .map(|e| e.id)
            .collect()
    }

    /// Validates a voucher for use against an event at time `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::InvalidVoucher`] carrying the specific
    /// [`VoucherIssue`]: `NotFound` when the code does not exist for this
    /// event, `OutsideWindow` when `now` is outside the validity window,
    /// `Exhausted` when the quota is zero.
    pub async fn validate_voucher(
        &self,
        event_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Voucher, SettlementError> {
        let inner = self.inner.read().await;
        let voucher = inner
            .vouchers
            .get(&(event_id, code.to_string()))
            .ok_or(SettlementError::InvalidVoucher(VoucherIssue::NotFound))?;
        if !voucher.in_window(now) {
            return Err(SettlementError::InvalidVoucher(VoucherIssue::OutsideWindow));
        }
        if voucher.quota == 0 {
            return Err(SettlementError::InvalidVoucher(VoucherIssue::Exhausted));
        }
        Ok(voucher.clone())
    }

    /// Consumes one redemption slot, re-checking the quota under the write
    /// lock. Never reversed on later transaction expiry.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::InvalidVoucher`] with `NotFound` or
    /// `Exhausted` when the voucher is missing or the quota raced to zero.
    pub async fn consume_voucher(&self, event_id: Uuid, code: &str) -> Result<(), SettlementError> {
        let mut inner = self.inner.write().await;
        let voucher = inner
            .vouchers
            .get_mut(&(event_id, code.to_string()))
            .ok_or(SettlementError::InvalidVoucher(VoucherIssue::NotFound))?;
        if voucher.quota == 0 {
            return Err(SettlementError::InvalidVoucher(VoucherIssue::Exhausted));
        }
        voucher.quota -= 1;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn voucher(event_id: Uuid, code: &str, quota: u32) -> Voucher {
        let now = Utc::now();
        Voucher {
            event_id,
            code: code.to_string(),
            discount: 5_000,
            starts_at: now - chrono::Duration::days(1),
            ends_at: now + chrono::Duration::days(1),
            quota,
        }
    }

    #[tokio::test]
    async fn ticket_type_title_unique_within_event() {
        let catalog = EventCatalog::new();
        let event = catalog.add_event(Uuid::new_v4(), "Concert").await;

        let Ok(_) = catalog.add_ticket_type(event, "VIP", 100_000, 50).await else {
            panic!("first insert failed");
        };
        let dup = catalog.add_ticket_type(event, "VIP", 200_000, 10).await;
        assert!(matches!(dup, Err(SettlementError::InvalidRequest(_))));

        // Same title under a different event is fine.
        let other = catalog.add_event(Uuid::new_v4(), "Festival").await;
        assert!(catalog.add_ticket_type(other, "VIP", 100_000, 50).await.is_ok());
    }

    #[tokio::test]
    async fn voucher_is_scoped_to_its_event() {
        let catalog = EventCatalog::new();
        let event_a = catalog.add_event(Uuid::new_v4(), "A").await;
        let event_b = catalog.add_event(Uuid::new_v4(), "B").await;
        let Ok(()) = catalog.add_voucher(voucher(event_a, "SAVE", 5)).await else {
            panic!("voucher insert failed");
        };

        let now = Utc::now();
        assert!(catalog.validate_voucher(event_a, "SAVE", now).await.is_ok());
        let wrong_event = catalog.validate_voucher(event_b, "SAVE", now).await;
        assert!(matches!(
            wrong_event,
            Err(SettlementError::InvalidVoucher(VoucherIssue::NotFound))
        ));
    }

    #[tokio::test]
    async fn voucher_window_is_enforced() {
        let catalog = EventCatalog::new();
        let event = catalog.add_event(Uuid::new_v4(), "A").await;
        let mut v = voucher(event, "EARLY", 5);
        v.starts_at = Utc::now() + chrono::Duration::days(2);
        v.ends_at = Utc::now() + chrono::Duration::days(3);
        let Ok(()) = catalog.add_voucher(v).await else {
            panic!("voucher insert failed");
        };

        let result = catalog.validate_voucher(event, "EARLY", Utc::now()).await;
        assert!(matches!(
            result,
            Err(SettlementError::InvalidVoucher(VoucherIssue::OutsideWindow))
        ));
    }

    #[tokio::test]
    async fn quota_runs_out() {
        let catalog = EventCatalog::new();
        let event = catalog.add_event(Uuid::new_v4(), "A").await;
        let Ok(()) = catalog.add_voucher(voucher(event, "ONE", 1)).await else {
            panic!("voucher insert failed");
        };

        let Ok(()) = catalog.consume_voucher(event, "ONE").await else {
            panic!("first consume failed");
        };
        let second = catalog.consume_voucher(event, "ONE").await;
        assert!(matches!(
            second,
            Err(SettlementError::InvalidVoucher(VoucherIssue::Exhausted))
        ));
        let validate = catalog.validate_voucher(event, "ONE", Utc::now()).await;
        assert!(matches!(
            validate,
            Err(SettlementError::InvalidVoucher(VoucherIssue::Exhausted))
        ));
    }

    #[tokio::test]
    async fn events_owned_by_filters_on_organizer() {
        let catalog = EventCatalog::new();
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        let a = catalog.add_event(mine, "A").await;
        let _b = catalog.add_event(theirs, "B").await;

        let owned = catalog.events_owned_by(mine).await;
        assert_eq!(owned, vec![a]);
    }
}
