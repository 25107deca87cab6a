//! Accounts, roles, and the loyalty point ledger.
//!
//! Users and organizers are two disjoint identity kinds sharing one
//! email-uniqueness domain, modeled as a tagged union rather than two
//! overlapping record shapes. Only users carry a referral code and a
//! loyalty point balance; the role is fixed at registration and gates
//! every lifecycle operation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::SettlementError;

/// Account role, immutable after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Ticket buyer: may create transactions, pay, and upload proof.
    User,
    /// Event owner: may confirm payments for their own events.
    Organizer,
}

/// Already-authenticated caller identity handed in by the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// Account ID of the caller.
    pub id: Uuid,
    /// Role the caller authenticated as.
    pub role: Role,
}

/// Role-specific capability set of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountKind {
    /// Buyer with a referral code and redeemable point balance.
    User {
        /// Code other signups may use to credit this user.
        referral_code: String,
        /// Redeemable loyalty point balance.
        points: i64,
    },
    /// Event organizer; carries no referral code or points.
    Organizer,
}

/// One registered account of either kind.
#[derive(Debug, Clone)]
pub struct Account {
    /// Unique account identifier.
    pub id: Uuid,
    /// Email address, unique across both account kinds.
    pub email: String,
    /// Role-specific capabilities.
    pub kind: AccountKind,
}

impl Account {
    /// Returns the role implied by the account kind.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self.kind {
            AccountKind::User { .. } => Role::User,
            AccountKind::Organizer => Role::Organizer,
        }
    }
}

/// In-memory account registry doubling as the loyalty point ledger.
///
/// A single `RwLock` over the map serializes writes, so point credits and
/// debits are atomic with respect to concurrent callers.
#[derive(Debug, Default)]
pub struct AccountDirectory {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl AccountDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a buyer account.
    ///
    /// Generates a fresh referral code for the new user. When
    /// `referral_code` names an existing user, that referrer is credited
    /// `referral_bonus` points, once per referred signup.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::InvalidRequest`] if the email is already
    /// taken or the referral code matches no user.
    pub async fn register_user(
        &self,
        email: &str,
        referral_code: Option<&str>,
        referral_bonus: i64,
    ) -> Result<Uuid, SettlementError> {
        let mut map = self.accounts.write().await;
        if map.values().any(|a| a.email == email) {
            return Err(SettlementError::InvalidRequest(format!(
                "email {email} is already registered"
            )));
        }

        if let Some(code) = referral_code {
            let referrer_id = map
                .values()
                .find_map(|a| match &a.kind {
                    AccountKind::User { referral_code, .. } if referral_code == code => Some(a.id),
                    _ => None,
                })
                .ok_or_else(|| {
                    SettlementError::InvalidRequest(format!("unknown referral code {code}"))
                })?;
            if let Some(referrer) = map.get_mut(&referrer_id)
                && let AccountKind::User { points, .. } = &mut referrer.kind
            {
                *points += referral_bonus;
                tracing::info!(%referrer_id, referral_bonus, "referral bonus credited");
            }
        }

        let id = Uuid::new_v4();
        map.insert(
            id,
            Account {
                id,
                email: email.to_string(),
                kind: AccountKind::User {
                    referral_code: generate_referral_code(),
                    points: 0,
                },
            },
        );
        Ok(id)
    }

    /// Registers an organizer account.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::InvalidRequest`] if the email is already
    /// taken by an account of either kind.
    pub async fn register_organizer(&self, email: &str) -> Result<Uuid, SettlementError> {
        let mut map = self.accounts.write().await;
        if map.values().any(|a| a.email == email) {
            return Err(SettlementError::InvalidRequest(format!(
                "email {email} is already registered"
            )));
        }
        let id = Uuid::new_v4();
        map.insert(
            id,
            Account {
                id,
                email: email.to_string(),
                kind: AccountKind::Organizer,
            },
        );
        Ok(id)
    }

    /// Returns a snapshot of the account.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::AccountNotFound`] if no such account exists.
    pub async fn get(&self, id: Uuid) -> Result<Account, SettlementError> {
        let map = self.accounts.read().await;
        map.get(&id)
            .cloned()
            .ok_or(SettlementError::AccountNotFound(id))
    }

    /// Returns a user's current point balance.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::AccountNotFound`] if the account is
    /// missing or is not a user.
    pub async fn point_balance(&self, user_id: Uuid) -> Result<i64, SettlementError> {
        let map = self.accounts.read().await;
        match map.get(&user_id) {
            Some(Account {
                kind: AccountKind::User { points, .. },
                ..
            }) => Ok(*points),
            _ => Err(SettlementError::AccountNotFound(user_id)),
        }
    }

    /// Credits points to a user's balance.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::AccountNotFound`] if the account is
    /// missing or is not a user.
    pub async fn credit_points(&self, user_id: Uuid, amount: i64) -> Result<(), SettlementError> {
        let mut map = self.accounts.write().await;
        match map.get_mut(&user_id) {
            Some(Account {
                kind: AccountKind::User { points, .. },
                ..
            }) => {
                *points += amount;
                Ok(())
            }
            _ => Err(SettlementError::AccountNotFound(user_id)),
        }
    }

    /// Debits points from a user's balance, checked against the current
    /// balance under the write lock.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::InsufficientPoints`] when the balance
    /// does not cover `amount`, or [`SettlementError::AccountNotFound`]
    /// if the account is missing or is not a user.
    pub async fn debit_points(&self, user_id: Uuid, amount: i64) -> Result<(), SettlementError> {
        let mut map = self.accounts.write().await;
        match map.get_mut(&user_id) {
            Some(Account {
                kind: AccountKind::User { points, .. },
                ..
            }) => {
                if amount > *points {
                    return Err(SettlementError::InsufficientPoints {
                        requested: amount,
                        available: *points,
                    });
                }
                *points -= amount;
                Ok(())
            }
            _ => Err(SettlementError::AccountNotFound(user_id)),
        }
    }
}

/// Generates an opaque referral code from a fresh UUID.
fn generate_referral_code() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    uuid.chars().take(8).collect::<String>().to_uppercase()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const BONUS: i64 = 10_000;

    #[tokio::test]
    async fn register_user_rejects_duplicate_email() {
        let dir = AccountDirectory::new();
        let first = dir.register_user("a@example.com", None, BONUS).await;
        assert!(first.is_ok());
        let second = dir.register_user("a@example.com", None, BONUS).await;
        assert!(matches!(second, Err(SettlementError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn email_domain_is_shared_across_kinds() {
        let dir = AccountDirectory::new();
        let Ok(_) = dir.register_organizer("shared@example.com").await else {
            panic!("organizer registration failed");
        };
        let result = dir.register_user("shared@example.com", None, BONUS).await;
        assert!(matches!(result, Err(SettlementError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn referral_signup_credits_referrer_once() {
        let dir = AccountDirectory::new();
        let Ok(referrer) = dir.register_user("ref@example.com", None, BONUS).await else {
            panic!("registration failed");
        };
        let Ok(Account {
            kind: AccountKind::User { referral_code, .. },
            ..
        }) = dir.get(referrer).await
        else {
            panic!("referrer is not a user");
        };

        let Ok(_) = dir
            .register_user("new@example.com", Some(&referral_code), BONUS)
            .await
        else {
            panic!("referred signup failed");
        };

        let Ok(balance) = dir.point_balance(referrer).await else {
            panic!("balance lookup failed");
        };
        assert_eq!(balance, BONUS);
    }

    #[tokio::test]
    async fn unknown_referral_code_is_rejected() {
        let dir = AccountDirectory::new();
        let result = dir
            .register_user("new@example.com", Some("NOSUCH"), BONUS)
            .await;
        assert!(matches!(result, Err(SettlementError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn debit_is_guarded_by_balance() {
        let dir = AccountDirectory::new();
        let Ok(user) = dir.register_user("u@example.com", None, BONUS).await else {
            panic!("registration failed");
        };
        let Ok(()) = dir.credit_points(user, 500).await else {
            panic!("credit failed");
        };

        let over = dir.debit_points(user, 501).await;
        assert!(matches!(
            over,
            Err(SettlementError::InsufficientPoints {
                requested: 501,
                available: 500
            })
        ));

        let Ok(()) = dir.debit_points(user, 500).await else {
            panic!("exact debit failed");
        };
        let Ok(balance) = dir.point_balance(user).await else {
            panic!("balance lookup failed");
        };
        assert_eq!(balance, 0);
    }

    #[tokio::test]
    async fn organizer_has_no_point_balance() {
        let dir = AccountDirectory::new();
        let Ok(org) = dir.register_organizer("o@example.com").await else {
            panic!("registration failed");
        };
        assert!(dir.point_balance(org).await.is_err());
        assert!(dir.credit_points(org, 10).await.is_err());
        let Ok(account) = dir.get(org).await else {
            panic!("lookup failed");
        };
        assert_eq!(account.role(), Role::Organizer);
    }
}
