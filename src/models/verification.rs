use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// An unconfirmed signup waiting for its email link to be followed.
///
/// Actionable only while `expires_at > now` and `used` is false. Rows are kept
/// after activation (marked used) until the sweep removes them.
#[derive(Debug, Clone, FromRow)]
pub struct PendingRegistration {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl PendingRegistration {
    pub fn is_actionable(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewPendingRegistration {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// What the caller learns after a successful submission. The token itself only
/// travels through the notifier.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegistrationReceipt {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}
