use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::auth::USERNAME_REGEX;

pub const DEFAULT_ROLE: &str = "user";

/// A verified account as stored in the `users` table.
///
/// Accounts are only ever created by activating a pending registration.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The public view of an [`Account`]; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role.clone(),
            is_active: account.is_active,
            created_at: account.created_at,
        }
    }
}

/// Payload for `PUT /api/users/me`. Absent or empty fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(
        length(min = 3, max = 20),
        regex(
            path = "USERNAME_REGEX",
            message = "Name must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 50))]
    pub password: Option<String>,
}

impl UpdateProfileRequest {
    /// Drops fields sent as empty strings so they count as absent.
    pub fn without_empty_fields(self) -> Self {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }
        Self {
            name: present(self.name),
            email: present(self.email),
            password: present(self.password),
        }
    }
}

/// The set of account columns a profile update will write.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password_hash.is_none()
    }
}
