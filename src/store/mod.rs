//! Persistence boundary.
//!
//! [`Store`] is the only shared mutable resource in the service. Every method
//! carries its full predicate: task operations always receive the owner's id and
//! must apply it in the same statement as the task id, and activation of a
//! pending registration is a single atomic check-and-consume.
//!
//! Two backends implement it: [`PgStore`] for Postgres and [`MemoryStore`] for
//! tests and local runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    Account, AccountChanges, NewPendingRegistration, NewTask, PendingRegistration, Task,
    TaskChanges, TaskListParams, TaskPage,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write. Carries a caller-safe message.
    #[error("{0}")]
    UniqueViolation(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result of [`Store::activate_pending`].
#[derive(Debug, Clone)]
pub enum Activation {
    /// The pending record was consumed and this account created.
    Activated(Account),
    /// No unused, unexpired record matched both token and email.
    NoMatch,
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    // Accounts

    async fn find_account(&self, id: i64) -> Result<Option<Account>, StoreError>;

    /// Exact, case-sensitive email match.
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Counts accounts using `email`, ignoring the account `except` when given.
    async fn count_accounts_with_email(
        &self,
        email: &str,
        except: Option<i64>,
    ) -> Result<i64, StoreError>;

    /// Applies the present fields of `changes`. `None` when no account has `id`.
    async fn update_account(
        &self,
        id: i64,
        changes: &AccountChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError>;

    // Pending registrations

    async fn create_pending(
        &self,
        pending: NewPendingRegistration,
    ) -> Result<PendingRegistration, StoreError>;

    /// In one transaction: find the record matching `token`, `email`,
    /// `expires_at > now` and `used = false`, mark it used, and create the
    /// account from it. Either both writes persist or neither does, and two
    /// concurrent calls for the same record cannot both activate.
    async fn activate_pending(
        &self,
        token: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Activation, StoreError>;

    /// Deletes every record with `expires_at < now`, used or not.
    async fn delete_expired_pending(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    // Tasks, always scoped to their owner

    async fn create_task(
        &self,
        owner_id: i64,
        task: NewTask,
        now: DateTime<Utc>,
    ) -> Result<Task, StoreError>;

    async fn find_task(&self, id: i64, owner_id: i64) -> Result<Option<Task>, StoreError>;

    async fn list_tasks(
        &self,
        owner_id: i64,
        params: &TaskListParams,
    ) -> Result<TaskPage, StoreError>;

    /// `None` when no task has both `id` and `owner_id`.
    async fn update_task(
        &self,
        id: i64,
        owner_id: i64,
        changes: &TaskChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError>;

    /// Rows affected: 0 when no task has both `id` and `owner_id`.
    async fn delete_task(&self, id: i64, owner_id: i64) -> Result<u64, StoreError>;
}
