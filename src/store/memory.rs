use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Activation, Store, StoreError};
use crate::models::{
    user::DEFAULT_ROLE, Account, AccountChanges, NewPendingRegistration, NewTask, PageMeta,
    PendingRegistration, Task, TaskChanges, TaskListParams, TaskPage, TaskSort, TaskStatus,
};

const EMAIL_TAKEN: &str = "Email already registered";

#[derive(Debug, Default)]
struct Tables {
    accounts: Vec<Account>,
    pending: Vec<PendingRegistration>,
    tasks: Vec<Task>,
    next_account_id: i64,
    next_pending_id: i64,
    next_task_id: i64,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.accounts
            .iter()
            .any(|a| a.email == email && Some(a.id) != except)
    }
}

/// A [`Store`] kept in process memory behind a single mutex.
///
/// Every trait method runs under one guard, which gives the same atomicity the
/// Postgres backend gets from its transactions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of every pending registration, used or not.
    pub fn pending_registrations(&self) -> Vec<PendingRegistration> {
        self.tables().pending.clone()
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.tables().accounts.clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tables().tasks.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_account(&self, id: i64) -> Result<Option<Account>, StoreError> {
        Ok(self.tables().accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .tables()
            .accounts
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn count_accounts_with_email(
        &self,
        email: &str,
        except: Option<i64>,
    ) -> Result<i64, StoreError> {
        let count = self
            .tables()
            .accounts
            .iter()
            .filter(|a| a.email == email && Some(a.id) != except)
            .count();
        Ok(count as i64)
    }

    async fn update_account(
        &self,
        id: i64,
        changes: &AccountChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError> {
        let mut tables = self.tables();
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::UniqueViolation(EMAIL_TAKEN.into()));
            }
        }

        let Some(account) = tables.accounts.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            account.name = name.clone();
        }
        if let Some(email) = &changes.email {
            account.email = email.clone();
        }
        if let Some(hash) = &changes.password_hash {
            account.password_hash = hash.clone();
        }
        account.updated_at = now;
        Ok(Some(account.clone()))
    }

    async fn create_pending(
        &self,
        pending: NewPendingRegistration,
    ) -> Result<PendingRegistration, StoreError> {
        let mut tables = self.tables();
        if tables.pending.iter().any(|p| p.token == pending.token) {
            return Err(StoreError::UniqueViolation(
                "Verification token already exists".into(),
            ));
        }

        tables.next_pending_id += 1;
        let record = PendingRegistration {
            id: tables.next_pending_id,
            email: pending.email,
            name: pending.name,
            password_hash: pending.password_hash,
            token: pending.token,
            expires_at: pending.expires_at,
            used: false,
            created_at: pending.created_at,
        };
        tables.pending.push(record.clone());
        Ok(record)
    }

    async fn activate_pending(
        &self,
        token: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Activation, StoreError> {
        let mut tables = self.tables();

        let Some(index) = tables
            .pending
            .iter()
            .position(|p| p.token == token && p.email == email && p.is_actionable(now))
        else {
            return Ok(Activation::NoMatch);
        };

        // Checked before any write so a conflict leaves the record untouched.
        if tables.email_taken(email, None) {
            return Err(StoreError::UniqueViolation(EMAIL_TAKEN.into()));
        }

        tables.next_account_id += 1;
        let id = tables.next_account_id;
        let pending = &mut tables.pending[index];
        pending.used = true;
        let account = Account {
            id,
            name: pending.name.clone(),
            email: pending.email.clone(),
            password_hash: pending.password_hash.clone(),
            is_active: true,
            role: DEFAULT_ROLE.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.accounts.push(account.clone());
        Ok(Activation::Activated(account))
    }

    async fn delete_expired_pending(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables();
        let before = tables.pending.len();
        tables.pending.retain(|p| p.expires_at >= now);
        Ok((before - tables.pending.len()) as u64)
    }

    async fn create_task(
        &self,
        owner_id: i64,
        task: NewTask,
        now: DateTime<Utc>,
    ) -> Result<Task, StoreError> {
        let mut tables = self.tables();
        tables.next_task_id += 1;
        let completed_at = (task.status == TaskStatus::Completed).then_some(now);
        let record = Task {
            id: tables.next_task_id,
            user_id: owner_id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: task.status,
            completed_at,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.push(record.clone());
        Ok(record)
    }

    async fn find_task(&self, id: i64, owner_id: i64) -> Result<Option<Task>, StoreError> {
        Ok(self
            .tables()
            .tasks
            .iter()
            .find(|t| t.id == id && t.user_id == owner_id)
            .cloned())
    }

    async fn list_tasks(
        &self,
        owner_id: i64,
        params: &TaskListParams,
    ) -> Result<TaskPage, StoreError> {
        let mut matching: Vec<Task> = self
            .tables()
            .tasks
            .iter()
            .filter(|t| t.user_id == owner_id)
            .filter(|t| params.status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();

        match params.sort {
            TaskSort::CreatedAtAsc => matching.sort_by_key(|t| (t.created_at, t.id)),
            TaskSort::CreatedAtDesc => matching.sort_by_key(|t| Reverse((t.created_at, t.id))),
            TaskSort::PriorityAsc => matching.sort_by_key(|t| (t.priority, t.id)),
            TaskSort::PriorityDesc => matching.sort_by_key(|t| Reverse((t.priority, t.id))),
        }

        let total = matching.len() as i64;
        let tasks = matching
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.limit as usize)
            .collect();

        Ok(TaskPage {
            tasks,
            meta: PageMeta {
                total,
                page: params.page,
                limit: params.limit,
            },
        })
    }

    async fn update_task(
        &self,
        id: i64,
        owner_id: i64,
        changes: &TaskChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        let mut tables = self.tables();
        let Some(task) = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.user_id == owner_id)
        else {
            return Ok(None);
        };

        if let Some(title) = &changes.title {
            task.title = title.clone();
        }
        if let Some(description) = &changes.description {
            task.description = description.clone();
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(completed_at) = changes.completed_at(now) {
            task.completed_at = completed_at;
        }
        task.updated_at = now;
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: i64, owner_id: i64) -> Result<u64, StoreError> {
        let mut tables = self.tables();
        let before = tables.tasks.len();
        tables
            .tasks
            .retain(|t| !(t.id == id && t.user_id == owner_id));
        Ok((before - tables.tasks.len()) as u64)
    }
}
