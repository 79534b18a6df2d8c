use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};

use super::{Activation, Store, StoreError};
use crate::models::{
    Account, AccountChanges, NewPendingRegistration, NewTask, PageMeta, PendingRegistration,
    Task, TaskChanges, TaskListParams, TaskPage, TaskStatus,
};

const ACCOUNT_COLUMNS: &str =
    "id, name, email, password_hash, is_active, role, created_at, updated_at";
const PENDING_COLUMNS: &str =
    "id, email, name, password_hash, token, expires_at, used, created_at";
const TASK_COLUMNS: &str =
    "id, user_id, title, description, priority, status, completed_at, created_at, updated_at";

/// Postgres-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and applies the embedded migrations. Any failure here is fatal
    /// for the binary.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Maps a unique violation on `users.email` to a caller-safe conflict.
fn email_conflict(err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::UniqueViolation("Email already registered".into())
    } else {
        StoreError::Database(err)
    }
}

fn push_task_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    owner_id: i64,
    status: Option<TaskStatus>,
) {
    builder.push(" WHERE user_id = ").push_bind(owner_id);
    if let Some(status) = status {
        builder.push(" AND status = ").push_bind(status);
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_account(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn count_accounts_with_email(
        &self,
        email: &str,
        except: Option<i64>,
    ) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2)",
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn update_account(
        &self,
        id: i64,
        changes: &AccountChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        let mut set = builder.separated(", ");
        if let Some(name) = &changes.name {
            set.push("name = ").push_bind_unseparated(name);
        }
        if let Some(email) = &changes.email {
            set.push("email = ").push_bind_unseparated(email);
        }
        if let Some(hash) = &changes.password_hash {
            set.push("password_hash = ").push_bind_unseparated(hash);
        }
        set.push("updated_at = ").push_bind_unseparated(now);
        builder.push(" WHERE id = ").push_bind(id);
        builder.push(format!(" RETURNING {ACCOUNT_COLUMNS}"));

        builder
            .build_query_as::<Account>()
            .fetch_optional(&self.pool)
            .await
            .map_err(email_conflict)
    }

    async fn create_pending(
        &self,
        pending: NewPendingRegistration,
    ) -> Result<PendingRegistration, StoreError> {
        let sql = format!(
            "INSERT INTO pending_registrations (email, name, password_hash, token, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PENDING_COLUMNS}"
        );
        let record = sqlx::query_as::<_, PendingRegistration>(&sql)
            .bind(&pending.email)
            .bind(&pending.name)
            .bind(&pending.password_hash)
            .bind(&pending.token)
            .bind(pending.expires_at)
            .bind(pending.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::UniqueViolation("Verification token already exists".into())
                } else {
                    StoreError::Database(e)
                }
            })?;
        Ok(record)
    }

    async fn activate_pending(
        &self,
        token: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Activation, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The predicate doubles as a compare-and-set on `used`: a concurrent
        // activation of the same row waits on the row lock and then matches nothing.
        let sql = format!(
            "UPDATE pending_registrations SET used = TRUE \
             WHERE token = $1 AND email = $2 AND expires_at > $3 AND used = FALSE \
             RETURNING {PENDING_COLUMNS}"
        );
        let consumed = sqlx::query_as::<_, PendingRegistration>(&sql)
            .bind(token)
            .bind(email)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(pending) = consumed else {
            tx.rollback().await?;
            return Ok(Activation::NoMatch);
        };

        let sql = format!(
            "INSERT INTO users (name, email, password_hash, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) RETURNING {ACCOUNT_COLUMNS}"
        );
        // Dropping `tx` on the error path rolls the used flag back.
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(&pending.name)
            .bind(&pending.email)
            .bind(&pending.password_hash)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(email_conflict)?;

        tx.commit().await?;
        Ok(Activation::Activated(account))
    }

    async fn delete_expired_pending(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM pending_registrations WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_task(
        &self,
        owner_id: i64,
        task: NewTask,
        now: DateTime<Utc>,
    ) -> Result<Task, StoreError> {
        let completed_at = (task.status == TaskStatus::Completed).then_some(now);
        let sql = format!(
            "INSERT INTO tasks (user_id, title, description, priority, status, completed_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING {TASK_COLUMNS}"
        );
        let record = sqlx::query_as::<_, Task>(&sql)
            .bind(owner_id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.priority)
            .bind(task.status)
            .bind(completed_at)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok(record)
    }

    async fn find_task(&self, id: i64, owner_id: i64) -> Result<Option<Task>, StoreError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2");
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn list_tasks(
        &self,
        owner_id: i64,
        params: &TaskListParams,
    ) -> Result<TaskPage, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks");
        push_task_filters(&mut count, owner_id, params.status);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
        push_task_filters(&mut select, owner_id, params.status);
        select.push(" ORDER BY ").push(params.sort.order_by());
        select.push(" LIMIT ").push_bind(i64::from(params.limit));
        select.push(" OFFSET ").push_bind(params.offset() as i64);
        let tasks = select
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await?;

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
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE tasks SET ");
        let mut set = builder.separated(", ");
        if let Some(title) = &changes.title {
            set.push("title = ").push_bind_unseparated(title);
        }
        if let Some(description) = &changes.description {
            set.push("description = ").push_bind_unseparated(description);
        }
        if let Some(priority) = changes.priority {
            set.push("priority = ").push_bind_unseparated(priority);
        }
        if let Some(status) = changes.status {
            set.push("status = ").push_bind_unseparated(status);
        }
        if let Some(completed_at) = changes.completed_at(now) {
            set.push("completed_at = ").push_bind_unseparated(completed_at);
        }
        set.push("updated_at = ").push_bind_unseparated(now);
        builder.push(" WHERE id = ").push_bind(id);
        builder.push(" AND user_id = ").push_bind(owner_id);
        builder.push(format!(" RETURNING {TASK_COLUMNS}"));

        let task = builder
            .build_query_as::<Task>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn delete_task(&self, id: i64, owner_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
