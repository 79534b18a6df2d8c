//! Pending registration → verified account.
//!
//! `submit` validates the request, stores a [`PendingRegistration`] carrying the
//! pre-hashed password and a single-use token, and hands the verification link to
//! the [`Notifier`] on a detached task. `verify` consumes the pending record and
//! creates the account in one atomic store operation. `sweep` deletes expired
//! records on a timer.
//!
//! [`PendingRegistration`]: crate::models::PendingRegistration

use chrono::Duration;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;
use validator::Validate;

use crate::auth::password::hash_password;
use crate::auth::RegisterRequest;
use crate::clock::Clock;
use crate::error::AppError;
use crate::mailer::Notifier;
use crate::models::{Account, NewPendingRegistration, RegistrationReceipt};
use crate::store::{Activation, Store};

pub const DEFAULT_VERIFICATION_TTL_SECS: i64 = 10 * 60;

/// Settings for [`RegistrationService`], taken from `Config` at startup.
#[derive(Debug, Clone)]
pub struct RegistrationSettings {
    /// Base of the emailed link, e.g. `http://localhost:8080`.
    pub base_url: String,
    pub verification_ttl: Duration,
    pub bcrypt_cost: u32,
}

pub struct RegistrationService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: RegistrationSettings,
}

/// Builds `<base>/verify?token=<token>&email=<escaped email>`.
pub fn verification_link(base_url: &str, token: &str, email: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let email: String = url::form_urlencoded::byte_serialize(email.as_bytes()).collect();
    format!("{base}/verify?token={token}&email={email}")
}

impl RegistrationService {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: RegistrationSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            settings,
        }
    }

    /// Accepts a registration and emails the verification link.
    ///
    /// Validation and the password confirmation check happen before the store
    /// is touched. The mail is sent on a detached task; its outcome is only
    /// logged and does not affect the stored record or the returned receipt.
    pub async fn submit(&self, request: RegisterRequest) -> Result<RegistrationReceipt, AppError> {
        request.validate()?;
        if request.password != request.confirm_password {
            return Err(AppError::ValidationError("Passwords do not match".into()));
        }

        if self
            .store
            .count_accounts_with_email(&request.email, None)
            .await?
            > 0
        {
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.settings.verification_ttl)
            .ok_or_else(|| {
                AppError::InternalServerError(format!(
                    "verification ttl {} overflows the expiry timestamp",
                    self.settings.verification_ttl
                ))
            })?;
        let password_hash = hash_password(&request.password, self.settings.bcrypt_cost)?;
        let token = Uuid::new_v4().to_string();

        let pending = self
            .store
            .create_pending(NewPendingRegistration {
                email: request.email,
                name: request.name,
                password_hash,
                token,
                expires_at,
                created_at: now,
            })
            .await
            .map_err(|e| {
                log::error!("failed to store pending registration: {}", e);
                AppError::InternalServerError("Failed to process registration".into())
            })?;

        let link = verification_link(&self.settings.base_url, &pending.token, &pending.email);
        let notifier = Arc::clone(&self.notifier);
        let name = pending.name.clone();
        let email = pending.email.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_verification_mail(&name, &email, &link).await {
                log::error!("failed to send verification mail to {}: {}", email, e);
            }
        });

        log::info!("registration pending verification for {}", pending.email);
        Ok(RegistrationReceipt {
            email: pending.email,
            expires_at: pending.expires_at,
        })
    }

    /// Activates the account for a `(token, email)` pair taken from the emailed link.
    ///
    /// Any mismatch, expiry or reuse yields the same [`AppError::InvalidOrExpired`].
    ///
    /// The email must match exactly; no trimming or case folding is applied.
    pub async fn verify(&self, token: &str, email: &str) -> Result<Account, AppError> {
        if token.is_empty() || email.is_empty() {
            return Err(AppError::BadRequest(
                "Missing token or email in verification link".into(),
            ));
        }

        match self
            .store
            .activate_pending(token, email, self.clock.now())
            .await?
        {
            Activation::Activated(account) => {
                log::info!("account {} activated for {}", account.id, account.email);
                Ok(account)
            }
            Activation::NoMatch => {
                log::debug!("verification rejected for {}", email);
                Err(AppError::InvalidOrExpired)
            }
        }
    }

    /// Deletes every pending registration whose expiry has passed.
    ///
    /// Errors are logged and reported as zero deletions; stale rows are simply
    /// picked up by the next run.
    pub async fn sweep(&self) -> u64 {
        match self.store.delete_expired_pending(self.clock.now()).await {
            Ok(0) => 0,
            Ok(deleted) => {
                log::info!("swept {} expired pending registrations", deleted);
                deleted
            }
            Err(e) => {
                log::error!("pending registration sweep failed: {}", e);
                0
            }
        }
    }
}

/// Runs [`RegistrationService::sweep`] every `every`, starting after one period.
pub fn spawn_sweeper(service: Arc<RegistrationService>, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            service.sweep().await;
        }
    })
}
