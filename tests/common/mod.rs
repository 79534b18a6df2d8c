#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

use taskwarden::auth::{RegistrationService, RegistrationSettings, TokenCodec};
use taskwarden::clock::ManualClock;
use taskwarden::mailer::{MailError, Notifier};
use taskwarden::state::AppState;
use taskwarden::store::MemoryStore;

pub const BASE_URL: &str = "http://localhost:8080";
pub const TEST_SECRET: &str = "integration-test-secret";
pub const TOKEN_TTL_SECS: i64 = 300;

/// Hands every verification link to the test instead of sending mail.
pub struct RecordingNotifier {
    links: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_verification_mail(
        &self,
        _name: &str,
        _email: &str,
        link: &str,
    ) -> Result<(), MailError> {
        let _ = self.links.send(link.to_string());
        Ok(())
    }
}

pub struct TestContext {
    pub state: web::Data<AppState>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub links: mpsc::UnboundedReceiver<String>,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (tx, links) = mpsc::unbounded_channel();

        let codec = TokenCodec::new(TEST_SECRET, Duration::seconds(TOKEN_TTL_SECS), clock.clone())
            .expect("test secret is valid");
        let registration = RegistrationService::new(
            store.clone(),
            Arc::new(RecordingNotifier { links: tx }),
            clock.clone(),
            RegistrationSettings {
                base_url: BASE_URL.to_string(),
                verification_ttl: Duration::minutes(10),
                bcrypt_cost: 4,
            },
        );

        let state = web::Data::new(AppState {
            store: store.clone(),
            codec: Arc::new(codec),
            registration: Arc::new(registration),
            clock: clock.clone(),
            bcrypt_cost: 4,
        });

        Self {
            state,
            store,
            clock,
            links,
        }
    }

    /// Waits for the next emailed link and returns it relative to the app root.
    pub async fn next_link_path(&mut self) -> String {
        let link = self.links.recv().await.expect("a verification link was sent");
        link.strip_prefix(BASE_URL)
            .expect("link starts with the base url")
            .to_string()
    }
}

pub struct TestUser {
    pub id: i64,
    pub token: String,
}

/// Registers, follows the emailed link and logs in.
pub async fn register_verify_and_login<S, B>(
    app: &S,
    ctx: &mut TestContext,
    name: &str,
    email: &str,
    password: &str,
) -> Result<TestUser, String>
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": name,
            "email": email,
            "password": password,
            "confirm_password": password
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    if !resp.status().is_success() {
        return Err(format!("register failed with {}", resp.status()));
    }

    let path = ctx.next_link_path().await;
    let req = test::TestRequest::get().uri(&path).to_request();
    let resp = test::call_service(app, req).await;
    if !resp.status().is_success() {
        return Err(format!("verify failed with {}", resp.status()));
    }

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    if !status.is_success() {
        return Err(format!(
            "login failed with {}: {}",
            status,
            String::from_utf8_lossy(&body)
        ));
    }
    let auth: taskwarden::auth::AuthResponse =
        serde_json::from_slice(&body).map_err(|e| format!("bad login body: {}", e))?;

    Ok(TestUser {
        id: auth.user_id,
        token: auth.token,
    })
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
