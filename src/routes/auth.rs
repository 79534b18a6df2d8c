use crate::{
    auth::{verify_password, AuthResponse, LoginRequest, RegisterRequest, VerifyQuery, SESSION_COOKIE},
    error::AppError,
    state::AppState,
};
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::json;
use validator::Validate;

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".into())
}

fn session_cookie(token: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(CookieDuration::seconds(max_age_secs))
        .finish()
}

/// Register a new user
///
/// Stores a pending registration and emails a verification link. No account
/// exists until the link is followed.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let receipt = state.registration.submit(register_data.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Registration received. Check your email for a verification link.",
        "email": receipt.email,
        "expires_at": receipt.expires_at,
    })))
}

/// Verify an email address
///
/// Target of the emailed link. Consumes the pending registration and creates
/// the account.
#[get("/verify")]
pub async fn verify(
    state: web::Data<AppState>,
    query: web::Query<VerifyQuery>,
) -> Result<impl Responder, AppError> {
    let account = state.registration.verify(&query.token, &query.email).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Email verified. You can now log in.",
        "email": account.email,
        "next": "/api/auth/login",
    })))
}

/// Login user
///
/// Authenticates a user, sets the session cookie and returns the token.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let account = state
        .store
        .find_account_by_email(&login_data.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    let password_ok = match verify_password(&login_data.password, &account.password_hash) {
        Ok(ok) => ok,
        Err(e) => {
            log::warn!("unusable password hash for account {}: {}", account.id, e);
            false
        }
    };
    if !password_ok || !account.is_active {
        return Err(invalid_credentials());
    }

    let token = state
        .codec
        .issue(account.id, &account.name, &account.email)?;
    let cookie = session_cookie(token.clone(), state.codec.ttl().num_seconds());

    log::info!("account {} logged in", account.id);
    Ok(HttpResponse::Ok().cookie(cookie).json(AuthResponse {
        message: "Login successful".into(),
        token,
        user_id: account.id,
    }))
}

/// Logout user
///
/// Clears the session cookie. The token itself stays valid until it expires.
#[post("/logout")]
pub async fn logout() -> impl Responder {
    let mut cookie = session_cookie(String::new(), 0);
    cookie.make_removal();

    HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "message": "Logged out" }))
}
