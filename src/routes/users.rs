use crate::{
    auth::{hash_password, AuthenticatedUser},
    error::AppError,
    models::{AccountChanges, AccountProfile, UpdateProfileRequest},
    state::AppState,
};
use actix_web::{get, put, web, HttpResponse, Responder};
use validator::Validate;

fn account_gone() -> AppError {
    AppError::NotFound("User not found".into())
}

/// Returns the profile of the account named by the session token.
#[get("/me")]
pub async fn get_profile(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let account = state
        .store
        .find_account(user.id)
        .await?
        .ok_or_else(account_gone)?;
    Ok(HttpResponse::Ok().json(AccountProfile::from(&account)))
}

/// Partially updates name, email and password.
///
/// ## Responses:
/// - `200 OK`: The updated profile.
/// - `400 Bad Request`: Nothing to update.
/// - `409 Conflict`: The new email belongs to another account.
/// - `422 Unprocessable Entity`: Validation failure.
#[put("/me")]
pub async fn update_profile(
    state: web::Data<AppState>,
    profile_data: web::Json<UpdateProfileRequest>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let update = profile_data.into_inner().without_empty_fields();
    update.validate()?;

    if let Some(email) = &update.email {
        if state
            .store
            .count_accounts_with_email(email, Some(user.id))
            .await?
            > 0
        {
            return Err(AppError::Conflict("Email already registered".into()));
        }
    }

    let password_hash = match &update.password {
        Some(password) => Some(hash_password(password, state.bcrypt_cost)?),
        None => None,
    };
    let changes = AccountChanges {
        name: update.name,
        email: update.email,
        password_hash,
    };
    if changes.is_empty() {
        return Err(AppError::NoFieldsProvided);
    }

    let account = state
        .store
        .update_account(user.id, &changes, state.clock.now())
        .await?
        .ok_or_else(account_gone)?;

    log::info!("account {} updated its profile", account.id);
    Ok(HttpResponse::Ok().json(AccountProfile::from(&account)))
}
