pub mod extractors;
pub mod middleware;
pub mod password;
pub mod registration;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use registration::{spawn_sweeper, RegistrationService, RegistrationSettings};
pub use token::{Claims, TokenCodec, TokenError};

/// Name of the session cookie set at login and read by the gate.
pub const SESSION_COOKIE: &str = "token";

lazy_static! {
    // Regex for display names: alphanumeric, underscores, hyphens
    pub static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Represents the payload for a login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Must be a valid email format.
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 50, message = "Password must be 8-50 characters"))]
    pub password: String,
}

/// Represents the payload for a registration request.
///
/// Nothing is persisted as an account from this payload directly; it becomes a
/// pending registration until the emailed link is followed.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name: 3 to 20 characters, alphanumeric, underscores or hyphens.
    #[serde(alias = "username")]
    #[validate(
        length(min = 3, max = 20, message = "Name must be 3-20 characters"),
        regex(
            path = "USERNAME_REGEX",
            message = "Name must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 50, message = "Password must be 8-50 characters"))]
    pub password: String,
    #[serde(alias = "confirmPassword")]
    pub confirm_password: String,
}

/// Query string of the emailed verification link.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub email: String,
}

/// Response body after a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    /// The signed session token, also set as the `token` cookie.
    pub token: String,
    pub user_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn register(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: password.to_string(),
        }
    }

    #[test]
    fn test_login_request_validation() {
        let valid_login = LoginRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(valid_login.validate().is_ok());

        let invalid_email_login = LoginRequest {
            email: "testexample.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(invalid_email_login.validate().is_err());

        let short_password_login = LoginRequest {
            email: "test@example.com".to_string(),
            password: "1234567".to_string(),
        };
        assert!(short_password_login.validate().is_err());
    }

    #[test]
    fn test_register_request_validation() {
        assert!(register("test_user-123", "test@example.com", "password123")
            .validate()
            .is_ok());

        // Contains space and exclamation
        assert!(register("test user!", "test@example.com", "password123")
            .validate()
            .is_err());
        assert!(register("tu", "test@example.com", "password123")
            .validate()
            .is_err());
        assert!(register("a_very_long_name_over_20", "test@example.com", "password123")
            .validate()
            .is_err());
        assert!(register("test_user", "test@example.com", &"p".repeat(51))
            .validate()
            .is_err());
    }

    #[test]
    fn test_register_request_accepts_camel_case_confirmation() {
        let request: RegisterRequest = serde_json::from_str(
            r#"{"name":"alice","email":"a@x.com","password":"pw12345678","confirmPassword":"pw12345678"}"#,
        )
        .unwrap();
        assert_eq!(request.confirm_password, "pw12345678");
    }
}
