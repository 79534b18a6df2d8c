#![doc = "The `taskwarden` library crate."]
#![doc = ""]
#![doc = "Task-management REST API with email-verified registration. The crate holds the"]
#![doc = "registration state machine, session tokens, the authentication gate, the store"]
#![doc = "abstraction with its Postgres and in-memory backends, and the HTTP routes."]
#![doc = "The binary (`main.rs`) wires these together from `Config`."]

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod mailer;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

pub use crate::error::AppError;
pub use crate::state::AppState;
