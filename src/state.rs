use std::sync::Arc;

use crate::auth::{RegistrationService, TokenCodec};
use crate::clock::Clock;
use crate::store::Store;

/// Shared, immutable application state handed to every worker as `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub codec: Arc<TokenCodec>,
    pub registration: Arc<RegistrationService>,
    pub clock: Arc<dyn Clock>,
    /// Cost used when re-hashing a password on profile update.
    pub bcrypt_cost: u32,
}
