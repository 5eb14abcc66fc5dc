// Application state shared across all modules

use std::sync::Arc;

use crate::common::config::AuthConfig;
use crate::services::IdentityService;

/// Application state containing the identity core and its configuration
///
/// The configuration is read once at startup and never mutated, so the
/// state is shared as a plain `Arc` with no interior locking.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService>,
    pub config: AuthConfig,
}
