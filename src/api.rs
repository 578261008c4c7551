//! HTTP API for Companion Tutor

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::auth::IdentityProvider;
use crate::config::AppConfig;
use crate::db::Database;
use crate::runtime::SessionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Database, identity: Arc<dyn IdentityProvider>, config: AppConfig) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new(db)),
            identity,
            config: Arc::new(config),
        }
    }
}
