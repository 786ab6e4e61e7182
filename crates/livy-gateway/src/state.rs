use std::sync::Arc;

use crate::service::ConfigurationService;

/// Shared application state accessible from all request handlers.
pub struct AppState {
    pub service: ConfigurationService,
}

impl AppState {
    pub fn new(service: ConfigurationService) -> Self {
        Self { service }
    }
}

pub type SharedState = Arc<AppState>;
