pub mod handlers;
pub mod response;
pub mod router;
pub mod server;
pub mod service;
pub mod state;
pub mod validation;

pub use router::build_router;
pub use server::GatewayServer;
pub use service::ConfigurationService;
pub use state::{AppState, SharedState};
