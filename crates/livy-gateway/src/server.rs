use std::future::Future;
use std::sync::Arc;

use livy_common::{Error, Result};
use livy_config::ApiConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::{ROUTES, build_router};
use crate::service::ConfigurationService;
use crate::state::AppState;

/// Binds the API listener and serves the configuration endpoints.
pub struct GatewayServer {
    api: ApiConfig,
    service: ConfigurationService,
}

impl GatewayServer {
    pub fn new(api: ApiConfig, service: ConfigurationService) -> Self {
        Self { api, service }
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.api.bind_addr();
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        for (method, path) in ROUTES {
            info!("route {method} {path}");
        }
        let addr = listener.local_addr()?;
        let state = Arc::new(AppState::new(self.service));
        let app = build_router(state);

        info!("Livy services running on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Gateway(format!("server error: {e}")))?;

        info!("Livy services stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; serve until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
