use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use livy_common::{Error, Result};
use tracing::debug;

use crate::gateway::StorageGateway;

/// Repository implementation shared by the schema and configuration traits.
/// Gateway calls block, so each one runs on tokio's blocking pool.
#[derive(Clone)]
pub struct SqlRepository {
    gateway: Arc<dyn StorageGateway>,
}

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;
const CANCELLED: u8 = 3;

impl SqlRepository {
    pub fn new(gateway: Arc<dyn StorageGateway>) -> Self {
        Self { gateway }
    }

    pub fn backend(&self) -> &'static str {
        self.gateway.backend()
    }

    /// Run `f` on the blocking pool. Dropping the returned future cancels the
    /// call: a call still queued never runs, and a running one is interrupted
    /// through [`StorageGateway::interrupt`].
    pub(crate) async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn StorageGateway) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(PENDING));
        let _cancel = CancelOnDrop {
            state: Arc::clone(&state),
            gateway: Arc::clone(&self.gateway),
        };

        let gateway = Arc::clone(&self.gateway);
        tokio::task::spawn_blocking(move || {
            if state
                .compare_exchange(PENDING, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return Err(Error::Timeout("storage call cancelled before it started".into()));
            }
            let result = f(gateway.as_ref());
            state.store(DONE, Ordering::SeqCst);
            result
        })
        .await
        .map_err(|e| Error::Database(format!("storage task failed: {e}")))?
    }
}

/// Lives as long as the caller waits on a blocking call.
struct CancelOnDrop {
    state: Arc<AtomicU8>,
    gateway: Arc<dyn StorageGateway>,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        match self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => debug!("storage call dropped before it started"),
            Err(RUNNING) => {
                debug!(backend = self.gateway.backend(), "interrupting abandoned storage call");
                self.gateway.interrupt();
            }
            Err(_) => {}
        }
    }
}
