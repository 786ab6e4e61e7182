use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use livy_common::{Configuration, Error, Result};
use livy_db::ConfigurationRepository;

/// Business layer between the HTTP handlers and the repository. Every call is
/// bounded by the request timeout; dropping the returned future abandons the
/// wait.
#[derive(Clone)]
pub struct ConfigurationService {
    repo: Arc<dyn ConfigurationRepository>,
    timeout: Duration,
}

impl ConfigurationService {
    pub fn new(repo: Arc<dyn ConfigurationRepository>, timeout: Duration) -> Self {
        Self { repo, timeout }
    }

    pub async fn list(&self) -> Result<Vec<Configuration>> {
        self.bounded("list configurations", self.repo.list()).await
    }

    pub async fn get(&self, name: &str) -> Result<Option<Configuration>> {
        self.bounded("get configuration", self.repo.get_by_name(name))
            .await
    }

    pub async fn create(&self, name: &str, value: &str) -> Result<Configuration> {
        self.bounded("create configuration", self.repo.insert(name, value))
            .await
    }

    pub async fn update(&self, id: &str, name: &str, value: &str) -> Result<u64> {
        self.bounded("update configuration", self.repo.update(id, name, value))
            .await
    }

    async fn bounded<T>(&self, what: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| Error::Timeout(format!("{what} exceeded {:?}", self.timeout)))?
    }
}
