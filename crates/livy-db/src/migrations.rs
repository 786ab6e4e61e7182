//! Versioned schema migrations.
//!
//! Steps live in a fixed, ordered list; the step at index `i` brings the
//! schema to version `i + 1`. Each run reads the highest recorded version from
//! `db_version`, applies the remaining steps in order and records every
//! version as soon as its step succeeds. There is no rollback: a failed step
//! stops the run and leaves earlier steps applied, and the next run resumes at
//! the first unrecorded step.

use std::sync::Arc;

use async_trait::async_trait;
use livy_common::{Error, Result};
use tracing::{info, warn};

use crate::schema::SchemaRepository;

/// One unit of schema change. Steps never record their own version.
#[async_trait]
pub trait MigrationStep: Send + Sync {
    fn name(&self) -> &'static str;

    async fn up(&self, repo: &dyn SchemaRepository) -> Result<()>;
}

/// Version 1: the version table itself.
pub struct CreateVersionTable;

#[async_trait]
impl MigrationStep for CreateVersionTable {
    fn name(&self) -> &'static str {
        "create_version_table"
    }

    async fn up(&self, repo: &dyn SchemaRepository) -> Result<()> {
        repo.create_version_table().await
    }
}

/// Version 2: the `configuration` table.
pub struct CreateConfigurationTable;

#[async_trait]
impl MigrationStep for CreateConfigurationTable {
    fn name(&self) -> &'static str {
        "create_configuration_table"
    }

    async fn up(&self, repo: &dyn SchemaRepository) -> Result<()> {
        repo.create_configuration_table().await
    }
}

/// The registered steps, in application order. Append only.
pub fn registered_steps() -> Vec<Box<dyn MigrationStep>> {
    vec![Box::new(CreateVersionTable), Box::new(CreateConfigurationTable)]
}

/// Outcome of a [`Migrator::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from: u32,
    pub to: u32,
    pub applied: Vec<u32>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

pub struct Migrator {
    repo: Arc<dyn SchemaRepository>,
    steps: Vec<Box<dyn MigrationStep>>,
}

impl Migrator {
    pub fn new(repo: Arc<dyn SchemaRepository>) -> Self {
        Self::with_steps(repo, registered_steps())
    }

    pub fn with_steps(repo: Arc<dyn SchemaRepository>, steps: Vec<Box<dyn MigrationStep>>) -> Self {
        Self { repo, steps }
    }

    /// Version reached once every registered step has run.
    pub fn latest_version(&self) -> u32 {
        self.steps.len() as u32
    }

    /// Current schema version, treating a missing version table as 0.
    pub async fn current_version(&self) -> Result<u32> {
        match self.repo.current_version().await {
            Ok(version) => Ok(version),
            Err(Error::MissingTable(detail)) => {
                info!("version table not found, starting from version 0 ({detail})");
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn run(&self) -> Result<MigrationReport> {
        let current = self.current_version().await?;
        let latest = self.latest_version();
        info!(current, latest, "schema version detected");

        if current > latest {
            return Err(Error::Migration {
                version: current,
                name: "unknown".into(),
                reason: format!(
                    "database is at version {current} but only {latest} migrations are known"
                ),
            });
        }

        if current == latest {
            info!("no migration needed");
            return Ok(MigrationReport {
                from: current,
                to: current,
                applied: Vec::new(),
            });
        }

        let mut applied = Vec::new();
        for (index, step) in self.steps.iter().enumerate().skip(current as usize) {
            let version = index as u32 + 1;
            let name = step.name();
            info!(version, name, "running migration");

            step.up(self.repo.as_ref())
                .await
                .map_err(|e| failed(version, name, e))?;

            match self.repo.record_version(version).await {
                Ok(()) => info!(version, "schema version recorded"),
                Err(Error::Conflict(detail)) => {
                    warn!(version, "schema version already recorded by another instance: {detail}");
                }
                Err(e) => return Err(failed(version, name, e)),
            }
            applied.push(version);
        }

        Ok(MigrationReport {
            from: current,
            to: latest,
            applied,
        })
    }
}

fn failed(version: u32, name: &str, err: Error) -> Error {
    Error::Migration {
        version,
        name: name.to_string(),
        reason: err.to_string(),
    }
}
