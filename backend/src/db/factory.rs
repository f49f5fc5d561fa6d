//! Repository factory for dependency injection.
//!
//! This module provides utilities for creating repository instances based on
//! runtime configuration.

use std::str::FromStr;
use std::sync::Arc;

use super::repositories::{FileRepository, LocalRepository};
use super::repository::{ReportRepository, RepositoryResult};
use crate::config::RepositorySettings;

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// One JSON document per report on disk
    File,
    /// In-memory local repository
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Parse repository type from string ("file", "local").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" | "fs" => Ok(Self::File),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

/// Repository factory for creating repository instances.
///
/// # Example
/// ```ignore
/// use trace_report::config::AppConfig;
/// use trace_report::db::RepositoryFactory;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = AppConfig::load(None)?;
///     let repo = RepositoryFactory::from_settings(&config.repository).await?;
///     Ok(())
/// }
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository from configuration settings.
    ///
    /// # Returns
    /// * `Ok(Arc<dyn ReportRepository>)` - Repository instance
    /// * `Err(RepositoryError)` - If the type is unknown or the store cannot be opened
    pub async fn from_settings(
        settings: &RepositorySettings,
    ) -> RepositoryResult<Arc<dyn ReportRepository>> {
        let repo_type = settings
            .repository_type()
            .map_err(|e| super::RepositoryError::configuration(e.to_string()))?;

        match repo_type {
            RepositoryType::File => {
                let repo = FileRepository::open(&settings.data_dir).await?;
                Ok(Arc::new(repo) as Arc<dyn ReportRepository>)
            }
            RepositoryType::Local => Ok(Self::create_local()),
        }
    }

    /// Create an in-memory local repository.
    pub fn create_local() -> Arc<dyn ReportRepository> {
        Arc::new(LocalRepository::new())
    }
}
