//! Directory-backed report repository.
//!
//! Each report is stored as `<id>.json`. Writes go to a temporary file that is
//! renamed into place, so readers never observe a half-written document.
//!
//! A run claims its kind with a `.<kind>.lock` file created exclusively in the
//! same directory, which excludes runs in other processes sharing the store.
//! A lock older than the stale limit is assumed to belong to a crashed process
//! and is taken over.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::db::repository::{
    ErrorContext, ReportFilter, ReportRepository, RepositoryError, RepositoryResult, RunLock,
};
use crate::models::{Report, ReportId, ReportKind};

/// Age after which a kind lock is considered abandoned.
pub const DEFAULT_STALE_LOCK_AFTER: Duration = Duration::from_secs(6 * 60 * 60);

pub struct FileRepository {
    dir: PathBuf,
    stale_lock_after: Duration,
}

/// Removes the kind lock file when the run ends.
struct KindLockFile {
    path: PathBuf,
}

impl Drop for KindLockFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove report kind lock");
            }
        }
    }
}

impl FileRepository {
    /// Open (creating if needed) a report directory.
    pub async fn open(dir: impl Into<PathBuf>) -> RepositoryResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            RepositoryError::storage(
                e.to_string(),
                ErrorContext::new("open").with_details(dir.display().to_string()),
            )
        })?;
        Ok(Self {
            dir,
            stale_lock_after: DEFAULT_STALE_LOCK_AFTER,
        })
    }

    pub fn with_stale_lock_after(mut self, after: Duration) -> Self {
        self.stale_lock_after = after;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock_path(&self, kind: ReportKind) -> PathBuf {
        self.dir.join(format!(".{}.lock", kind))
    }

    /// Create the lock file exclusively. `Ok(false)` if it already exists.
    async fn create_lock(path: &Path) -> std::io::Result<bool> {
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e),
        };
        file.write_all(format!("{}\n", std::process::id()).as_bytes())
            .await?;
        Ok(true)
    }

    async fn is_stale(&self, path: &Path) -> std::io::Result<bool> {
        let modified = match fs::metadata(path).await {
            Ok(meta) => meta.modified()?,
            // released between our attempt and this check
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e),
        };
        Ok(modified
            .elapsed()
            .is_ok_and(|age| age >= self.stale_lock_after))
    }

    fn path_for(&self, id: ReportId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    async fn write_document(&self, report: &Report, operation: &str) -> RepositoryResult<()> {
        let ctx = || ErrorContext::new(operation).with_entity_id(report.id);
        let body = serde_json::to_vec_pretty(report)
            .map_err(|e| RepositoryError::serialization(e.to_string(), ctx()))?;

        let tmp = self.dir.join(format!(".{}.json.tmp", report.id));
        fs::write(&tmp, body)
            .await
            .map_err(|e| RepositoryError::storage(e.to_string(), ctx()))?;
        fs::rename(&tmp, self.path_for(report.id))
            .await
            .map_err(|e| RepositoryError::storage(e.to_string(), ctx()))
    }

    async fn read_document(path: &Path) -> Result<Report, String> {
        let bytes = fs::read(path).await.map_err(|e| e.to_string())?;
        serde_json::from_slice(&bytes).map_err(|e| e.to_string())
    }

    async fn exists(&self, id: ReportId, operation: &str) -> RepositoryResult<bool> {
        fs::try_exists(self.path_for(id)).await.map_err(|e| {
            RepositoryError::storage(e.to_string(), ErrorContext::new(operation).with_entity_id(id))
        })
    }
}

#[async_trait]
impl ReportRepository for FileRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        match fs::metadata(&self.dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RepositoryError::storage(e.to_string(), ErrorContext::new("health_check"))),
        }
    }

    async fn insert_report(&self, report: &Report) -> RepositoryResult<()> {
        if self.exists(report.id, "insert_report").await? {
            return Err(RepositoryError::conflict(
                "report already exists",
                ErrorContext::new("insert_report").with_entity_id(report.id),
            ));
        }
        self.write_document(report, "insert_report").await
    }

    async fn update_report(&self, report: &Report) -> RepositoryResult<()> {
        if !self.exists(report.id, "update_report").await? {
            return Err(RepositoryError::not_found(
                "report does not exist",
                ErrorContext::new("update_report").with_entity_id(report.id),
            ));
        }
        self.write_document(report, "update_report").await
    }

    async fn get_report(&self, id: ReportId) -> RepositoryResult<Report> {
        let path = self.path_for(id);
        let ctx = || ErrorContext::new("get_report").with_entity_id(id);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RepositoryError::not_found(format!("report {} not found", id), ctx()))
            }
            Err(e) => return Err(RepositoryError::storage(e.to_string(), ctx())),
        };
        serde_json::from_slice(&bytes).map_err(|e| RepositoryError::serialization(e.to_string(), ctx()))
    }

    async fn list_reports(&self, filter: &ReportFilter) -> RepositoryResult<Vec<Report>> {
        let mut entries = fs::read_dir(&self.dir).await.map_err(|e| {
            RepositoryError::storage(e.to_string(), ErrorContext::new("list_reports"))
        })?;

        let mut reports = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            RepositoryError::storage(e.to_string(), ErrorContext::new("list_reports"))
        })? {
            let path = entry.path();
            let is_document = path.extension().is_some_and(|ext| ext == "json")
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_document {
                continue;
            }
            match Self::read_document(&path).await {
                Ok(report) => reports.push(report),
                Err(error) => warn!(path = %path.display(), %error, "skipping unreadable report document"),
            }
        }

        Ok(filter.apply(reports))
    }

    async fn lock_kind(&self, kind: ReportKind) -> RepositoryResult<Option<RunLock>> {
        let path = self.lock_path(kind);
        let ctx = || ErrorContext::new("lock_kind").with_details(path.display().to_string());

        if Self::create_lock(&path)
            .await
            .map_err(|e| RepositoryError::storage(e.to_string(), ctx()))?
        {
            debug!(%kind, path = %path.display(), "report kind locked");
            return Ok(Some(RunLock::holding(KindLockFile { path })));
        }

        if !self
            .is_stale(&path)
            .await
            .map_err(|e| RepositoryError::storage(e.to_string(), ctx()))?
        {
            return Ok(None);
        }

        warn!(%kind, path = %path.display(), "taking over stale report kind lock");
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(RepositoryError::storage(e.to_string(), ctx())),
        }
        let acquired = Self::create_lock(&path)
            .await
            .map_err(|e| RepositoryError::storage(e.to_string(), ctx()))?;
        Ok(acquired.then(|| RunLock::holding(KindLockFile { path })))
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
