//! Repository trait for report persistence.
//!
//! The document store is an external collaborator; this module is the fixed
//! interface the generator and the HTTP read endpoints use to reach it.

pub mod error;
pub mod reports;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use reports::{ReportFilter, ReportRepository, RunLock};
