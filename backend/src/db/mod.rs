//! Database module for report storage.
//!
//! This module provides abstractions for report persistence via the Repository
//! pattern, allowing different storage backends to be swapped easily.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application Layer (generator, REST API, scheduled run) │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs) - read helpers              │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Trait (repository/) - Abstract Interface     │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴───────────────┐
//!     │  LocalRepository (in-memory)  │
//!     │  FileRepository (JSON docs)   │
//!     └───────────────────────────────┘
//! ```

pub mod factory;
pub mod repositories;
pub mod repository;
pub mod services;

pub use factory::{RepositoryFactory, RepositoryType};
pub use repositories::{FileRepository, LocalRepository};
pub use repository::{
    ErrorContext, ReportFilter, ReportRepository, RepositoryError, RepositoryResult, RunLock,
};
