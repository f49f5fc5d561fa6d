//! Repository implementations module.
//!
//! This module contains the implementations of the `ReportRepository` trait:
//! - `local`: In-memory implementation for unit testing and local development
//! - `file`: One JSON document per report in a directory, shared between the
//!   server and the scheduled entry point
pub mod file;
pub mod local;

pub use file::FileRepository;
pub use local::LocalRepository;
