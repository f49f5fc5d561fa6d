//! HTTP server module for report generation.
//!
//! This module provides an axum-based HTTP server exposing the generation
//! trigger and read access to stored reports.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                              │
//! │  - Request parsing and validation                        │
//! │  - JSON / HTML / CSV responses                           │
//! │  - CORS, compression, request tracing                    │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services/)                               │
//! │  - RunDispatcher → ReportGenerator                       │
//! │  - Rendering                                             │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Repository Layer (db/)                                  │
//! │  - FileRepository / LocalRepository                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Endpoints
//!
//! | Method | Path                               | Purpose                      |
//! |--------|------------------------------------|------------------------------|
//! | GET    | `/health`                          | liveness and store status    |
//! | POST   | `/generate`, `/v1/reports/generate`| start a run, answer at once  |
//! | GET    | `/v1/reports`                      | list, newest first           |
//! | GET    | `/v1/reports/latest/{kind}`        | newest complete report       |
//! | GET    | `/v1/reports/{id}`                 | one report                   |
//! | GET    | `/v1/reports/{id}/summary.html`    | HTML rendering               |
//! | GET    | `/v1/reports/{id}/metrics.csv`     | CSV export                   |

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
