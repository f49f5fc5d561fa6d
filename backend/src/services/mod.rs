//! Service layer for report generation.
//!
//! This module sits between the trigger surfaces (HTTP handlers and the
//! scheduled binary) and the trace client and repository:
//!
//! - [`aggregator`]: pure reduction of trace records into report metrics
//! - [`in_flight`]: per-kind run exclusion
//! - [`generator`]: one generation run end to end
//! - [`dispatcher`]: detached runs for the HTTP trigger
//! - [`render`]: HTML and CSV views of stored reports

pub mod aggregator;
pub mod dispatcher;
pub mod generator;
pub mod in_flight;
pub mod render;

pub use aggregator::{aggregate, AggregationError};
pub use dispatcher::{DispatchError, LogSink, RunDispatcher, RunSink};
pub use generator::{Clock, FixedClock, GenerationError, ReportGenerator, SystemClock};
pub use in_flight::{GenerationRun, InFlightGuard, InFlightRegistry};
