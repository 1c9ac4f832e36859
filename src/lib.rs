//! Process-recording core for a six-stage production line.
//!
//! This crate tracks a manufactured product through a fixed sequence of
//! processes (winding, embedding, wire connection, pressing, stopper
//! turning, immersion), each recorded as an (employee, time) pair on the
//! product's row. The `ProcessTracker` service enforces the entry rules
//! (no overwrites, a winding cooldown per employee) and aggregates rows
//! into per-employee, time-windowed reports over heterogeneous stored
//! date formats.
//!
//! Storage is a trait seam: `PostgresProductStore` backs production behind
//! the `postgres` feature, `MemoryProductStore` backs tests.

pub mod error;
pub mod identity;
pub mod metrics;
pub mod process;
pub mod product;
pub mod store;
pub mod temporal;
pub mod tracker;

// Re-export commonly used types
pub use error::{Result, WorklineError};
#[cfg(feature = "metrics")]
pub use metrics::TrackerMetrics;
pub use process::{ModelSeries, ProcessFields, ProcessKind, SeriesProcess, ALL_PROCESSES};
pub use product::{MonthRange, ProcessCount, ProductRecord, RawTimestamp, Transaction};
pub use store::memory::MemoryProductStore;
#[cfg(feature = "postgres")]
pub use store::postgres::PostgresProductStore;
pub use store::{ProcessWrite, ProductStore};
pub use tracker::{
    BatchItemOutcome, ClearProcessRequest, ProcessTracker, RecordProcessRequest, TrackerConfig,
};
