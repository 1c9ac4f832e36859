//! Storage trait for product rows and shop catalogs.
//!
//! This module defines the `ProductStore` trait, which provides the
//! interface for fetching product snapshots, writing process entries, and
//! reading the catalog tables reports depend on. A PostgreSQL
//! implementation lives behind the `postgres` feature; an in-memory
//! implementation backs tests.

use anyhow::anyhow;
use async_trait::async_trait;

use crate::error::Result;
use crate::process::{ModelSeries, ProcessFields, ProcessKind, SeriesProcess};
use crate::product::{ProductRecord, RawTimestamp};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

/// Values for one process write, addressed by resolved field names.
#[derive(Debug, Clone)]
pub struct ProcessWrite {
    /// Target columns, as resolved by the process catalog.
    pub fields: ProcessFields,
    /// Timestamp the time column receives.
    pub time: RawTimestamp,
    /// Employee label; written only when `fields.employee` is set.
    pub employee: String,
}

/// Storage trait for product rows and catalogs.
///
/// Reads return snapshots; concurrent writers may change a row between a
/// fetch and a write, which is why the only conditional primitive here is
/// [`record_if_unset`](ProductStore::record_if_unset). Implementations do
/// not enforce recording rules; that is the tracker's job.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Fetch one product snapshot by exact code.
    async fn fetch_product(&self, code: &str) -> Result<Option<ProductRecord>>;

    /// Fetch only the model of a product, if the row exists.
    async fn product_model(&self, code: &str) -> Result<Option<String>>;

    /// Whether a model is in the winding-cooldown exception set.
    async fn is_exempt_model(&self, model: &str) -> Result<bool>;

    /// Most recent winding time stored under exactly this employee label.
    ///
    /// "Most recent" means greatest by stored-text ordering, the same
    /// order a text column gives.
    async fn latest_winding_time(&self, employee: &str) -> Result<Option<RawTimestamp>>;

    /// Insert a new product row holding only the written fields.
    ///
    /// Fails if the code already exists.
    async fn insert_product(&self, code: &str, write: &ProcessWrite) -> Result<()>;

    /// Write a process onto an existing row, atomically, only while its
    /// time field is still null.
    ///
    /// Returns `false` when the condition matched no row, i.e. the field
    /// was taken (or the row vanished) since the caller's snapshot.
    async fn record_if_unset(&self, code: &str, write: &ProcessWrite) -> Result<bool>;

    /// Null out a process's fields. Succeeds even if the row is missing.
    async fn clear_process(&self, code: &str, fields: &ProcessFields) -> Result<()>;

    /// Coarse prefetch for reports: products where any employee column
    /// contains the trimmed name as a substring, in product-code order.
    ///
    /// This over-selects on purpose; callers re-check each stage with the
    /// fuzzy identity rule.
    async fn search_by_employee(&self, name: &str) -> Result<Vec<ProductRecord>>;

    /// All model-to-series catalog rows.
    async fn model_series(&self) -> Result<Vec<ModelSeries>>;

    /// All series process-flow catalog rows.
    async fn series_processes(&self) -> Result<Vec<SeriesProcess>>;

    /// The configured reporting month window, if one is set.
    async fn month_range(&self) -> Result<Option<(RawTimestamp, RawTimestamp)>>;
}

/// Resolve write field names onto record slots.
///
/// The process catalog hands unknown field names through unchanged, so the
/// storage layer is where they finally fail, as internal errors. This also
/// means only whitelisted column names ever reach SQL.
pub(crate) fn resolve_slots(fields: &ProcessFields) -> Result<(ProcessKind, Option<ProcessKind>)> {
    let time_slot = ProcessKind::from_time_field(&fields.time)
        .ok_or_else(|| anyhow!("unknown process time field: {}", fields.time))?;
    let employee_slot = match &fields.employee {
        Some(field) => Some(
            ProcessKind::from_employee_field(field)
                .ok_or_else(|| anyhow!("unknown process employee field: {field}"))?,
        ),
        None => None,
    };
    Ok((time_slot, employee_slot))
}
