//! Process recording, clearance, and per-employee reporting.
//!
//! `ProcessTracker` is the service seam of the crate: it owns the entry
//! rules (no overwrites, winding cooldown, exact-owner clearance) and the
//! report passes (window filtering, daily counts), and delegates all row
//! access to a [`ProductStore`]. It holds no state of its own beyond
//! configuration, so one tracker can serve any number of concurrent
//! callers.

use std::time::Duration;

use anyhow::anyhow;
use chrono::{FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorklineError};
use crate::identity;
use crate::process::{self, ModelSeries, ProcessFields, ProcessKind, SeriesProcess, ALL_PROCESSES};
use crate::product::{MonthRange, ProcessCount, ProductRecord, RawTimestamp, Transaction};
use crate::store::{ProcessWrite, ProductStore};
use crate::temporal::{self, Stamp, Window};

/// Tunable recording and reporting behavior.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Minimum gap between two winding entries by the same employee.
    pub winding_cooldown: Duration,
    /// Shop-floor zone, used for daily buckets and month fallbacks.
    pub shop_offset: FixedOffset,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            winding_cooldown: Duration::from_secs(300),
            shop_offset: FixedOffset::east_opt(8 * 3600).expect("constant offset is in range"),
        }
    }
}

/// One process entry to record.
///
/// `time_field` / `employee_field` override the catalog's column choice;
/// an explicitly empty `employee_field` skips the employee write. Most
/// callers set neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordProcessRequest {
    pub product_code: String,
    /// External process identifier, e.g. `"winding"`.
    pub process_type: String,
    pub employee_name: String,
    #[serde(default)]
    pub time_field: Option<String>,
    #[serde(default)]
    pub employee_field: Option<String>,
    pub timestamp: RawTimestamp,
}

impl RecordProcessRequest {
    pub fn new(
        product_code: impl Into<String>,
        process_type: impl Into<String>,
        employee_name: impl Into<String>,
        timestamp: RawTimestamp,
    ) -> Self {
        RecordProcessRequest {
            product_code: product_code.into(),
            process_type: process_type.into(),
            employee_name: employee_name.into(),
            time_field: None,
            employee_field: None,
            timestamp,
        }
    }

    fn resolved_fields(&self) -> ProcessFields {
        process::resolve_fields(
            &self.process_type,
            self.time_field.as_deref(),
            self.employee_field.as_deref(),
        )
    }
}

/// One process clearance to apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearProcessRequest {
    pub product_code: String,
    pub process_type: String,
    /// Caller identity; must exactly equal the stored employee label,
    /// except for immersion.
    pub employee_name: String,
    #[serde(default)]
    pub time_field: Option<String>,
    #[serde(default)]
    pub employee_field: Option<String>,
}

impl ClearProcessRequest {
    pub fn new(
        product_code: impl Into<String>,
        process_type: impl Into<String>,
        employee_name: impl Into<String>,
    ) -> Self {
        ClearProcessRequest {
            product_code: product_code.into(),
            process_type: process_type.into(),
            employee_name: employee_name.into(),
            time_field: None,
            employee_field: None,
        }
    }

    fn resolved_fields(&self) -> ProcessFields {
        process::resolve_fields(
            &self.process_type,
            self.time_field.as_deref(),
            self.employee_field.as_deref(),
        )
    }
}

/// Outcome of one product code within a batch entry.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemOutcome {
    pub product_code: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Recording and reporting service over a [`ProductStore`].
///
/// # Example
/// ```ignore
/// use workline::{MemoryProductStore, ProcessTracker, RawTimestamp, RecordProcessRequest};
///
/// let tracker = ProcessTracker::new(MemoryProductStore::new());
/// tracker
///     .record_process(RecordProcessRequest::new(
///         "P1", "winding", "方辉", RawTimestamp::now(),
///     ))
///     .await?;
/// ```
pub struct ProcessTracker<S> {
    store: S,
    config: TrackerConfig,
}

impl<S: ProductStore> ProcessTracker<S> {
    /// Create a tracker with default rules: a 300 second winding cooldown
    /// and a +08:00 shop zone. Customize with `.with_config()` if needed.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: TrackerConfig::default(),
        }
    }

    /// Set a custom configuration.
    ///
    /// This is a builder method that can be chained after `new()`.
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Record one process entry.
    ///
    /// Creates the product row if the code is new. On an existing row the
    /// entry only lands while the target time field is still null; fields
    /// are never overwritten. Entries by an employee with a recent winding
    /// on record are throttled by the configured cooldown.
    #[tracing::instrument(skip(self, request), fields(
        product_code = %request.product_code,
        process = %request.process_type,
        employee = %request.employee_name,
    ))]
    pub async fn record_process(&self, request: RecordProcessRequest) -> Result<()> {
        self.enforce_winding_cooldown(&request).await?;

        let write = ProcessWrite {
            fields: request.resolved_fields(),
            time: request.timestamp.clone(),
            employee: request.employee_name.clone(),
        };

        match self.store.fetch_product(&request.product_code).await? {
            None => {
                self.store
                    .insert_product(&request.product_code, &write)
                    .await?;
                tracing::info!("Created product on first process entry");
                Ok(())
            }
            Some(product) => {
                if let Some(slot) = ProcessKind::from_time_field(&write.fields.time) {
                    if product.time(slot).is_some() {
                        return Err(WorklineError::AlreadyRecorded(
                            request.product_code.clone(),
                            write.fields.time.clone(),
                        ));
                    }
                }
                // The snapshot check above only gives the precise error;
                // the conditional write is what actually holds the line
                // against concurrent writers.
                let written = self
                    .store
                    .record_if_unset(&request.product_code, &write)
                    .await?;
                if !written {
                    return Err(WorklineError::AlreadyRecorded(
                        request.product_code.clone(),
                        write.fields.time.clone(),
                    ));
                }
                tracing::info!("Recorded process entry");
                Ok(())
            }
        }
    }

    /// Record the same process for a sequence of product codes.
    ///
    /// Codes go through the full single-entry rules in order, each stamped
    /// with the wall clock at its own turn. Failures are per-code: one bad
    /// code never aborts the rest, and there is no overall status.
    #[tracing::instrument(skip(self, product_codes), fields(
        codes = product_codes.len(),
        process = %process_type,
        employee = %employee_name,
    ))]
    pub async fn record_batch(
        &self,
        product_codes: &[String],
        process_type: &str,
        employee_name: &str,
    ) -> Vec<BatchItemOutcome> {
        let mut outcomes = Vec::with_capacity(product_codes.len());
        for code in product_codes {
            let request = RecordProcessRequest::new(
                code.clone(),
                process_type,
                employee_name,
                RawTimestamp::now(),
            );
            match self.record_process(request).await {
                Ok(()) => outcomes.push(BatchItemOutcome {
                    product_code: code.clone(),
                    success: true,
                    error: None,
                }),
                Err(e) => {
                    tracing::warn!(product_code = %code, error = %e, "Batch entry failed, continuing");
                    outcomes.push(BatchItemOutcome {
                        product_code: code.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        outcomes
    }

    /// Throttle repeat winding entries by one employee.
    ///
    /// The model exemption is only consulted for winding entries; the gap
    /// check itself runs for every process type, matching how the line has
    /// always behaved.
    /// TODO: confirm with the shop whether non-winding entries should trip
    /// the winding gap before tightening this to winding only.
    async fn enforce_winding_cooldown(&self, request: &RecordProcessRequest) -> Result<()> {
        let is_winding =
            ProcessKind::from_external(&request.process_type) == Some(ProcessKind::Winding);

        if is_winding {
            if let Some(model) = self.store.product_model(&request.product_code).await? {
                if self.store.is_exempt_model(&model).await? {
                    tracing::debug!(model = %model, "Cooldown skipped for exempt model");
                    return Ok(());
                }
            }
        }

        let Some(previous) = self.store.latest_winding_time(&request.employee_name).await? else {
            return Ok(());
        };
        // Unparseable history fails open. So do zone-naive values: there
        // is no honest way to measure their gap against the wall clock
        // without inventing a zone for them.
        let Some(Stamp::Zoned(previous_at)) = temporal::normalize(&previous) else {
            return Ok(());
        };

        let gap_secs = Utc::now()
            .signed_duration_since(previous_at)
            .num_seconds()
            .abs();
        let min_secs = self.config.winding_cooldown.as_secs() as i64;
        if gap_secs < min_secs {
            tracing::info!(gap_secs, "Rejected entry inside winding cooldown");
            return Err(WorklineError::CooldownViolation(
                request.employee_name.clone(),
                previous.storage_text(),
                min_secs,
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Clearance
    // ========================================================================

    /// Clear one recorded process from a product.
    ///
    /// The caller must exactly equal the stored employee label, whitespace
    /// and all; the fuzzy report-matching rule does not apply here.
    /// Immersion skips the ownership check entirely.
    #[tracing::instrument(skip(self, request), fields(
        product_code = %request.product_code,
        process = %request.process_type,
    ))]
    pub async fn clear_process(&self, request: ClearProcessRequest) -> Result<()> {
        let fields = request.resolved_fields();
        let product = self
            .store
            .fetch_product(&request.product_code)
            .await?
            .ok_or_else(|| WorklineError::ProductNotFound(request.product_code.clone()))?;

        let immersion =
            ProcessKind::from_external(&request.process_type) == Some(ProcessKind::Immersion);
        if let Some(employee_field) = &fields.employee {
            if !immersion {
                let slot = ProcessKind::from_employee_field(employee_field)
                    .ok_or_else(|| anyhow!("unknown process employee field: {employee_field}"))?;
                if product.employee(slot) != Some(request.employee_name.as_str()) {
                    return Err(WorklineError::NotAuthorized(
                        request.product_code.clone(),
                        request.process_type.clone(),
                    ));
                }
            }
        }

        self.store
            .clear_process(&request.product_code, &fields)
            .await?;
        tracing::info!("Cleared process entry");
        Ok(())
    }

    // ========================================================================
    // Reports
    // ========================================================================

    /// Products where the employee did at least one stage inside the
    /// window.
    ///
    /// A stage qualifies when its employee label fuzzily matches the query
    /// name and its time normalizes into the window; each of the six slots
    /// is evaluated independently. Malformed window bounds fall back to
    /// the current shop-local calendar month.
    #[tracing::instrument(skip(self), fields(employee = %employee_name))]
    pub async fn monthly_records(
        &self,
        employee_name: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<ProductRecord>> {
        let window = Window::parse_or_current_month(start_date, end_date, self.config.shop_offset);
        let candidates = self.store.search_by_employee(employee_name).await?;
        Ok(candidates
            .into_iter()
            .filter(|product| {
                ALL_PROCESSES
                    .into_iter()
                    .any(|kind| stage_qualifies(product, kind, employee_name, &window))
            })
            .collect())
    }

    /// Qualifying stages flattened to one row per (process, product).
    ///
    /// Same matching as [`monthly_records`](Self::monthly_records), but a
    /// product contributes one transaction per qualifying stage, up to
    /// six. Times are passed through exactly as stored.
    #[tracing::instrument(skip(self), fields(employee = %employee_name))]
    pub async fn monthly_transactions(
        &self,
        employee_name: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<Transaction>> {
        let window = Window::parse_or_current_month(start_date, end_date, self.config.shop_offset);
        let candidates = self.store.search_by_employee(employee_name).await?;

        let mut transactions = Vec::new();
        for product in &candidates {
            for kind in ALL_PROCESSES {
                if !stage_qualifies(product, kind, employee_name, &window) {
                    continue;
                }
                let Some(time) = product.time(kind) else {
                    continue;
                };
                transactions.push(Transaction {
                    process: kind,
                    product_code: product.product_code.clone(),
                    product_model: product.product_model.clone(),
                    time: time.clone(),
                });
            }
        }
        Ok(transactions)
    }

    /// Per-process counts of the employee's entries on the current
    /// shop-local day, in production order. Zero counts are omitted.
    ///
    /// Zoned times convert into the shop zone before bucketing; naive
    /// times are taken as already shop-local.
    #[tracing::instrument(skip(self), fields(employee = %employee_name))]
    pub async fn today_process_counts(&self, employee_name: &str) -> Result<Vec<ProcessCount>> {
        let (day_start, day_end) = temporal::shop_today(self.config.shop_offset);
        let candidates = self.store.search_by_employee(employee_name).await?;

        let mut counts = Vec::new();
        for kind in ALL_PROCESSES {
            let count = candidates
                .iter()
                .filter(|product| {
                    let Some(stored) = product.employee(kind) else {
                        return false;
                    };
                    if !identity::matches(stored, employee_name) {
                        return false;
                    }
                    let Some(raw) = product.time(kind) else {
                        return false;
                    };
                    let Some(stamp) = temporal::normalize(raw) else {
                        return false;
                    };
                    let wall = temporal::shop_wall_time(stamp, self.config.shop_offset);
                    day_start <= wall && wall <= day_end
                })
                .count() as u64;
            if count > 0 {
                counts.push(ProcessCount {
                    process: kind,
                    count,
                });
            }
        }
        Ok(counts)
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Full snapshot of one product.
    pub async fn product_details(&self, code: &str) -> Result<ProductRecord> {
        self.store
            .fetch_product(code)
            .await?
            .ok_or_else(|| WorklineError::ProductNotFound(code.to_string()))
    }

    /// Model-to-series catalog.
    pub async fn model_series(&self) -> Result<Vec<ModelSeries>> {
        self.store.model_series().await
    }

    /// Series process-flow catalog.
    pub async fn series_processes(&self) -> Result<Vec<SeriesProcess>> {
        self.store.series_processes().await
    }

    /// The reporting month window: the configured one when storage has
    /// it, otherwise the current shop-local calendar month.
    pub async fn month_range(&self) -> Result<MonthRange> {
        if let Some((start_date, end_date)) = self.store.month_range().await? {
            return Ok(MonthRange {
                start_date,
                end_date,
            });
        }
        let window = Window::current_month(self.config.shop_offset);
        Ok(MonthRange {
            start_date: window.start.into(),
            end_date: window.end.into(),
        })
    }
}

/// One stage qualifies when its employee label fuzzily matches and its
/// time normalizes into the window.
fn stage_qualifies(
    product: &ProductRecord,
    kind: ProcessKind,
    employee_name: &str,
    window: &Window,
) -> bool {
    let Some(stored) = product.employee(kind) else {
        return false;
    };
    if !identity::matches(stored, employee_name) {
        return false;
    }
    let Some(raw) = product.time(kind) else {
        return false;
    };
    match temporal::normalize(raw) {
        Some(stamp) => window.contains(stamp),
        None => false,
    }
}
