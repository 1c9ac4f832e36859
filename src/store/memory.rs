//! In-memory [`ProductStore`] used by tests and examples.

use std::collections::{BTreeMap, HashSet};

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;
use crate::process::{ModelSeries, ProcessFields, SeriesProcess};
use crate::product::{ProductRecord, RawTimestamp};
use crate::store::{resolve_slots, ProcessWrite, ProductStore};

/// In-memory implementation of [`ProductStore`].
///
/// Mirrors the relational layout closely enough for integration tests:
/// products are keyed by code (iteration order is code order), the
/// exception set is a plain set of models, and "most recent" winding
/// lookups use stored-text ordering exactly like a text column would.
#[derive(Default)]
pub struct MemoryProductStore {
    products: Mutex<BTreeMap<String, ProductRecord>>,
    exempt_models: Mutex<HashSet<String>>,
    model_series: Mutex<Vec<ModelSeries>>,
    series_processes: Mutex<Vec<SeriesProcess>>,
    month_range: Mutex<Option<(RawTimestamp, RawTimestamp)>>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a product row.
    pub fn put_product(&self, record: ProductRecord) {
        self.products
            .lock()
            .insert(record.product_code.clone(), record);
    }

    /// Add a model to the winding-cooldown exception set.
    pub fn add_exempt_model(&self, model: impl Into<String>) {
        self.exempt_models.lock().insert(model.into());
    }

    /// Replace the model-to-series catalog.
    pub fn set_model_series(&self, rows: Vec<ModelSeries>) {
        *self.model_series.lock() = rows;
    }

    /// Replace the series process-flow catalog.
    pub fn set_series_processes(&self, rows: Vec<SeriesProcess>) {
        *self.series_processes.lock() = rows;
    }

    /// Configure the reporting month window.
    pub fn set_month_range(&self, start: RawTimestamp, end: RawTimestamp) {
        *self.month_range.lock() = Some((start, end));
    }

    /// Current snapshot of a product, for test assertions.
    pub fn product(&self, code: &str) -> Option<ProductRecord> {
        self.products.lock().get(code).cloned()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn fetch_product(&self, code: &str) -> Result<Option<ProductRecord>> {
        Ok(self.products.lock().get(code).cloned())
    }

    async fn product_model(&self, code: &str) -> Result<Option<String>> {
        Ok(self
            .products
            .lock()
            .get(code)
            .and_then(|record| record.product_model.clone()))
    }

    async fn is_exempt_model(&self, model: &str) -> Result<bool> {
        Ok(self.exempt_models.lock().contains(model))
    }

    async fn latest_winding_time(&self, employee: &str) -> Result<Option<RawTimestamp>> {
        let products = self.products.lock();
        let latest = products
            .values()
            .filter(|record| record.winding_employee.as_deref() == Some(employee))
            .filter_map(|record| record.winding_time.as_ref())
            .max_by_key(|time| time.storage_text())
            .cloned();
        Ok(latest)
    }

    async fn insert_product(&self, code: &str, write: &ProcessWrite) -> Result<()> {
        let (time_slot, employee_slot) = resolve_slots(&write.fields)?;
        let mut products = self.products.lock();
        if products.contains_key(code) {
            return Err(anyhow!("product already exists: {code}").into());
        }
        let mut record = ProductRecord::new(code);
        record.set_time(time_slot, Some(write.time.clone()));
        if let Some(slot) = employee_slot {
            record.set_employee(slot, Some(write.employee.clone()));
        }
        products.insert(code.to_string(), record);
        Ok(())
    }

    async fn record_if_unset(&self, code: &str, write: &ProcessWrite) -> Result<bool> {
        let (time_slot, employee_slot) = resolve_slots(&write.fields)?;
        let mut products = self.products.lock();
        let Some(record) = products.get_mut(code) else {
            return Ok(false);
        };
        if record.time(time_slot).is_some() {
            return Ok(false);
        }
        record.set_time(time_slot, Some(write.time.clone()));
        if let Some(slot) = employee_slot {
            record.set_employee(slot, Some(write.employee.clone()));
        }
        Ok(true)
    }

    async fn clear_process(&self, code: &str, fields: &ProcessFields) -> Result<()> {
        let (time_slot, employee_slot) = resolve_slots(fields)?;
        let mut products = self.products.lock();
        if let Some(record) = products.get_mut(code) {
            record.set_time(time_slot, None);
            if let Some(slot) = employee_slot {
                record.set_employee(slot, None);
            }
        }
        Ok(())
    }

    async fn search_by_employee(&self, name: &str) -> Result<Vec<ProductRecord>> {
        let needle = name.trim();
        let products = self.products.lock();
        let matched = products
            .values()
            .filter(|record| {
                crate::process::ALL_PROCESSES
                    .into_iter()
                    .any(|kind| record.employee(kind).is_some_and(|e| e.contains(needle)))
            })
            .cloned()
            .collect();
        Ok(matched)
    }

    async fn model_series(&self) -> Result<Vec<ModelSeries>> {
        Ok(self.model_series.lock().clone())
    }

    async fn series_processes(&self) -> Result<Vec<SeriesProcess>> {
        Ok(self.series_processes.lock().clone())
    }

    async fn month_range(&self) -> Result<Option<(RawTimestamp, RawTimestamp)>> {
        Ok(self.month_range.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::resolve_fields;

    fn write_for(process_type: &str, time: &str, employee: &str) -> ProcessWrite {
        ProcessWrite {
            fields: resolve_fields(process_type, None, None),
            time: RawTimestamp::from(time),
            employee: employee.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_then_fetch_round_trips() {
        let store = MemoryProductStore::new();
        store
            .insert_product("P1", &write_for("winding", "2025-03-10T08:00:00Z", "方辉"))
            .await
            .unwrap();

        let record = store.fetch_product("P1").await.unwrap().unwrap();
        assert_eq!(record.product_code, "P1");
        assert_eq!(record.winding_employee.as_deref(), Some("方辉"));
        assert_eq!(
            record.winding_time,
            Some(RawTimestamp::from("2025-03-10T08:00:00Z"))
        );
        assert_eq!(record.pressing_time, None);
    }

    #[tokio::test]
    async fn duplicate_insert_fails() {
        let store = MemoryProductStore::new();
        let write = write_for("winding", "2025-03-10T08:00:00Z", "方辉");
        store.insert_product("P1", &write).await.unwrap();
        assert!(store.insert_product("P1", &write).await.is_err());
    }

    #[tokio::test]
    async fn conditional_write_respects_existing_value() {
        let store = MemoryProductStore::new();
        store
            .insert_product("P1", &write_for("winding", "2025-03-10T08:00:00Z", "方辉"))
            .await
            .unwrap();

        // Different stage on the same row goes through.
        let pressed = store
            .record_if_unset("P1", &write_for("pressing", "2025-03-10T09:00:00Z", "李雷"))
            .await
            .unwrap();
        assert!(pressed);

        // Same stage again does not.
        let rewound = store
            .record_if_unset("P1", &write_for("winding", "2025-03-10T10:00:00Z", "李雷"))
            .await
            .unwrap();
        assert!(!rewound);

        let record = store.product("P1").unwrap();
        assert_eq!(record.winding_employee.as_deref(), Some("方辉"));
        assert_eq!(record.pressing_employee.as_deref(), Some("李雷"));
    }

    #[tokio::test]
    async fn conditional_write_on_missing_row_is_false() {
        let store = MemoryProductStore::new();
        let written = store
            .record_if_unset("nope", &write_for("winding", "2025-03-10T08:00:00Z", "方辉"))
            .await
            .unwrap();
        assert!(!written);
    }

    #[tokio::test]
    async fn unknown_field_is_an_error_even_without_a_row() {
        let store = MemoryProductStore::new();
        let err = store
            .record_if_unset("nope", &write_for("painting", "2025-03-10T08:00:00Z", "方辉"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown process time field"));
    }

    #[tokio::test]
    async fn latest_winding_uses_text_ordering_and_exact_label() {
        let store = MemoryProductStore::new();
        store
            .insert_product("P1", &write_for("winding", "2025-03-10T08:00:00+00:00", "方辉"))
            .await
            .unwrap();
        store
            .insert_product("P2", &write_for("winding", "2025-03-12T08:00:00+00:00", "方辉"))
            .await
            .unwrap();
        store
            .insert_product("P3", &write_for("winding", "2025-03-14T08:00:00+00:00", "方辉A"))
            .await
            .unwrap();

        let latest = store.latest_winding_time("方辉").await.unwrap();
        // P3 belongs to a different exact label and must not win.
        assert_eq!(
            latest,
            Some(RawTimestamp::from("2025-03-12T08:00:00+00:00"))
        );
        assert_eq!(store.latest_winding_time("王五").await.unwrap(), None);
    }

    #[tokio::test]
    async fn search_is_substring_on_any_employee_column() {
        let store = MemoryProductStore::new();
        store
            .insert_product("P1", &write_for("winding", "t1", "方辉"))
            .await
            .unwrap();
        store
            .insert_product("P2", &write_for("pressing", "t2", "方辉-白班"))
            .await
            .unwrap();
        store
            .insert_product("P3", &write_for("immersion", "t3", "李雷"))
            .await
            .unwrap();

        let found = store.search_by_employee(" 方辉 ").await.unwrap();
        let codes: Vec<&str> = found.iter().map(|r| r.product_code.as_str()).collect();
        assert_eq!(codes, ["P1", "P2"]);
    }

    #[tokio::test]
    async fn clear_nulls_both_fields_and_tolerates_missing_rows() {
        let store = MemoryProductStore::new();
        store
            .insert_product("P1", &write_for("winding", "t1", "方辉"))
            .await
            .unwrap();

        let fields = resolve_fields("winding", None, None);
        store.clear_process("P1", &fields).await.unwrap();
        let record = store.product("P1").unwrap();
        assert_eq!(record.winding_time, None);
        assert_eq!(record.winding_employee, None);

        store.clear_process("absent", &fields).await.unwrap();
    }
}
