//! Product records and the report rows derived from them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::process::ProcessKind;

/// A process time exactly as it exists in storage.
///
/// Legacy imports left text in several formats alongside native values, so
/// the raw representation is preserved end-to-end. Anything that needs to
/// compare or bucket these values goes through [`crate::temporal::normalize`];
/// report output carries the raw value untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// Native zoned value.
    Utc(DateTime<Utc>),
    /// Native zone-naive value.
    Naive(NaiveDateTime),
    /// Free text, format unknown until normalized.
    Text(String),
}

impl RawTimestamp {
    /// The current instant, zoned.
    pub fn now() -> Self {
        RawTimestamp::Utc(Utc::now())
    }

    /// Canonical text rendering.
    ///
    /// This is what gets written to text columns, and it is the ordering
    /// key for "most recent" lookups, matching the lexicographic order a
    /// text column gives.
    pub fn storage_text(&self) -> String {
        match self {
            RawTimestamp::Utc(dt) => dt.to_rfc3339(),
            RawTimestamp::Naive(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            RawTimestamp::Text(s) => s.clone(),
        }
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        RawTimestamp::Utc(dt)
    }
}

impl From<NaiveDateTime> for RawTimestamp {
    fn from(dt: NaiveDateTime) -> Self {
        RawTimestamp::Naive(dt)
    }
}

impl From<String> for RawTimestamp {
    fn from(s: String) -> Self {
        RawTimestamp::Text(s)
    }
}

impl From<&str> for RawTimestamp {
    fn from(s: &str) -> Self {
        RawTimestamp::Text(s.to_string())
    }
}

/// Snapshot of one product row.
///
/// One optional `(employee, time)` pair per stage. A stage counts as
/// recorded iff its time field is non-null; the employee field alone
/// proves nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_code: String,
    pub product_model: Option<String>,
    pub winding_employee: Option<String>,
    pub winding_time: Option<RawTimestamp>,
    pub embedding_employee: Option<String>,
    pub embedding_time: Option<RawTimestamp>,
    pub wire_connection_employee: Option<String>,
    pub wire_connection_time: Option<RawTimestamp>,
    pub pressing_employee: Option<String>,
    pub pressing_time: Option<RawTimestamp>,
    pub stopper_turning_employee: Option<String>,
    pub stopper_turning_time: Option<RawTimestamp>,
    pub immersion_employee: Option<String>,
    pub immersion_time: Option<RawTimestamp>,
}

impl ProductRecord {
    /// An empty record for the given code.
    pub fn new(product_code: impl Into<String>) -> Self {
        ProductRecord {
            product_code: product_code.into(),
            ..ProductRecord::default()
        }
    }

    /// Employee label recorded for a stage.
    pub fn employee(&self, kind: ProcessKind) -> Option<&str> {
        match kind {
            ProcessKind::Winding => self.winding_employee.as_deref(),
            ProcessKind::Embedding => self.embedding_employee.as_deref(),
            ProcessKind::WireConnection => self.wire_connection_employee.as_deref(),
            ProcessKind::Pressing => self.pressing_employee.as_deref(),
            ProcessKind::StopperTurning => self.stopper_turning_employee.as_deref(),
            ProcessKind::Immersion => self.immersion_employee.as_deref(),
        }
    }

    /// Timestamp recorded for a stage.
    pub fn time(&self, kind: ProcessKind) -> Option<&RawTimestamp> {
        match kind {
            ProcessKind::Winding => self.winding_time.as_ref(),
            ProcessKind::Embedding => self.embedding_time.as_ref(),
            ProcessKind::WireConnection => self.wire_connection_time.as_ref(),
            ProcessKind::Pressing => self.pressing_time.as_ref(),
            ProcessKind::StopperTurning => self.stopper_turning_time.as_ref(),
            ProcessKind::Immersion => self.immersion_time.as_ref(),
        }
    }

    pub(crate) fn set_employee(&mut self, kind: ProcessKind, value: Option<String>) {
        match kind {
            ProcessKind::Winding => self.winding_employee = value,
            ProcessKind::Embedding => self.embedding_employee = value,
            ProcessKind::WireConnection => self.wire_connection_employee = value,
            ProcessKind::Pressing => self.pressing_employee = value,
            ProcessKind::StopperTurning => self.stopper_turning_employee = value,
            ProcessKind::Immersion => self.immersion_employee = value,
        }
    }

    pub(crate) fn set_time(&mut self, kind: ProcessKind, value: Option<RawTimestamp>) {
        match kind {
            ProcessKind::Winding => self.winding_time = value,
            ProcessKind::Embedding => self.embedding_time = value,
            ProcessKind::WireConnection => self.wire_connection_time = value,
            ProcessKind::Pressing => self.pressing_time = value,
            ProcessKind::StopperTurning => self.stopper_turning_time = value,
            ProcessKind::Immersion => self.immersion_time = value,
        }
    }
}

/// One qualifying `(process, product)` occurrence inside a report window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub process: ProcessKind,
    pub product_code: String,
    pub product_model: Option<String>,
    /// Raw stored time, passed through untouched.
    pub time: RawTimestamp,
}

/// Per-process occurrence count for one employee over the current shop day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessCount {
    pub process: ProcessKind,
    pub count: u64,
}

/// Reporting window, either configured in storage or defaulted to the
/// current calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthRange {
    pub start_date: RawTimestamp,
    pub end_date: RawTimestamp,
}
