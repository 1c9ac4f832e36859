//! Process catalog: the six production stages and their record fields.
//!
//! Every field-name decision in the crate goes through this module. The
//! catalog maps external process identifiers onto the `(employee, time)`
//! column pair a stage writes to, and the reverse maps let storage code
//! whitelist column names instead of interpolating caller input.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One stage of the fixed production sequence.
///
/// The declaration order is production order; reports iterate stages in
/// this order and emit them in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    Winding,
    Embedding,
    WireConnection,
    Pressing,
    StopperTurning,
    Immersion,
}

/// All six stages in production order.
pub const ALL_PROCESSES: [ProcessKind; 6] = [
    ProcessKind::Winding,
    ProcessKind::Embedding,
    ProcessKind::WireConnection,
    ProcessKind::Pressing,
    ProcessKind::StopperTurning,
    ProcessKind::Immersion,
];

impl ProcessKind {
    /// External identifier for this stage, as clients send it.
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessKind::Winding => "winding",
            ProcessKind::Embedding => "embedding",
            ProcessKind::WireConnection => "wire_connection",
            ProcessKind::Pressing => "pressing",
            ProcessKind::StopperTurning => "stopper_turning",
            ProcessKind::Immersion => "immersion",
        }
    }

    /// Look a stage up by its external identifier.
    ///
    /// Returns `None` for identifiers outside the catalog; write paths then
    /// fall through to permissive field resolution instead of failing.
    pub fn from_external(id: &str) -> Option<ProcessKind> {
        match id {
            "winding" => Some(ProcessKind::Winding),
            "embedding" => Some(ProcessKind::Embedding),
            "wire_connection" => Some(ProcessKind::WireConnection),
            "pressing" => Some(ProcessKind::Pressing),
            "stopper_turning" => Some(ProcessKind::StopperTurning),
            "immersion" => Some(ProcessKind::Immersion),
            _ => None,
        }
    }

    /// Shop-floor display name for this stage.
    ///
    /// Paperwork and terminals on the line are in Chinese; report consumers
    /// show this label next to the external identifier.
    pub fn display_name(self) -> &'static str {
        match self {
            ProcessKind::Winding => "绕线",
            ProcessKind::Embedding => "嵌线",
            ProcessKind::WireConnection => "接线",
            ProcessKind::Pressing => "压装",
            ProcessKind::StopperTurning => "车止口",
            ProcessKind::Immersion => "浸漆",
        }
    }

    /// Column receiving this stage's entry timestamp.
    pub fn time_field(self) -> &'static str {
        match self {
            ProcessKind::Winding => "winding_time",
            ProcessKind::Embedding => "embedding_time",
            ProcessKind::WireConnection => "wire_connection_time",
            ProcessKind::Pressing => "pressing_time",
            ProcessKind::StopperTurning => "stopper_turning_time",
            ProcessKind::Immersion => "immersion_time",
        }
    }

    /// Column receiving this stage's employee label.
    pub fn employee_field(self) -> &'static str {
        match self {
            ProcessKind::Winding => "winding_employee",
            ProcessKind::Embedding => "embedding_employee",
            ProcessKind::WireConnection => "wire_connection_employee",
            ProcessKind::Pressing => "pressing_employee",
            ProcessKind::StopperTurning => "stopper_turning_employee",
            ProcessKind::Immersion => "immersion_employee",
        }
    }

    /// Stage owning a given time column, if any.
    pub fn from_time_field(name: &str) -> Option<ProcessKind> {
        ALL_PROCESSES.into_iter().find(|k| k.time_field() == name)
    }

    /// Stage owning a given employee column, if any.
    pub fn from_employee_field(name: &str) -> Option<ProcessKind> {
        ALL_PROCESSES.into_iter().find(|k| k.employee_field() == name)
    }
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The record fields one process entry writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFields {
    /// Column receiving the entry timestamp.
    pub time: String,
    /// Column receiving the employee label; `None` skips the employee
    /// write entirely.
    pub employee: Option<String>,
}

/// Resolve an external process identifier into its record fields, honoring
/// caller-supplied overrides.
///
/// Known identifiers map through the catalog. Unknown identifiers resolve
/// permissively to `{id}_time` / `{id}_employee`; whether such columns
/// exist is the storage layer's problem and surfaces there as an internal
/// error, never as a validation error here.
///
/// An explicit `time_field` or `employee_field` override wins over the
/// catalog, and an empty `employee_field` override drops the employee
/// write.
pub fn resolve_fields(
    process_type: &str,
    time_field: Option<&str>,
    employee_field: Option<&str>,
) -> ProcessFields {
    let mut fields = match ProcessKind::from_external(process_type) {
        Some(kind) => ProcessFields {
            time: kind.time_field().to_string(),
            employee: Some(kind.employee_field().to_string()),
        },
        None => ProcessFields {
            time: format!("{process_type}_time"),
            employee: Some(format!("{process_type}_employee")),
        },
    };

    if let Some(tf) = time_field {
        if !tf.is_empty() {
            fields.time = tf.to_string();
        }
    }
    if let Some(ef) = employee_field {
        fields.employee = if ef.is_empty() { None } else { Some(ef.to_string()) };
    }

    fields
}

/// Catalog row linking a product model to the series it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct ModelSeries {
    pub product_model: String,
    pub series: String,
}

/// Catalog row describing one step of a series' process flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct SeriesProcess {
    pub series: String,
    /// Position of the step within the flow, starting at 1.
    pub sequence: i32,
    pub process: String,
}
