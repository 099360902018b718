//! Report envelope and serialization
//!
//! Pure transformation: wraps a mode payload (or the discovery inventory) in
//! a versioned envelope and serializes it. Field order is fixed by struct
//! definitions and all maps are ordered, so identical input yields identical
//! output. Errors serialize as `{"error": <message>}`.

use crate::error::InsightError;
use crate::{INSIGHT_VERSION, PRODUCER_NAME};
use serde::Serialize;
use uuid::Uuid;

/// Current report envelope version.
pub const REPORT_VERSION: &str = "1.0.0";

/// Who produced a report.
#[derive(Debug, Clone, Serialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Versioned envelope around any report payload.
#[derive(Debug, Clone, Serialize)]
pub struct Report<T: Serialize> {
    pub report_version: String,
    pub producer: Producer,
    /// What the payload is: `discovery`, `scan`, `sleep`, ...
    pub kind: String,
    pub payload: T,
}

/// Emitter with a stable per-run instance id.
#[derive(Debug, Clone)]
pub struct ReportEmitter {
    instance_id: String,
}

impl Default for ReportEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEmitter {
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Wrap a payload in the envelope.
    pub fn wrap<T: Serialize>(&self, kind: &str, payload: T) -> Report<T> {
        Report {
            report_version: REPORT_VERSION.to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: INSIGHT_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            kind: kind.to_string(),
            payload,
        }
    }

    /// Wrap and serialize to pretty JSON.
    pub fn emit<T: Serialize>(&self, kind: &str, payload: T) -> Result<String, InsightError> {
        serde_json::to_string_pretty(&self.wrap(kind, payload)).map_err(InsightError::from)
    }

    /// The structured error payload every fatal-to-a-call failure surfaces as.
    pub fn error_json(err: &InsightError) -> String {
        serde_json::json!({ "error": err.to_string() }).to_string()
    }
}
