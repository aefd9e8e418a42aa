//! Capture status as reported by the host extension.

use serde::{Deserialize, Serialize};

use crate::BridgeError;

/// Snapshot returned by `getStatus()` on the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Seconds since capture began.
    pub time: f64,
    /// Samples written so far.
    pub samples: u64,
    /// File currently being written.
    pub filename: String,
}

impl StatusReport {
    /// Decode the `result` payload of a status response.
    pub fn from_value(value: serde_json::Value) -> Result<Self, BridgeError> {
        let report: StatusReport = serde_json::from_value(value)
            .map_err(|e| BridgeError::MalformedResponse(e.to_string()))?;
        if !report.time.is_finite() {
            return Err(BridgeError::MalformedResponse(format!(
                "non-finite capture time {}",
                report.time
            )));
        }
        Ok(report)
    }

    /// Elapsed time as two-decimal text.
    pub fn time_text(&self) -> String {
        format!("{:.2}", self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_status_payload() {
        let report =
            StatusReport::from_value(json!({"time": 12.3, "samples": 1230, "filename": "run.json"}))
                .unwrap();
        assert_eq!(report.samples, 1230);
        assert_eq!(report.filename, "run.json");
        assert_eq!(report.time_text(), "12.30");
    }

    #[test]
    fn rejects_missing_fields() {
        let err = StatusReport::from_value(json!({"time": 1.0})).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_negative_sample_count() {
        let err =
            StatusReport::from_value(json!({"time": 1.0, "samples": -4, "filename": ""}))
                .unwrap_err();
        assert!(matches!(err, BridgeError::MalformedResponse(_)));
    }
}
