//! Task acknowledgements
//!
//! The outcome of processing one task, reported back to the server so it can
//! decide whether to redeliver.

use serde::{Deserialize, Serialize};

/// Acknowledgement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    /// Delivered and processed without errors
    Success,
    /// Delivered but processed with an application-level error
    Error,
    /// Not processed; the task must remain enqueued for redelivery
    Retry,
}

/// Acknowledgement for one task
///
/// Serializes to the wire shape `{status, message?, app_id?}`. The optional
/// `app_id` correlates the task's subject with a record in the consuming
/// application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAck {
    pub status: AckStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

impl TaskAck {
    /// Acknowledges successful processing
    pub fn success() -> Self {
        Self::with_status(AckStatus::Success)
    }

    /// Acknowledges delivery with an application-level failure
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_status(AckStatus::Error).with_message(message)
    }

    /// Declines to process the task; it stays enqueued
    pub fn retry() -> Self {
        Self::with_status(AckStatus::Retry)
    }

    fn with_status(status: AckStatus) -> Self {
        Self {
            status,
            message: None,
            app_id: None,
        }
    }

    /// Attaches a human-readable message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches the application-assigned identifier for the task's subject
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let ack = TaskAck::success();
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success"}));
    }

    #[test]
    fn test_optional_fields_serialized_when_present() {
        let ack = TaskAck::error("could not update record").with_app_id("42");
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "error",
                "message": "could not update record",
                "app_id": "42",
            })
        );
    }

    #[test]
    fn test_retry_has_no_message() {
        let json = serde_json::to_value(TaskAck::retry()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "retry"}));
    }
}
