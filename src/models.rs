//! Shared models and types
//!
//! Types shared across multiple modules to avoid circular dependencies.

use crate::camera_registry::WorkerState;
use crate::counting::ClassCounts;
use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub tracker_connected: bool,
}

/// Camera summary for list/detail endpoints
#[derive(Debug, Clone, Serialize)]
pub struct CameraSummary {
    pub camera_id: String,
    pub name: String,
    pub location: String,
    pub state: WorkerState,
    pub counts: Vec<ClassCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Per-camera counter report
#[derive(Debug, Clone, Serialize)]
pub struct CountsResponse {
    pub camera_id: String,
    pub counts: Vec<ClassCounts>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success_omits_error() {
        let resp = ApiResponse::success(42);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"ok\":true"));
        assert!(json.contains("\"data\":42"));
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_api_response_error_omits_data() {
        let resp: ApiResponse<()> = ApiResponse::error("boom");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"ok\":false"));
        assert!(json.contains("\"error\":\"boom\""));
        assert!(!json.contains("data"));
    }
}
