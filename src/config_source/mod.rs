//! ConfigSource - Camera Configuration Backend Adapter
//!
//! ## Responsibilities
//!
//! - Fetch the camera list from the external configuration backend
//! - Map wire records into validated `CameraConfig` values
//!
//! Camera configuration is loaded once at startup and treated as
//! immutable at runtime.

use crate::counting::{DirectionMode, Point};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// Reader strategy, selected by camera brand/protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderStrategy {
    /// ffmpeg subprocess piping raw frames (RTSP and most brands)
    Ffmpeg,
    /// HTTP endpoint returning JPEG stills, polled at a fixed rate
    Snapshot,
}

impl ReaderStrategy {
    /// Strategy for a camera brand tag
    pub fn from_brand(brand: &str) -> Self {
        match brand.to_lowercase().as_str() {
            "axis" => Self::Snapshot,
            _ => Self::Ffmpeg,
        }
    }
}

/// Immutable per-camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub camera_id: String,
    pub name: String,
    pub source_url: String,
    pub strategy: ReaderStrategy,
    /// Counting line endpoints (pixel coordinates at the target resolution)
    pub line_start: Point,
    pub line_end: Point,
    pub direction_mode: DirectionMode,
    /// Swaps the sign-to-direction mapping of the counting line
    pub invert_direction: bool,
    pub location: String,
}

/// Wire record returned by the configuration backend
#[derive(Debug, Clone, Deserialize)]
pub struct CameraRecord {
    pub id: String,
    pub name: String,
    pub rtsp_url: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub direction_mode: Option<String>,
    #[serde(default)]
    pub line_start_x: f64,
    #[serde(default)]
    pub line_start_y: f64,
    #[serde(default = "default_line_end_x")]
    pub line_end_x: f64,
    #[serde(default = "default_line_end_y")]
    pub line_end_y: f64,
    #[serde(default)]
    pub invert_direction: bool,
    #[serde(default)]
    pub location: Option<String>,
}

fn default_line_end_x() -> f64 {
    640.0
}

fn default_line_end_y() -> f64 {
    360.0
}

impl CameraRecord {
    /// Validate and convert into a `CameraConfig`
    ///
    /// Records without a source URL are rejected (the backend keeps
    /// cameras that are not yet provisioned).
    pub fn into_config(self) -> Result<CameraConfig> {
        let source_url = self
            .rtsp_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::Validation(format!("camera {} has no source URL", self.id)))?;

        let brand = self.brand.unwrap_or_default();
        Ok(CameraConfig {
            camera_id: self.id,
            name: self.name,
            source_url,
            strategy: ReaderStrategy::from_brand(&brand),
            line_start: Point::new(self.line_start_x, self.line_start_y),
            line_end: Point::new(self.line_end_x, self.line_end_y),
            direction_mode: DirectionMode::parse(self.direction_mode.as_deref().unwrap_or("BOTH")),
            invert_direction: self.invert_direction,
            location: self.location.unwrap_or_default(),
        })
    }
}

/// Configuration backend client
pub struct ConfigSource {
    client: reqwest::Client,
    base_url: String,
}

impl ConfigSource {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, base_url }
    }

    /// Fetch all configured cameras
    ///
    /// Records that fail validation are skipped with a warning rather than
    /// failing the whole fetch.
    pub async fn fetch_cameras(&self) -> Result<Vec<CameraConfig>> {
        let url = format!("{}/api/cctv/", self.base_url);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Config(format!(
                "camera list fetch failed: {}",
                resp.status()
            )));
        }

        let records: Vec<CameraRecord> = resp.json().await?;
        let mut cameras = Vec::with_capacity(records.len());
        for record in records {
            let camera_id = record.id.clone();
            match record.into_config() {
                Ok(config) => cameras.push(config),
                Err(e) => {
                    tracing::warn!(camera_id = %camera_id, error = %e, "Skipping camera record");
                }
            }
        }

        tracing::info!(count = cameras.len(), "Camera configuration loaded");
        Ok(cameras)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_into_config() {
        let json = r#"{
            "id": "cam-001",
            "name": "North Gate",
            "rtsp_url": "rtsp://10.0.0.5/stream1",
            "brand": "unv",
            "direction_mode": "IN",
            "line_start_x": 0, "line_start_y": 200,
            "line_end_x": 640, "line_end_y": 200,
            "location": "north"
        }"#;
        let record: CameraRecord = serde_json::from_str(json).unwrap();
        let config = record.into_config().unwrap();

        assert_eq!(config.camera_id, "cam-001");
        assert_eq!(config.strategy, ReaderStrategy::Ffmpeg);
        assert_eq!(config.direction_mode, DirectionMode::In);
        assert_eq!(config.line_start, Point::new(0.0, 200.0));
        assert_eq!(config.line_end, Point::new(640.0, 200.0));
        assert!(!config.invert_direction);
    }

    #[test]
    fn test_record_defaults() {
        let json = r#"{"id": "cam-002", "name": "Side", "rtsp_url": "rtsp://x/s"}"#;
        let record: CameraRecord = serde_json::from_str(json).unwrap();
        let config = record.into_config().unwrap();

        assert_eq!(config.direction_mode, DirectionMode::Both);
        assert_eq!(config.line_end, Point::new(640.0, 360.0));
        assert_eq!(config.location, "");
    }

    #[test]
    fn test_record_without_url_rejected() {
        let json = r#"{"id": "cam-003", "name": "Unprovisioned"}"#;
        let record: CameraRecord = serde_json::from_str(json).unwrap();
        assert!(record.into_config().is_err());
    }

    #[test]
    fn test_strategy_from_brand() {
        assert_eq!(ReaderStrategy::from_brand("axis"), ReaderStrategy::Snapshot);
        assert_eq!(ReaderStrategy::from_brand("AXIS"), ReaderStrategy::Snapshot);
        assert_eq!(ReaderStrategy::from_brand("unv"), ReaderStrategy::Ffmpeg);
        assert_eq!(ReaderStrategy::from_brand(""), ReaderStrategy::Ffmpeg);
    }
}
