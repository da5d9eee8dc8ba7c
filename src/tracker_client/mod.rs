//! TrackerClient - External Detector/Tracker Adapter
//!
//! ## Responsibilities
//!
//! - Open a per-camera tracking session (the resource-heavy model load)
//! - Send frames for detection + tracking, parse box/track-id/class tuples
//! - Health checks
//!
//! One client instance is shared by all camera workers; the tracker owns
//! per-camera sessions so track identifiers never collide across cameras.

use crate::counting::Point;
use crate::error::{Error, Result};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One tracked bounding box from the external tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Tracker-assigned identifier, persistent while the object is visible
    pub track_id: i64,
    pub class_id: i64,
    pub confidence: f32,
}

impl TrackedBox {
    /// Geometric center, used as the object's position proxy
    pub fn centroid(&self) -> Point {
        Point::new(
            f64::from(self.x1 + self.x2) / 2.0,
            f64::from(self.y1 + self.y2) / 2.0,
        )
    }
}

/// Response from the tracker's track endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TrackResponse {
    pub camera_id: String,
    #[serde(default)]
    pub boxes: Vec<TrackedBox>,
}

/// Session open request
#[derive(Debug, Clone, Serialize)]
struct SessionRequest<'a> {
    camera_id: &'a str,
}

/// Tracker service client
pub struct TrackerClient {
    client: reqwest::Client,
    base_url: String,
}

impl TrackerClient {
    /// Create new tracker client
    pub fn new(base_url: String) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create new tracker client with custom timeout
    pub fn with_timeout(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, base_url }
    }

    /// Check tracker health
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Open a tracking session for a camera
    ///
    /// The tracker loads its detection model and allocates track-id state
    /// for the camera. Expensive; the camera worker calls this once per
    /// worker lifetime and treats failure as fatal for that camera.
    pub async fn open_session(&self, camera_id: &str) -> Result<()> {
        let url = format!("{}/v1/sessions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&SessionRequest { camera_id })
            .send()
            .await
            .map_err(|e| Error::Tracker(format!("session open failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Tracker(format!(
                "session open for {} failed: {} - {}",
                camera_id, status, body
            )));
        }

        tracing::info!(camera_id = %camera_id, "Tracker session opened");
        Ok(())
    }

    /// Run detection + tracking on one frame
    ///
    /// Returns the visible tracked boxes (possibly empty).
    pub async fn track(&self, camera_id: &str, jpeg: Vec<u8>) -> Result<Vec<TrackedBox>> {
        let url = format!("{}/v1/track", self.base_url);

        let form = Form::new()
            .part(
                "frame",
                Part::bytes(jpeg)
                    .file_name("frame.jpg")
                    .mime_str("image/jpeg")?,
            )
            .text("camera_id", camera_id.to_string());

        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Tracker(format!("track request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Error::Tracker(format!(
                "track for {} failed: {}",
                camera_id,
                resp.status()
            )));
        }

        let result: TrackResponse = resp
            .json()
            .await
            .map_err(|e| Error::Tracker(format!("track response parse failed: {}", e)))?;
        Ok(result.boxes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid() {
        let tracked = TrackedBox {
            x1: 100.0,
            y1: 50.0,
            x2: 200.0,
            y2: 150.0,
            track_id: 1,
            class_id: 2,
            confidence: 0.8,
        };
        let c = tracked.centroid();
        assert_eq!(c.x, 150.0);
        assert_eq!(c.y, 100.0);
    }

    #[test]
    fn test_track_response_deserialization() {
        let json = r#"{
            "camera_id": "cam-001",
            "boxes": [
                {"x1": 1.0, "y1": 2.0, "x2": 3.0, "y2": 4.0,
                 "track_id": 17, "class_id": 7, "confidence": 0.91}
            ]
        }"#;
        let resp: TrackResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.camera_id, "cam-001");
        assert_eq!(resp.boxes.len(), 1);
        assert_eq!(resp.boxes[0].track_id, 17);
        assert_eq!(resp.boxes[0].class_id, 7);
    }

    #[test]
    fn test_track_response_boxes_default_empty() {
        let resp: TrackResponse = serde_json::from_str(r#"{"camera_id": "cam-001"}"#).unwrap();
        assert!(resp.boxes.is_empty());
    }
}
