//! EventEmitter - Fire-and-Forget Detection Event Delivery
//!
//! ## Responsibilities
//!
//! - Post counted crossings to the external event sink
//! - Never block the counting loop on sink latency or failures
//!
//! Each event is sent from a spawned task. Delivery failures are logged
//! and the event is dropped; there is no retry queue.

use crate::counting::Direction;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use std::time::Duration;

/// One counted crossing ready for delivery
#[derive(Debug, Clone)]
pub struct DetectionEvent {
    pub camera_id: String,
    pub vehicle_class: String,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
    /// Annotated JPEG of the frame that produced the crossing
    pub snapshot: Option<Vec<u8>>,
}

/// Event sink client
pub struct EventEmitter {
    client: reqwest::Client,
    sink_url: String,
}

impl EventEmitter {
    pub fn new(sink_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, sink_url }
    }

    /// Queue an event for delivery and return immediately
    pub fn emit(self: &Arc<Self>, event: DetectionEvent) {
        let emitter = self.clone();
        tokio::spawn(async move {
            if let Err(e) = emitter.send(&event).await {
                tracing::warn!(
                    camera_id = %event.camera_id,
                    vehicle_class = %event.vehicle_class,
                    error = %e,
                    "Detection event delivery failed, dropping"
                );
            }
        });
    }

    async fn send(&self, event: &DetectionEvent) -> crate::Result<()> {
        let url = format!("{}/api/detections/", self.sink_url);

        let mut form = Form::new()
            .text("cctv", event.camera_id.clone())
            .text("vehicle_type", event.vehicle_class.clone())
            .text("direction", event.direction.as_str())
            .text("timestamp", event.timestamp.to_rfc3339());

        if let Some(jpeg) = &event.snapshot {
            form = form.part(
                "frame_image",
                Part::bytes(jpeg.clone())
                    .file_name("detection.jpg")
                    .mime_str("image/jpeg")?,
            );
        }

        let resp = self.client.post(&url).multipart(form).send().await?;
        resp.error_for_status_ref()?;

        tracing::debug!(
            camera_id = %event.camera_id,
            vehicle_class = %event.vehicle_class,
            direction = %event.direction.as_str(),
            "Detection event delivered"
        );
        Ok(())
    }
}
