//! StreamReader - Restartable Frame Sequences
//!
//! ## Responsibilities
//!
//! - Turn a camera source into a lazy sequence of fixed-resolution frames
//! - Survive transient read failures with bounded retry + backoff
//! - Guarantee the underlying decode resource is released on every exit
//!
//! Two interchangeable strategies share the same contract and are picked
//! by camera brand: an ffmpeg subprocess piping raw RGB24 frames, and an
//! HTTP endpoint returning JPEG stills. A sequence that ends (`None`) is
//! not fatal; the camera worker reopens it at its own recovery layer.

use crate::config_source::{CameraConfig, ReaderStrategy};
use crate::error::{Error, Result};
use crate::frame::Frame;
use image::imageops::FilterType;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

/// Reader tuning shared by all cameras
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    pub width: u32,
    pub height: u32,
    /// Consecutive failures tolerated before the sequence ends
    pub max_attempts: u32,
    /// Delay before each reconnect attempt
    pub backoff: Duration,
    /// Poll interval for the snapshot strategy
    pub snapshot_interval: Duration,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            max_attempts: 3,
            backoff: Duration::from_secs(2),
            snapshot_interval: Duration::from_millis(200),
        }
    }
}

/// Bounded retry counter, reset after every delivered frame
#[derive(Debug)]
pub struct RetryBudget {
    failures: u32,
    max_attempts: u32,
    backoff: Duration,
}

impl RetryBudget {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            failures: 0,
            max_attempts,
            backoff,
        }
    }

    /// Record a failure; returns `true` if another attempt is allowed
    pub fn record_failure(&mut self) -> bool {
        self.failures += 1;
        self.failures <= self.max_attempts
    }

    /// Reset after a successfully delivered frame
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// One open frame sequence for a camera
pub enum StreamReader {
    Ffmpeg(FfmpegReader),
    Snapshot(SnapshotReader),
}

impl StreamReader {
    /// Open the sequence appropriate to the camera's strategy
    pub fn open(config: &CameraConfig, settings: &ReaderSettings) -> Result<Self> {
        match config.strategy {
            ReaderStrategy::Ffmpeg => {
                Ok(Self::Ffmpeg(FfmpegReader::open(&config.source_url, settings)?))
            }
            ReaderStrategy::Snapshot => Ok(Self::Snapshot(SnapshotReader::new(
                config.source_url.clone(),
                settings,
            ))),
        }
    }

    /// Next frame, or `None` when the retry budget is exhausted
    pub async fn next_frame(&mut self) -> Option<Frame> {
        match self {
            Self::Ffmpeg(reader) => reader.next_frame().await,
            Self::Snapshot(reader) => reader.next_frame().await,
        }
    }
}

/// Raw-frame pipe from an ffmpeg subprocess
///
/// `kill_on_drop(true)` guarantees the subprocess is killed when the
/// reader is dropped or the pipe is replaced during a reconnect, so no
/// exit path leaks an ffmpeg process.
pub struct FfmpegReader {
    url: String,
    width: u32,
    height: u32,
    _child: Child,
    stdout: ChildStdout,
    budget: RetryBudget,
}

/// ffmpeg argument list for raw RGB24 output at a fixed resolution
fn ffmpeg_args(url: &str, width: u32, height: u32) -> Vec<String> {
    vec![
        "-rtsp_transport".into(),
        "tcp".into(),
        "-i".into(),
        url.into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-vf".into(),
        format!("scale={}:{}", width, height),
        "-an".into(),
        "-loglevel".into(),
        "error".into(),
        "-".into(),
    ]
}

impl FfmpegReader {
    /// Spawn ffmpeg and attach to its stdout pipe
    pub fn open(url: &str, settings: &ReaderSettings) -> Result<Self> {
        let (child, stdout) = Self::spawn(url, settings.width, settings.height)?;
        tracing::debug!(url = %url, "ffmpeg reader opened");

        Ok(Self {
            url: url.to_string(),
            width: settings.width,
            height: settings.height,
            _child: child,
            stdout,
            budget: RetryBudget::new(settings.max_attempts, settings.backoff),
        })
    }

    fn spawn(url: &str, width: u32, height: u32) -> Result<(Child, ChildStdout)> {
        let mut child = Command::new("ffmpeg")
            .args(ffmpeg_args(url, width, height))
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Stream(format!("ffmpeg spawn failed: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Stream("ffmpeg stdout unavailable".to_string()))?;

        Ok((child, stdout))
    }

    /// Read one raw frame; reconnects on short reads until the budget runs out
    pub async fn next_frame(&mut self) -> Option<Frame> {
        let frame_size = Frame::byte_len(self.width, self.height);

        loop {
            let mut buf = vec![0u8; frame_size];
            match self.stdout.read_exact(&mut buf).await {
                Ok(_) => {
                    self.budget.reset();
                    return Frame::from_raw(self.width, self.height, buf);
                }
                Err(e) => {
                    tracing::warn!(
                        url = %self.url,
                        error = %e,
                        failures = self.budget.failures() + 1,
                        "ffmpeg read failed"
                    );

                    if !self.budget.record_failure() {
                        tracing::warn!(url = %self.url, "ffmpeg retry budget exhausted");
                        return None;
                    }

                    tokio::time::sleep(self.budget.backoff()).await;

                    // Replacing the child drops the old one, which kills
                    // the stale ffmpeg process.
                    match Self::spawn(&self.url, self.width, self.height) {
                        Ok((child, stdout)) => {
                            self._child = child;
                            self.stdout = stdout;
                        }
                        Err(e) => {
                            tracing::warn!(url = %self.url, error = %e, "ffmpeg reopen failed");
                        }
                    }
                }
            }
        }
    }
}

/// Fixed-rate JPEG poller for cameras exposing an HTTP still endpoint
pub struct SnapshotReader {
    url: String,
    width: u32,
    height: u32,
    client: reqwest::Client,
    interval: Duration,
    budget: RetryBudget,
}

impl SnapshotReader {
    pub fn new(url: String, settings: &ReaderSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            url,
            width: settings.width,
            height: settings.height,
            client,
            interval: settings.snapshot_interval,
            budget: RetryBudget::new(settings.max_attempts, settings.backoff),
        }
    }

    async fn fetch_frame(&self) -> Result<Frame> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(Error::Stream(format!(
                "snapshot fetch failed: {}",
                resp.status()
            )));
        }

        let bytes = resp.bytes().await?;
        let image = image::load_from_memory(&bytes)?
            .resize_exact(self.width, self.height, FilterType::Triangle)
            .to_rgb8();
        Ok(Frame::from_image(image))
    }

    /// Next snapshot frame at the configured poll rate
    pub async fn next_frame(&mut self) -> Option<Frame> {
        loop {
            tokio::time::sleep(self.interval).await;

            match self.fetch_frame().await {
                Ok(frame) => {
                    self.budget.reset();
                    return Some(frame);
                }
                Err(e) => {
                    tracing::warn!(
                        url = %self.url,
                        error = %e,
                        failures = self.budget.failures() + 1,
                        "snapshot fetch failed"
                    );

                    if !self.budget.record_failure() {
                        tracing::warn!(url = %self.url, "snapshot retry budget exhausted");
                        return None;
                    }

                    tokio::time::sleep(self.budget.backoff()).await;
                }
            }
        }
    }
}
