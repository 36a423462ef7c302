use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::command::FfmpegInvocation;

const FFMPEG_BIN: &str = "ffmpeg";
const FFPROBE_BIN: &str = "ffprobe";

/// Longest stderr tail surfaced in a failure diagnostic.
const DIAGNOSTIC_LIMIT: usize = 500;

/// Dimensions assumed when the selected video stream omits them. Never used
/// when no video stream exists at all.
const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
}

/// Errors from the transform run. Probe unavailability is not here: it is a
/// recoverable `None`, not an error.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to spawn ffmpeg: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("ffmpeg error: {0}")]
    Ffmpeg(String),
    #[error("output file was not created")]
    MissingOutput,
}

/// Probe container/stream metadata with ffprobe. Non-zero exit, spawn
/// failure, malformed JSON, or a report without a video stream all collapse
/// to `None`; callers treat that as "could not read video metadata".
pub async fn probe(input: &Path) -> Option<VideoMetadata> {
    let output = Command::new(FFPROBE_BIN)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(input)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .inspect_err(|error| warn!(%error, "Failed to run ffprobe"))
        .ok()?;

    if !output.status.success() {
        debug!(status = ?output.status, "ffprobe exited non-zero");
        return None;
    }

    let report: ProbeReport = serde_json::from_slice(&output.stdout)
        .inspect_err(|error| warn!(%error, "Malformed ffprobe report"))
        .ok()?;

    let video = report
        .streams
        .iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"))?;

    Some(VideoMetadata {
        width: video.width.unwrap_or(DEFAULT_WIDTH),
        height: video.height.unwrap_or(DEFAULT_HEIGHT),
    })
}

/// Run the transform to completion in a child process, capturing stderr for
/// diagnostics. Success additionally requires that `expected_output` exists
/// afterwards; a zero exit without the file is still a failure.
pub async fn run(invocation: &FfmpegInvocation, expected_output: &Path) -> Result<(), RunError> {
    debug!(args = ?invocation.args, "Running ffmpeg");

    let output = Command::new(FFMPEG_BIN)
        .args(&invocation.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RunError::Ffmpeg(truncate_diagnostic(&stderr)));
    }

    if !expected_output.exists() {
        return Err(RunError::MissingOutput);
    }

    Ok(())
}

/// Whether the ffmpeg binary answers `-version`, bounded so a wedged binary
/// cannot stall the health endpoint.
pub async fn version_check() -> bool {
    let mut command = Command::new(FFMPEG_BIN);
    command
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    matches!(
        tokio::time::timeout(Duration::from_secs(5), command.status()).await,
        Ok(Ok(status)) if status.success()
    )
}

/// Last `DIAGNOSTIC_LIMIT` characters of stderr, which is where ffmpeg puts
/// the actual failure reason.
fn truncate_diagnostic(stderr: &str) -> String {
    if stderr.is_empty() {
        return "Unknown error".into();
    }
    let chars = stderr.chars().count();
    stderr
        .chars()
        .skip(chars.saturating_sub(DIAGNOSTIC_LIMIT))
        .collect()
}
