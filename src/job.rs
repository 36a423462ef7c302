use std::io::Error as IoError;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::app_state::AppState;
use crate::command::FfmpegInvocation;
use crate::error::{ApiError, ApiResult};
use crate::ffmpeg;
use crate::logo::{LogoAsset, LogoPreset};
use crate::region::{self, WatermarkPosition};

/// Every temporary file one job creates, released exactly once.
///
/// Files are tracked as they are materialized and unlinked together: either
/// explicitly via [`cleanup`](Self::cleanup), or on drop for the failure and
/// panic paths. Deletion is best-effort; a file that is already gone is not
/// an error.
#[derive(Debug, Default)]
pub struct TempFiles {
    files: Vec<PathBuf>,
}

impl TempFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    pub fn cleanup(&mut self) {
        for path in self.files.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed temp file"),
                Err(error) => debug!(path = %path.display(), %error, "Temp file already gone"),
            }
        }
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Response body stream that owns the job's [`TempFiles`]. The files are
/// unlinked when the stream is dropped: after the body has been fully sent,
/// or earlier if the client disconnects.
pub struct DeliveryStream {
    inner: ReaderStream<tokio::fs::File>,
    _files: TempFiles,
}

impl DeliveryStream {
    pub async fn open(output: &Path, files: TempFiles) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(output).await?;
        Ok(Self {
            inner: ReaderStream::new(file),
            _files: files,
        })
    }
}

impl Stream for DeliveryStream {
    type Item = Result<Bytes, IoError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Probe, region calculation, command build, and the encode itself, all
/// under one concurrency permit. The permit is scoped to this function so
/// it is back in the pool before the response starts streaming, and a panic
/// anywhere in here cannot leak it.
pub async fn run_transform(
    state: &AppState,
    job_id: &str,
    input: &Path,
    output: &Path,
    preset: LogoPreset,
    position: WatermarkPosition,
) -> ApiResult<()> {
    let _permit = state
        .permits
        .acquire()
        .await
        .map_err(|error| ApiError::Internal(error.into()))?;

    let metadata = ffmpeg::probe(input)
        .await
        .ok_or_else(|| ApiError::processing("Could not read video metadata"))?;

    let resolution = region::Resolution::from_height(metadata.height);
    let region = region::calculate(metadata.width, metadata.height, position);
    debug!(
        %job_id,
        width = metadata.width,
        height = metadata.height,
        resolution = resolution.label(),
        ?region,
        "Watermark region calculated"
    );

    let logo = match state.logos.resolve(preset) {
        LogoAsset::File(path) => Some(path),
        LogoAsset::NoOverlay => None,
        LogoAsset::Unavailable => {
            // Missing asset degrades to remove-only, matching the
            // availability flag the presets endpoint reports.
            warn!(%job_id, preset = preset.id(), "Logo asset unavailable, skipping overlay");
            None
        }
    };

    let invocation = FfmpegInvocation::build(input, output, region, position, logo.as_deref());
    ffmpeg::run(&invocation, output).await?;

    info!(%job_id, "Transform finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cleanup_removes_tracked_files() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.mp4");
        let b = dir.path().join("b.mp4");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let mut files = TempFiles::new();
        files.track(a.clone());
        files.track(b.clone());
        files.cleanup();

        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn cleanup_tolerates_missing_files_and_runs_once() {
        let dir = tempdir().unwrap();
        let mut files = TempFiles::new();
        files.track(dir.path().join("never-created.mp4"));
        files.cleanup();
        files.cleanup();
        // Drop runs a third time with an empty list.
    }

    #[test]
    fn drop_cleans_up_without_explicit_call() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orphan.mp4");
        std::fs::write(&path, b"x").unwrap();

        {
            let mut files = TempFiles::new();
            files.track(path.clone());
        }

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn delivery_stream_cleans_up_after_full_send() {
        use futures::StreamExt;

        let dir = tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        let output = dir.path().join("out.mp4");
        std::fs::write(&input, b"input").unwrap();
        std::fs::write(&output, b"output-bytes").unwrap();

        let mut files = TempFiles::new();
        files.track(input.clone());
        files.track(output.clone());

        let mut stream = DeliveryStream::open(&output, files).await.unwrap();
        let mut delivered = Vec::new();
        while let Some(chunk) = stream.next().await {
            delivered.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(delivered, b"output-bytes");

        // Files survive until the body stream is dropped.
        assert!(input.exists());
        drop(stream);
        assert!(!input.exists());
        assert!(!output.exists());
    }
}
