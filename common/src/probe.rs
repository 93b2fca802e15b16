// Video duration probing via ffprobe
//
// The probe sits behind a trait so the scanner can be exercised in tests
// without ffprobe installed. A video the probe cannot read is treated as
// unplayable and the item is excluded by the scanner.

use crate::errors::ProbeError;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Probes the playable duration of a local video file
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn duration_seconds(&self, video_path: &Path) -> Result<f64, ProbeError>;
}

/// ffprobe-backed implementation
pub struct FfprobeDurationProbe;

#[async_trait]
impl DurationProbe for FfprobeDurationProbe {
    async fn duration_seconds(&self, video_path: &Path) -> Result<f64, ProbeError> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(video_path)
            .output()
            .await
            .map_err(|e| ProbeError::SpawnFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(ProbeError::ProbeFailed {
                path: video_path.display().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let duration = raw
            .parse::<f64>()
            .map_err(|_| ProbeError::UnparseableDuration {
                path: video_path.display().to_string(),
                raw: raw.clone(),
            })?;

        debug!(path = %video_path.display(), duration_seconds = duration, "Probed video duration");
        Ok(duration)
    }
}

/// Fixed-duration probe for tests
pub struct FixedDurationProbe {
    pub duration_seconds: f64,
}

#[async_trait]
impl DurationProbe for FixedDurationProbe {
    async fn duration_seconds(&self, _video_path: &Path) -> Result<f64, ProbeError> {
        Ok(self.duration_seconds)
    }
}
