//! VideoTranscoder - per-variant ffmpeg re-encoding.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use varia_core::models::{named_resolution, VideoVariantSpec};

use crate::TransformError;

/// Short container string for a video content type, used for the passthrough
/// variant which keeps its container.
pub fn container_format(content_type: &str) -> String {
    match content_type.to_lowercase().as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        other => other.strip_prefix("video/").unwrap_or("bin"),
    }
    .to_string()
}

/// Result of one transcode: path to the output file plus byte length and
/// container format.
#[derive(Debug, Clone)]
pub struct TranscodedVariant {
    pub path: PathBuf,
    pub file_size: i64,
    pub format: String,
}

/// ffmpeg wrapper producing one output file per video tier.
pub struct VideoTranscoder {
    ffmpeg_path: String,
    timeout: Duration,
}

impl VideoTranscoder {
    pub fn new(ffmpeg_path: String, timeout: Duration) -> Self {
        Self {
            ffmpeg_path,
            timeout,
        }
    }

    /// Build the ffmpeg argument list for one tier. Known resolution names
    /// map to an explicit scale filter; unknown names re-encode at the target
    /// bitrate without a scale constraint. Buffer size is capped at twice the
    /// bitrate to bound transcoder memory.
    fn build_args(input: &Path, output: &Path, spec: &VideoVariantSpec) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "fast".to_string(),
            "-profile:v".to_string(),
            "main".to_string(),
        ];

        if let Some(encoding) = &spec.encoding {
            if let Some((width, height)) = named_resolution(&encoding.resolution) {
                args.extend_from_slice(&[
                    "-vf".to_string(),
                    format!("scale={}:{}", width, height),
                ]);
            }
            args.extend_from_slice(&[
                "-b:v".to_string(),
                format!("{}k", encoding.bitrate_kbps),
                "-maxrate".to_string(),
                format!("{}k", (encoding.bitrate_kbps as f32 * 1.2) as u32),
                "-bufsize".to_string(),
                format!("{}k", encoding.bitrate_kbps * 2),
            ]);
        }

        args.extend_from_slice(&[
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "128k".to_string(),
            "-ac".to_string(),
            "2".to_string(),
            "-ar".to_string(),
            "48000".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            output.to_string_lossy().to_string(),
        ]);

        args
    }

    /// Transcode one variant into `output_dir`. The output file is only
    /// reported on success; a failed run never yields a path.
    #[tracing::instrument(skip(self, input_path, output_dir, spec), fields(variant = %spec.name))]
    pub async fn transcode_variant(
        &self,
        input_path: &Path,
        output_dir: &Path,
        spec: &VideoVariantSpec,
    ) -> Result<TranscodedVariant, TransformError> {
        let fail = |message: String| TransformError::new(spec.name.clone(), message);

        let output_path = output_dir.join(format!("{}.mp4", spec.name));
        let args = Self::build_args(input_path, &output_path, spec);

        let start = std::time::Instant::now();
        // kill_on_drop: a cancelled variant task must not leave ffmpeg
        // writing into the scratch directory.
        let run = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => {
                result.map_err(|e| fail(format!("failed to execute ffmpeg: {}", e)))?
            }
            Err(_) => {
                // Remove any partial output so a timeout never looks like success.
                let _ = tokio::fs::remove_file(&output_path).await;
                return Err(fail(format!(
                    "transcode timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let _ = tokio::fs::remove_file(&output_path).await;
            return Err(fail(format!("ffmpeg failed: {}", stderr)));
        }

        let metadata = tokio::fs::metadata(&output_path)
            .await
            .map_err(|e| fail(format!("missing transcode output: {}", e)))?;

        tracing::debug!(
            variant = %spec.name,
            size_bytes = metadata.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Transcode complete"
        );

        Ok(TranscodedVariant {
            path: output_path,
            file_size: metadata.len() as i64,
            format: "mp4".to_string(),
        })
    }
}
