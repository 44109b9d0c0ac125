use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::{
    foundation::core::ClipDuration,
    foundation::error::{SlotreelError, SlotreelResult},
    media::blob::MediaBlob,
};

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum ProbeError {
    #[error("media probing is unavailable: {0}")]
    Unavailable(String),

    #[error("probe failed for '{source_ref}': {reason}")]
    Failed { source_ref: String, reason: String },

    #[error("no duration reported for '{0}'")]
    NoDuration(String),
}

/// Capability that resolves the playable duration of a media blob.
///
/// Implementations report failure through `Err` and must not panic. One call resolves exactly
/// once; calls for different blobs may run concurrently.
pub trait MediaProbe: Sync {
    fn probe_duration(&self, blob: &MediaBlob) -> Result<f64, ProbeError>;
}

/// Probe every blob concurrently and join, preserving input order.
///
/// A failure degrades that entry to [`ClipDuration::Unknown`] and never affects its neighbours.
pub fn probe_all(
    probe: &dyn MediaProbe,
    files: &[MediaBlob],
    threads: Option<usize>,
) -> SlotreelResult<Vec<ClipDuration>> {
    let run = || {
        files
            .par_iter()
            .map(|blob| match probe.probe_duration(blob) {
                Ok(sec) => ClipDuration::from_probe(sec),
                Err(e) => {
                    tracing::warn!(file = %blob.file_name, error = %e, "duration probe failed");
                    ClipDuration::Unknown
                }
            })
            .collect::<Vec<_>>()
    };

    match threads {
        None => Ok(run()),
        Some(n) => Ok(build_thread_pool(n)?.install(run)),
    }
}

fn build_thread_pool(threads: usize) -> SlotreelResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(SlotreelError::validation(
            "probe_threads must be >= 1 when set",
        ));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| SlotreelError::validation(format!("failed to build probe thread pool: {e}")))
}

/// Table-driven probe keyed by `MediaBlob::source`, for tests and dry runs.
#[derive(Clone, Debug, Default)]
pub struct FixedProbe {
    durations: BTreeMap<String, f64>,
}

impl FixedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl Into<String>, duration_sec: f64) -> Self {
        self.durations.insert(source.into(), duration_sec);
        self
    }

    pub fn insert(&mut self, source: impl Into<String>, duration_sec: f64) {
        self.durations.insert(source.into(), duration_sec);
    }
}

impl MediaProbe for FixedProbe {
    fn probe_duration(&self, blob: &MediaBlob) -> Result<f64, ProbeError> {
        self.durations
            .get(&blob.source)
            .copied()
            .ok_or_else(|| ProbeError::Failed {
                source_ref: blob.source.clone(),
                reason: "no fixed duration registered".to_string(),
            })
    }
}

/// Probe backed by the `ffprobe` executable; `MediaBlob::source` must be a local path.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfprobeProbe;

#[cfg(feature = "media-ffmpeg")]
impl MediaProbe for FfprobeProbe {
    fn probe_duration(&self, blob: &MediaBlob) -> Result<f64, ProbeError> {
        #[derive(serde::Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            duration: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeOut {
            #[serde(default)]
            streams: Vec<ProbeStream>,
            format: Option<ProbeFormat>,
        }

        let failed = |reason: String| ProbeError::Failed {
            source_ref: blob.source.clone(),
            reason,
        };

        let out = std::process::Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(&blob.source)
            .output()
            .map_err(|e| ProbeError::Unavailable(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(failed(
                String::from_utf8_lossy(&out.stderr).trim().to_string(),
            ));
        }

        let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
            .map_err(|e| failed(format!("ffprobe json parse failed: {e}")))?;

        let from_format = parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|d| *d > 0.0);
        // Some containers only carry the duration on the video stream.
        let from_stream = || {
            parsed
                .streams
                .iter()
                .filter(|s| s.codec_type.as_deref() == Some("video"))
                .filter_map(|s| s.duration.as_deref()?.parse::<f64>().ok())
                .find(|d| *d > 0.0)
        };

        from_format
            .or_else(from_stream)
            .ok_or_else(|| ProbeError::NoDuration(blob.source.clone()))
    }
}

#[cfg(not(feature = "media-ffmpeg"))]
impl MediaProbe for FfprobeProbe {
    fn probe_duration(&self, _blob: &MediaBlob) -> Result<f64, ProbeError> {
        Err(ProbeError::Unavailable(
            "duration probing requires the 'media-ffmpeg' feature".to_string(),
        ))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/probe.rs"]
mod tests;
