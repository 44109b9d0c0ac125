use std::path::{Path, PathBuf};

use crate::{
    foundation::core::ClipId,
    foundation::error::{SlotreelError, SlotreelResult},
    plan::EditPlan,
};

/// One clip span placed into one slot, in final playback order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderSegment {
    pub slot_id: String,
    pub clip_id: ClipId,
    pub source: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub target_duration_sec: f64,
    /// Seconds the span runs past the slot target; the renderer decides whether to clamp.
    pub overage_sec: f64,
}

/// Everything an external renderer needs to produce the final video.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderRequest {
    pub template_id: String,
    pub template_name: String,
    pub bgm: String,
    pub segments: Vec<RenderSegment>,
}

impl RenderRequest {
    /// Fails if any slot is empty or still lacks a needed trim.
    pub fn from_plan(plan: &EditPlan) -> SlotreelResult<Self> {
        let segments = plan
            .entries
            .iter()
            .map(|entry| {
                let clip = entry.clip.as_ref().ok_or_else(|| {
                    SlotreelError::validation(format!("slot '{}' has no clip", entry.slot_id))
                })?;
                let range = clip.effective_range.ok_or_else(|| {
                    SlotreelError::validation(format!(
                        "clip '{}' in slot '{}' needs a trim",
                        clip.clip_id, entry.slot_id
                    ))
                })?;
                Ok(RenderSegment {
                    slot_id: entry.slot_id.clone(),
                    clip_id: clip.clip_id.clone(),
                    source: clip.source.clone(),
                    start_sec: range.start_sec,
                    end_sec: range.end_sec,
                    target_duration_sec: entry.target_duration_sec,
                    overage_sec: (range.len_sec() - entry.target_duration_sec).max(0.0),
                })
            })
            .collect::<SlotreelResult<Vec<_>>>()?;

        Ok(Self {
            template_id: plan.template_id.clone(),
            template_name: plan.template_name.clone(),
            bgm: plan.bgm.clone(),
            segments,
        })
    }

    pub fn total_duration_sec(&self) -> f64 {
        self.segments.iter().map(|s| s.end_sec - s.start_sec).sum()
    }
}

/// Reference to whatever the renderer produced.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RenderArtifact {
    pub uri: String,
}

/// External collaborator that turns a finished edit plan into media.
pub trait Renderer {
    fn render(&mut self, request: &RenderRequest) -> SlotreelResult<RenderArtifact>;
}

/// Writes the request as a JSON manifest for a downstream render job.
#[derive(Clone, Debug)]
pub struct ManifestRenderer {
    out_path: PathBuf,
    overwrite: bool,
}

impl ManifestRenderer {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
        }
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn out_path(&self) -> &Path {
        &self.out_path
    }
}

impl Renderer for ManifestRenderer {
    fn render(&mut self, request: &RenderRequest) -> SlotreelResult<RenderArtifact> {
        if !self.overwrite && self.out_path.exists() {
            return Err(SlotreelError::render(format!(
                "output '{}' exists and overwrite is disabled",
                self.out_path.display()
            )));
        }
        if let Some(parent) = self.out_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(request)?;
        std::fs::write(&self.out_path, json)?;
        tracing::info!(
            path = %self.out_path.display(),
            segments = request.segments.len(),
            "wrote render manifest"
        );
        Ok(RenderArtifact {
            uri: self.out_path.display().to_string(),
        })
    }
}

/// Captures requests in memory, for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemoryRenderer {
    requests: Vec<RenderRequest>,
    fail_with: Option<String>,
}

impl InMemoryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer that refuses every request with `msg`.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            requests: Vec::new(),
            fail_with: Some(msg.into()),
        }
    }

    pub fn requests(&self) -> &[RenderRequest] {
        &self.requests
    }
}

impl Renderer for InMemoryRenderer {
    fn render(&mut self, request: &RenderRequest) -> SlotreelResult<RenderArtifact> {
        if let Some(msg) = &self.fail_with {
            return Err(SlotreelError::render(msg.clone()));
        }
        self.requests.push(request.clone());
        Ok(RenderArtifact {
            uri: format!("memory://{}/{}", request.template_id, self.requests.len()),
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/render.rs"]
mod tests;
