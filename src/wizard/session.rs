use std::{fmt, sync::Arc};

use crate::{
    catalog::{
        model::{Niche, Template},
        store::TemplateCatalog,
    },
    foundation::core::{ClipDuration, ClipId, TimeRange},
    foundation::error::{SlotreelError, SlotreelResult},
    media::{
        blob::MediaBlob,
        preview::PreviewPool,
        probe::{MediaProbe, ProbeError},
    },
    plan::{self, EditPlan, TrimValidity},
    registry::{BatchOutcome, Clip, ClipRegistry, PendingBatch, ProbeApplied, ProbeTicket},
    render::{RenderArtifact, RenderRequest, Renderer},
    trim::{self, TrimLedger, TrimMode, TrimRange},
    wizard::{
        config::WizardConfig,
        persist::{Snapshot, restorable_stage},
        stage::Stage,
    },
};

pub type SharedCatalog = Arc<dyn TemplateCatalog + Send + Sync>;

/// Derived predicates returned by every mutating session call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Readiness {
    pub stage: Stage,
    pub slots_filled: bool,
    pub all_ready: bool,
    pub can_advance: bool,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct BatchReport {
    /// Empty when the batch went stale while probing.
    pub added: Vec<ClipId>,
    pub readiness: Readiness,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub enum RenderState {
    #[default]
    Idle,
    Done(RenderArtifact),
    Failed(String),
}

/// One user's pass through the wizard: niche → template → upload → trim → render.
///
/// The session is the only writer of its clip registry and trim ledger; every mutation goes
/// through a method here so stage rules and cascades are applied in one place.
pub struct WizardSession {
    config: WizardConfig,
    catalog: SharedCatalog,
    stage: Stage,
    niche: Option<String>,
    registry: ClipRegistry,
    ledger: TrimLedger,
    render: RenderState,
}

impl fmt::Debug for WizardSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardSession")
            .field("stage", &self.stage)
            .field("niche", &self.niche)
            .field("template", &self.registry.template().map(|t| &t.id))
            .field("clips", &self.registry.len())
            .field("trims", &self.ledger.len())
            .field("render", &self.render)
            .finish_non_exhaustive()
    }
}

impl WizardSession {
    pub fn new(catalog: SharedCatalog, config: WizardConfig) -> SlotreelResult<Self> {
        Self::with_preview_pool(catalog, config, PreviewPool::new())
    }

    pub fn with_preview_pool(
        catalog: SharedCatalog,
        config: WizardConfig,
        previews: PreviewPool,
    ) -> SlotreelResult<Self> {
        config.validate()?;
        let registry = ClipRegistry::new(config.registry_opts(), previews);
        Ok(Self {
            config,
            catalog,
            stage: Stage::NicheSelect,
            niche: None,
            registry,
            ledger: TrimLedger::new(),
            render: RenderState::Idle,
        })
    }

    /// Rebuild a session from persisted state. Trims are dropped with the clips they referred
    /// to, and the stage is lowered to what an empty registry allows.
    ///
    /// Selections are re-resolved through the catalog: a niche or template that no longer
    /// exists, or a template that no longer belongs to the persisted niche, is discarded.
    pub fn restore(
        catalog: SharedCatalog,
        config: WizardConfig,
        snapshot: Snapshot,
    ) -> SlotreelResult<Self> {
        let mut session = Self::new(catalog, config)?;

        let niche = snapshot.selected_niche_id.filter(|id| {
            let known = session.catalog.niche(id).is_some();
            if !known {
                tracing::warn!(niche = %id, "persisted niche is not in the catalog");
            }
            known
        });
        let template = snapshot.selected_template.and_then(|persisted| {
            match session.catalog.template(&persisted.id) {
                Some(current) if niche.as_deref().is_none_or(|n| n == current.niche) => {
                    if current != persisted {
                        tracing::debug!(template = %current.id, "catalog template changed since save");
                    }
                    Some(current)
                }
                _ => {
                    tracing::warn!(
                        template = %persisted.id,
                        "persisted template is missing from the catalog or belongs to another niche"
                    );
                    None
                }
            }
        });

        if let Some(template) = template {
            template.validate()?;
            session.niche = niche.or_else(|| Some(template.niche.clone()));
            session.registry.set_template(Some(template));
        } else {
            session.niche = niche;
        }

        if !snapshot.trim_ranges.is_empty() {
            tracing::warn!(
                trims = snapshot.trim_ranges.len(),
                "dropping persisted trims: their clips did not survive the reload"
            );
        }

        let stage = restorable_stage(
            snapshot.current_step,
            session.niche.is_some(),
            session.registry.template().is_some(),
        );
        if stage != snapshot.current_step {
            tracing::warn!(
                persisted = %snapshot.current_step,
                resumed = %stage,
                "persisted stage is not reachable without clips"
            );
        }
        session.stage = stage;
        Ok(session)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            current_step: self.stage,
            selected_niche_id: self.niche.clone(),
            selected_template: self.registry.template().cloned(),
            trim_ranges: self.ledger.ranges().cloned().collect(),
        }
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn selected_niche(&self) -> Option<&str> {
        self.niche.as_deref()
    }

    pub fn template(&self) -> Option<&Template> {
        self.registry.template()
    }

    pub fn registry(&self) -> &ClipRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &TrimLedger {
        &self.ledger
    }

    pub fn clips(&self) -> &[Clip] {
        self.registry.clips()
    }

    pub fn previews(&self) -> &PreviewPool {
        self.registry.previews()
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render
    }

    pub fn niches(&self) -> Vec<Niche> {
        self.catalog.niches()
    }

    /// Templates of the selected niche.
    pub fn templates(&self) -> Vec<Template> {
        self.niche
            .as_deref()
            .map(|n| self.catalog.templates(n))
            .unwrap_or_default()
    }

    pub fn slots_filled(&self) -> bool {
        plan::slots_filled(&self.registry)
    }

    pub fn all_ready(&self) -> bool {
        plan::all_ready(&self.registry, &self.ledger)
    }

    pub fn readiness(&self) -> Readiness {
        Readiness {
            stage: self.stage,
            slots_filled: self.slots_filled(),
            all_ready: self.all_ready(),
            can_advance: self.blocker().is_none(),
        }
    }

    pub fn edit_plan(&self) -> SlotreelResult<EditPlan> {
        EditPlan::build(&self.registry, &self.ledger, self.config.trim_tolerance_sec)
    }

    /// Why `advance` would fail right now, or `None` if it would succeed.
    fn blocker(&self) -> Option<&'static str> {
        match self.stage {
            Stage::NicheSelect if self.niche.is_none() => Some("no niche selected"),
            Stage::TemplateSelect if self.registry.template().is_none() => {
                Some("no template selected")
            }
            Stage::Upload if !self.slots_filled() => Some("not every slot has a clip"),
            Stage::Trim if !self.all_ready() => Some("some clips still need a trim"),
            Stage::Trim
                if self.config.enforce_trim_fit
                    && !self.edit_plan().is_ok_and(|p| p.is_complete()) =>
            {
                Some("some trims run past their slot")
            }
            Stage::Render => Some("render is the last stage"),
            _ => None,
        }
    }

    #[tracing::instrument(skip(self), fields(from = %self.stage))]
    pub fn advance(&mut self) -> SlotreelResult<Readiness> {
        if let Some(reason) = self.blocker() {
            return Err(SlotreelError::stage(format!(
                "cannot advance from {}: {reason}",
                self.stage
            )));
        }
        if let Some(next) = self.stage.next() {
            self.stage = next;
            tracing::info!(to = %next, "stage advanced");
        }
        Ok(self.readiness())
    }

    /// Step back one stage. Always allowed; a no-op on the first stage.
    pub fn back(&mut self) -> Readiness {
        if let Some(prev) = self.stage.prev() {
            self.enter(prev);
        }
        self.readiness()
    }

    /// Jump back to any earlier stage, or forward by exactly one.
    pub fn go_to(&mut self, target: Stage) -> SlotreelResult<Readiness> {
        if target <= self.stage {
            self.enter(target);
            return Ok(self.readiness());
        }
        if Some(target) == self.stage.next() {
            return self.advance();
        }
        Err(SlotreelError::stage(format!(
            "cannot skip from {} to {target}",
            self.stage
        )))
    }

    fn enter(&mut self, stage: Stage) {
        if self.stage == Stage::Render && stage != Stage::Render {
            self.render = RenderState::Idle;
        }
        tracing::debug!(from = %self.stage, to = %stage, "stage changed");
        self.stage = stage;
    }

    /// Back to a fresh session.
    pub fn reset(&mut self) -> Readiness {
        self.clear_downstream_of_niche();
        self.niche = None;
        self.stage = Stage::NicheSelect;
        self.readiness()
    }

    fn clear_downstream_of_niche(&mut self) {
        self.registry.set_template(None);
        self.ledger.clear();
        self.render = RenderState::Idle;
    }

    /// Pick a niche. Choosing a different one discards the template, clips and trims.
    #[tracing::instrument(skip(self))]
    pub fn select_niche(&mut self, niche_id: &str) -> SlotreelResult<Readiness> {
        if self.catalog.niche(niche_id).is_none() {
            return Err(SlotreelError::validation(format!(
                "unknown niche '{niche_id}'"
            )));
        }
        if self.niche.as_deref() != Some(niche_id) {
            self.clear_downstream_of_niche();
            self.niche = Some(niche_id.to_string());
        }
        self.enter(Stage::TemplateSelect);
        Ok(self.readiness())
    }

    /// Pick a template of the selected niche. Choosing a different one discards clips and trims.
    #[tracing::instrument(skip(self))]
    pub fn select_template(&mut self, template_id: &str) -> SlotreelResult<Readiness> {
        let niche = self
            .niche
            .as_deref()
            .ok_or_else(|| SlotreelError::stage("select a niche before a template"))?;
        let template = self.catalog.template(template_id).ok_or_else(|| {
            SlotreelError::validation(format!("unknown template '{template_id}'"))
        })?;
        if template.niche != niche {
            return Err(SlotreelError::validation(format!(
                "template '{template_id}' belongs to niche '{}', not '{niche}'",
                template.niche
            )));
        }
        template.validate()?;

        if self.registry.template().map(|t| t.id.as_str()) != Some(template_id) {
            self.registry.set_template(Some(template));
            self.ledger.clear();
            self.render = RenderState::Idle;
        }
        self.enter(Stage::Upload);
        Ok(self.readiness())
    }

    fn guard_edit(&self) -> SlotreelResult<()> {
        if self.stage == Stage::Render {
            return Err(SlotreelError::stage(
                "clips and trims are frozen in the render stage; go back to edit",
            ));
        }
        if self.registry.template().is_none() {
            return Err(SlotreelError::stage("no template selected"));
        }
        Ok(())
    }

    /// Upload a batch: validate, probe every file concurrently, then bind all at once.
    pub fn add_clips(
        &mut self,
        files: Vec<MediaBlob>,
        probe: &dyn MediaProbe,
    ) -> SlotreelResult<BatchReport> {
        self.guard_edit()?;
        let added = self.registry.add_clips(files, probe)?;
        Ok(BatchReport {
            added,
            readiness: self.readiness(),
        })
    }

    /// First half of an upload whose probing happens elsewhere.
    pub fn begin_batch(&mut self, files: Vec<MediaBlob>) -> SlotreelResult<PendingBatch> {
        self.guard_edit()?;
        self.registry.begin_batch(files)
    }

    /// Second half of [`begin_batch`](Self::begin_batch). A batch that outlived a reset or a
    /// template change is dropped without error.
    pub fn commit_batch(
        &mut self,
        pending: PendingBatch,
        durations: Vec<ClipDuration>,
    ) -> SlotreelResult<BatchReport> {
        let added = match self.registry.commit_batch(pending, durations)? {
            BatchOutcome::Committed(ids) => ids,
            BatchOutcome::Stale => Vec::new(),
        };
        Ok(BatchReport {
            added,
            readiness: self.readiness(),
        })
    }

    pub fn cancel_batch(&mut self, pending: PendingBatch) -> Readiness {
        self.registry.cancel_batch(pending);
        self.readiness()
    }

    /// Remove a clip together with its trim.
    pub fn remove_clip(&mut self, clip_id: &ClipId) -> SlotreelResult<Readiness> {
        self.guard_edit()?;
        self.registry.remove_clip(clip_id)?;
        self.ledger.drop_trim(clip_id);
        Ok(self.readiness())
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> SlotreelResult<Readiness> {
        self.guard_edit()?;
        self.registry.reorder(from, to)?;
        Ok(self.readiness())
    }

    /// Probe one clip again, e.g. after its duration came back unknown.
    pub fn reprobe(
        &mut self,
        clip_id: &ClipId,
        probe: &dyn MediaProbe,
    ) -> SlotreelResult<Readiness> {
        self.guard_edit()?;
        let ticket = self.registry.begin_reprobe(clip_id)?;
        let result = match self.registry.clip(clip_id) {
            Some(clip) => probe.probe_duration(clip.media()),
            None => return Ok(self.readiness()),
        };
        if let ProbeApplied::Updated(_) = self.registry.apply_probe(ticket, result) {
            self.refit_trim(clip_id);
        }
        Ok(self.readiness())
    }

    pub fn begin_reprobe(&self, clip_id: &ClipId) -> SlotreelResult<ProbeTicket> {
        self.registry.begin_reprobe(clip_id)
    }

    /// Apply a re-probe that completed out of band. Stale results are ignored.
    pub fn apply_probe(
        &mut self,
        ticket: ProbeTicket,
        result: Result<f64, ProbeError>,
    ) -> (ProbeApplied, Readiness) {
        let clip_id = ticket.clip_id().clone();
        let applied = self.registry.apply_probe(ticket, result);
        if let ProbeApplied::Updated(_) = applied {
            self.refit_trim(&clip_id);
        }
        (applied, self.readiness())
    }

    /// Keep a stored trim inside its clip once the clip's duration becomes known: the out point
    /// is clamped to the new end, and a trim left shorter than `min_trim_sec` is dropped.
    fn refit_trim(&mut self, clip_id: &ClipId) {
        let Some(ClipDuration::Known(d)) = self.registry.clip(clip_id).map(Clip::duration) else {
            return;
        };
        let Some(range) = self.ledger.get(clip_id) else {
            return;
        };
        if range.end_sec <= d {
            return;
        }
        let (start_sec, end_sec) = (range.start_sec, range.end_sec);
        if start_sec >= d || d - start_sec < self.config.min_trim_sec {
            self.ledger.drop_trim(clip_id);
            tracing::debug!(clip = %clip_id, duration = d, start_sec, "dropped trim past the clip end");
        } else {
            self.ledger.upsert(clip_id.clone(), start_sec, d);
            tracing::debug!(clip = %clip_id, from = end_sec, to = d, "clamped trim to the clip end");
        }
    }

    /// Set both trim points of a clip (dual-ended trimmer).
    ///
    /// Besides `0 <= start < end <= duration`, the span must be at least
    /// [`WizardConfig::min_trim_sec`] long (0.5 s by default, the trimmer's smallest handle
    /// gap); set it to `0.0` to accept any non-empty span. A trim addressed to a clip that no
    /// longer exists is ignored.
    pub fn upsert_trim(
        &mut self,
        clip_id: &ClipId,
        start_sec: f64,
        end_sec: f64,
    ) -> SlotreelResult<Readiness> {
        self.guard_edit()?;
        if self.config.trim_mode != TrimMode::DualEnded {
            return Err(SlotreelError::validation(
                "both trim points were given but trim_mode is single_ended",
            ));
        }
        let Some(clip) = self.registry.clip(clip_id) else {
            tracing::debug!(clip = %clip_id, "ignoring trim for removed clip");
            return Ok(self.readiness());
        };
        let range = self.check_trim(clip, start_sec, end_sec)?;
        self.ledger
            .upsert(clip_id.clone(), range.start_sec, range.end_sec);
        Ok(self.readiness())
    }

    /// Set the in point of a clip; the out point follows the slot length (single-ended trimmer).
    pub fn trim_from(&mut self, clip_id: &ClipId, start_sec: f64) -> SlotreelResult<Readiness> {
        self.guard_edit()?;
        if self.config.trim_mode != TrimMode::SingleEnded {
            return Err(SlotreelError::validation(
                "only an in point was given but trim_mode is dual_ended",
            ));
        }
        let Some(clip) = self.registry.clip(clip_id) else {
            tracing::debug!(clip = %clip_id, "ignoring trim for removed clip");
            return Ok(self.readiness());
        };
        let slot = self.registry.slot_for(clip).ok_or_else(|| {
            SlotreelError::validation(format!("clip '{clip_id}' is not bound to a slot"))
        })?;
        let range = trim::single_ended_range(start_sec, clip, slot)?;
        let range = self.check_trim(clip, range.start_sec, range.end_sec)?;
        self.ledger
            .upsert(clip_id.clone(), range.start_sec, range.end_sec);
        Ok(self.readiness())
    }

    fn check_trim(&self, clip: &Clip, start_sec: f64, end_sec: f64) -> SlotreelResult<TimeRange> {
        let range = TimeRange::new(start_sec, end_sec)?;
        if let ClipDuration::Known(d) = clip.duration()
            && end_sec > d
        {
            return Err(SlotreelError::validation(format!(
                "trim end {end_sec:.1}s is past the end of clip '{}' ({d:.1}s)",
                clip.id()
            )));
        }
        if range.len_sec() < self.config.min_trim_sec {
            return Err(SlotreelError::validation(format!(
                "trim of {:.2}s is shorter than the {:.2}s minimum",
                range.len_sec(),
                self.config.min_trim_sec
            )));
        }
        Ok(range)
    }

    /// Seed a default trim for a clip that needs one and has none yet, as a trimmer does when
    /// it first opens. Returns the clip's trim afterwards, if any.
    pub fn ensure_default_trim(&mut self, clip_id: &ClipId) -> SlotreelResult<Option<TrimRange>> {
        self.guard_edit()?;
        let clip = self
            .registry
            .clip(clip_id)
            .ok_or_else(|| SlotreelError::validation(format!("unknown clip '{clip_id}'")))?;
        if !self.ledger.has(clip_id)
            && let Some(slot) = self.registry.slot_for(clip)
            && plan::needs_trim(clip, slot)
            && let Some(range) = trim::suggested_range(clip, slot)
        {
            self.ledger
                .upsert(clip_id.clone(), range.start_sec, range.end_sec);
        }
        Ok(self.ledger.get(clip_id).cloned())
    }

    pub fn suggested_trim(&self, clip_id: &ClipId) -> Option<TimeRange> {
        let clip = self.registry.clip(clip_id)?;
        trim::suggested_range(clip, self.registry.slot_for(clip)?)
    }

    pub fn trim_validity(&self, clip_id: &ClipId) -> Option<TrimValidity> {
        let clip = self.registry.clip(clip_id)?;
        let slot = self.registry.slot_for(clip)?;
        plan::trim_validity(&self.ledger, clip, slot, self.config.trim_tolerance_sec)
    }

    /// Hand the edit plan to `renderer`. Only valid in the render stage.
    #[tracing::instrument(skip(self, renderer))]
    pub fn render(&mut self, renderer: &mut dyn Renderer) -> SlotreelResult<RenderArtifact> {
        if self.stage != Stage::Render {
            return Err(SlotreelError::stage(format!(
                "render requested in the {} stage",
                self.stage
            )));
        }
        let request = RenderRequest::from_plan(&self.edit_plan()?)?;
        match renderer.render(&request) {
            Ok(artifact) => {
                tracing::info!(uri = %artifact.uri, "render finished");
                self.render = RenderState::Done(artifact.clone());
                Ok(artifact)
            }
            Err(e) => {
                tracing::warn!(error = %e, "render failed");
                self.render = RenderState::Failed(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/wizard/session.rs"]
mod tests;
