use crate::{
    catalog::model::{Slot, Template},
    foundation::core::{ClipDuration, ClipId},
    foundation::error::{SlotreelError, SlotreelResult},
    media::{
        blob::{AdmissionPolicy, MediaBlob, UploadRejection},
        preview::{PreviewHandle, PreviewPool},
        probe::{MediaProbe, ProbeError, probe_all},
    },
};

/// Upload behaviour of a [`ClipRegistry`].
#[derive(Clone, Debug)]
pub struct RegistryOpts {
    pub admission: AdmissionPolicy,
    /// `Some(1)` gives the one-file-at-a-time upload flow.
    pub max_files_per_batch: Option<usize>,
    pub allow_reorder: bool,
    /// Worker count for batch probing; `None` uses rayon's global pool.
    pub probe_threads: Option<usize>,
}

impl Default for RegistryOpts {
    fn default() -> Self {
        Self {
            admission: AdmissionPolicy::default(),
            max_files_per_batch: None,
            allow_reorder: true,
            probe_threads: None,
        }
    }
}

/// An uploaded clip bound to one template slot.
#[derive(Debug)]
pub struct Clip {
    id: ClipId,
    media: MediaBlob,
    preview: PreviewHandle,
    duration: ClipDuration,
    bound_slot_id: String,
}

impl Clip {
    pub fn id(&self) -> &ClipId {
        &self.id
    }

    pub fn media(&self) -> &MediaBlob {
        &self.media
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    pub fn duration(&self) -> ClipDuration {
        self.duration
    }

    /// Duration in seconds, `0.0` when the probe failed.
    pub fn duration_sec(&self) -> f64 {
        self.duration.as_secs_or_zero()
    }

    pub fn bound_slot_id(&self) -> &str {
        &self.bound_slot_id
    }
}

/// Capacity reserved by [`ClipRegistry::begin_batch`], redeemed by `commit_batch`.
#[must_use = "a pending batch holds slot capacity until committed or cancelled"]
#[derive(Debug)]
pub struct PendingBatch {
    epoch: u64,
    files: Vec<MediaBlob>,
}

impl PendingBatch {
    pub fn files(&self) -> &[MediaBlob] {
        &self.files
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BatchOutcome {
    Committed(Vec<ClipId>),
    /// The registry was reset while the batch was probing; nothing was applied.
    Stale,
}

/// Identifies an outstanding re-probe of one clip.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeTicket {
    clip_id: ClipId,
    epoch: u64,
}

impl ProbeTicket {
    pub fn clip_id(&self) -> &ClipId {
        &self.clip_id
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProbeApplied {
    Updated(ClipDuration),
    Stale,
}

/// Ordered clips bound to the slots of the selected template.
///
/// Clips are kept sorted by slot position. Removing a clip leaves its slot empty; the next
/// upload fills the lowest empty slot. Every reset bumps the epoch so completions issued
/// before it can be recognised and dropped.
#[derive(Debug)]
pub struct ClipRegistry {
    opts: RegistryOpts,
    previews: PreviewPool,
    template: Option<Template>,
    clips: Vec<Clip>,
    reserved: usize,
    epoch: u64,
    next_clip: u64,
}

impl ClipRegistry {
    pub fn new(opts: RegistryOpts, previews: PreviewPool) -> Self {
        Self {
            opts,
            previews,
            template: None,
            clips: Vec::new(),
            reserved: 0,
            epoch: 0,
            next_clip: 1,
        }
    }

    pub fn opts(&self) -> &RegistryOpts {
        &self.opts
    }

    pub fn previews(&self) -> &PreviewPool {
        &self.previews
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    /// Drop every clip and bind to `template` (or to nothing).
    pub fn set_template(&mut self, template: Option<Template>) {
        self.reset();
        self.template = template;
    }

    /// Drop every clip, releasing previews, and invalidate in-flight batches and probes.
    pub fn reset(&mut self) {
        let dropped = self.clips.len();
        self.clips.clear();
        self.reserved = 0;
        self.epoch += 1;
        tracing::debug!(dropped, epoch = self.epoch, "clip registry reset");
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Clips in slot order.
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn clip(&self, clip_id: &ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| &c.id == clip_id)
    }

    pub fn contains(&self, clip_id: &ClipId) -> bool {
        self.clip(clip_id).is_some()
    }

    pub fn slot_count(&self) -> usize {
        self.template.as_ref().map_or(0, Template::slot_count)
    }

    /// Slots not yet bound and not reserved by an in-flight batch.
    pub fn remaining_capacity(&self) -> usize {
        self.slot_count()
            .saturating_sub(self.clips.len())
            .saturating_sub(self.reserved)
    }

    /// The clip bound to slot `slot_idx`, if any.
    pub fn clip_at_slot(&self, slot_idx: usize) -> Option<&Clip> {
        let slot = self.template.as_ref()?.slot(slot_idx)?;
        self.clips.iter().find(|c| c.bound_slot_id == slot.id)
    }

    /// The slot `clip` is bound to.
    pub fn slot_for(&self, clip: &Clip) -> Option<&Slot> {
        let template = self.template.as_ref()?;
        template.slots.iter().find(|s| s.id == clip.bound_slot_id)
    }

    /// Every bound `(slot, clip)` pair in slot order.
    pub fn bound_pairs(&self) -> impl Iterator<Item = (&Slot, &Clip)> {
        self.clips
            .iter()
            .filter_map(|c| self.slot_for(c).map(|s| (s, c)))
    }

    fn require_template(&self) -> SlotreelResult<&Template> {
        self.template
            .as_ref()
            .ok_or_else(|| SlotreelError::stage("no template selected"))
    }

    /// Validate a batch and reserve capacity for it.
    ///
    /// Nothing becomes visible until [`commit_batch`](Self::commit_batch).
    pub fn begin_batch(&mut self, files: Vec<MediaBlob>) -> SlotreelResult<PendingBatch> {
        self.require_template()?;

        let remaining = self.remaining_capacity();
        if files.len() > remaining {
            return Err(UploadRejection::TooManySlots {
                requested: files.len(),
                remaining,
            }
            .into());
        }
        if let Some(limit) = self.opts.max_files_per_batch
            && files.len() > limit
        {
            return Err(UploadRejection::TooManyFiles {
                requested: files.len(),
                limit,
            }
            .into());
        }
        self.opts.admission.check_all(&files)?;

        self.reserved += files.len();
        tracing::debug!(
            files = files.len(),
            reserved = self.reserved,
            epoch = self.epoch,
            "upload batch accepted"
        );
        Ok(PendingBatch {
            epoch: self.epoch,
            files,
        })
    }

    /// Release the capacity held by `pending` without adding anything.
    pub fn cancel_batch(&mut self, pending: PendingBatch) {
        if pending.epoch == self.epoch {
            self.reserved = self.reserved.saturating_sub(pending.files.len());
        }
    }

    /// Make a probed batch visible. `durations` pairs with `pending.files()` by index.
    pub fn commit_batch(
        &mut self,
        pending: PendingBatch,
        durations: Vec<ClipDuration>,
    ) -> SlotreelResult<BatchOutcome> {
        if pending.epoch != self.epoch {
            tracing::debug!(
                batch_epoch = pending.epoch,
                epoch = self.epoch,
                "discarding stale upload batch"
            );
            return Ok(BatchOutcome::Stale);
        }
        self.reserved = self.reserved.saturating_sub(pending.files.len());
        if durations.len() != pending.files.len() {
            return Err(SlotreelError::validation(format!(
                "batch has {} file(s) but {} probe result(s)",
                pending.files.len(),
                durations.len()
            )));
        }

        let mut added = Vec::with_capacity(pending.files.len());
        for (media, duration) in pending.files.into_iter().zip(durations) {
            let Some(slot_idx) = self.first_free_slot() else {
                // Capacity was reserved in begin_batch; reaching this means slots vanished.
                return Err(SlotreelError::validation("no free slot left for upload"));
            };
            let id = self.mint_clip_id();
            let clip = self.bind_new_clip(id.clone(), media, duration, slot_idx)?;
            tracing::debug!(clip = %clip.id, slot = %clip.bound_slot_id, ?duration, "clip added");
            let pos = self
                .clips
                .iter()
                .position(|c| self.slot_index_of(c) > Some(slot_idx))
                .unwrap_or(self.clips.len());
            self.clips.insert(pos, clip);
            added.push(id);
        }
        Ok(BatchOutcome::Committed(added))
    }

    /// Validate, probe concurrently, then commit: the one-call upload path.
    #[tracing::instrument(skip(self, files, probe), fields(files = files.len()))]
    pub fn add_clips(
        &mut self,
        files: Vec<MediaBlob>,
        probe: &dyn MediaProbe,
    ) -> SlotreelResult<Vec<ClipId>> {
        let pending = self.begin_batch(files)?;
        let durations = match probe_all(probe, pending.files(), self.opts.probe_threads) {
            Ok(d) => d,
            Err(e) => {
                self.cancel_batch(pending);
                return Err(e);
            }
        };
        match self.commit_batch(pending, durations)? {
            BatchOutcome::Committed(ids) => Ok(ids),
            BatchOutcome::Stale => Ok(Vec::new()),
        }
    }

    /// Remove a clip and release its preview. Other clips keep their slots.
    pub fn remove_clip(&mut self, clip_id: &ClipId) -> SlotreelResult<()> {
        let pos = self
            .clips
            .iter()
            .position(|c| &c.id == clip_id)
            .ok_or_else(|| SlotreelError::validation(format!("unknown clip '{clip_id}'")))?;
        let clip = self.clips.remove(pos);
        tracing::debug!(clip = %clip.id, slot = %clip.bound_slot_id, "clip removed");
        Ok(())
    }

    /// Move the clip at position `from` to position `to`, then rebind every clip to the slot at
    /// its new position.
    pub fn reorder(&mut self, from: usize, to: usize) -> SlotreelResult<()> {
        if !self.opts.allow_reorder {
            return Err(SlotreelError::validation("reordering is disabled"));
        }
        let len = self.clips.len();
        if from >= len || to >= len {
            return Err(SlotreelError::validation(format!(
                "reorder {from} -> {to} out of range for {len} clip(s)"
            )));
        }

        let clip = self.clips.remove(from);
        self.clips.insert(to, clip);
        self.rebind_all()?;
        tracing::debug!(from, to, "clips reordered");
        Ok(())
    }

    /// Start re-probing a clip whose duration should be refreshed.
    pub fn begin_reprobe(&self, clip_id: &ClipId) -> SlotreelResult<ProbeTicket> {
        if !self.contains(clip_id) {
            return Err(SlotreelError::validation(format!("unknown clip '{clip_id}'")));
        }
        Ok(ProbeTicket {
            clip_id: clip_id.clone(),
            epoch: self.epoch,
        })
    }

    /// Apply a re-probe result. Results for clips that are gone are dropped.
    pub fn apply_probe(
        &mut self,
        ticket: ProbeTicket,
        result: Result<f64, ProbeError>,
    ) -> ProbeApplied {
        if ticket.epoch != self.epoch {
            tracing::debug!(clip = %ticket.clip_id, "discarding probe from before reset");
            return ProbeApplied::Stale;
        }
        let Some(clip) = self.clips.iter_mut().find(|c| c.id == ticket.clip_id) else {
            tracing::debug!(clip = %ticket.clip_id, "discarding probe for removed clip");
            return ProbeApplied::Stale;
        };
        clip.duration = match result {
            Ok(sec) => ClipDuration::from_probe(sec),
            Err(e) => {
                tracing::warn!(clip = %clip.id, error = %e, "re-probe failed");
                ClipDuration::Unknown
            }
        };
        ProbeApplied::Updated(clip.duration)
    }

    fn mint_clip_id(&mut self) -> ClipId {
        let id = ClipId(format!("clip-{}", self.next_clip));
        self.next_clip += 1;
        id
    }

    fn bind_new_clip(
        &self,
        id: ClipId,
        media: MediaBlob,
        duration: ClipDuration,
        slot_idx: usize,
    ) -> SlotreelResult<Clip> {
        let slot = self
            .require_template()?
            .slot(slot_idx)
            .ok_or_else(|| SlotreelError::validation(format!("slot index {slot_idx} out of range")))?;
        let preview = self.previews.allocate(&media);
        Ok(Clip {
            id,
            media,
            preview,
            duration,
            bound_slot_id: slot.id.clone(),
        })
    }

    fn slot_index_of(&self, clip: &Clip) -> Option<usize> {
        self.template.as_ref()?.slot_index(&clip.bound_slot_id)
    }

    fn first_free_slot(&self) -> Option<usize> {
        let template = self.template.as_ref()?;
        template
            .slots
            .iter()
            .position(|s| !self.clips.iter().any(|c| c.bound_slot_id == s.id))
    }

    fn rebind_all(&mut self) -> SlotreelResult<()> {
        let template = self
            .template
            .as_ref()
            .ok_or_else(|| SlotreelError::stage("no template selected"))?;
        for (clip, slot) in self.clips.iter_mut().zip(&template.slots) {
            clip.bound_slot_id = slot.id.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/registry.rs"]
mod tests;
