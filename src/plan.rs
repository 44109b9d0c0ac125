//! Readiness predicates and the derived edit plan.
//!
//! Everything here is a pure function of the template, the clip registry and the trim ledger;
//! nothing is cached, so callers recompute after every mutation.

use crate::{
    catalog::model::Slot,
    foundation::core::{ClipDuration, ClipId, TimeRange},
    foundation::error::{SlotreelError, SlotreelResult},
    registry::{Clip, ClipRegistry},
    trim::TrimLedger,
};

/// Overage allowed before a trim counts as too long (matches one decimal of display rounding).
pub const DEFAULT_TRIM_TOLERANCE_SEC: f64 = 0.1;

/// Advisory fit of a chosen trim against its slot.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct TrimValidity {
    pub ok: bool,
    pub overage_sec: f64,
}

/// `true` when every slot has a clip.
pub fn slots_filled(registry: &ClipRegistry) -> bool {
    let n = registry.slot_count();
    n > 0 && registry.len() >= n && (0..n).all(|i| registry.clip_at_slot(i).is_some())
}

/// `true` when the clip is (or may be) longer than its slot.
pub fn needs_trim(clip: &Clip, slot: &Slot) -> bool {
    !clip.duration().fits_within(slot.target_duration_sec)
}

pub fn is_clip_ready(ledger: &TrimLedger, clip: &Clip, slot: &Slot) -> bool {
    !needs_trim(clip, slot) || ledger.has(clip.id())
}

/// Slots filled and every bound clip either fits or has a trim. Trim tightness is not checked.
pub fn all_ready(registry: &ClipRegistry, ledger: &TrimLedger) -> bool {
    slots_filled(registry)
        && registry
            .bound_pairs()
            .all(|(slot, clip)| is_clip_ready(ledger, clip, slot))
}

/// `None` when the clip has no stored trim.
pub fn trim_validity(
    ledger: &TrimLedger,
    clip: &Clip,
    slot: &Slot,
    tolerance_sec: f64,
) -> Option<TrimValidity> {
    let range = ledger.get(clip.id())?;
    let overage_sec = (range.selected_sec() - slot.target_duration_sec).max(0.0);
    Some(TrimValidity {
        ok: overage_sec <= tolerance_sec,
        overage_sec,
    })
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PlanClip {
    pub clip_id: ClipId,
    pub source: String,
    pub preview_uri: String,
    pub duration: ClipDuration,
    pub needs_trim: bool,
    /// Explicit or implied span; `None` while a needed trim is missing.
    pub effective_range: Option<TimeRange>,
    pub validity: Option<TrimValidity>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PlanEntry {
    pub slot_index: usize,
    pub slot_id: String,
    pub slot_label: String,
    pub target_duration_sec: f64,
    pub clip: Option<PlanClip>,
}

impl PlanEntry {
    /// Has a clip whose trim exists where needed.
    pub fn is_ready(&self) -> bool {
        self.clip
            .as_ref()
            .is_some_and(|c| c.effective_range.is_some())
    }

    /// Ready, and any explicit trim fits within tolerance.
    pub fn is_complete(&self) -> bool {
        self.clip.as_ref().is_some_and(|c| {
            c.effective_range.is_some() && c.validity.is_none_or(|v| v.ok)
        })
    }
}

/// Slot-ordered resolution of the current wizard state.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct EditPlan {
    pub template_id: String,
    pub template_name: String,
    pub bgm: String,
    pub entries: Vec<PlanEntry>,
}

impl EditPlan {
    pub fn build(
        registry: &ClipRegistry,
        ledger: &TrimLedger,
        tolerance_sec: f64,
    ) -> SlotreelResult<Self> {
        let template = registry
            .template()
            .ok_or_else(|| SlotreelError::stage("no template selected"))?;

        let entries = template
            .slots
            .iter()
            .enumerate()
            .map(|(slot_index, slot)| PlanEntry {
                slot_index,
                slot_id: slot.id.clone(),
                slot_label: slot.label.clone(),
                target_duration_sec: slot.target_duration_sec,
                clip: registry.clip_at_slot(slot_index).map(|clip| PlanClip {
                    clip_id: clip.id().clone(),
                    source: clip.media().source.clone(),
                    preview_uri: clip.preview().uri().to_string(),
                    duration: clip.duration(),
                    needs_trim: needs_trim(clip, slot),
                    effective_range: ledger.effective_range(clip, slot),
                    validity: trim_validity(ledger, clip, slot, tolerance_sec),
                }),
            })
            .collect();

        Ok(Self {
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            bgm: template.bgm.clone(),
            entries,
        })
    }

    pub fn slots_filled(&self) -> bool {
        self.entries.iter().all(|e| e.clip.is_some())
    }

    /// Presence-only readiness: same answer as [`all_ready`].
    pub fn is_ready(&self) -> bool {
        self.entries.iter().all(PlanEntry::is_ready)
    }

    /// Every slot filled and every trim within tolerance.
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(PlanEntry::is_complete)
    }

    /// Sum of effective span lengths of the filled entries.
    pub fn planned_duration_sec(&self) -> f64 {
        self.entries
            .iter()
            .filter_map(|e| e.clip.as_ref()?.effective_range)
            .map(TimeRange::len_sec)
            .sum()
    }
}

#[cfg(test)]
#[path = "../tests/unit/plan.rs"]
mod tests;
