use std::collections::BTreeMap;

use crate::{
    catalog::model::Slot,
    foundation::core::{ClipDuration, ClipId, TimeRange},
    foundation::error::{SlotreelError, SlotreelResult},
    registry::Clip,
};

/// How trims are picked: an in point only (the out point follows the slot length) or both points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimMode {
    SingleEnded,
    #[default]
    DualEnded,
}

/// Selected portion of one clip's native timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrimRange {
    pub clip_id: ClipId,
    pub start_sec: f64,
    pub end_sec: f64,
}

impl TrimRange {
    pub fn new(clip_id: ClipId, range: TimeRange) -> Self {
        Self {
            clip_id,
            start_sec: range.start_sec,
            end_sec: range.end_sec,
        }
    }

    pub fn range(&self) -> TimeRange {
        TimeRange {
            start_sec: self.start_sec,
            end_sec: self.end_sec,
        }
    }

    pub fn selected_sec(&self) -> f64 {
        self.end_sec - self.start_sec
    }
}

/// At most one trim range per clip. Ranges are independent of each other.
///
/// Bounds are the caller's responsibility (`0 <= start < end <= clip duration`); the ledger
/// stores what it is given.
#[derive(Clone, Debug, Default)]
pub struct TrimLedger {
    ranges: BTreeMap<ClipId, TrimRange>,
}

impl TrimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the range for `clip_id`.
    pub fn upsert(&mut self, clip_id: ClipId, start_sec: f64, end_sec: f64) {
        let range = TrimRange {
            clip_id: clip_id.clone(),
            start_sec,
            end_sec,
        };
        self.ranges.insert(clip_id, range);
    }

    pub fn drop_trim(&mut self, clip_id: &ClipId) -> Option<TrimRange> {
        self.ranges.remove(clip_id)
    }

    pub fn has(&self, clip_id: &ClipId) -> bool {
        self.ranges.contains_key(clip_id)
    }

    pub fn get(&self, clip_id: &ClipId) -> Option<&TrimRange> {
        self.ranges.get(clip_id)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Ranges in clip-id order.
    pub fn ranges(&self) -> impl Iterator<Item = &TrimRange> {
        self.ranges.values()
    }

    /// The span of `clip` that ends up in `slot`.
    ///
    /// `None` means the clip is too long (or of unknown length) and has no trim yet.
    pub fn effective_range(&self, clip: &Clip, slot: &Slot) -> Option<TimeRange> {
        if let Some(r) = self.ranges.get(clip.id()) {
            return Some(r.range());
        }
        match clip.duration() {
            ClipDuration::Known(d) if clip.duration().fits_within(slot.target_duration_sec) => {
                Some(TimeRange {
                    start_sec: 0.0,
                    end_sec: d,
                })
            }
            _ => None,
        }
    }
}

/// Starting selection for a trimmer: from zero, as long as the slot allows.
pub fn suggested_range(clip: &Clip, slot: &Slot) -> Option<TimeRange> {
    let end = match clip.duration() {
        ClipDuration::Known(d) => d.min(slot.target_duration_sec),
        ClipDuration::Unknown => slot.target_duration_sec,
    };
    TimeRange::new(0.0, end).ok()
}

/// Range for a single-ended trimmer: the out point trails the in point by the slot length,
/// clamped to the clip's end.
pub fn single_ended_range(start_sec: f64, clip: &Clip, slot: &Slot) -> SlotreelResult<TimeRange> {
    let mut end = start_sec + slot.target_duration_sec;
    if let ClipDuration::Known(d) = clip.duration() {
        if start_sec >= d {
            return Err(SlotreelError::validation(format!(
                "trim start {start_sec:.1}s is past the end of clip '{}' ({d:.1}s)",
                clip.id()
            )));
        }
        end = end.min(d);
    }
    TimeRange::new(start_sec, end)
}

#[cfg(test)]
#[path = "../tests/unit/trim.rs"]
mod tests;
