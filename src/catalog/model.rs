use std::collections::BTreeSet;

use crate::foundation::error::{SlotreelError, SlotreelResult};

/// Content category a template belongs to.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Niche {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
}

/// A named, timed position in a template that one clip must fill.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Slot {
    pub id: String,
    pub label: String,
    pub target_duration_sec: f64,
}

/// Immutable template: an ordered list of slots plus presentation metadata.
///
/// Slot order is significant; a slot's index is its position in the final video.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub niche: String,
    pub slots: Vec<Slot>,
    /// Background music reference handed through to the renderer.
    pub bgm: String,
    #[serde(default)]
    pub description: String,
}

impl Template {
    pub fn validate(&self) -> SlotreelResult<()> {
        if self.id.trim().is_empty() {
            return Err(SlotreelError::validation("template id must be non-empty"));
        }
        if self.slots.is_empty() {
            return Err(SlotreelError::validation(format!(
                "template '{}' must have at least one slot",
                self.id
            )));
        }

        let mut seen = BTreeSet::new();
        for slot in &self.slots {
            if slot.id.trim().is_empty() {
                return Err(SlotreelError::validation(format!(
                    "template '{}' has a slot with an empty id",
                    self.id
                )));
            }
            if !seen.insert(slot.id.as_str()) {
                return Err(SlotreelError::validation(format!(
                    "template '{}' has duplicate slot id '{}'",
                    self.id, slot.id
                )));
            }
            if !slot.target_duration_sec.is_finite() || slot.target_duration_sec <= 0.0 {
                return Err(SlotreelError::validation(format!(
                    "slot '{}' in template '{}' must have target_duration_sec > 0",
                    slot.id, self.id
                )));
            }
        }
        Ok(())
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, idx: usize) -> Option<&Slot> {
        self.slots.get(idx)
    }

    pub fn slot_index(&self, slot_id: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.id == slot_id)
    }

    /// Sum of all slot targets: the nominal length of the finished video.
    pub fn total_duration_sec(&self) -> f64 {
        self.slots.iter().map(|s| s.target_duration_sec).sum()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/catalog/model.rs"]
mod tests;
