use std::fmt;

use crate::foundation::error::{SlotreelError, SlotreelResult};

/// Session-unique clip identifier. Ids are handed out by the registry and never reused.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Native duration of a clip as reported by the media probe.
///
/// A failed probe, or one that reports no positive length, is `Unknown` rather than `0.0`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "sec", rename_all = "snake_case")]
pub enum ClipDuration {
    Known(f64),
    Unknown,
}

impl ClipDuration {
    /// Build from a probe result; zero, negative and non-finite values count as unknown.
    pub fn from_probe(sec: f64) -> Self {
        if sec.is_finite() && sec > 0.0 {
            Self::Known(sec)
        } else {
            Self::Unknown
        }
    }

    pub fn known(self) -> Option<f64> {
        match self {
            Self::Known(sec) => Some(sec),
            Self::Unknown => None,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Seconds, with `Unknown` flattened to `0.0`.
    pub fn as_secs_or_zero(self) -> f64 {
        self.known().unwrap_or(0.0)
    }

    /// Return `true` when the clip is known to fit inside `target_sec` without trimming.
    pub fn fits_within(self, target_sec: f64) -> bool {
        match self {
            Self::Known(sec) => sec > 0.0 && sec <= target_sec,
            Self::Unknown => false,
        }
    }
}

/// Closed-open span `[start_sec, end_sec)` on a clip's native timeline.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    pub start_sec: f64,
    pub end_sec: f64,
}

impl TimeRange {
    /// Create a validated range with `0 <= start < end`.
    pub fn new(start_sec: f64, end_sec: f64) -> SlotreelResult<Self> {
        if !start_sec.is_finite() || !end_sec.is_finite() {
            return Err(SlotreelError::validation("time range bounds must be finite"));
        }
        if start_sec < 0.0 {
            return Err(SlotreelError::validation("time range start must be >= 0"));
        }
        if end_sec <= start_sec {
            return Err(SlotreelError::validation(
                "time range end must be > start",
            ));
        }
        Ok(Self { start_sec, end_sec })
    }

    pub fn len_sec(self) -> f64 {
        self.end_sec - self.start_sec
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
