use crate::media::{blob::UploadRejection, probe::ProbeError};

/// Crate-wide result alias.
pub type SlotreelResult<T> = Result<T, SlotreelError>;

/// Top-level error type for wizard, catalog and plan operations.
#[derive(thiserror::Error, Debug)]
pub enum SlotreelError {
    /// Malformed input: catalog data, config values, trim bounds, unknown ids.
    #[error("validation error: {0}")]
    Validation(String),

    /// An upload batch was refused before any probing started.
    #[error("upload rejected: {0}")]
    Upload(#[from] UploadRejection),

    /// The requested operation is not allowed in the current wizard stage.
    #[error("stage error: {0}")]
    Stage(String),

    /// A media probe failed in a context where it cannot degrade.
    #[error("probe error: {0}")]
    Probe(#[from] ProbeError),

    /// The external renderer refused or failed the edit plan.
    #[error("render error: {0}")]
    Render(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlotreelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn stage(msg: impl Into<String>) -> Self {
        Self::Stage(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for SlotreelError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
