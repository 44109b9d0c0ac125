use std::{fmt, path::Path};

use crate::foundation::error::SlotreelResult;

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

pub const ACCEPTED_MIME_TYPES: &[&str] = &["video/mp4", "video/quicktime", "video/webm"];
pub const ACCEPTED_EXTENSIONS: &[&str] = &["mp4", "mov", "webm"];

/// Raw media handed to the wizard for upload.
///
/// `source` is opaque to the registry; it is what probes and renderers dereference
/// (a filesystem path for the CLI, an object key or URL for other hosts).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaBlob {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    pub source: String,
}

impl MediaBlob {
    pub fn new(file_name: impl Into<String>, size_bytes: u64, source: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            size_bytes,
            source: source.into(),
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Describe a file on disk. The MIME type is left unset; admission falls back to the extension.
    pub fn from_path(path: &Path) -> SlotreelResult<Self> {
        let meta = std::fs::metadata(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(
            file_name,
            meta.len(),
            path.to_string_lossy().into_owned(),
        ))
    }

    /// Lowercased extension of `file_name`, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }
}

/// Format and size gate applied to every file of a batch before any probing starts.
#[derive(Clone, Debug, PartialEq)]
pub struct AdmissionPolicy {
    pub max_bytes: u64,
    pub mime_types: Vec<String>,
    pub extensions: Vec<String>,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::with_max_bytes(MAX_UPLOAD_BYTES)
    }
}

impl AdmissionPolicy {
    pub fn with_max_bytes(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            mime_types: ACCEPTED_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
            extensions: ACCEPTED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// A file passes the format check when either its MIME type or its extension is allow-listed.
    pub fn accepts_format(&self, blob: &MediaBlob) -> bool {
        let mime_ok = blob.mime_type.as_deref().is_some_and(|m| {
            let m = m.trim().to_ascii_lowercase();
            self.mime_types.iter().any(|a| *a == m)
        });
        let ext_ok = blob
            .extension()
            .is_some_and(|ext| self.extensions.iter().any(|a| *a == ext));
        mime_ok || ext_ok
    }

    pub fn check(&self, blob: &MediaBlob) -> Option<FileRejectionReason> {
        if !self.accepts_format(blob) {
            return Some(FileRejectionReason::InvalidFormat);
        }
        if blob.size_bytes > self.max_bytes {
            return Some(FileRejectionReason::TooLarge {
                size_bytes: blob.size_bytes,
                limit_bytes: self.max_bytes,
            });
        }
        None
    }

    /// Check every file, collecting all failures instead of stopping at the first.
    pub fn check_all(&self, files: &[MediaBlob]) -> Result<(), UploadRejection> {
        let rejected: Vec<FileRejection> = files
            .iter()
            .filter_map(|blob| {
                self.check(blob).map(|reason| FileRejection {
                    file_name: blob.file_name.clone(),
                    reason,
                })
            })
            .collect();
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(UploadRejection::InvalidFiles(rejected))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub enum FileRejectionReason {
    InvalidFormat,
    TooLarge { size_bytes: u64, limit_bytes: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FileRejection {
    pub file_name: String,
    pub reason: FileRejectionReason,
}

impl fmt::Display for FileRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FileRejectionReason::InvalidFormat => {
                write!(f, "'{}' is not an mp4/mov/webm video", self.file_name)
            }
            FileRejectionReason::TooLarge {
                size_bytes,
                limit_bytes,
            } => write!(
                f,
                "'{}' is {size_bytes} bytes (limit {limit_bytes})",
                self.file_name
            ),
        }
    }
}

/// Why a whole upload batch was refused. The registry is untouched in every case.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("batch of {requested} file(s) exceeds the {remaining} remaining slot(s)")]
    TooManySlots { requested: usize, remaining: usize },

    #[error("batch of {requested} file(s) exceeds the per-batch limit of {limit}")]
    TooManyFiles { requested: usize, limit: usize },

    #[error("{}", join_rejections(.0))]
    InvalidFiles(Vec<FileRejection>),
}

fn join_rejections(items: &[FileRejection]) -> String {
    items
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[path = "../../tests/unit/media/blob.rs"]
mod tests;
