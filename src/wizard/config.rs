use std::{fs::File, io::BufReader, path::Path};

use crate::{
    foundation::error::{SlotreelError, SlotreelResult},
    media::blob::{AdmissionPolicy, MAX_UPLOAD_BYTES},
    plan::DEFAULT_TRIM_TOLERANCE_SEC,
    registry::RegistryOpts,
    trim::TrimMode,
};

/// Smallest span a trimmer may select, in seconds.
pub const DEFAULT_MIN_TRIM_SEC: f64 = 0.5;

/// Knobs for one wizard session. Missing JSON fields take their defaults.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    /// `Some(1)` uploads one file at a time; `None` accepts any batch that fits.
    pub max_files_per_batch: Option<usize>,
    pub allow_reorder: bool,
    pub trim_mode: TrimMode,
    pub max_file_bytes: u64,
    pub trim_tolerance_sec: f64,
    pub min_trim_sec: f64,
    /// Also require every trim to fit its slot before rendering.
    pub enforce_trim_fit: bool,
    pub probe_threads: Option<usize>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self::batch()
    }
}

impl WizardConfig {
    /// Multi-file uploads with reordering and a dual-handle trimmer.
    pub fn batch() -> Self {
        Self {
            max_files_per_batch: None,
            allow_reorder: true,
            trim_mode: TrimMode::DualEnded,
            max_file_bytes: MAX_UPLOAD_BYTES,
            trim_tolerance_sec: DEFAULT_TRIM_TOLERANCE_SEC,
            min_trim_sec: DEFAULT_MIN_TRIM_SEC,
            enforce_trim_fit: false,
            probe_threads: None,
        }
    }

    /// One file per upload, fixed order.
    pub fn single_file() -> Self {
        Self {
            max_files_per_batch: Some(1),
            allow_reorder: false,
            ..Self::batch()
        }
    }

    pub fn load_json(path: &Path) -> SlotreelResult<Self> {
        let f = File::open(path)?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> SlotreelResult<()> {
        if self.max_files_per_batch == Some(0) {
            return Err(SlotreelError::validation(
                "max_files_per_batch must be >= 1 when set",
            ));
        }
        if self.probe_threads == Some(0) {
            return Err(SlotreelError::validation(
                "probe_threads must be >= 1 when set",
            ));
        }
        if self.max_file_bytes == 0 {
            return Err(SlotreelError::validation("max_file_bytes must be > 0"));
        }
        if !self.trim_tolerance_sec.is_finite() || self.trim_tolerance_sec < 0.0 {
            return Err(SlotreelError::validation(
                "trim_tolerance_sec must be finite and >= 0",
            ));
        }
        if !self.min_trim_sec.is_finite() || self.min_trim_sec < 0.0 {
            return Err(SlotreelError::validation(
                "min_trim_sec must be finite and >= 0",
            ));
        }
        Ok(())
    }

    pub(crate) fn registry_opts(&self) -> RegistryOpts {
        RegistryOpts {
            admission: AdmissionPolicy::with_max_bytes(self.max_file_bytes),
            max_files_per_batch: self.max_files_per_batch,
            allow_reorder: self.allow_reorder,
            probe_threads: self.probe_threads,
        }
    }
}
