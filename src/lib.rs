//! Slotreel assembles short videos from user clips by filling the timed slots of a template.
//!
//! The crate owns the wizard state machine, not the pixels:
//!
//! - Pick a niche and a [`Template`] from a [`TemplateCatalog`]
//! - Upload clips into slots through a [`WizardSession`] (probed by a [`MediaProbe`])
//! - Trim clips that run longer than their slot
//! - Hand the resulting [`EditPlan`] to an external [`Renderer`]
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod catalog;
pub(crate) mod media;
pub(crate) mod plan;
pub(crate) mod registry;
pub(crate) mod render;
pub(crate) mod trim;
pub(crate) mod wizard;

pub use crate::catalog::model::{Niche, Slot, Template};
pub use crate::catalog::store::{StaticCatalog, TemplateCatalog};
pub use crate::foundation::core::{ClipDuration, ClipId, TimeRange};
pub use crate::foundation::error::{SlotreelError, SlotreelResult};
pub use crate::media::blob::{
    ACCEPTED_EXTENSIONS, ACCEPTED_MIME_TYPES, AdmissionPolicy, FileRejection,
    FileRejectionReason, MAX_UPLOAD_BYTES, MediaBlob, UploadRejection,
};
pub use crate::media::preview::{PreviewHandle, PreviewPool, PreviewPoolStats};
pub use crate::media::probe::{FfprobeProbe, FixedProbe, MediaProbe, ProbeError, probe_all};
pub use crate::plan::{
    DEFAULT_TRIM_TOLERANCE_SEC, EditPlan, PlanClip, PlanEntry, TrimValidity, all_ready,
    is_clip_ready, needs_trim, slots_filled, trim_validity,
};
pub use crate::registry::{
    BatchOutcome, Clip, ClipRegistry, PendingBatch, ProbeApplied, ProbeTicket, RegistryOpts,
};
pub use crate::render::{
    InMemoryRenderer, ManifestRenderer, RenderArtifact, RenderRequest, RenderSegment, Renderer,
};
pub use crate::trim::{TrimLedger, TrimMode, TrimRange, single_ended_range, suggested_range};
pub use crate::wizard::config::{DEFAULT_MIN_TRIM_SEC, WizardConfig};
pub use crate::wizard::persist::{Snapshot, restorable_stage};
pub use crate::wizard::session::{
    BatchReport, Readiness, RenderState, SharedCatalog, WizardSession,
};
pub use crate::wizard::stage::Stage;
