use std::{fs::File, io::BufReader, path::Path};

use crate::{
    catalog::model::Template, foundation::error::SlotreelResult, trim::TrimRange,
    wizard::stage::Stage,
};

/// The durable part of a wizard session.
///
/// Clips and their previews are not included; they do not outlive the session that uploaded
/// them.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub current_step: Stage,
    #[serde(default)]
    pub selected_niche_id: Option<String>,
    #[serde(default)]
    pub selected_template: Option<Template>,
    #[serde(default)]
    pub trim_ranges: Vec<TrimRange>,
}

impl Snapshot {
    pub fn to_json_string(&self) -> SlotreelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(s: &str) -> SlotreelResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn save_json(&self, path: &Path) -> SlotreelResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> SlotreelResult<Self> {
        let f = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(f))?)
    }
}

/// Stage to resume at after a reload.
///
/// The clip registry always comes back empty, so nothing past `Upload` is reachable; the
/// persisted stage is lowered to the deepest stage whose prerequisites still hold.
pub fn restorable_stage(persisted: Stage, has_niche: bool, has_template: bool) -> Stage {
    let deepest = match (has_niche, has_template) {
        (_, true) => Stage::Upload,
        (true, false) => Stage::TemplateSelect,
        (false, false) => Stage::NicheSelect,
    };
    persisted.min(deepest)
}
