use std::{fs::File, io::BufReader, path::Path};

use crate::{
    catalog::model::{Niche, Template},
    foundation::error::{SlotreelError, SlotreelResult},
};

/// Read-only source of niches and templates.
pub trait TemplateCatalog {
    fn niches(&self) -> Vec<Niche>;

    /// Templates in catalog order belonging to `niche_id`.
    fn templates(&self, niche_id: &str) -> Vec<Template>;

    fn template(&self, template_id: &str) -> Option<Template>;

    fn niche(&self, niche_id: &str) -> Option<Niche> {
        self.niches().into_iter().find(|n| n.id == niche_id)
    }
}

/// Catalog held entirely in memory, typically loaded from a JSON document.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct StaticCatalog {
    pub niches: Vec<Niche>,
    pub templates: Vec<Template>,
}

impl StaticCatalog {
    /// Build and validate a catalog.
    pub fn new(niches: Vec<Niche>, templates: Vec<Template>) -> SlotreelResult<Self> {
        let catalog = Self { niches, templates };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_json_str(s: &str) -> SlotreelResult<Self> {
        let catalog: Self = serde_json::from_str(s)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load_json(path: &Path) -> SlotreelResult<Self> {
        let f = File::open(path)?;
        let catalog: Self = serde_json::from_reader(BufReader::new(f))?;
        catalog.validate()?;
        tracing::debug!(
            path = %path.display(),
            niches = catalog.niches.len(),
            templates = catalog.templates.len(),
            "loaded template catalog"
        );
        Ok(catalog)
    }

    pub fn validate(&self) -> SlotreelResult<()> {
        for (i, niche) in self.niches.iter().enumerate() {
            if niche.id.trim().is_empty() {
                return Err(SlotreelError::validation("niche id must be non-empty"));
            }
            if self.niches[..i].iter().any(|n| n.id == niche.id) {
                return Err(SlotreelError::validation(format!(
                    "duplicate niche id '{}'",
                    niche.id
                )));
            }
        }

        for (i, template) in self.templates.iter().enumerate() {
            template.validate()?;
            if self.templates[..i].iter().any(|t| t.id == template.id) {
                return Err(SlotreelError::validation(format!(
                    "duplicate template id '{}'",
                    template.id
                )));
            }
            if !self.niches.iter().any(|n| n.id == template.niche) {
                return Err(SlotreelError::validation(format!(
                    "template '{}' references missing niche '{}'",
                    template.id, template.niche
                )));
            }
        }
        Ok(())
    }
}

impl TemplateCatalog for StaticCatalog {
    fn niches(&self) -> Vec<Niche> {
        self.niches.clone()
    }

    fn templates(&self, niche_id: &str) -> Vec<Template> {
        self.templates
            .iter()
            .filter(|t| t.niche == niche_id)
            .cloned()
            .collect()
    }

    fn template(&self, template_id: &str) -> Option<Template> {
        self.templates.iter().find(|t| t.id == template_id).cloned()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/catalog/store.rs"]
mod tests;
