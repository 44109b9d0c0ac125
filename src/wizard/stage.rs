use std::fmt;

/// The five wizard stages, in their only legal forward order.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    NicheSelect,
    TemplateSelect,
    Upload,
    Trim,
    Render,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::NicheSelect,
        Stage::TemplateSelect,
        Stage::Upload,
        Stage::Trim,
        Stage::Render,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn prev(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::NicheSelect => "niche",
            Stage::TemplateSelect => "template",
            Stage::Upload => "upload",
            Stage::Trim => "trim",
            Stage::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
