//! Label definitions

use serde::{Deserialize, Serialize};
use rand::seq::SliceRandom;

/// Label identifier assigned by the server
pub type LabelId = u64;

/// A named, colored tag attachable to a pull request.
///
/// Labels are identified by `name`; `id` stays empty until the server has
/// stored the label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LabelId>,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

impl Label {
    /// Create an unsaved label without a color
    pub fn candidate(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            color: String::new(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_id(mut self, id: LabelId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn same_name(&self, other: &Label) -> bool {
        self.name == other.name
    }
}

/// Labels relevant to one screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    /// Every label known for the repository
    pub all: Vec<Label>,
    /// Labels attached to the current pull request
    pub pr: Vec<Label>,
}

impl LabelSet {
    pub fn new(all: Vec<Label>, pr: Vec<Label>) -> Self {
        Self { all, pr }
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.all.iter().any(|label| label.name == name)
    }

    /// Append to `all` unless a label with the same name is already there.
    /// Returns whether the label was appended.
    pub fn push_unique(&mut self, label: Label) -> bool {
        if self.contains_name(&label.name) {
            return false;
        }
        self.all.push(label);
        true
    }
}

/// Fixed palette used for labels created without a color
pub struct WellKnownColors;

impl WellKnownColors {
    pub const PALETTE: [&'static str; 12] = [
        "#d04437", "#f6c342", "#14892c", "#205081", "#59afe1", "#8eb021",
        "#f79232", "#654982", "#f691b2", "#3b7fc4", "#815b3a", "#707070",
    ];

    /// Pick a palette entry at random
    pub fn random() -> &'static str {
        Self::PALETTE
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(Self::PALETTE[0])
    }

    pub fn contains(color: &str) -> bool {
        Self::PALETTE.contains(&color)
    }
}
