//! Pull-request list query state

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Query parameters of a pull-request search
pub type QueryParams = BTreeMap<String, String>;

/// Query key carrying the selected label
pub const LABEL_PARAM: &str = "label";
/// Query key carrying the avatar size in pixels
pub const AVATAR_SIZE_PARAM: &str = "avatar_size";

/// Avatar sizes understood by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarSize {
    XSmall,
    Small,
    #[default]
    Medium,
    Large,
    XLarge,
}

impl AvatarSize {
    pub fn px(self) -> u32 {
        match self {
            Self::XSmall => 16,
            Self::Small => 24,
            Self::Medium => 32,
            Self::Large => 48,
            Self::XLarge => 64,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "xsmall" => Some(Self::XSmall),
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            "xlarge" => Some(Self::XLarge),
            _ => None,
        }
    }
}

/// Filter selection plus the fixed parameters of the filtered list.
///
/// Clones share the same selection, so the filter wiring and the list builder
/// always read the same value.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    selected: Arc<RwLock<Option<String>>>,
    avatar_size: AvatarSize,
}

impl ListQuery {
    pub fn new(avatar_size: AvatarSize) -> Self {
        Self {
            selected: Arc::default(),
            avatar_size,
        }
    }

    pub fn selected(&self) -> Option<String> {
        self.selected
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn select(&self, label: impl Into<String>) {
        *self
            .selected
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(label.into());
    }

    pub fn clear(&self) {
        *self
            .selected
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Merge filter, avatar size and host parameters.
    /// Host parameters win over computed ones with the same name.
    pub fn build(&self, host_params: &QueryParams) -> QueryParams {
        let mut params = QueryParams::new();
        if let Some(label) = self.selected() {
            params.insert(LABEL_PARAM.to_string(), label);
        }
        params.insert(
            AVATAR_SIZE_PARAM.to_string(),
            self.avatar_size.px().to_string(),
        );
        params.extend(host_params.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }
}
