//! Label edits from the summary panel editor

use crate::api::{ApiError, LabelsApi};
use crate::host::LabelSource;
use crate::state::{Label, LabelSet, PageContext, PullRequestId, WellKnownColors};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use super::{read, write};

/// Turns editor actions into API calls and keeps the repository label list
/// in step with successful additions. Nothing is retried or rolled back.
pub struct LabelBridge {
    context: Arc<PageContext>,
    api: Arc<dyn LabelsApi>,
    pull_request: PullRequestId,
    labels: Arc<RwLock<LabelSet>>,
}

impl LabelBridge {
    pub fn new(
        context: Arc<PageContext>,
        api: Arc<dyn LabelsApi>,
        pull_request: PullRequestId,
        labels: Arc<RwLock<LabelSet>>,
    ) -> Self {
        Self {
            context,
            api,
            pull_request,
            labels,
        }
    }
}

#[async_trait]
impl LabelSource for LabelBridge {
    /// Every repository label; the editor filters by `term` itself
    fn query(&self, _term: &str) -> Vec<Label> {
        read(&self.labels).all.clone()
    }

    /// Attach a label. A name not yet known gets a palette color and, once
    /// the server accepts it, joins the repository list with its new id.
    async fn add(&self, mut candidate: Label) -> Result<Label, ApiError> {
        let known = read(&self.labels)
            .all
            .iter()
            .find(|label| label.same_name(&candidate))
            .cloned();
        if known.is_none() {
            candidate.color = WellKnownColors::random().to_string();
        }

        let added = self
            .api
            .add_label(
                self.context.project_id(),
                self.context.repository_id(),
                self.pull_request,
                &candidate,
            )
            .await?;

        if let Some(known) = known {
            return Ok(known);
        }

        candidate.id = Some(added.id);
        if !write(&self.labels).push_unique(candidate.clone()) {
            tracing::debug!(label = %candidate.name, "label appeared while it was being added");
        }
        Ok(candidate)
    }

    async fn remove(&self, label: &Label) -> Result<(), ApiError> {
        self.api
            .remove_label(
                self.context.project_id(),
                self.context.repository_id(),
                self.pull_request,
                label,
            )
            .await
    }

    async fn update(&self, label: &Label) -> Result<(), ApiError> {
        self.api
            .update_label(
                self.context.project_id(),
                self.context.repository_id(),
                label,
            )
            .await
    }
}
