//! Trait abstraction for the labels API to enable mocking in tests

use crate::state::{Label, LabelId, ProjectId, PullRequestId, QueryParams, RepositoryId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ApiError;

/// Body of the label listing endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelsResponse {
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// Body returned after attaching a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedLabel {
    pub id: LabelId,
}

/// Remote label store operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LabelsApi: Send + Sync {
    /// Every label known for a repository
    async fn get_by_repository(
        &self,
        project: ProjectId,
        repository: RepositoryId,
    ) -> Result<LabelsResponse, ApiError>;

    /// Labels attached to a pull request
    async fn get_by_pull_request(
        &self,
        project: ProjectId,
        repository: RepositoryId,
        pull_request: PullRequestId,
    ) -> Result<LabelsResponse, ApiError>;

    /// Attach a label to a pull request, creating it when the name is new
    async fn add_label(
        &self,
        project: ProjectId,
        repository: RepositoryId,
        pull_request: PullRequestId,
        candidate: &Label,
    ) -> Result<AddedLabel, ApiError>;

    /// Detach a label from a pull request
    async fn remove_label(
        &self,
        project: ProjectId,
        repository: RepositoryId,
        pull_request: PullRequestId,
        label: &Label,
    ) -> Result<(), ApiError>;

    /// Edit a label's shared attributes for the whole repository
    async fn update_label(
        &self,
        project: ProjectId,
        repository: RepositoryId,
        label: &Label,
    ) -> Result<(), ApiError>;

    /// Pull-request search URL. Builds the URL only, no request is made.
    fn search_url(
        &self,
        project: ProjectId,
        repository: RepositoryId,
        params: &QueryParams,
    ) -> Result<String, ApiError>;
}
