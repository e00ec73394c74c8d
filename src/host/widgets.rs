//! Widget interfaces supplied by the host toolkit

use crate::api::{ApiError, LabelsApi};
use crate::state::{Label, ListQuery, ProjectId, QueryParams, RepositoryId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use super::NodeId;

/// Selection change of the label filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterEvent {
    Added(Label),
    Removed(Label),
}

/// Label selector placed above the pull-request table
pub trait LabelFilter: Send + Sync {
    /// Take the selection change stream. Only the first call gets it.
    fn take_events(&self) -> Option<UnboundedReceiver<FilterEvent>>;

    /// Mount the control into the host's filter bar
    fn mount(&self, filter_bar: NodeId);
}

/// Pull-request list fed by search URLs
pub trait PullRequestList: Send + Sync {
    /// Show the list and fetch its first page. The list keeps `search` and
    /// asks it for a fresh URL on every later page fetch.
    fn mount(&self, search: SearchQuery) -> Result<(), ApiError>;

    fn unmount(&self);
}

/// Fetch strategy of the filtered pull-request list
#[derive(Clone)]
pub struct SearchQuery {
    pub project: ProjectId,
    pub repository: RepositoryId,
    pub query: ListQuery,
    pub api: Arc<dyn LabelsApi>,
}

impl SearchQuery {
    pub fn new(
        project: ProjectId,
        repository: RepositoryId,
        query: ListQuery,
        api: Arc<dyn LabelsApi>,
    ) -> Self {
        Self {
            project,
            repository,
            query,
            api,
        }
    }

    /// URL for one page fetch. `host_params` are the paging and sorting
    /// parameters the list holds for that page; they win over the filter.
    pub fn url(&self, host_params: &QueryParams) -> Result<String, ApiError> {
        let params = self.query.build(host_params);
        self.api.search_url(self.project, self.repository, &params)
    }
}

impl fmt::Debug for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchQuery")
            .field("project", &self.project)
            .field("repository", &self.repository)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

/// Table decorating each pull-request row with its labels
pub trait LabelsTable: Send + Sync {
    fn mount(&self, container: NodeId);
}

/// Label editor shown on the pull-request summary panel
pub trait LabelsPanel: Send + Sync {
    /// Show a label as already attached
    fn preselect(&self, label: &Label);

    fn attach(&self, container: NodeId);

    fn is_visible(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelOptions {
    /// Let the user type labels that do not exist yet
    pub allow_new: bool,
}

/// Operations the label editor calls back into
#[async_trait]
pub trait LabelSource: Send + Sync {
    /// Labels offered for selection
    fn query(&self, term: &str) -> Vec<Label>;

    async fn add(&self, candidate: Label) -> Result<Label, ApiError>;

    async fn remove(&self, label: &Label) -> Result<(), ApiError>;

    async fn update(&self, label: &Label) -> Result<(), ApiError>;
}

/// Source of label badges for one repository's rows
#[derive(Clone)]
pub struct LabelsCellProvider {
    pub project: ProjectId,
    pub repository: RepositoryId,
    pub api: Arc<dyn LabelsApi>,
}

impl LabelsCellProvider {
    pub fn new(project: ProjectId, repository: RepositoryId, api: Arc<dyn LabelsApi>) -> Self {
        Self {
            project,
            repository,
            api,
        }
    }
}

impl fmt::Debug for LabelsCellProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelsCellProvider")
            .field("project", &self.project)
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}
