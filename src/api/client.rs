//! REST client for the labels API
//!
//! Endpoints are rooted at `{base_url}{rest_path}/{project}/{repository}`.

use crate::config::LabelsConfig;
use crate::state::{Label, ProjectId, PullRequestId, QueryParams, RepositoryId};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{AddedLabel, ApiError, LabelsApi, LabelsResponse};

/// Labels API over HTTP
pub struct HttpLabelsApi {
    client: Client,
    /// Base URL plus REST prefix, without trailing slash
    root: String,
    token: Option<String>,
}

impl HttpLabelsApi {
    /// Create a client from configuration
    pub fn new(config: &LabelsConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs()))
            .build()?;

        let root = format!(
            "{}/{}",
            config.base_url().trim_end_matches('/'),
            config.rest_path().trim_matches('/')
        );
        Url::parse(&root).map_err(|e| ApiError::InvalidUrl(format!("{root}: {e}")))?;

        Ok(Self {
            client,
            root,
            token: config.token(),
        })
    }

    fn repository_url(&self, project: ProjectId, repository: RepositoryId, tail: &str) -> String {
        format!("{}/{}/{}/{}", self.root, project, repository, tail)
    }

    fn repository_labels_url(&self, project: ProjectId, repository: RepositoryId) -> String {
        self.repository_url(project, repository, "labels")
    }

    fn pull_request_labels_url(
        &self,
        project: ProjectId,
        repository: RepositoryId,
        pull_request: PullRequestId,
    ) -> String {
        self.repository_url(
            project,
            repository,
            &format!("pull-requests/{pull_request}/labels"),
        )
    }

    /// Attach credentials, send, and turn non-2xx answers into errors
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!("labels api answered {status}: {message}");
            return Err(ApiError::status(status.as_u16(), message));
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl LabelsApi for HttpLabelsApi {
    async fn get_by_repository(
        &self,
        project: ProjectId,
        repository: RepositoryId,
    ) -> Result<LabelsResponse, ApiError> {
        let url = self.repository_labels_url(project, repository);
        let response = self.send(self.client.get(url)).await?;
        Self::read_json(response).await
    }

    async fn get_by_pull_request(
        &self,
        project: ProjectId,
        repository: RepositoryId,
        pull_request: PullRequestId,
    ) -> Result<LabelsResponse, ApiError> {
        let url = self.pull_request_labels_url(project, repository, pull_request);
        let response = self.send(self.client.get(url)).await?;
        Self::read_json(response).await
    }

    async fn add_label(
        &self,
        project: ProjectId,
        repository: RepositoryId,
        pull_request: PullRequestId,
        candidate: &Label,
    ) -> Result<AddedLabel, ApiError> {
        let url = self.pull_request_labels_url(project, repository, pull_request);
        let response = self.send(self.client.post(url).json(candidate)).await?;
        Self::read_json(response).await
    }

    async fn remove_label(
        &self,
        project: ProjectId,
        repository: RepositoryId,
        pull_request: PullRequestId,
        label: &Label,
    ) -> Result<(), ApiError> {
        let url = self.pull_request_labels_url(project, repository, pull_request);
        self.send(self.client.delete(url).json(label)).await?;
        Ok(())
    }

    async fn update_label(
        &self,
        project: ProjectId,
        repository: RepositoryId,
        label: &Label,
    ) -> Result<(), ApiError> {
        let id = label
            .id
            .ok_or_else(|| ApiError::MissingId(label.name.clone()))?;
        let url = self.repository_url(project, repository, &format!("labels/{id}"));
        self.send(self.client.put(url).json(label)).await?;
        Ok(())
    }

    fn search_url(
        &self,
        project: ProjectId,
        repository: RepositoryId,
        params: &QueryParams,
    ) -> Result<String, ApiError> {
        let base = self.repository_url(project, repository, "pull-requests");
        Url::parse_with_params(&base, params)
            .map(String::from)
            .map_err(|e| ApiError::InvalidUrl(format!("{base}: {e}")))
    }
}
