//! Shared helpers for view tests

use crate::api::{AddedLabel, ApiError, LabelsApi, LabelsResponse};
use crate::state::{Label, ProjectId, PullRequestId, QueryParams, RepositoryId};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Let spawned tasks run until they block
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Stand-in for `LabelsApi::search_url` in mock expectations
pub fn search_url(
    project: ProjectId,
    repository: RepositoryId,
    params: &QueryParams,
) -> Result<String, ApiError> {
    let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    Ok(format!(
        "/{project}/{repository}/pull-requests?{}",
        query.join("&")
    ))
}

/// Labels API that suspends like a network call.
///
/// Every call yields once. A gated api additionally holds each fetch until
/// the matching `release_*` call.
pub struct FakeApi {
    repository: Vec<Label>,
    pull_request: Vec<Label>,
    gates: Option<Gates>,
    repository_fetches: AtomicUsize,
    pull_request_fetches: AtomicUsize,
    repository_failure: Mutex<Option<u16>>,
    added: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

struct Gates {
    repository: Arc<Semaphore>,
    pull_request: Arc<Semaphore>,
    add: Arc<Semaphore>,
}

async fn pass(gate: Option<&Arc<Semaphore>>) {
    tokio::task::yield_now().await;
    if let Some(gate) = gate {
        gate.acquire().await.unwrap().forget();
    }
}

impl FakeApi {
    pub fn new(repository: Vec<Label>, pull_request: Vec<Label>) -> Self {
        Self {
            repository,
            pull_request,
            gates: None,
            repository_fetches: AtomicUsize::new(0),
            pull_request_fetches: AtomicUsize::new(0),
            repository_failure: Mutex::new(None),
            added: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(100),
        }
    }

    pub fn gated(mut self) -> Self {
        self.gates = Some(Gates {
            repository: Arc::new(Semaphore::new(0)),
            pull_request: Arc::new(Semaphore::new(0)),
            add: Arc::new(Semaphore::new(0)),
        });
        self
    }

    pub fn release_repository(&self) {
        if let Some(gates) = &self.gates {
            gates.repository.add_permits(1);
        }
    }

    pub fn release_pull_request(&self) {
        if let Some(gates) = &self.gates {
            gates.pull_request.add_permits(1);
        }
    }

    pub fn release_add(&self) {
        if let Some(gates) = &self.gates {
            gates.add.add_permits(1);
        }
    }

    /// Make the next repository fetch fail with `status`
    pub fn fail_repository_once(&self, status: u16) {
        *self.repository_failure.lock().unwrap() = Some(status);
    }

    pub fn repository_fetches(&self) -> usize {
        self.repository_fetches.load(Ordering::SeqCst)
    }

    pub fn pull_request_fetches(&self) -> usize {
        self.pull_request_fetches.load(Ordering::SeqCst)
    }

    /// Names sent to `add_label`
    pub fn added(&self) -> Vec<String> {
        self.added.lock().unwrap().clone()
    }
}

#[async_trait]
impl LabelsApi for FakeApi {
    async fn get_by_repository(
        &self,
        _project: ProjectId,
        _repository: RepositoryId,
    ) -> Result<LabelsResponse, ApiError> {
        self.repository_fetches.fetch_add(1, Ordering::SeqCst);
        pass(self.gates.as_ref().map(|g| &g.repository)).await;
        let failure = self.repository_failure.lock().unwrap().take();
        if let Some(status) = failure {
            return Err(ApiError::status(status, "fake failure"));
        }
        Ok(LabelsResponse {
            labels: self.repository.clone(),
        })
    }

    async fn get_by_pull_request(
        &self,
        _project: ProjectId,
        _repository: RepositoryId,
        _pull_request: PullRequestId,
    ) -> Result<LabelsResponse, ApiError> {
        self.pull_request_fetches.fetch_add(1, Ordering::SeqCst);
        pass(self.gates.as_ref().map(|g| &g.pull_request)).await;
        Ok(LabelsResponse {
            labels: self.pull_request.clone(),
        })
    }

    async fn add_label(
        &self,
        _project: ProjectId,
        _repository: RepositoryId,
        _pull_request: PullRequestId,
        candidate: &Label,
    ) -> Result<AddedLabel, ApiError> {
        self.added.lock().unwrap().push(candidate.name.clone());
        pass(self.gates.as_ref().map(|g| &g.add)).await;
        Ok(AddedLabel {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn remove_label(
        &self,
        _project: ProjectId,
        _repository: RepositoryId,
        _pull_request: PullRequestId,
        _label: &Label,
    ) -> Result<(), ApiError> {
        pass(None).await;
        Ok(())
    }

    async fn update_label(
        &self,
        _project: ProjectId,
        _repository: RepositoryId,
        _label: &Label,
    ) -> Result<(), ApiError> {
        pass(None).await;
        Ok(())
    }

    fn search_url(
        &self,
        project: ProjectId,
        repository: RepositoryId,
        params: &QueryParams,
    ) -> Result<String, ApiError> {
        search_url(project, repository, params)
    }
}
