//! Page identifiers supplied by the host

use serde::{Deserialize, Serialize};

/// Project identifier
pub type ProjectId = u64;
/// Repository identifier
pub type RepositoryId = u64;
/// Pull request identifier
pub type PullRequestId = u64;

/// Identifiers of the screen the views were loaded into.
///
/// Built once per page load and shared read-only by every view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    project_id: ProjectId,
    repository_id: RepositoryId,
    #[serde(default)]
    pull_request_id: Option<PullRequestId>,
}

impl PageContext {
    pub fn new(
        project_id: ProjectId,
        repository_id: RepositoryId,
        pull_request_id: Option<PullRequestId>,
    ) -> Self {
        Self {
            project_id,
            repository_id,
            pull_request_id,
        }
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn repository_id(&self) -> RepositoryId {
        self.repository_id
    }

    /// Present only on pull-request screens
    pub fn pull_request_id(&self) -> Option<PullRequestId> {
        self.pull_request_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let ctx = PageContext::new(1, 2, Some(3));
        assert_eq!(ctx.project_id(), 1);
        assert_eq!(ctx.repository_id(), 2);
        assert_eq!(ctx.pull_request_id(), Some(3));
    }

    #[test]
    fn test_pull_request_id_defaults_to_none() {
        let parsed: PageContext =
            serde_json::from_str(r#"{"project_id": 4, "repository_id": 5}"#).unwrap();
        assert_eq!(parsed.pull_request_id(), None);
    }
}
