//! Label badges on the dashboard pull-request tables

use crate::api::LabelsApi;
use crate::host::{Host, LabelsCellProvider, NodeId};
use crate::state::{PageContext, ProjectId, RepositoryId};
use std::sync::Arc;

use super::{MountHandle, MountOutcome, View, ViewResult};

const NAME: &str = "dashboard";

pub const DASHBOARD_TABLE: &str = "table.dashboard-pull-requests-table";
/// Pull-request link carrying the repository identifiers as data attributes
pub const TITLE_LINK: &str = "td div.title a";

#[derive(Clone)]
pub struct DashboardView {
    api: Arc<dyn LabelsApi>,
    host: Arc<dyn Host>,
    containers: Vec<NodeId>,
}

impl DashboardView {
    /// The dashboard spans several repositories, so the page context is not
    /// used; each container carries its own identifiers.
    pub fn new(
        _context: Arc<PageContext>,
        api: Arc<dyn LabelsApi>,
        host: Arc<dyn Host>,
    ) -> ViewResult<Self> {
        let containers = host.select(DASHBOARD_TABLE);
        if containers.is_empty() {
            tracing::debug!(view = NAME, "no dashboard tables on page");
            return ViewResult::NotApplicable;
        }

        ViewResult::Applicable(Self {
            api,
            host,
            containers,
        })
    }

    /// Mount one independent labels table per container.
    /// Returns how many containers were decorated.
    pub fn decorate(&self) -> usize {
        let mut tables = 0;
        for container in &self.containers {
            let Some((project, repository)) = self.identifiers(*container) else {
                tracing::warn!(view = NAME, %container, "row without repository identifiers");
                continue;
            };

            let cells = LabelsCellProvider::new(project, repository, self.api.clone());
            self.host.labels_table(cells).mount(*container);
            tables += 1;
        }
        tables
    }

    fn identifiers(&self, container: NodeId) -> Option<(ProjectId, RepositoryId)> {
        let link = self
            .host
            .select_within(container, TITLE_LINK)
            .first()
            .copied()?;
        let project = self.host.data(link, "project-id")?.trim().parse().ok()?;
        let repository = self.host.data(link, "repository-id")?.trim().parse().ok()?;
        Some((project, repository))
    }
}

impl View for DashboardView {
    fn name(&self) -> &'static str {
        NAME
    }

    fn mount(&self) -> MountHandle {
        let view = self.clone();
        tokio::spawn(async move {
            Ok(MountOutcome::Decorated {
                tables: view.decorate(),
            })
        })
    }
}
