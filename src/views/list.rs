//! Pull-request list with a label filter

use crate::api::{ApiError, LabelsApi};
use crate::host::{FilterEvent, Host, LabelsCellProvider, NodeId, PullRequestList, SearchQuery};
use crate::state::{AvatarSize, Label, ListQuery, PageContext};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use super::{settle_failure, spawn_reported, MountHandle, MountOutcome, View, ViewError, ViewResult};

const NAME: &str = "pull-request-list";

/// Container of the pull-request list screen
pub const LIST_CONTAINER: &str = "#pull-requests-content";
/// Table element used by older host releases without component state
pub const LEGACY_TABLE: &str = ".pull-requests-table";
pub const FILTER_BAR: &str = ".filter-bar";

#[derive(Clone)]
pub struct PullRequestListView {
    context: Arc<PageContext>,
    api: Arc<dyn LabelsApi>,
    host: Arc<dyn Host>,
    container: NodeId,
    query: ListQuery,
}

impl PullRequestListView {
    pub fn new(
        context: Arc<PageContext>,
        api: Arc<dyn LabelsApi>,
        host: Arc<dyn Host>,
    ) -> ViewResult<Self> {
        let Some(container) = host.select(LIST_CONTAINER).first().copied() else {
            tracing::debug!(view = NAME, "no list container on page");
            return ViewResult::NotApplicable;
        };

        ViewResult::Applicable(Self {
            context,
            api,
            host,
            container,
            query: ListQuery::new(AvatarSize::default()),
        })
    }

    pub fn with_avatar_size(mut self, avatar_size: AvatarSize) -> Self {
        self.query = ListQuery::new(avatar_size);
        self
    }

    /// Filter selection shared with the list widget
    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    /// Fetch the repository labels and render the filter, list and table
    pub async fn load(&self) -> Result<MountOutcome, ViewError> {
        tracing::debug!(view = NAME, "fetching repository labels");
        let fetched = self
            .api
            .get_by_repository(self.context.project_id(), self.context.repository_id())
            .await;

        match fetched {
            Ok(response) => Ok(self.render(response.labels)),
            Err(err) => settle_failure(self.host.as_ref(), NAME, err),
        }
    }

    /// The container itself when it carries the host's table state,
    /// otherwise the nested legacy table
    fn table(&self) -> NodeId {
        if self.host.has_component_state(self.container) {
            return self.container;
        }
        self.host
            .select_within(self.container, LEGACY_TABLE)
            .first()
            .copied()
            .unwrap_or(self.container)
    }

    fn render(&self, labels: Vec<Label>) -> MountOutcome {
        if !self.host.is_attached(self.container) {
            tracing::debug!(view = NAME, "list container left the page, not rendering");
            return MountOutcome::Detached;
        }

        let table = self.table();
        let filter = self.host.label_filter(table, &labels);
        let search = SearchQuery::new(
            self.context.project_id(),
            self.context.repository_id(),
            self.query.clone(),
            self.api.clone(),
        );
        let list = self.host.pull_request_list(table);
        let wiring = FilterWiring::new(search, self.host.clone(), list);
        if let Some(events) = filter.take_events() {
            tokio::spawn(wiring.run(events));
        }

        if let Some(filter_bar) = self
            .host
            .select_within(self.container, FILTER_BAR)
            .first()
            .copied()
        {
            filter.mount(filter_bar);
        }

        let cells = LabelsCellProvider::new(
            self.context.project_id(),
            self.context.repository_id(),
            self.api.clone(),
        );
        self.host.labels_table(cells).mount(self.container);

        tracing::info!(view = NAME, labels = labels.len(), "label filter mounted");
        MountOutcome::Rendered
    }
}

impl View for PullRequestListView {
    fn name(&self) -> &'static str {
        NAME
    }

    fn mount(&self) -> MountHandle {
        let view = self.clone();
        spawn_reported(self.host.clone(), NAME, async move { view.load().await })
    }
}

/// Connects filter selection changes to the pull-request list
#[derive(Clone)]
pub struct FilterWiring {
    search: SearchQuery,
    host: Arc<dyn Host>,
    list: Arc<dyn PullRequestList>,
}

impl FilterWiring {
    pub fn new(search: SearchQuery, host: Arc<dyn Host>, list: Arc<dyn PullRequestList>) -> Self {
        Self { search, host, list }
    }

    /// Added selects the label and mounts the list; removed clears the
    /// selection and unmounts it
    pub fn apply(&self, event: FilterEvent) -> Result<(), ApiError> {
        match event {
            FilterEvent::Added(label) => {
                tracing::debug!(view = NAME, label = %label.name, "mounting filtered list");
                self.search.query.select(label.name);
                self.list.mount(self.search.clone())?;
            }
            FilterEvent::Removed(_) => {
                self.search.query.clear();
                self.list.unmount();
            }
        }
        Ok(())
    }

    async fn run(self, mut events: UnboundedReceiver<FilterEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(err) = self.apply(event) {
                tracing::error!(view = NAME, "filter change failed: {err}");
                self.host.report_error(&err);
            }
        }
    }
}
