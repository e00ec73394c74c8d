//! Label editor on the pull-request summary panel
//!
//! The host re-renders the pull-request page on its own, so this view
//! subscribes to page mutations and remounts whenever the summary panel or
//! its container shows up again. Remounts are serialized by a [`MountGuard`]:
//! a signal arriving while a fetch is running is dropped.

use crate::api::LabelsApi;
use crate::host::{Host, LabelsPanel, NodeId, PanelOptions};
use crate::state::{LabelSet, MountGuard, MountState, PageContext, PullRequestId};
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::{JoinError, JoinSet};

use super::{
    read, report, settle_failure, write, LabelBridge, MountHandle, MountOutcome, View, ViewError,
    ViewResult,
};

const NAME: &str = "pull-request-details";

/// Panel the label editor is appended to
pub const SUMMARY_PANEL: &str = ".pull-request-overview .summary-panel";
/// Part of the page watched for re-renders
pub const PAGE_ROOT: &str = ".aui-page-panel-inner";
/// Nodes whose insertion triggers a remount
pub const OBSERVED_TARGETS: &str = "#pull-requests-container, .summary-panel";

#[derive(Clone)]
pub struct PullRequestDetailsView {
    inner: Arc<DetailsInner>,
}

struct DetailsInner {
    context: Arc<PageContext>,
    api: Arc<dyn LabelsApi>,
    host: Arc<dyn Host>,
    pull_request: PullRequestId,
    anchor: RwLock<Option<NodeId>>,
    labels: Arc<RwLock<LabelSet>>,
    guard: MountGuard,
    panel: Mutex<Option<Arc<dyn LabelsPanel>>>,
    bridge: Arc<LabelBridge>,
}

impl PullRequestDetailsView {
    pub fn new(
        context: Arc<PageContext>,
        api: Arc<dyn LabelsApi>,
        host: Arc<dyn Host>,
    ) -> ViewResult<Self> {
        let Some(pull_request) = context.pull_request_id() else {
            tracing::debug!(view = NAME, "page has no pull request");
            return ViewResult::NotApplicable;
        };

        let labels = Arc::new(RwLock::new(LabelSet::default()));
        let bridge = Arc::new(LabelBridge::new(
            context.clone(),
            api.clone(),
            pull_request,
            labels.clone(),
        ));
        let anchor = host.select(SUMMARY_PANEL).first().copied();

        ViewResult::Applicable(Self {
            inner: Arc::new(DetailsInner {
                context,
                api,
                host,
                pull_request,
                anchor: RwLock::new(anchor),
                labels,
                guard: MountGuard::new(),
                panel: Mutex::new(None),
                bridge,
            }),
        })
    }

    /// Current copy of the fetched labels
    pub fn labels(&self) -> LabelSet {
        read(&self.inner.labels).clone()
    }

    pub fn mount_state(&self) -> MountState {
        self.inner.guard.state()
    }

    /// Look the summary panel up again; earlier handles may be stale
    pub fn resolve_anchor(&self) -> Option<NodeId> {
        let anchor = self.inner.host.select(SUMMARY_PANEL).first().copied();
        *write(&self.inner.anchor) = anchor;
        anchor
    }

    /// Fetch repository and pull-request labels together, then render.
    ///
    /// Returns [`MountOutcome::Skipped`] without fetching when another cycle
    /// is in flight. The guard is released however the cycle ends.
    pub async fn remount(&self) -> Result<MountOutcome, ViewError> {
        let Some(_cycle) = self.inner.guard.try_begin() else {
            tracing::debug!(view = NAME, "mount already in flight, dropping signal");
            return Ok(MountOutcome::Skipped);
        };

        let inner = &self.inner;
        let project = inner.context.project_id();
        let repository = inner.context.repository_id();

        tracing::debug!(view = NAME, pull_request = inner.pull_request, "fetching labels");
        let fetched = tokio::try_join!(
            inner.api.get_by_repository(project, repository),
            inner
                .api
                .get_by_pull_request(project, repository, inner.pull_request),
        );

        match fetched {
            Ok((all, pr)) => {
                *write(&inner.labels) = LabelSet::new(all.labels, pr.labels);
                Ok(self.render())
            }
            Err(err) => settle_failure(inner.host.as_ref(), NAME, err),
        }
    }

    fn render(&self) -> MountOutcome {
        let inner = &self.inner;

        let cached = *read(&inner.anchor);
        let anchor = match cached.filter(|node| inner.host.is_attached(*node)) {
            Some(anchor) => Some(anchor),
            None => self.resolve_anchor(),
        };
        let Some(anchor) = anchor else {
            tracing::debug!(view = NAME, "summary panel gone, not rendering");
            return MountOutcome::Detached;
        };

        let mut panel = inner
            .panel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if panel.as_ref().is_some_and(|existing| existing.is_visible()) {
            return MountOutcome::AlreadyRendered;
        }

        let created = inner
            .host
            .labels_panel(PanelOptions { allow_new: true }, inner.bridge.clone());
        for label in &read(&inner.labels).pr {
            created.preselect(label);
        }
        created.attach(anchor);
        *panel = Some(created);

        tracing::info!(view = NAME, %anchor, "labels panel mounted");
        MountOutcome::Rendered
    }

    /// Remount on every page signal until the subscription ends
    async fn watch(self) -> Result<MountOutcome, ViewError> {
        let host = self.inner.host.clone();
        let Some(root) = host.select(PAGE_ROOT).first().copied() else {
            tracing::warn!(view = NAME, "page root not found, nothing to observe");
            return Ok(MountOutcome::Observed { signals: 0 });
        };

        let mut signals = host.observe(root, OBSERVED_TARGETS);
        let mut cycles = JoinSet::new();
        let mut count = 0;

        loop {
            tokio::select! {
                signal = signals.recv() => {
                    let Some(target) = signal else { break };
                    count += 1;
                    tracing::debug!(view = NAME, %target, "page changed");
                    self.resolve_anchor();
                    let view = self.clone();
                    cycles.spawn(async move { view.remount().await });
                }
                Some(done) = cycles.join_next(), if !cycles.is_empty() => {
                    self.settle(done);
                }
            }
        }

        while let Some(done) = cycles.join_next().await {
            self.settle(done);
        }

        Ok(MountOutcome::Observed { signals: count })
    }

    fn settle(&self, done: Result<Result<MountOutcome, ViewError>, JoinError>) {
        let result = done.map_err(ViewError::from).and_then(|result| result);
        if let Err(err) = result {
            report(self.inner.host.as_ref(), NAME, &err);
        }
    }
}

impl View for PullRequestDetailsView {
    fn name(&self) -> &'static str {
        NAME
    }

    fn mount(&self) -> MountHandle {
        tokio::spawn(self.clone().watch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, LabelsResponse, MockLabelsApi};
    use crate::host::{LabelSource, PageSnapshot, SnapshotNode, StaticPage, WidgetEvent};
    use crate::state::Label;
    use crate::test_support::{settle, FakeApi};
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_pending, assert_ready};

    fn pr_page(pull_request: Option<PullRequestId>) -> Arc<StaticPage> {
        Arc::new(StaticPage::new(PageSnapshot {
            context: PageContext::new(1, 2, pull_request),
            list_params: Default::default(),
            nodes: vec![SnapshotNode::new(&[PAGE_ROOT]).with_child(
                SnapshotNode::new(&["#pull-requests-container"]).with_child(SnapshotNode::new(&[
                    ".summary-panel",
                    SUMMARY_PANEL,
                ])),
            )],
        }))
    }

    fn details(api: Arc<dyn LabelsApi>, page: &Arc<StaticPage>) -> PullRequestDetailsView {
        PullRequestDetailsView::new(Arc::new(page.context().clone()), api, page.clone())
            .into_view()
            .unwrap()
    }

    fn panel_events(page: &StaticPage) -> Vec<WidgetEvent> {
        page.events()
            .into_iter()
            .filter(|e| matches!(e, WidgetEvent::PanelAttached { .. }))
            .collect()
    }

    #[tokio::test]
    async fn test_without_pull_request_is_not_applicable() {
        let page = pr_page(None);
        let result = PullRequestDetailsView::new(
            Arc::new(page.context().clone()),
            Arc::new(MockLabelsApi::new()),
            page.clone(),
        );
        assert!(!result.is_applicable());
        assert!(result.mount().is_none());
        assert_eq!(page.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_remount_waits_for_both_fetches() {
        let page = pr_page(Some(3));
        let api = Arc::new(
            FakeApi::new(vec![Label::candidate("bug").with_id(1)], Vec::new()).gated(),
        );
        let view = details(api.clone(), &page);

        let mut task = tokio_test::task::spawn(view.remount());
        assert_pending!(task.poll());

        api.release_repository();
        assert_pending!(task.poll());
        assert!(page.panels().is_empty());

        api.release_pull_request();
        let outcome = assert_ready!(task.poll()).unwrap();
        assert_eq!(outcome, MountOutcome::Rendered);

        let panels = page.panels();
        assert_eq!(panels.len(), 1);
        assert!(panels[0].preselected.is_empty());
        let selectable = panels[0].source.query("");
        assert_eq!(selectable, vec![Label::candidate("bug").with_id(1)]);
    }

    #[tokio::test]
    async fn test_remount_preselects_pull_request_labels() {
        let page = pr_page(Some(3));
        let bug = Label::candidate("bug").with_id(1);
        let api = Arc::new(FakeApi::new(vec![bug.clone()], vec![bug.clone()]));
        let view = details(api, &page);

        view.remount().await.unwrap();

        assert_eq!(
            panel_events(&page),
            vec![WidgetEvent::PanelAttached {
                container: NodeId(2),
                preselected: vec!["bug".to_string()],
                allow_new: true,
            }]
        );
        assert_eq!(view.labels(), LabelSet::new(vec![bug.clone()], vec![bug]));
    }

    #[tokio::test]
    async fn test_concurrent_remount_is_dropped() {
        let page = pr_page(Some(3));
        let api = Arc::new(FakeApi::new(vec![Label::candidate("bug")], Vec::new()).gated());
        let view = details(api.clone(), &page);

        let mut first = tokio_test::task::spawn(view.remount());
        assert_pending!(first.poll());
        assert_eq!(view.mount_state(), MountState::InFlight);

        let mut second = tokio_test::task::spawn(view.remount());
        let skipped = assert_ready!(second.poll()).unwrap();
        assert_eq!(skipped, MountOutcome::Skipped);

        api.release_repository();
        api.release_pull_request();
        assert_eq!(assert_ready!(first.poll()).unwrap(), MountOutcome::Rendered);

        assert_eq!(api.repository_fetches(), 1);
        assert_eq!(api.pull_request_fetches(), 1);
        assert_eq!(panel_events(&page).len(), 1);
        assert_eq!(view.mount_state(), MountState::Idle);
    }

    #[tokio::test]
    async fn test_visible_panel_is_not_rendered_twice() {
        let page = pr_page(Some(3));
        let api = Arc::new(FakeApi::new(vec![Label::candidate("bug")], Vec::new()));
        let view = details(api.clone(), &page);

        assert_eq!(view.remount().await.unwrap(), MountOutcome::Rendered);
        assert_eq!(view.remount().await.unwrap(), MountOutcome::AlreadyRendered);
        assert_eq!(panel_events(&page).len(), 1);
        assert_eq!(api.repository_fetches(), 2);
    }

    #[tokio::test]
    async fn test_hidden_panel_is_rendered_again() {
        let page = pr_page(Some(3));
        let api = Arc::new(FakeApi::new(vec![Label::candidate("bug")], Vec::new()));
        let view = details(api, &page);

        view.remount().await.unwrap();
        page.set_visible(NodeId(2), false);
        view.resolve_anchor();
        assert_eq!(view.remount().await.unwrap(), MountOutcome::Rendered);
        assert_eq!(panel_events(&page).len(), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_shows_notice_and_releases_guard() {
        let page = pr_page(Some(3));
        let mut api = MockLabelsApi::new();
        api.expect_get_by_repository()
            .returning(|_, _| Err(ApiError::status(401, "")));
        api.expect_get_by_pull_request()
            .returning(|_, _, _| Ok(LabelsResponse::default()));
        let view = details(Arc::new(api), &page);

        assert_eq!(view.remount().await.unwrap(), MountOutcome::Unauthorized);
        assert_eq!(page.license_notices(), 1);
        assert!(page.panels().is_empty());
        assert_eq!(view.mount_state(), MountState::Idle);
    }

    #[tokio::test]
    async fn test_other_failure_is_raised_and_guard_released() {
        let page = pr_page(Some(3));
        let mut api = MockLabelsApi::new();
        api.expect_get_by_repository()
            .returning(|_, _| Ok(LabelsResponse::default()));
        api.expect_get_by_pull_request()
            .returning(|_, _, _| Err(ApiError::status(404, "no such pull request")));
        let view = details(Arc::new(api), &page);

        let err = view.remount().await.unwrap_err();
        assert!(matches!(err, ViewError::Api(ApiError::Status { status: 404, .. })));
        assert_eq!(page.license_notices(), 0);
        assert_eq!(view.mount_state(), MountState::Idle);
    }

    #[tokio::test]
    async fn test_failure_does_not_block_later_remount() {
        let page = pr_page(Some(3));
        let api = Arc::new(FakeApi::new(vec![Label::candidate("bug")], Vec::new()));
        api.fail_repository_once(500);
        let view = details(api.clone(), &page);

        assert!(view.remount().await.is_err());
        assert_eq!(view.remount().await.unwrap(), MountOutcome::Rendered);
    }

    #[tokio::test]
    async fn test_removed_anchor_skips_render() {
        let page = pr_page(Some(3));
        let api = Arc::new(FakeApi::new(vec![Label::candidate("bug")], Vec::new()));
        let view = details(api, &page);

        page.remove(NodeId(2));
        assert_eq!(view.remount().await.unwrap(), MountOutcome::Detached);
        assert!(page.panels().is_empty());
    }

    #[tokio::test]
    async fn test_mount_observes_page_and_renders_once_per_burst() {
        let page = pr_page(Some(3));
        let api = Arc::new(FakeApi::new(vec![Label::candidate("bug")], Vec::new()));
        let view = details(api.clone(), &page);

        let handle = view.mount();
        settle().await;
        // container and summary panel arrive together
        assert_eq!(panel_events(&page).len(), 1);
        assert_eq!(api.repository_fetches(), 1);

        page.close_observers();
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome, MountOutcome::Observed { signals: 2 });
    }

    #[tokio::test]
    async fn test_rerendered_page_gets_a_new_panel() {
        let page = pr_page(Some(3));
        let api = Arc::new(FakeApi::new(vec![Label::candidate("bug")], Vec::new()));
        let view = details(api.clone(), &page);

        let handle = view.mount();
        settle().await;

        let container = page.replace(NodeId(1)).unwrap();
        settle().await;

        let summary = page
            .select_within(container, SUMMARY_PANEL)
            .first()
            .copied()
            .unwrap();
        let attached: Vec<_> = panel_events(&page)
            .into_iter()
            .map(|e| match e {
                WidgetEvent::PanelAttached { container, .. } => container,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(attached, vec![NodeId(2), summary]);

        page.close_observers();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_watch_reports_failures_to_host() {
        let page = pr_page(Some(3));
        let api = Arc::new(FakeApi::new(Vec::new(), Vec::new()));
        api.fail_repository_once(500);
        let view = details(api, &page);

        let handle = view.mount();
        settle().await;
        page.close_observers();
        handle.await.unwrap().unwrap();

        assert_eq!(page.errors().len(), 1);
        assert!(page.errors()[0].contains("500"));
    }

    #[tokio::test]
    async fn test_missing_page_root_observes_nothing() {
        let page = Arc::new(StaticPage::new(PageSnapshot {
            context: PageContext::new(1, 2, Some(3)),
            list_params: Default::default(),
            nodes: Vec::new(),
        }));
        let view = details(Arc::new(MockLabelsApi::new()), &page);

        let outcome = view.mount().await.unwrap().unwrap();
        assert_eq!(outcome, MountOutcome::Observed { signals: 0 });
    }
}
