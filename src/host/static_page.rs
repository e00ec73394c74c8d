//! In-memory host built from a page snapshot
//!
//! Nodes answer to the exact selector strings listed in the snapshot; there
//! is no CSS engine. Widgets created through the page record what they do so
//! the result of a mount can be inspected or printed.

use crate::state::{Label, PageContext, ProjectId, QueryParams, RepositoryId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{
    FilterEvent, Host, LabelFilter, LabelSource, LabelsCellProvider, LabelsPanel, LabelsTable,
    NodeId, PanelOptions, PullRequestList, SearchQuery,
};
use crate::api::ApiError;

fn visible_by_default() -> bool {
    true
}

/// One node of a page snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotNode {
    /// Selectors this node answers to
    #[serde(default)]
    pub selectors: Vec<String>,
    #[serde(default)]
    pub data: HashMap<String, String>,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    #[serde(default)]
    pub component_state: bool,
    #[serde(default)]
    pub children: Vec<SnapshotNode>,
}

impl SnapshotNode {
    pub fn new(selectors: &[&str]) -> Self {
        Self {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            data: HashMap::new(),
            visible: true,
            component_state: false,
            children: Vec::new(),
        }
    }

    pub fn with_data(mut self, key: &str, value: impl Into<String>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn with_component_state(mut self) -> Self {
        self.component_state = true;
        self
    }

    pub fn with_child(mut self, child: SnapshotNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Page description loaded by [`StaticPage`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub context: PageContext,
    /// Parameters the host adds to every pull-request list query
    #[serde(default)]
    pub list_params: QueryParams,
    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
}

/// Widget activity recorded by the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum WidgetEvent {
    FilterCreated {
        table: NodeId,
        labels: Vec<String>,
    },
    FilterMounted {
        filter_bar: NodeId,
    },
    ListMounted {
        url: String,
    },
    /// A later page of a mounted list
    ListFetched {
        url: String,
    },
    ListUnmounted,
    LabelsTableMounted {
        container: NodeId,
        project: ProjectId,
        repository: RepositoryId,
    },
    PanelAttached {
        container: NodeId,
        preselected: Vec<String>,
        allow_new: bool,
    },
}

/// A panel created through the page
#[derive(Clone)]
pub struct PanelRecord {
    pub container: Option<NodeId>,
    pub preselected: Vec<Label>,
    pub source: Arc<dyn LabelSource>,
}

struct NodeRecord {
    parent: Option<NodeId>,
    selectors: Vec<String>,
    data: HashMap<String, String>,
    visible: bool,
    component_state: bool,
    attached: bool,
    children: Vec<NodeId>,
}

struct Observer {
    root: NodeId,
    selector: String,
    tx: UnboundedSender<NodeId>,
}

#[derive(Default)]
struct PageState {
    nodes: Vec<NodeRecord>,
    observers: Vec<Observer>,
    observers_closed: bool,
    filters: Vec<UnboundedSender<FilterEvent>>,
    list_params: QueryParams,
    events: Vec<WidgetEvent>,
    license_notices: usize,
    errors: Vec<String>,
    panels: Vec<Arc<RecordingPanel>>,
    lists: Vec<Arc<RecordingList>>,
}

fn selector_matches(selectors: &[String], selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .any(|part| selectors.iter().any(|s| s == part))
}

impl PageState {
    fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id.0 as usize)
    }

    fn add_tree(&mut self, parent: Option<NodeId>, node: &SnapshotNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(NodeRecord {
            parent,
            selectors: node.selectors.clone(),
            data: node.data.clone(),
            visible: node.visible,
            component_state: node.component_state,
            attached: true,
            children: Vec::new(),
        });
        if let Some(record) = parent.and_then(|parent| self.nodes.get_mut(parent.0 as usize)) {
            record.children.push(id);
        }
        for child in &node.children {
            self.add_tree(Some(id), child);
        }
        id
    }

    fn snapshot_of(&self, id: NodeId) -> Option<SnapshotNode> {
        let record = self.node(id)?;
        Some(SnapshotNode {
            selectors: record.selectors.clone(),
            data: record.data.clone(),
            visible: record.visible,
            component_state: record.component_state,
            children: record
                .children
                .iter()
                .filter(|child| self.is_attached(**child))
                .filter_map(|child| self.snapshot_of(*child))
                .collect(),
        })
    }

    fn is_attached(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|record| record.attached)
    }

    fn matches(&self, id: NodeId, selector: &str) -> bool {
        self.node(id)
            .is_some_and(|record| record.attached && selector_matches(&record.selectors, selector))
    }

    /// Preorder walk of `id` and everything below it
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(record) = self.node(current) {
                out.push(current);
                stack.extend(record.children.iter().rev().copied());
            }
        }
        out
    }

    fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.node(node).and_then(|record| record.parent);
        }
        false
    }

    fn detach(&mut self, id: NodeId) {
        for node in self.subtree(id) {
            self.nodes[node.0 as usize].attached = false;
        }
    }

    /// Deliver a freshly inserted subtree to matching observers
    fn notify(&mut self, inserted: NodeId) {
        let subtree = self.subtree(inserted);
        let mut deliveries = Vec::new();
        for (index, observer) in self.observers.iter().enumerate() {
            if !self.is_attached(observer.root) || !self.is_within(inserted, observer.root) {
                continue;
            }
            for node in &subtree {
                if self.matches(*node, &observer.selector) {
                    deliveries.push((index, *node));
                }
            }
        }

        let mut closed = Vec::new();
        for (index, node) in deliveries {
            if self.observers[index].tx.send(node).is_err() {
                closed.push(index);
            }
        }
        let mut index = 0;
        self.observers.retain(|_| {
            let keep = !closed.contains(&index);
            index += 1;
            keep
        });
    }
}

fn lock(state: &Mutex<PageState>) -> MutexGuard<'_, PageState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn record(page: &Weak<Mutex<PageState>>, event: WidgetEvent) {
    if let Some(page) = page.upgrade() {
        lock(&page).events.push(event);
    }
}

/// Host page held in memory
#[derive(Clone)]
pub struct StaticPage {
    context: PageContext,
    state: Arc<Mutex<PageState>>,
}

impl StaticPage {
    pub fn new(snapshot: PageSnapshot) -> Self {
        let mut state = PageState {
            list_params: snapshot.list_params,
            ..Default::default()
        };
        for node in &snapshot.nodes {
            state.add_tree(None, node);
        }
        Self {
            context: snapshot.context,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn context(&self) -> &PageContext {
        &self.context
    }

    /// Insert a subtree, notifying observers. Returns `None` when `parent`
    /// is not an attached node.
    pub fn insert(&self, parent: Option<NodeId>, node: SnapshotNode) -> Option<NodeId> {
        let mut state = lock(&self.state);
        if parent.is_some_and(|parent| !state.is_attached(parent)) {
            return None;
        }
        let id = state.add_tree(parent, &node);
        state.notify(id);
        Some(id)
    }

    /// Detach a node and insert an identical copy in its place, the way a
    /// client-side re-render does. Returns the new node.
    pub fn replace(&self, node: NodeId) -> Option<NodeId> {
        let mut state = lock(&self.state);
        if !state.is_attached(node) {
            return None;
        }
        let parent = state.node(node)?.parent;
        let snapshot = state.snapshot_of(node)?;
        state.detach(node);
        let id = state.add_tree(parent, &snapshot);
        state.notify(id);
        Some(id)
    }

    pub fn remove(&self, node: NodeId) {
        lock(&self.state).detach(node);
    }

    pub fn set_visible(&self, node: NodeId, visible: bool) {
        if let Some(record) = lock(&self.state).nodes.get_mut(node.0 as usize) {
            record.visible = visible;
        }
    }

    /// Send a selection change to every filter widget. Returns how many
    /// filters received it.
    pub fn emit_filter(&self, event: FilterEvent) -> usize {
        let mut state = lock(&self.state);
        state.filters.retain(|tx| !tx.is_closed());
        state
            .filters
            .iter()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    /// Move every mounted list to another page with the given paging and
    /// sorting parameters. Returns how many lists fetched.
    pub fn load_list_page(&self, params: QueryParams) -> usize {
        let lists = {
            let mut state = lock(&self.state);
            state.list_params = params;
            state.lists.clone()
        };

        let mut fetched = 0;
        for list in lists {
            match list.fetch() {
                Some(Ok(url)) => {
                    record(&list.page, WidgetEvent::ListFetched { url });
                    fetched += 1;
                }
                Some(Err(err)) => lock(&self.state).errors.push(err.to_string()),
                None => {}
            }
        }
        fetched
    }

    /// End every mutation subscription. Later subscriptions only receive
    /// the nodes already present.
    pub fn close_observers(&self) {
        let mut state = lock(&self.state);
        state.observers.clear();
        state.observers_closed = true;
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.state).observers.len()
    }

    pub fn events(&self) -> Vec<WidgetEvent> {
        lock(&self.state).events.clone()
    }

    pub fn license_notices(&self) -> usize {
        lock(&self.state).license_notices
    }

    pub fn errors(&self) -> Vec<String> {
        lock(&self.state).errors.clone()
    }

    pub fn panels(&self) -> Vec<PanelRecord> {
        let panels = lock(&self.state).panels.clone();
        panels.iter().map(|panel| panel.snapshot()).collect()
    }
}

impl Host for StaticPage {
    fn select(&self, selector: &str) -> Vec<NodeId> {
        let state = lock(&self.state);
        (0..state.nodes.len() as u64)
            .map(NodeId)
            .filter(|id| state.matches(*id, selector))
            .collect()
    }

    fn select_within(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let state = lock(&self.state);
        if !state.is_attached(root) {
            return Vec::new();
        }
        state
            .subtree(root)
            .into_iter()
            .skip(1)
            .filter(|id| state.matches(*id, selector))
            .collect()
    }

    fn data(&self, node: NodeId, key: &str) -> Option<String> {
        lock(&self.state)
            .node(node)
            .and_then(|record| record.data.get(key).cloned())
    }

    fn is_attached(&self, node: NodeId) -> bool {
        lock(&self.state).is_attached(node)
    }

    fn has_component_state(&self, node: NodeId) -> bool {
        lock(&self.state)
            .node(node)
            .is_some_and(|record| record.component_state)
    }

    fn observe(&self, root: NodeId, selector: &str) -> UnboundedReceiver<NodeId> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = lock(&self.state);
        if state.is_attached(root) {
            for node in state.subtree(root) {
                if state.matches(node, selector) {
                    let _ = tx.send(node);
                }
            }
        }
        if !state.observers_closed {
            state.observers.push(Observer {
                root,
                selector: selector.to_string(),
                tx,
            });
        }
        rx
    }

    fn show_license_notice(&self) {
        lock(&self.state).license_notices += 1;
    }

    fn report_error(&self, error: &dyn std::error::Error) {
        lock(&self.state).errors.push(error.to_string());
    }

    fn label_filter(&self, table: NodeId, labels: &[Label]) -> Arc<dyn LabelFilter> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = lock(&self.state);
        state.filters.push(tx);
        state.events.push(WidgetEvent::FilterCreated {
            table,
            labels: labels.iter().map(|label| label.name.clone()).collect(),
        });
        Arc::new(RecordingFilter {
            page: Arc::downgrade(&self.state),
            events: Mutex::new(Some(rx)),
        })
    }

    fn pull_request_list(&self, _table: NodeId) -> Arc<dyn PullRequestList> {
        let list = Arc::new(RecordingList {
            page: Arc::downgrade(&self.state),
            search: Mutex::new(None),
        });
        lock(&self.state).lists.push(Arc::clone(&list));
        list
    }

    fn labels_table(&self, cells: LabelsCellProvider) -> Arc<dyn LabelsTable> {
        Arc::new(RecordingTable {
            page: Arc::downgrade(&self.state),
            cells,
        })
    }

    fn labels_panel(
        &self,
        options: PanelOptions,
        source: Arc<dyn LabelSource>,
    ) -> Arc<dyn LabelsPanel> {
        let panel = Arc::new(RecordingPanel {
            page: Arc::downgrade(&self.state),
            options,
            source,
            preselected: Mutex::new(Vec::new()),
            container: Mutex::new(None),
        });
        lock(&self.state).panels.push(Arc::clone(&panel));
        panel
    }
}

struct RecordingFilter {
    page: Weak<Mutex<PageState>>,
    events: Mutex<Option<UnboundedReceiver<FilterEvent>>>,
}

impl LabelFilter for RecordingFilter {
    fn take_events(&self) -> Option<UnboundedReceiver<FilterEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    fn mount(&self, filter_bar: NodeId) {
        record(&self.page, WidgetEvent::FilterMounted { filter_bar });
    }
}

struct RecordingList {
    page: Weak<Mutex<PageState>>,
    search: Mutex<Option<SearchQuery>>,
}

impl RecordingList {
    fn host_params(&self) -> QueryParams {
        self.page
            .upgrade()
            .map(|page| lock(&page).list_params.clone())
            .unwrap_or_default()
    }

    /// URL of the current page; `None` while unmounted
    fn fetch(&self) -> Option<Result<String, ApiError>> {
        let search = self
            .search
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()?;
        Some(search.url(&self.host_params()))
    }
}

impl PullRequestList for RecordingList {
    fn mount(&self, search: SearchQuery) -> Result<(), ApiError> {
        let url = search.url(&self.host_params())?;
        *self
            .search
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(search);
        record(&self.page, WidgetEvent::ListMounted { url });
        Ok(())
    }

    fn unmount(&self) {
        *self
            .search
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        record(&self.page, WidgetEvent::ListUnmounted);
    }
}

struct RecordingTable {
    page: Weak<Mutex<PageState>>,
    cells: LabelsCellProvider,
}

impl LabelsTable for RecordingTable {
    fn mount(&self, container: NodeId) {
        record(
            &self.page,
            WidgetEvent::LabelsTableMounted {
                container,
                project: self.cells.project,
                repository: self.cells.repository,
            },
        );
    }
}

struct RecordingPanel {
    page: Weak<Mutex<PageState>>,
    options: PanelOptions,
    source: Arc<dyn LabelSource>,
    preselected: Mutex<Vec<Label>>,
    container: Mutex<Option<NodeId>>,
}

impl RecordingPanel {
    fn snapshot(&self) -> PanelRecord {
        PanelRecord {
            container: *self
                .container
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
            preselected: self
                .preselected
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
            source: Arc::clone(&self.source),
        }
    }
}

impl LabelsPanel for RecordingPanel {
    fn preselect(&self, label: &Label) {
        self.preselected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(label.clone());
    }

    fn attach(&self, container: NodeId) {
        *self
            .container
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(container);
        let preselected = self
            .preselected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|label| label.name.clone())
            .collect();
        record(
            &self.page,
            WidgetEvent::PanelAttached {
                container,
                preselected,
                allow_new: self.options.allow_new,
            },
        );
    }

    /// Visible while the container it was attached to is attached and shown
    fn is_visible(&self) -> bool {
        let container = *self
            .container
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(container) = container else {
            return false;
        };
        self.page.upgrade().is_some_and(|page| {
            lock(&page)
                .node(container)
                .is_some_and(|record| record.attached && record.visible)
        })
    }
}
