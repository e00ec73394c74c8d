//! Host page seam
//!
//! The views never touch the host document directly. Everything they need
//! from the page (node lookup, mutation signals, notices and the widget
//! toolkit) goes through [`Host`].

mod static_page;
mod widgets;

pub use static_page::*;
pub use widgets::*;

use crate::state::Label;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Opaque handle to a node of the host document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The host page and its widget toolkit
pub trait Host: Send + Sync {
    /// Attached nodes matching `selector`, in document order
    fn select(&self, selector: &str) -> Vec<NodeId>;

    /// Attached descendants of `root` matching `selector`
    fn select_within(&self, root: NodeId, selector: &str) -> Vec<NodeId>;

    /// Data attribute of a node
    fn data(&self, node: NodeId, key: &str) -> Option<String>;

    /// Whether the node is still part of the document
    fn is_attached(&self, node: NodeId) -> bool;

    /// Whether the node carries the host's own table component state
    fn has_component_state(&self, node: NodeId) -> bool;

    /// Subscribe to insertions and mutations of `selector` below `root`.
    ///
    /// Nodes already matching are delivered first. The stream ends when the
    /// host drops the subscription.
    fn observe(&self, root: NodeId, selector: &str) -> UnboundedReceiver<NodeId>;

    /// Show the invalid-license notice
    fn show_license_notice(&self);

    /// Hand an error to the host's global error reporting
    fn report_error(&self, error: &dyn std::error::Error);

    fn label_filter(&self, table: NodeId, labels: &[Label]) -> Arc<dyn LabelFilter>;

    fn pull_request_list(&self, table: NodeId) -> Arc<dyn PullRequestList>;

    fn labels_table(&self, cells: LabelsCellProvider) -> Arc<dyn LabelsTable>;

    fn labels_panel(
        &self,
        options: PanelOptions,
        source: Arc<dyn LabelSource>,
    ) -> Arc<dyn LabelsPanel>;
}
