//! Screen views
//!
//! Each view is built from `(context, api, host)`. Construction checks the
//! page for the view's anchor first and yields [`ViewResult::NotApplicable`]
//! when it is missing; mounting a view that does not apply does nothing.

mod bridge;
mod dashboard;
mod details;
mod list;

pub use bridge::LabelBridge;
pub use dashboard::DashboardView;
pub use details::PullRequestDetailsView;
pub use list::{FilterWiring, PullRequestListView};

use crate::api::{ApiError, LabelsApi};
use crate::host::Host;
use crate::state::{AvatarSize, PageContext};
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};

/// Result of one mount attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// Widgets were attached
    Rendered,
    /// Another mount cycle was already in flight
    Skipped,
    /// The panel is already on screen
    AlreadyRendered,
    /// The anchor left the page before the data arrived
    Detached,
    /// The license notice was shown instead
    Unauthorized,
    /// Observation ended after this many page signals
    Observed { signals: usize },
    /// Dashboard containers that got a labels table
    Decorated { tables: usize },
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("mount task failed: {0}")]
    Task(#[from] JoinError),
}

/// Pending mount; resolves once the view's data has been fetched and rendered
pub type MountHandle = JoinHandle<Result<MountOutcome, ViewError>>;

pub trait View: Send + Sync {
    fn name(&self) -> &'static str;

    /// Start mounting and return right away
    fn mount(&self) -> MountHandle;
}

/// Outcome of constructing a view, decided once
pub enum ViewResult<V> {
    Applicable(V),
    NotApplicable,
}

impl<V: View + 'static> ViewResult<V> {
    pub fn is_applicable(&self) -> bool {
        matches!(self, Self::Applicable(_))
    }

    pub fn view(&self) -> Option<&V> {
        match self {
            Self::Applicable(view) => Some(view),
            Self::NotApplicable => None,
        }
    }

    pub fn into_view(self) -> Option<V> {
        match self {
            Self::Applicable(view) => Some(view),
            Self::NotApplicable => None,
        }
    }

    pub fn map(self, f: impl FnOnce(V) -> V) -> Self {
        match self {
            Self::Applicable(view) => Self::Applicable(f(view)),
            Self::NotApplicable => Self::NotApplicable,
        }
    }

    /// `None` when the view does not apply: no request, no page change
    pub fn mount(&self) -> Option<MountHandle> {
        self.view().map(View::mount)
    }

    fn boxed(self) -> Option<Box<dyn View>> {
        self.into_view().map(|view| Box::new(view) as Box<dyn View>)
    }
}

/// Construct every view for the page and mount the ones that apply
pub fn mount_applicable(
    context: Arc<PageContext>,
    api: Arc<dyn LabelsApi>,
    host: Arc<dyn Host>,
    avatar_size: AvatarSize,
) -> Vec<(&'static str, MountHandle)> {
    let views = [
        PullRequestListView::new(context.clone(), api.clone(), host.clone())
            .map(|view| view.with_avatar_size(avatar_size))
            .boxed(),
        PullRequestDetailsView::new(context.clone(), api.clone(), host.clone()).boxed(),
        DashboardView::new(context, api, host).boxed(),
    ];

    views
        .into_iter()
        .flatten()
        .map(|view| (view.name(), view.mount()))
        .collect()
}

/// Settle a failed fetch: 401 shows the license notice and ends the mount,
/// anything else goes back to the caller.
fn settle_failure(
    host: &dyn Host,
    view: &'static str,
    error: ApiError,
) -> Result<MountOutcome, ViewError> {
    if !error.is_unauthorized() {
        return Err(error.into());
    }
    tracing::info!(view, "labels api refused access, showing license notice");
    host.show_license_notice();
    Ok(MountOutcome::Unauthorized)
}

/// Run a mount in the background; errors are also handed to the host
fn spawn_reported<F>(host: Arc<dyn Host>, view: &'static str, mount: F) -> MountHandle
where
    F: Future<Output = Result<MountOutcome, ViewError>> + Send + 'static,
{
    tokio::spawn(async move {
        let result = mount.await;
        if let Err(err) = &result {
            report(host.as_ref(), view, err);
        }
        result
    })
}

fn report(host: &dyn Host, view: &'static str, err: &ViewError) {
    tracing::error!(view, "mount failed: {err}");
    host.report_error(err);
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
