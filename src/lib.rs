//! Pull-request labels for a code-review host
//!
//! Injects label filtering and label editing widgets into the pull-request
//! list, the pull-request detail panel and the dashboard of a host page.

pub mod api;
pub mod config;
pub mod host;
pub mod state;
pub mod views;

#[cfg(test)]
mod test_support;
