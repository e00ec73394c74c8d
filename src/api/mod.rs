//! Labels API collaborator
//!
//! The views talk to the remote label store only through [`LabelsApi`];
//! [`HttpLabelsApi`] is the REST implementation.

mod client;
mod error;
mod traits;

pub use client::HttpLabelsApi;
pub use error::{ApiError, FailureKind};
pub use traits::{AddedLabel, LabelsApi, LabelsResponse};

#[cfg(test)]
pub use traits::MockLabelsApi;
