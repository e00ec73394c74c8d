//! Label and page state shared by the views

mod context;
mod guard;
mod label;
mod query;

pub use context::*;
pub use guard::*;
pub use label::*;
pub use query::*;
