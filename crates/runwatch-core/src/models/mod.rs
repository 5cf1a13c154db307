//! Data models for Runwatch

mod error_detail;
mod hierarchy;
mod run;
mod stats;

pub use error_detail::*;
pub use hierarchy::*;
pub use run::*;
pub use stats::*;
