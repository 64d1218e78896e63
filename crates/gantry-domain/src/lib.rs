//! Gantry Build Domain Model
//!
//! Defines the types flowing through the log-distribution layer:
//! - `Build`: a build as the distributor describes it (id, project, status)
//! - `BuildDelta`: the field-change map attached to a build update
//! - `LogLine`: a numbered, newline-free line of build output
//! - `DistributorEvent`: the lifecycle/data event stream the distributor emits
//!
//! All objects are serializable. This crate performs no I/O; builds are
//! created and mutated exclusively by the external distributor, and the
//! distribution layer only reacts to them.

pub mod build;
pub mod events;
pub mod log_line;

pub use build::{Build, BuildDelta, BuildId, BuildStatus, ProjectRef};
pub use events::DistributorEvent;
pub use log_line::LogLine;

/// Gantry domain version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
