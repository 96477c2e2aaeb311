//! Tool catalog and invocation.
//!
//! The [`ToolRegistry`] is the capability table (name to contract and
//! handler); the [`ToolDispatcher`] looks tools up, coerces arguments and
//! turns every outcome into a tagged [`ToolOutcome`].

pub mod args;
pub mod builtin;
pub mod dispatcher;
pub mod registry;

pub use args::Arguments;
pub use dispatcher::{ToolDispatcher, ToolFailure, ToolFailureKind, ToolOutcome};
pub use registry::{Tool, ToolRegistry};
