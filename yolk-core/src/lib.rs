//! yolk - query installed Python packages and the PyPI registry
//!
//! Two resolvers share one metadata model:
//!
//! - [`local::LocalResolver`] answers from the distributions installed on an
//!   interpreter's `sys.path`.
//! - [`registry::RegistryResolver`] answers from a PyPI-style registry.

pub mod config;
pub mod error;
pub mod local;
pub mod metadata;
pub mod registry;

pub use error::{Result, YolkError};
