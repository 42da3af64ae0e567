//! Installed Python distributions
//!
//! # Architecture
//!
//! ```text
//! interpreter sys.path
//!     │
//!     ▼
//! SitePackagesProvider     ← *.dist-info / *.egg-info / *.egg
//!     │  (DistributionProvider)
//!     ▼
//! LocalResolver            ← scope, name, version filtering; dependencies
//! ```

mod provider;
mod record;
mod resolver;
mod site_packages;

pub use provider::{DistributionFilter, DistributionProvider, StaticProvider};
pub use record::{DependencySpec, DistributionRecord, Scope};
pub use resolver::{DependencyGroup, LocalResolver};
pub use site_packages::SitePackagesProvider;
