//! Remote package registry
//!
//! # Architecture
//!
//! ```text
//! RegistryResolver         ← canonical names, link ordering, feed cap
//!     │             ╲
//!     │              PackageListCache   ← pkglist.json
//!     ▼
//! RegistryClient (trait)
//!     │
//!     ▼
//! PypiClient               ← JSON API, simple index, XML-RPC, RSS
//! ```

mod cache;
mod client;
mod feed;
mod pypi;
mod resolver;
mod types;
mod xml;
mod xmlrpc;

pub use cache::{CachedPackageList, PackageListCache};
pub use client::RegistryClient;
pub use feed::parse_feed;
pub use pypi::PypiClient;
pub use resolver::{RegistryResolver, RECENT_UPDATES_LIMIT};
pub use types::{
    DownloadLink, FeedEntry, LinkSource, PackageReleases, RefreshOutcome, ReleaseFile,
    SearchResult, SearchSpec,
};
