//! Package repository handling.
//!
//! `normalize` classifies raw repo strings, `context` holds the registered
//! repositories and their metadata, `fetch` is the network seam, and
//! `registrar` drives the whole registration sequence.

pub mod context;
pub mod fetch;
pub mod normalize;
pub mod registrar;

pub use context::{RepoEntry, RepoUrls, ResolutionContext};
pub use fetch::{CurlFetcher, MetadataFetcher, RepoMd, RepoMdRecord};
pub use registrar::{register_repos, RepoOptions};
