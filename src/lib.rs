//! Versioned acquisition and local caching of external datasets.
//!
//! A [`source::DataSource`] pairs a [`source::Provider`] (how to discover and
//! download releases) with a [`transfer::Transport`] and an on-disk
//! [`store::Store`]. Providers that can list their releases also implement
//! [`source::VersionEnumerable`], which unlocks `iterate_versions` and
//! `get_specific`.

pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod github;
pub mod output;
pub mod providers;
pub mod source;
pub mod store;
pub mod transfer;

pub use config::{FetchOptions, SourceConfig};
pub use domain::{KnownSource, SourceName, Version};
pub use error::WagsError;
pub use github::GitHubReleases;
pub use source::{DataSource, Provider, VersionEnumerable};
