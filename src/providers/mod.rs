//! Concrete data sources shipped with the crate.

pub mod chembl;
pub mod mondo;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::{FetchOptions, SourceConfig};
use crate::domain::{KnownSource, SourceName, Version};
use crate::error::WagsError;
use crate::github::GitHubReleases;
use crate::source::DataSource;

pub use chembl::Chembl;
pub use mondo::mondo_releases;

pub type MondoData = DataSource<GitHubReleases>;
pub type ChemblData = DataSource<Chembl>;

/// A [`KnownSource`] opened over HTTP, so callers can pick a source at runtime.
pub enum SourceHandle {
    Mondo(MondoData),
    Chembl(ChemblData),
}

impl SourceHandle {
    pub fn open(source: KnownSource, config: SourceConfig) -> Result<Self, WagsError> {
        match source {
            KnownSource::Mondo => Ok(Self::Mondo(DataSource::new(mondo_releases()?, config)?)),
            KnownSource::Chembl => Ok(Self::Chembl(DataSource::new(Chembl::new()?, config)?)),
        }
    }

    pub fn name(&self) -> &SourceName {
        match self {
            Self::Mondo(source) => source.name(),
            Self::Chembl(source) => source.name(),
        }
    }

    pub fn data_dir(&self) -> &Utf8Path {
        match self {
            Self::Mondo(source) => source.data_dir(),
            Self::Chembl(source) => source.data_dir(),
        }
    }

    pub fn get_latest(&self, options: FetchOptions) -> Result<Utf8PathBuf, WagsError> {
        match self {
            Self::Mondo(source) => source.get_latest(options),
            Self::Chembl(source) => source.get_latest(options),
        }
    }

    pub fn get_specific(
        &self,
        version: &Version,
        options: FetchOptions,
    ) -> Result<Utf8PathBuf, WagsError> {
        match self {
            Self::Mondo(source) => source.get_specific(version, options),
            Self::Chembl(source) => Err(unsupported(source.name(), "specific versions")),
        }
    }

    pub fn versions(&self) -> Result<Vec<Version>, WagsError> {
        match self {
            Self::Mondo(source) => source.iterate_versions().collect(),
            Self::Chembl(source) => Err(unsupported(source.name(), "version listing")),
        }
    }
}

fn unsupported(name: &SourceName, what: &str) -> WagsError {
    WagsError::InvalidArgument(format!("{name} does not support {what}"))
}
