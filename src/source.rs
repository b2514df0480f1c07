use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::config::{FetchOptions, SourceConfig};
use crate::domain::{SourceName, Version};
use crate::error::WagsError;
use crate::store::{Store, artifact_glob};
use crate::transfer::{
    ConsoleProgress, DownloadRequest, Downloader, HttpTransport, NoopProgress, ProgressSink,
    Transport,
};

/// Provider-specific knowledge: how to find the newest release and where to
/// download a given one from.
pub trait Provider {
    fn name(&self) -> &SourceName;

    /// Extension of cached artifacts, without the leading dot.
    fn filetype(&self) -> &str;

    fn latest_version(&self, transport: &dyn Transport) -> Result<Version, WagsError>;

    fn download_request(&self, version: &Version) -> Result<DownloadRequest, WagsError>;
}

/// Lazily produced versions, newest first.
pub type Versions<'a> = Box<dyn Iterator<Item = Result<Version, WagsError>> + 'a>;

/// Providers that can list every published version, not only the newest.
pub trait VersionEnumerable: Provider {
    /// Start a fresh listing. No request is made until the first item is
    /// pulled.
    fn iterate_versions<'a>(&'a self, transport: &'a dyn Transport) -> Versions<'a>;
}

/// A cached, versioned view over one remote dataset.
pub struct DataSource<P: Provider, T: Transport = HttpTransport> {
    provider: P,
    store: Store,
    downloader: Downloader<T>,
}

impl<P: Provider> DataSource<P, HttpTransport> {
    pub fn new(provider: P, config: SourceConfig) -> Result<Self, WagsError> {
        Self::with_transport(provider, HttpTransport::new()?, config)
    }
}

impl<P: Provider, T: Transport> DataSource<P, T> {
    pub fn with_transport(
        provider: P,
        transport: T,
        config: SourceConfig,
    ) -> Result<Self, WagsError> {
        let store = Store::open(provider.name(), config.data_dir)?;
        let progress: Box<dyn ProgressSink> = if config.silent {
            Box::new(NoopProgress)
        } else {
            Box::new(ConsoleProgress::new())
        };
        Ok(Self {
            provider,
            store,
            downloader: Downloader::new(transport, progress),
        })
    }

    /// Replace the progress reporter used for every later transfer.
    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.downloader.set_progress(progress);
        self
    }

    pub fn name(&self) -> &SourceName {
        self.provider.name()
    }

    pub fn data_dir(&self) -> &Utf8Path {
        self.store.data_dir()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn transport(&self) -> &T {
        self.downloader.transport()
    }

    /// Path to the newest version of the data.
    ///
    /// `from_local` only looks at the cache; `force_refresh` downloads even
    /// if the newest version is already cached. Setting both is an error.
    pub fn get_latest(&self, options: FetchOptions) -> Result<Utf8PathBuf, WagsError> {
        options.validate()?;
        if options.from_local {
            return self
                .store
                .latest_local(&artifact_glob(self.name(), self.provider.filetype()));
        }

        let version = self.provider.latest_version(self.downloader.transport())?;
        debug!(source = %self.name(), %version, "discovered latest version");
        self.fetch_version(&version, options.force_refresh)
    }

    fn fetch_version(
        &self,
        version: &Version,
        force_refresh: bool,
    ) -> Result<Utf8PathBuf, WagsError> {
        let path = self
            .store
            .artifact_path(self.name(), version, self.provider.filetype());
        if !force_refresh && path.as_std_path().exists() {
            debug!(source = %self.name(), %version, %path, "cache hit");
            return Ok(path);
        }

        let request = self.provider.download_request(version)?;
        self.downloader.download(
            &request.url,
            &path,
            &request.headers,
            request.post_process.as_deref(),
        )?;
        info!(source = %self.name(), %version, %path, "stored new version");
        Ok(path)
    }
}

impl<P: VersionEnumerable, T: Transport> DataSource<P, T> {
    /// Every published version, newest first. Each call restarts the listing.
    pub fn iterate_versions(&self) -> Versions<'_> {
        self.provider.iterate_versions(self.downloader.transport())
    }

    /// Path to exactly `version`. With `from_local`, only a cached file for
    /// that version counts; other cached versions are ignored.
    pub fn get_specific(
        &self,
        version: &Version,
        options: FetchOptions,
    ) -> Result<Utf8PathBuf, WagsError> {
        options.validate()?;
        if options.from_local {
            let path = self
                .store
                .artifact_path(self.name(), version, self.provider.filetype());
            if !path.as_std_path().exists() {
                return Err(WagsError::NotFound(format!(
                    "{} version {version} in {}",
                    self.name(),
                    self.store.data_dir()
                )));
            }
            return Ok(path);
        }
        self.fetch_version(version, options.force_refresh)
    }
}
