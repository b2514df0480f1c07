use camino::Utf8PathBuf;

use crate::error::WagsError;

/// Overrides the cache root; used as-is.
pub const WAGS_TAILS_DIR_VAR: &str = "WAGS_TAILS_DIR";
/// XDG user data home; the library subdirectory is appended.
pub const XDG_DATA_HOME_VAR: &str = "XDG_DATA_HOME";
/// Colon-separated XDG data directories, tried in order.
pub const XDG_DATA_DIRS_VAR: &str = "XDG_DATA_DIRS";
/// Subdirectory created under shared data locations.
pub const LIBRARY_DIR_NAME: &str = "wags_tails";

/// Per-instance settings, fixed when a data source is built.
#[derive(Debug, Clone, Default)]
pub struct SourceConfig {
    /// Directory holding this source's artifacts. Skips directory resolution
    /// entirely when set.
    pub data_dir: Option<Utf8PathBuf>,
    /// Suppress transfer progress output.
    pub silent: bool,
}

impl SourceConfig {
    pub fn silent() -> Self {
        Self {
            data_dir: None,
            silent: true,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<Utf8PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }
}

/// Flags accepted by `get_latest` / `get_specific`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Only consult the local cache.
    pub from_local: bool,
    /// Download again even if the version is cached.
    pub force_refresh: bool,
}

impl FetchOptions {
    pub fn from_local() -> Self {
        Self {
            from_local: true,
            force_refresh: false,
        }
    }

    pub fn force_refresh() -> Self {
        Self {
            from_local: false,
            force_refresh: true,
        }
    }

    pub fn validate(&self) -> Result<(), WagsError> {
        if self.from_local && self.force_refresh {
            return Err(WagsError::InvalidArgument(
                "cannot set both `force_refresh` and `from_local`".to_string(),
            ));
        }
        Ok(())
    }
}
