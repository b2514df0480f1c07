use std::fs;
use std::io;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use glob::Pattern;
use tracing::debug;

use crate::config::{LIBRARY_DIR_NAME, WAGS_TAILS_DIR_VAR, XDG_DATA_DIRS_VAR, XDG_DATA_HOME_VAR};
use crate::domain::{SourceName, Version, compare_natural};
use crate::error::WagsError;

/// On-disk layout for one source: `{data_dir}/{name}_{version}.{filetype}`.
#[derive(Debug, Clone)]
pub struct Store {
    data_dir: Utf8PathBuf,
}

impl Store {
    /// Open the store for `name`, resolving the cache root from the
    /// environment unless `data_dir` is given. The directory is created if
    /// missing.
    pub fn open(name: &SourceName, data_dir: Option<Utf8PathBuf>) -> Result<Self, WagsError> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => resolve_base_directory()?.join(name.as_str()),
        };
        ensure_dir(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }

    pub fn artifact_path(
        &self,
        name: &SourceName,
        version: &Version,
        filetype: &str,
    ) -> Utf8PathBuf {
        self.data_dir.join(artifact_file_name(name, version, filetype))
    }

    pub fn latest_local(&self, pattern: &str) -> Result<Utf8PathBuf, WagsError> {
        latest_local(&self.data_dir, pattern)
    }
}

pub fn artifact_file_name(name: &SourceName, version: &Version, filetype: &str) -> String {
    format!("{name}_{version}.{filetype}")
}

/// Glob matching every cached artifact of a source.
pub fn artifact_glob(name: &SourceName, filetype: &str) -> String {
    format!("{}_*.{}", Pattern::escape(name.as_str()), Pattern::escape(filetype))
}

/// Resolve the cache root from the process environment and create it.
pub fn resolve_base_directory() -> Result<Utf8PathBuf, WagsError> {
    resolve_base_directory_with(|key| std::env::var(key).ok())
}

/// Resolve the cache root with a custom variable lookup.
///
/// First match wins: `WAGS_TAILS_DIR` as-is, `XDG_DATA_HOME/wags_tails`, the
/// first entry of `XDG_DATA_DIRS` (with `wags_tails` appended) that is not an
/// existing plain file, then the platform user-data directory.
pub fn resolve_base_directory_with<F>(lookup: F) -> Result<Utf8PathBuf, WagsError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    let base = if let Some(dir) = var(WAGS_TAILS_DIR_VAR) {
        Utf8PathBuf::from(dir)
    } else if let Some(dir) = var(XDG_DATA_HOME_VAR) {
        Utf8PathBuf::from(dir).join(LIBRARY_DIR_NAME)
    } else if let Some(dirs) = var(XDG_DATA_DIRS_VAR) {
        let candidate = dirs
            .split(':')
            .filter(|dir| !dir.is_empty())
            .map(|dir| Utf8PathBuf::from(dir).join(LIBRARY_DIR_NAME))
            .find(|candidate| !candidate.as_std_path().is_file());
        match candidate {
            Some(dir) => dir,
            None => default_base_directory()?,
        }
    } else {
        default_base_directory()?
    };

    debug!(path = %base, "resolved data directory");
    ensure_dir(&base)?;
    Ok(base)
}

fn default_base_directory() -> Result<Utf8PathBuf, WagsError> {
    let dirs = BaseDirs::new().ok_or_else(|| {
        WagsError::Filesystem("unable to resolve user data directory".to_string())
    })?;
    to_utf8(dirs.data_dir().join(LIBRARY_DIR_NAME))
}

/// Most recent artifact in `dir` whose file name matches `pattern`.
///
/// Candidates are ordered with [`compare_natural`], so `chembl_10.db` beats
/// `chembl_9.db` and dated tags keep their chronological order.
pub fn latest_local(dir: &Utf8Path, pattern: &str) -> Result<Utf8PathBuf, WagsError> {
    let matcher = Pattern::new(pattern)
        .map_err(|err| WagsError::InvalidArgument(format!("bad pattern {pattern}: {err}")))?;

    let entries = match fs::read_dir(dir.as_std_path()) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(WagsError::NotFound(format!("{pattern} in {dir}")));
        }
        Err(err) => return Err(WagsError::Filesystem(err.to_string())),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| WagsError::Filesystem(err.to_string()))?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if matcher.matches(&name) {
            names.push(name);
        }
    }
    names.sort_by(|a, b| compare_natural(a, b));

    names
        .pop()
        .map(|name| dir.join(name))
        .ok_or_else(|| WagsError::NotFound(format!("{pattern} in {dir}")))
}

pub fn ensure_dir(path: &Utf8Path) -> Result<(), WagsError> {
    fs::create_dir_all(path.as_std_path())
        .map_err(|err| WagsError::Filesystem(format!("create {path}: {err}")))
}

pub fn to_utf8(path: PathBuf) -> Result<Utf8PathBuf, WagsError> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|path| WagsError::Filesystem(format!("non UTF-8 path: {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn temp_utf8() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        (temp, path)
    }

    #[test]
    fn latest_local_prefers_numeric_order() {
        let (_temp, dir) = temp_utf8();
        for name in ["chembl_9.db", "chembl_10.db", "chembl_33.db", "other_40.db"] {
            fs::write(dir.join(name), b"").unwrap();
        }
        let latest = latest_local(&dir, "chembl_*.db").unwrap();
        assert_eq!(latest, dir.join("chembl_33.db"));
    }

    #[test]
    fn latest_local_missing_dir_is_not_found() {
        let (_temp, dir) = temp_utf8();
        let err = latest_local(&dir.join("absent"), "mondo_*.owl").unwrap_err();
        assert_matches!(err, WagsError::NotFound(_));
    }

    #[test]
    fn artifact_glob_escapes_metacharacters() {
        let name: SourceName = "mondo".parse().unwrap();
        assert_eq!(artifact_glob(&name, "owl"), "mondo_*.owl");
    }

    #[test]
    fn data_dirs_skip_plain_files() {
        let (_temp, root) = temp_utf8();
        let blocked = root.join("blocked");
        fs::create_dir_all(&blocked).unwrap();
        fs::write(blocked.join(LIBRARY_DIR_NAME), b"not a dir").unwrap();
        let open = root.join("open");

        let dirs = format!("{blocked}:{open}");
        let resolved = resolve_base_directory_with(|key| match key {
            XDG_DATA_DIRS_VAR => Some(dirs.clone()),
            _ => None,
        })
        .unwrap();
        assert_eq!(resolved, open.join(LIBRARY_DIR_NAME));
        assert!(resolved.as_std_path().is_dir());
    }
}
