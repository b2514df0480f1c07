//! Post-processing steps that turn a downloaded payload into an artifact.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use glob::Pattern;
use tar::Archive;
use tempfile::Builder;
use zip::ZipArchive;

use crate::error::WagsError;
use crate::transfer::PostProcess;

fn compile(pattern: &str) -> Result<Pattern, WagsError> {
    Pattern::new(pattern)
        .map_err(|err| WagsError::InvalidArgument(format!("bad member pattern {pattern}: {err}")))
}

fn member_matches(pattern: &Pattern, member: &Path) -> bool {
    let Some(full) = member.to_str() else {
        return false;
    };
    let base = member.file_name().and_then(|name| name.to_str());
    pattern.matches(full) || base.map(|name| pattern.matches(name)).unwrap_or(false)
}

/// Copy `reader` to `destination` through a sibling temporary file.
fn write_member<R: Read>(reader: &mut R, destination: &Path) -> Result<(), WagsError> {
    let parent = destination.parent().ok_or_else(|| {
        WagsError::Filesystem(format!("invalid destination {}", destination.display()))
    })?;
    fs::create_dir_all(parent).map_err(|err| WagsError::Filesystem(err.to_string()))?;
    let mut temp = Builder::new()
        .prefix(".wags_tails_member")
        .tempfile_in(parent)
        .map_err(|err| WagsError::Filesystem(err.to_string()))?;
    io::copy(reader, temp.as_file_mut()).map_err(|err| WagsError::Extraction(err.to_string()))?;
    temp.persist(destination)
        .map_err(|err| WagsError::Filesystem(err.error.to_string()))?;
    Ok(())
}

/// Extract the first regular file of a `.tar.gz` whose path (or file name)
/// matches a glob, saving it under the destination filename.
#[derive(Debug, Clone)]
pub struct TarGzMember {
    pattern: Pattern,
}

impl TarGzMember {
    pub fn new(pattern: &str) -> Result<Self, WagsError> {
        Ok(Self {
            pattern: compile(pattern)?,
        })
    }
}

impl PostProcess for TarGzMember {
    fn apply(&self, payload: &Path, destination: &Path) -> Result<(), WagsError> {
        let file = File::open(payload)
            .map_err(|err| WagsError::Filesystem(format!("open {}: {err}", payload.display())))?;
        let mut archive = Archive::new(GzDecoder::new(file));
        let entries = archive
            .entries()
            .map_err(|err| WagsError::Extraction(err.to_string()))?;
        for entry in entries {
            let mut entry = entry.map_err(|err| WagsError::Extraction(err.to_string()))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let path = entry
                .path()
                .map_err(|err| WagsError::Extraction(err.to_string()))?
                .into_owned();
            if member_matches(&self.pattern, &path) {
                tracing::debug!(member = %path.display(), "extracting tarball member");
                return write_member(&mut entry, destination);
            }
        }
        Err(WagsError::Extraction(format!(
            "no member matching {} in tarball",
            self.pattern
        )))
    }
}

/// Zip counterpart of [`TarGzMember`].
#[derive(Debug, Clone)]
pub struct ZipMember {
    pattern: Pattern,
}

impl ZipMember {
    pub fn new(pattern: &str) -> Result<Self, WagsError> {
        Ok(Self {
            pattern: compile(pattern)?,
        })
    }
}

impl PostProcess for ZipMember {
    fn apply(&self, payload: &Path, destination: &Path) -> Result<(), WagsError> {
        let file = File::open(payload).map_err(|err| {
            WagsError::Filesystem(format!("open zip {}: {err}", payload.display()))
        })?;
        let mut archive =
            ZipArchive::new(file).map_err(|err| WagsError::Extraction(err.to_string()))?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|err| WagsError::Extraction(err.to_string()))?;
            if !entry.is_file() {
                continue;
            }
            let Some(path) = entry.enclosed_name() else {
                continue;
            };
            if member_matches(&self.pattern, &path) {
                return write_member(&mut entry, destination);
            }
        }
        Err(WagsError::Extraction(format!(
            "no member matching {} in zip archive",
            self.pattern
        )))
    }
}

/// Decompress a single gzip stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gunzip;

impl PostProcess for Gunzip {
    fn apply(&self, payload: &Path, destination: &Path) -> Result<(), WagsError> {
        let file = File::open(payload)
            .map_err(|err| WagsError::Filesystem(format!("open {}: {err}", payload.display())))?;
        write_member(&mut GzDecoder::new(file), destination)
    }
}
