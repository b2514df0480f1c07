use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::HeaderMap;

use crate::domain::{SourceName, Version};
use crate::error::WagsError;
use crate::extract::TarGzMember;
use crate::source::Provider;
use crate::transfer::{DownloadRequest, Transport};

pub const CHEMBL_BASE_URL: &str = "https://ftp.ebi.ac.uk/pub/databases/chembl/ChEMBLdb";

static RELEASE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*\s*Release:\s*chembl_(\d+)").expect("release line pattern is valid")
});

/// ChEMBL SQLite dumps. The release number is read from the README of the
/// `latest` directory and the database is pulled out of the release tarball.
#[derive(Debug, Clone)]
pub struct Chembl {
    name: SourceName,
    base_url: String,
}

impl Chembl {
    pub fn new() -> Result<Self, WagsError> {
        Ok(Self {
            name: "chembl".parse()?,
            base_url: CHEMBL_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn readme_url(&self) -> String {
        format!("{}/latest/README", self.base_url)
    }

    pub fn tarball_url(&self, version: &Version) -> String {
        format!("{}/latest/chembl_{version}_sqlite.tar.gz", self.base_url)
    }
}

impl Provider for Chembl {
    fn name(&self) -> &SourceName {
        &self.name
    }

    fn filetype(&self) -> &str {
        "db"
    }

    fn latest_version(&self, transport: &dyn Transport) -> Result<Version, WagsError> {
        let readme = transport.get_text(&self.readme_url(), &HeaderMap::new())?;
        parse_release_number(&readme)
    }

    fn download_request(&self, version: &Version) -> Result<DownloadRequest, WagsError> {
        Ok(DownloadRequest::new(self.tarball_url(version))
            .with_post_process(TarGzMember::new("chembl_*.db")?))
    }
}

pub fn parse_release_number(readme: &str) -> Result<Version, WagsError> {
    readme
        .lines()
        .find_map(|line| RELEASE_LINE.captures(line.trim_start()))
        .and_then(|caps| caps.get(1))
        .map(|number| number.as_str().parse::<Version>())
        .transpose()?
        .ok_or_else(|| {
            WagsError::RemoteParse(
                "unable to find the ChEMBL release number in the latest README".to_string(),
            )
        })
}
