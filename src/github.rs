use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::domain::{SourceName, Version};
use crate::error::WagsError;
use crate::source::{Provider, VersionEnumerable, Versions};
use crate::transfer::{DownloadRequest, Transport};

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITHUB_WEB_URL: &str = "https://github.com";
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Versions are release tag names of a GitHub repository; each release is
/// expected to carry the same asset filename.
///
/// Only the first page of the release listing is consulted.
#[derive(Debug, Clone)]
pub struct GitHubReleases {
    name: SourceName,
    repo: String,
    asset: String,
    filetype: String,
    api_base: String,
    web_base: String,
    token: Option<String>,
}

impl GitHubReleases {
    pub fn new(
        name: SourceName,
        repo: impl Into<String>,
        asset: impl Into<String>,
        filetype: impl Into<String>,
    ) -> Self {
        let token = std::env::var(GITHUB_TOKEN_VAR)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        Self {
            name,
            repo: repo.into(),
            asset: asset.into(),
            filetype: filetype.into(),
            api_base: GITHUB_API_URL.to_string(),
            web_base: GITHUB_WEB_URL.to_string(),
            token,
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_web_base(mut self, base: impl Into<String>) -> Self {
        self.web_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn releases_url(&self) -> String {
        format!("{}/repos/{}/releases", self.api_base, self.repo)
    }

    pub fn latest_release_url(&self) -> String {
        format!("{}/repos/{}/releases/latest", self.api_base, self.repo)
    }

    pub fn asset_url(&self, version: &Version) -> String {
        format!(
            "{}/{}/releases/download/{}/{}",
            self.web_base, self.repo, version, self.asset
        )
    }

    fn api_headers(&self) -> Result<HeaderMap, WagsError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        if let Some(token) = &self.token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|err| WagsError::InvalidArgument(err.to_string()))?,
            );
        }
        Ok(headers)
    }

    /// Tag names from the first page of the release listing, in listing order.
    pub fn list_releases(&self, transport: &dyn Transport) -> Result<Vec<Version>, WagsError> {
        let url = self.releases_url();
        let text = transport.get_text(&url, &self.api_headers()?)?;
        parse_release_tags(&text)
    }

    pub fn iter_tags<'a>(&'a self, transport: &'a dyn Transport) -> ReleaseTags<'a> {
        ReleaseTags {
            releases: self,
            transport,
            state: TagState::Pending,
        }
    }
}

impl Provider for GitHubReleases {
    fn name(&self) -> &SourceName {
        &self.name
    }

    fn filetype(&self) -> &str {
        &self.filetype
    }

    fn latest_version(&self, transport: &dyn Transport) -> Result<Version, WagsError> {
        let url = self.latest_release_url();
        let text = transport.get_text(&url, &self.api_headers()?)?;
        let release: Value = serde_json::from_str(&text)
            .map_err(|err| WagsError::RemoteParse(format!("{url}: {err}")))?;
        release_tag(&release)
    }

    fn download_request(&self, version: &Version) -> Result<DownloadRequest, WagsError> {
        Ok(DownloadRequest::new(self.asset_url(version)))
    }
}

impl VersionEnumerable for GitHubReleases {
    fn iterate_versions<'a>(&'a self, transport: &'a dyn Transport) -> Versions<'a> {
        Box::new(self.iter_tags(transport))
    }
}

enum TagState {
    Pending,
    Listing(std::vec::IntoIter<Version>),
    Done,
}

/// Lazy iterator over release tags. The listing is requested on the first
/// call to `next`; a failed request is yielded once and ends the sequence.
pub struct ReleaseTags<'a> {
    releases: &'a GitHubReleases,
    transport: &'a dyn Transport,
    state: TagState,
}

impl Iterator for ReleaseTags<'_> {
    type Item = Result<Version, WagsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, TagState::Pending) {
            match self.releases.list_releases(self.transport) {
                Ok(tags) => self.state = TagState::Listing(tags.into_iter()),
                Err(err) => {
                    self.state = TagState::Done;
                    return Some(Err(err));
                }
            }
        }
        match &mut self.state {
            TagState::Listing(tags) => tags.next().map(Ok),
            _ => None,
        }
    }
}

pub fn parse_release_tags(text: &str) -> Result<Vec<Version>, WagsError> {
    let listing: Value = serde_json::from_str(text)
        .map_err(|err| WagsError::RemoteParse(format!("release listing: {err}")))?;
    let releases = listing
        .as_array()
        .ok_or_else(|| WagsError::RemoteParse("release listing is not an array".to_string()))?;
    releases.iter().map(release_tag).collect()
}

fn release_tag(release: &Value) -> Result<Version, WagsError> {
    let tag = release
        .get("tag_name")
        .and_then(|value| value.as_str())
        .ok_or_else(|| WagsError::RemoteParse("release without tag_name".to_string()))?;
    tag.parse()
        .map_err(|_| WagsError::RemoteParse(format!("unusable release tag {tag:?}")))
}
