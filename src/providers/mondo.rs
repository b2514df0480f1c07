use crate::error::WagsError;
use crate::github::GitHubReleases;

pub const MONDO_REPO: &str = "monarch-initiative/mondo";
pub const MONDO_ASSET: &str = "mondo.owl";

/// Mondo Disease Ontology, published as `mondo.owl` on every GitHub release.
pub fn mondo_releases() -> Result<GitHubReleases, WagsError> {
    Ok(GitHubReleases::new(
        "mondo".parse()?,
        MONDO_REPO,
        MONDO_ASSET,
        "owl",
    ))
}
