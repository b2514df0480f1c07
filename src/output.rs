use std::io::{self, Write};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::domain::{SourceName, Version};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub source: SourceName,
    pub requested: Option<Version>,
    pub path: Utf8PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionsResult {
    pub source: SourceName,
    pub versions: Vec<Version>,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(result: &FetchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_versions(result: &VersionsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct HumanOutput;

impl HumanOutput {
    pub fn print_fetch(result: &FetchResult) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", result.path)
    }

    pub fn print_versions(result: &VersionsResult) -> io::Result<()> {
        let mut stdout = io::stdout();
        for version in &result.versions {
            writeln!(stdout, "{version}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_result_serializes_flat_strings() {
        let result = FetchResult {
            source: "mondo".parse().unwrap(),
            requested: None,
            path: Utf8PathBuf::from("/data/mondo/mondo_v2023-09-12.owl"),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["source"], "mondo");
        assert_eq!(value["path"], "/data/mondo/mondo_v2023-09-12.owl");
        assert!(value["requested"].is_null());
    }
}
