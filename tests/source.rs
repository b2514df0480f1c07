mod common;

use std::path::Path;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;

use wags_tails::config::{
    FetchOptions, LIBRARY_DIR_NAME, SourceConfig, WAGS_TAILS_DIR_VAR, XDG_DATA_DIRS_VAR,
    XDG_DATA_HOME_VAR,
};
use wags_tails::domain::{SourceName, Version};
use wags_tails::error::WagsError;
use wags_tails::source::{DataSource, Provider};
use wags_tails::store::resolve_base_directory_with;
use wags_tails::transfer::{DownloadRequest, PostProcess, ProgressEvent, ProgressSink, Transport};

use common::{MockTransport, temp_dir, touch};

const MANIFEST_URL: &str = "https://files.example.org/hgnc/LATEST";

/// Manifest-driven provider: the latest version is the body of a text file.
struct ManifestSource {
    name: SourceName,
}

impl ManifestSource {
    fn new() -> Self {
        Self {
            name: "hgnc".parse().unwrap(),
        }
    }
}

impl Provider for ManifestSource {
    fn name(&self) -> &SourceName {
        &self.name
    }

    fn filetype(&self) -> &str {
        "json"
    }

    fn latest_version(&self, transport: &dyn Transport) -> Result<Version, WagsError> {
        let text = transport.get_text(MANIFEST_URL, &Default::default())?;
        text.trim()
            .parse()
            .map_err(|_| WagsError::RemoteParse(format!("bad manifest {text:?}")))
    }

    fn download_request(&self, version: &Version) -> Result<DownloadRequest, WagsError> {
        Ok(DownloadRequest::new(format!(
            "https://files.example.org/hgnc/{version}/hgnc.json.raw"
        ))
        .with_post_process(Trim))
    }
}

struct Trim;

impl PostProcess for Trim {
    fn apply(&self, payload: &Path, destination: &Path) -> Result<(), WagsError> {
        let content = std::fs::read_to_string(payload)
            .map_err(|err| WagsError::Filesystem(err.to_string()))?;
        std::fs::write(destination, content.trim())
            .map_err(|err| WagsError::Filesystem(err.to_string()))
    }
}

#[derive(Clone, Default)]
struct CountingSink {
    finished: Arc<Mutex<usize>>,
}

impl ProgressSink for CountingSink {
    fn event(&self, event: ProgressEvent<'_>) {
        if let ProgressEvent::Finished { .. } = event {
            *self.finished.lock().unwrap() += 1;
        }
    }
}

fn open(data_dir: camino::Utf8PathBuf) -> DataSource<ManifestSource, MockTransport> {
    DataSource::with_transport(
        ManifestSource::new(),
        MockTransport::new(),
        SourceConfig::silent().with_data_dir(data_dir),
    )
    .unwrap()
}

#[test]
fn conflicting_flags_fail_before_any_request() {
    let (_temp, root) = temp_dir();
    let source = open(root.join("hgnc"));
    touch(&root.join("hgnc").join("hgnc_10.json"));

    let err = source
        .get_latest(FetchOptions {
            from_local: true,
            force_refresh: true,
        })
        .unwrap_err();
    assert_matches!(err, WagsError::InvalidArgument(_));
    assert_eq!(source.transport().call_count(), 0);
}

#[test]
fn local_lookup_orders_numeric_versions() {
    let (_temp, root) = temp_dir();
    let data_dir = root.join("hgnc");
    let source = open(data_dir.clone());
    for version in ["10", "9", "2"] {
        touch(&data_dir.join(format!("hgnc_{version}.json")));
    }
    touch(&data_dir.join("hgnc_11.tsv"));

    let latest = source.get_latest(FetchOptions::from_local()).unwrap();
    assert_eq!(latest, data_dir.join("hgnc_10.json"));
}

#[test]
fn download_runs_post_process_and_reports_progress() {
    let (_temp, root) = temp_dir();
    let data_dir = root.join("hgnc");
    let sink = CountingSink::default();
    let source = open(data_dir.clone()).with_progress(Box::new(sink.clone()));
    source.transport().route(MANIFEST_URL, "2024-01-05\n");
    source.transport().route(
        "https://files.example.org/hgnc/2024-01-05/hgnc.json.raw",
        "  {\"docs\": []}  \n",
    );

    let path = source.get_latest(FetchOptions::default()).unwrap();
    assert_eq!(path, data_dir.join("hgnc_2024-01-05.json"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"docs\": []}");
    assert_eq!(*sink.finished.lock().unwrap(), 1);

    let entries: Vec<_> = std::fs::read_dir(&data_dir).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn failed_transfer_leaves_no_artifact() {
    let (_temp, root) = temp_dir();
    let data_dir = root.join("hgnc");
    let source = open(data_dir.clone());
    source.transport().route(MANIFEST_URL, "2024-01-05");

    let err = source.get_latest(FetchOptions::default()).unwrap_err();
    assert_matches!(err, WagsError::TransferStatus { status: 404, .. });
    assert_eq!(std::fs::read_dir(&data_dir).unwrap().count(), 0);
    assert_matches!(
        source.get_latest(FetchOptions::from_local()),
        Err(WagsError::NotFound(_))
    );
}

#[test]
fn unparseable_manifest_is_remote_parse_error() {
    let (_temp, root) = temp_dir();
    let source = open(root.join("hgnc"));
    source.transport().route(MANIFEST_URL, "../../etc");

    assert_matches!(
        source.get_latest(FetchOptions::default()),
        Err(WagsError::RemoteParse(_))
    );
}

#[test]
fn base_directory_precedence() {
    let (_temp, root) = temp_dir();
    let explicit = root.join("explicit");
    let home = root.join("home");
    let dirs = format!("{}:{}", root.join("first"), root.join("second"));

    let all = |key: &str| match key {
        WAGS_TAILS_DIR_VAR => Some(explicit.to_string()),
        XDG_DATA_HOME_VAR => Some(home.to_string()),
        XDG_DATA_DIRS_VAR => Some(dirs.clone()),
        _ => None,
    };
    assert_eq!(resolve_base_directory_with(all).unwrap(), explicit);

    let no_override = |key: &str| match key {
        XDG_DATA_HOME_VAR => Some(home.to_string()),
        XDG_DATA_DIRS_VAR => Some(dirs.clone()),
        _ => None,
    };
    assert_eq!(
        resolve_base_directory_with(no_override).unwrap(),
        home.join(LIBRARY_DIR_NAME)
    );

    let dirs_only = |key: &str| match key {
        XDG_DATA_DIRS_VAR => Some(dirs.clone()),
        WAGS_TAILS_DIR_VAR => Some(String::new()),
        _ => None,
    };
    let resolved = resolve_base_directory_with(dirs_only).unwrap();
    assert_eq!(resolved, root.join("first").join(LIBRARY_DIR_NAME));
    assert!(resolved.as_std_path().is_dir());

    // Resolving again over existing directories must not fail.
    assert_eq!(resolve_base_directory_with(dirs_only).unwrap(), resolved);
}

#[test]
fn explicit_data_dir_is_created() {
    let (_temp, root) = temp_dir();
    let data_dir = root.join("nested").join("hgnc");
    let source = open(data_dir.clone());
    assert_eq!(source.data_dir(), data_dir.as_path());
    assert!(data_dir.as_std_path().is_dir());
    let again = open(data_dir.clone());
    assert_eq!(again.data_dir(), data_dir.as_path());
}
