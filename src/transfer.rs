use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use camino::Utf8Path;
use crossterm::cursor::MoveToColumn;
use crossterm::execute;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tempfile::Builder;
use tracing::{debug, info};

use crate::error::WagsError;
use crate::store::ensure_dir;

const CHUNK_SIZE: usize = 8192;

/// A response body ready to be streamed.
pub struct RemoteBody {
    pub content_length: Option<u64>,
    pub reader: Box<dyn Read + Send>,
}

/// Blocking access to remote resources.
///
/// Implementations must fail with [`WagsError::TransferStatus`] on a
/// non-success status and must not buffer the body.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, headers: &HeaderMap) -> Result<RemoteBody, WagsError>;

    fn get_text(&self, url: &str, headers: &HeaderMap) -> Result<String, WagsError> {
        let mut body = self.get(url, headers)?;
        let mut text = String::new();
        body.reader
            .read_to_string(&mut text)
            .map_err(|err| WagsError::Transfer(format!("read {url}: {err}")))?;
        Ok(text)
    }
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, WagsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("wags-tails/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| WagsError::Transfer(err.to_string()))?,
        );
        // Dataset dumps can take far longer than any sane total timeout, so
        // only the connection phase is bounded.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| WagsError::Transfer(err.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, headers: &HeaderMap) -> Result<RemoteBody, WagsError> {
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .map_err(|err| WagsError::Transfer(format!("{url}: {err}")))?;
        if !response.status().is_success() {
            return Err(WagsError::TransferStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(RemoteBody {
            content_length: response.content_length(),
            reader: Box::new(response),
        })
    }
}

/// Turns a raw downloaded payload into the final artifact, e.g. by pulling one
/// member out of an archive.
pub trait PostProcess: Send + Sync {
    fn apply(&self, payload: &Path, destination: &Path) -> Result<(), WagsError>;
}

/// Everything needed to fetch one version of a source.
pub struct DownloadRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub post_process: Option<Box<dyn PostProcess>>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HeaderMap::new(),
            post_process: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_post_process(mut self, step: impl PostProcess + 'static) -> Self {
        self.post_process = Some(Box::new(step));
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent<'a> {
    Started { url: &'a str, total: Option<u64> },
    Advanced { url: &'a str, downloaded: u64, total: Option<u64> },
    Finished { url: &'a str, downloaded: u64 },
}

/// Receives byte-level transfer progress. Purely informational.
pub trait ProgressSink: Send + Sync {
    fn event(&self, event: ProgressEvent<'_>);
}

pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn event(&self, _event: ProgressEvent<'_>) {}
}

/// Single-line progress on stderr, redrawn at most once per MiB.
#[derive(Default)]
pub struct ConsoleProgress {
    last_drawn: AtomicU64,
}

impl ConsoleProgress {
    const REDRAW_EVERY: u64 = 1024 * 1024;

    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for ConsoleProgress {
    fn event(&self, event: ProgressEvent<'_>) {
        let mut stderr = io::stderr();
        let _ = match event {
            ProgressEvent::Started { url, .. } => {
                self.last_drawn.store(0, Ordering::Relaxed);
                let name = url.rsplit('/').next().unwrap_or(url);
                execute!(stderr, Print(format!("Downloading {name}\n")))
            }
            ProgressEvent::Advanced {
                downloaded, total, ..
            } => {
                let last = self.last_drawn.load(Ordering::Relaxed);
                if downloaded.saturating_sub(last) < Self::REDRAW_EVERY
                    && Some(downloaded) != total
                {
                    return;
                }
                self.last_drawn.store(downloaded, Ordering::Relaxed);
                execute!(
                    stderr,
                    MoveToColumn(0),
                    Clear(ClearType::CurrentLine),
                    Print(render_progress(downloaded, total))
                )
            }
            ProgressEvent::Finished { downloaded, .. } => execute!(
                stderr,
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(format!("{} done\n", format_bytes(downloaded)))
            ),
        };
    }
}

fn render_progress(downloaded: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => {
            let percent = downloaded.saturating_mul(100) / total;
            format!(
                "{percent:>3}% {}/{}",
                format_bytes(downloaded),
                format_bytes(total)
            )
        }
        _ => format_bytes(downloaded),
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Streams remote bodies to disk.
///
/// Bytes always land in a temporary file next to the destination first.
/// Without a post-process step the temporary file is renamed into place once
/// complete; otherwise the step receives `(temporary, destination)` and is
/// responsible for producing the artifact. Nothing is placed at the
/// destination when the transfer fails.
pub struct Downloader<T: Transport> {
    transport: T,
    progress: Box<dyn ProgressSink>,
}

impl<T: Transport> Downloader<T> {
    pub fn new(transport: T, progress: Box<dyn ProgressSink>) -> Self {
        Self {
            transport,
            progress,
        }
    }

    pub fn silent(transport: T) -> Self {
        Self::new(transport, Box::new(NoopProgress))
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn set_progress(&mut self, progress: Box<dyn ProgressSink>) {
        self.progress = progress;
    }

    pub fn download(
        &self,
        url: &str,
        destination: &Utf8Path,
        headers: &HeaderMap,
        post_process: Option<&dyn PostProcess>,
    ) -> Result<(), WagsError> {
        let parent = destination
            .parent()
            .ok_or_else(|| WagsError::Filesystem(format!("invalid destination {destination}")))?;
        ensure_dir(parent)?;

        info!(%url, %destination, "downloading");
        let body = self.transport.get(url, headers)?;

        let mut temp = Builder::new()
            .prefix(".wags_tails_tmp")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| WagsError::Filesystem(err.to_string()))?;
        let written = self.stream(url, body, temp.as_file_mut())?;
        debug!(%url, bytes = written, path = %temp.path().display(), "payload written");

        match post_process {
            Some(step) => step.apply(temp.path(), destination.as_std_path())?,
            None => {
                temp.persist(destination.as_std_path())
                    .map_err(|err| WagsError::Filesystem(err.error.to_string()))?;
            }
        }
        Ok(())
    }

    fn stream(&self, url: &str, body: RemoteBody, file: &mut File) -> Result<u64, WagsError> {
        let RemoteBody {
            content_length: total,
            mut reader,
        } = body;
        self.progress.event(ProgressEvent::Started { url, total });

        let mut buffer = [0u8; CHUNK_SIZE];
        let mut downloaded = 0u64;
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(WagsError::Transfer(format!("read {url}: {err}"))),
            };
            file.write_all(&buffer[..read])
                .map_err(|err| WagsError::Filesystem(err.to_string()))?;
            downloaded += read as u64;
            self.progress.event(ProgressEvent::Advanced {
                url,
                downloaded,
                total,
            });
        }
        file.flush()
            .map_err(|err| WagsError::Filesystem(err.to_string()))?;

        self.progress.event(ProgressEvent::Finished { url, downloaded });
        Ok(downloaded)
    }
}
