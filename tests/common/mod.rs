#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::Mutex;

use camino::Utf8PathBuf;
use reqwest::header::HeaderMap;

use wags_tails::error::WagsError;
use wags_tails::transfer::{RemoteBody, Transport};

/// In-memory transport serving canned bodies and recording every request.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, Vec<u8>>>,
    broken: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), body.into());
    }

    /// Serve `prefix`, then fail the read as if the connection dropped.
    pub fn route_broken(&self, url: &str, prefix: impl Into<Vec<u8>>) {
        self.broken
            .lock()
            .unwrap()
            .insert(url.to_string(), prefix.into());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| called.as_str() == url)
            .count()
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str, _headers: &HeaderMap) -> Result<RemoteBody, WagsError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(prefix) = self.broken.lock().unwrap().get(url) {
            return Ok(RemoteBody {
                content_length: Some(prefix.len() as u64 * 4),
                reader: Box::new(Cursor::new(prefix.clone()).chain(ConnectionReset)),
            });
        }
        match self.routes.lock().unwrap().get(url) {
            Some(body) => Ok(RemoteBody {
                content_length: Some(body.len() as u64),
                reader: Box::new(Cursor::new(body.clone())),
            }),
            None => Err(WagsError::TransferStatus {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

struct ConnectionReset;

impl Read for ConnectionReset {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
    }
}

pub fn temp_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, path)
}

pub fn touch(path: &Utf8PathBuf) {
    std::fs::write(path.as_std_path(), b"").unwrap();
}
