use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum WagsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid source name: {0}")]
    InvalidSourceName(String),

    #[error("invalid version identifier: {0}")]
    InvalidVersion(String),

    #[error("no local data found: {0}")]
    #[diagnostic(help("run without --from-local to fetch it from the remote provider"))]
    NotFound(String),

    #[error("unable to parse remote response: {0}")]
    RemoteParse(String),

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("remote returned status {status} for {url}")]
    TransferStatus { status: u16, url: String },

    #[error("failed to extract downloaded payload: {0}")]
    Extraction(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl WagsError {
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            WagsError::RemoteParse(_) | WagsError::Transfer(_) | WagsError::TransferStatus { .. }
        )
    }
}
