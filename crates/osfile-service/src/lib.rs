//! # osfile-service
//!
//! The caller-facing half of the file bridge: path-based whole-file
//! operations, handle acquisition backed by a per-session handle table,
//! and the asynchronous request/response surface an untrusted caller
//! talks to. Native calls run on the blocking pool; results come back
//! through the bridge as structured values, never as silent failures.

mod bridge;
mod exec;
mod service;
mod session;

pub use bridge::{spawn_bridge, BridgeClient, OsRequest, OsResponse};
pub use exec::{CommandInvoker, ExecResult, ExecSpec, ProcessInvoker};
pub use service::FileService;
pub use session::{FileSession, HandleId};

use osfile_libc::FileError;
use thiserror::Error;

/// Errors surfaced by the service layer.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error("no such file: {path}")]
    NotFound { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown file handle {id}")]
    UnknownHandle { id: u64 },

    #[error("process invocation failed: {0}")]
    Exec(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ServiceError {
    /// Stable machine-readable tag used by the bridge error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::File(FileError::Platform(_)) => "unsupported-platform",
            ServiceError::File(FileError::LibraryLoad { .. })
            | ServiceError::File(FileError::MissingSymbol { .. }) => "native-binding",
            ServiceError::File(FileError::Open { .. }) => "open-error",
            ServiceError::File(FileError::UseAfterClose) => "use-after-close",
            ServiceError::File(FileError::UnsupportedEncoding(_)) => "unsupported-encoding",
            ServiceError::File(FileError::Decode(_)) => "decode-error",
            ServiceError::File(FileError::ShortWrite { .. }) => "short-write",
            ServiceError::File(FileError::Seek { .. }) => "seek-error",
            ServiceError::File(FileError::Close { .. }) => "close-error",
            ServiceError::File(FileError::NotImplemented(_)) => "not-implemented",
            ServiceError::NotFound { .. } => "not-found",
            ServiceError::Io(_) => "io-error",
            ServiceError::UnknownHandle { .. } => "unknown-handle",
            ServiceError::Exec(_) => "exec-error",
            ServiceError::Task(_) => "task-error",
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
