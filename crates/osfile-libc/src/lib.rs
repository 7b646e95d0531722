//! # osfile-libc
//!
//! The native half of the file bridge: loads the platform C library named
//! by the resolved [`osfile_platform::PlatformProfile`], binds the five
//! stdio calls (`fopen`/`fread`/`fwrite`/`fseek`/`fclose`) as typed
//! function pointers, and wraps each open descriptor in a single-owner
//! [`FileHandle`] that can never be used after close and never leaks a
//! descriptor on an error path.

mod binding;
mod encoding;
mod handle;

pub use binding::LibcBinding;
pub use encoding::{Encoding, FileContent};
pub use handle::{FileHandle, DEFAULT_MODE};

use thiserror::Error;

/// Errors from the native binding and file-handle layer.
///
/// Every foreign-call failure is detected by inspecting return codes or
/// null sentinels immediately after the call; the native library is never
/// trusted to signal failure any other way.
#[derive(Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Platform(#[from] osfile_platform::PlatformError),

    #[error("failed to load native library {library}")]
    LibraryLoad {
        library: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("missing symbol {symbol} in {library}")]
    MissingSymbol {
        symbol: &'static str,
        library: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("failed to open {path}")]
    Open { path: String },

    #[error("file handle used after close")]
    UseAfterClose,

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("bytes are not valid UTF-8")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("short write: requested {requested} bytes, wrote {actual}")]
    ShortWrite { requested: usize, actual: usize },

    #[error("seek failed with code {code}")]
    Seek { code: i32 },

    #[error("close reported code {code}")]
    Close { code: i32 },

    #[error("{0} is not implemented by the native backend")]
    NotImplemented(&'static str),
}

pub type Result<T> = std::result::Result<T, FileError>;
