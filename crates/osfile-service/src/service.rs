//! Path-based file operations and handle acquisition.

use std::io;
use std::path::Path;
use std::sync::Arc;

use osfile_libc::{Encoding, FileContent, FileHandle};
use osfile_platform::SeekOrigin;
use tokio::task;
use tracing::warn;

use crate::exec::{CommandInvoker, ExecResult, ExecSpec, ProcessInvoker};
use crate::session::{FileSession, HandleId};
use crate::{Result, ServiceError};

/// Entry point of the bridge: one instance per caller context.
///
/// Every operation validates its encoding string before touching the
/// filesystem, runs the native work on the blocking pool, and reports a
/// structured result. Open handles are owned by the service's session
/// and are released when the session is torn down.
pub struct FileService {
    session: Arc<FileSession>,
    invoker: Arc<dyn ProcessInvoker>,
}

impl FileService {
    pub fn new() -> Self {
        Self::with_invoker(Arc::new(CommandInvoker))
    }

    /// Build a service around a caller-supplied process facility.
    pub fn with_invoker(invoker: Arc<dyn ProcessInvoker>) -> Self {
        FileService {
            session: Arc::new(FileSession::new()),
            invoker,
        }
    }

    pub fn session(&self) -> &Arc<FileSession> {
        &self.session
    }

    /// Whole-file read: open, read to end-of-stream, close.
    pub async fn read_file(&self, path: &str, encoding: &str) -> Result<FileContent> {
        let encoding: Encoding = encoding.parse().map_err(ServiceError::File)?;
        let path = path.to_string();
        task::spawn_blocking(move || {
            let mut handle = FileHandle::open(&path, Some("rb"))?;
            let content = handle.read(usize::MAX, encoding)?;
            handle.close()?;
            Ok(content)
        })
        .await?
    }

    /// Atomic whole-file replace: the payload is written to a sibling
    /// temp file and renamed over `path`, so concurrent readers never
    /// observe a partial write.
    pub async fn write_file(&self, path: &str, data: FileContent, encoding: &str) -> Result<()> {
        // Encoding and payload agreement are checked before any native
        // call; a mismatched declaration is a caller error.
        let encoding: Encoding = encoding.parse().map_err(ServiceError::File)?;
        data.check_encoding(encoding)?;
        let path = path.to_string();
        task::spawn_blocking(move || {
            let dir = Path::new(&path)
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let staged = tempfile::Builder::new()
                .prefix(".osfile-stage")
                .tempfile_in(dir)?;
            let staged_path = staged.path().to_str().ok_or_else(|| {
                ServiceError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "staging path is not valid UTF-8",
                ))
            })?;

            let mut handle = FileHandle::open(staged_path, Some("wb"))?;
            handle.write(&data)?;
            handle.close()?;

            // Finalize; on any earlier error the staged file is removed
            // when `staged` drops.
            staged.persist(&path).map_err(|e| ServiceError::Io(e.error))?;
            Ok(())
        })
        .await?
    }

    /// Append one payload to `path`, creating it if absent. If the write
    /// or close fails after a successful open, the descriptor is closed
    /// best-effort before the error propagates.
    pub async fn append_file(&self, path: &str, data: FileContent, encoding: &str) -> Result<()> {
        let encoding: Encoding = encoding.parse().map_err(ServiceError::File)?;
        data.check_encoding(encoding)?;
        let path = path.to_string();
        task::spawn_blocking(move || {
            let mut handle = FileHandle::open(&path, Some("ab"))?;
            if let Err(error) = handle.write(&data) {
                if let Err(close_error) = handle.close() {
                    warn!(path = %path, error = %close_error, "close after failed append");
                }
                return Err(error.into());
            }
            handle.close()?;
            Ok(())
        })
        .await?
    }

    /// Remove a file; a missing path is a reported error, not a no-op.
    pub async fn remove_file(&self, path: &str) -> Result<()> {
        let path = path.to_string();
        task::spawn_blocking(move || match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ServiceError::NotFound { path }),
            Err(e) => Err(e.into()),
        })
        .await?
    }

    /// Create a directory; with `ignore_existing`, an already-present
    /// directory at `path` is success.
    pub async fn create_dir(&self, path: &str, ignore_existing: bool) -> Result<()> {
        let path = path.to_string();
        task::spawn_blocking(move || match std::fs::create_dir(&path) {
            Ok(()) => Ok(()),
            Err(e) if ignore_existing && e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.into()),
        })
        .await?
    }

    /// Open a handle and register it in the session table.
    pub async fn open_file(&self, path: &str, mode: Option<String>) -> Result<HandleId> {
        let path = path.to_string();
        let session = self.session.clone();
        task::spawn_blocking(move || {
            let handle = FileHandle::open(&path, mode.as_deref())?;
            Ok(session.insert(handle))
        })
        .await?
    }

    /// Capped read on an open handle.
    pub async fn read(&self, id: HandleId, max_bytes: usize, encoding: &str) -> Result<FileContent> {
        let encoding: Encoding = encoding.parse().map_err(ServiceError::File)?;
        self.with_handle(id, move |handle| {
            handle.read(max_bytes, encoding).map_err(Into::into)
        })
        .await
    }

    /// Single-shot write on an open handle.
    pub async fn write(&self, id: HandleId, data: FileContent, encoding: &str) -> Result<()> {
        let encoding: Encoding = encoding.parse().map_err(ServiceError::File)?;
        data.check_encoding(encoding)?;
        self.with_handle(id, move |handle| handle.write(&data).map_err(Into::into))
            .await
    }

    /// Seek on an open handle.
    pub async fn set_position(&self, id: HandleId, offset: i64, origin: SeekOrigin) -> Result<()> {
        self.with_handle(id, move |handle| {
            handle.set_position(offset, origin).map_err(Into::into)
        })
        .await
    }

    /// Close a handle. Idempotent: closing an already-closed id succeeds.
    pub async fn close(&self, id: HandleId) -> Result<()> {
        self.with_handle(id, |handle| handle.close().map_err(Into::into))
            .await
    }

    /// Pass one invocation through to the process facility.
    pub async fn exec(&self, spec: ExecSpec) -> Result<ExecResult> {
        let invoker = self.invoker.clone();
        task::spawn_blocking(move || invoker.invoke(&spec)).await?
    }

    /// Check the handle out of the table, run `op` on the blocking pool,
    /// and check it back in whatever the outcome. The checkout window is
    /// what serializes operations on a single handle.
    async fn with_handle<T, F>(&self, id: HandleId, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut FileHandle) -> Result<T> + Send + 'static,
    {
        let session = self.session.clone();
        task::spawn_blocking(move || {
            let mut handle = session.checkout(id)?;
            let result = op(&mut handle);
            session.checkin(id, handle);
            result
        })
        .await?
    }
}

impl Default for FileService {
    fn default() -> Self {
        Self::new()
    }
}
