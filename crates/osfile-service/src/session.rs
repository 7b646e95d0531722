//! Per-caller handle table.
//!
//! Each caller context gets one session; the session is the only owner
//! of its open handles and exposes them to the bridge as opaque ids.
//! When the owning context ends, every still-open handle is closed
//! best-effort.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use osfile_libc::FileHandle;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Result, ServiceError};

/// Opaque identifier for a handle owned by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(pub u64);

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owning table of open `FileHandle`s for one caller context.
///
/// Handles are checked out for the duration of one operation and checked
/// back in afterwards; the caller is expected to issue operations on a
/// single handle sequentially, per the native library's rules.
#[derive(Default)]
pub struct FileSession {
    next_id: AtomicU64,
    handles: Mutex<HashMap<HandleId, FileHandle>>,
}

impl FileSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly opened handle, returning its id.
    pub fn insert(&self, handle: FileHandle) -> HandleId {
        let id = HandleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, handle);
        id
    }

    /// Remove a handle for the duration of one operation.
    pub(crate) fn checkout(&self, id: HandleId) -> Result<FileHandle> {
        self.lock()
            .remove(&id)
            .ok_or(ServiceError::UnknownHandle { id: id.0 })
    }

    /// Return a checked-out handle. Closed handles stay registered so a
    /// repeated close on the same id remains an idempotent success.
    pub(crate) fn checkin(&self, id: HandleId, handle: FileHandle) {
        self.lock().insert(id, handle);
    }

    pub fn open_count(&self) -> usize {
        self.lock().values().filter(|h| !h.is_closed()).count()
    }

    /// Close everything still open. Errors are swallowed; there is no
    /// channel left to report them on during teardown.
    pub fn close_all(&self) {
        let drained: Vec<(HandleId, FileHandle)> = self.lock().drain().collect();
        for (id, mut handle) in drained {
            if handle.is_closed() {
                continue;
            }
            match handle.close() {
                Ok(()) => debug!(handle = %id, path = %handle.path(), "closed on teardown"),
                Err(error) => {
                    warn!(handle = %id, path = %handle.path(), error = %error, "teardown close failed")
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<HandleId, FileHandle>> {
        // Keep going with the inner state if a panicking op poisoned the
        // lock; teardown must still be able to close handles.
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for FileSession {
    fn drop(&mut self) {
        self.close_all();
    }
}
