//! Asynchronous request bridge.
//!
//! The untrusted caller speaks [`OsRequest`]/[`OsResponse`]: every
//! public operation has a request form, every outcome (success or
//! error) comes back as a response value over a oneshot channel. The
//! serve loop owns the [`FileService`]; when the last client goes away
//! the loop ends, the service drops, and the session teardown closes
//! any handles the caller left open.

use std::sync::Arc;

use osfile_libc::FileContent;
use osfile_platform::SeekOrigin;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::exec::{ExecResult, ExecSpec};
use crate::service::FileService;
use crate::session::HandleId;
use crate::ServiceError;

/// One request from the caller. Encodings stay in string form here; the
/// service rejects unknown values before any native call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OsRequest {
    ReadFile {
        path: String,
        encoding: String,
    },
    WriteFile {
        path: String,
        data: FileContent,
        encoding: String,
    },
    AppendFile {
        path: String,
        data: FileContent,
        encoding: String,
    },
    RemoveFile {
        path: String,
    },
    CreateDirectory {
        path: String,
        ignore_existing: bool,
    },
    OpenFile {
        path: String,
        mode: Option<String>,
    },
    Read {
        handle: HandleId,
        max_bytes: u64,
        encoding: String,
    },
    Write {
        handle: HandleId,
        data: FileContent,
        encoding: String,
    },
    SetPosition {
        handle: HandleId,
        offset: i64,
        origin: SeekOrigin,
    },
    Close {
        handle: HandleId,
    },
    Exec {
        spec: ExecSpec,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OsResponse {
    Content { data: FileContent },
    Opened { handle: HandleId },
    Done,
    Executed { result: ExecResult },
    Error { kind: String, message: String },
}

impl OsResponse {
    fn error(e: &ServiceError) -> OsResponse {
        OsResponse::Error {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

type Envelope = (OsRequest, oneshot::Sender<OsResponse>);

/// Caller-side endpoint of the bridge.
#[derive(Clone)]
pub struct BridgeClient {
    tx: mpsc::Sender<Envelope>,
}

impl BridgeClient {
    /// Issue one request and wait for its response.
    pub async fn request(&self, request: OsRequest) -> OsResponse {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send((request, reply_tx)).await.is_err() {
            return OsResponse::Error {
                kind: "bridge".to_string(),
                message: "bridge task is gone".to_string(),
            };
        }
        reply_rx.await.unwrap_or_else(|_| OsResponse::Error {
            kind: "bridge".to_string(),
            message: "bridge dropped the request".to_string(),
        })
    }
}

/// Spawn the serve loop around `service` and hand back its client.
pub fn spawn_bridge(service: FileService) -> BridgeClient {
    let (tx, mut rx) = mpsc::channel::<Envelope>(64);
    tokio::spawn(async move {
        let service = Arc::new(service);
        while let Some((request, reply)) = rx.recv().await {
            let response = dispatch(&service, request).await;
            // A caller that dropped its reply end gets nothing; the
            // operation itself has already run to completion.
            let _ = reply.send(response);
        }
        debug!("bridge loop ended, tearing down session");
    });
    BridgeClient { tx }
}

async fn dispatch(service: &FileService, request: OsRequest) -> OsResponse {
    match request {
        OsRequest::ReadFile { path, encoding } => {
            match service.read_file(&path, &encoding).await {
                Ok(data) => OsResponse::Content { data },
                Err(e) => OsResponse::error(&e),
            }
        }
        OsRequest::WriteFile {
            path,
            data,
            encoding,
        } => done(service.write_file(&path, data, &encoding).await),
        OsRequest::AppendFile {
            path,
            data,
            encoding,
        } => done(service.append_file(&path, data, &encoding).await),
        OsRequest::RemoveFile { path } => done(service.remove_file(&path).await),
        OsRequest::CreateDirectory {
            path,
            ignore_existing,
        } => done(service.create_dir(&path, ignore_existing).await),
        OsRequest::OpenFile { path, mode } => match service.open_file(&path, mode).await {
            Ok(handle) => OsResponse::Opened { handle },
            Err(e) => OsResponse::error(&e),
        },
        OsRequest::Read {
            handle,
            max_bytes,
            encoding,
        } => {
            let max_bytes = usize::try_from(max_bytes).unwrap_or(usize::MAX);
            match service.read(handle, max_bytes, &encoding).await {
                Ok(data) => OsResponse::Content { data },
                Err(e) => OsResponse::error(&e),
            }
        }
        OsRequest::Write {
            handle,
            data,
            encoding,
        } => done(service.write(handle, data, &encoding).await),
        OsRequest::SetPosition {
            handle,
            offset,
            origin,
        } => done(service.set_position(handle, offset, origin).await),
        OsRequest::Close { handle } => done(service.close(handle).await),
        OsRequest::Exec { spec } => match service.exec(spec).await {
            Ok(result) => OsResponse::Executed { result },
            Err(e) => OsResponse::error(&e),
        },
    }
}

fn done(result: crate::Result<()>) -> OsResponse {
    match result {
        Ok(()) => OsResponse::Done,
        Err(e) => OsResponse::error(&e),
    }
}
