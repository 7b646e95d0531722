//! Process-invocation seam.
//!
//! The service does not implement spawning; it hands an [`ExecSpec`] to
//! whatever [`ProcessInvoker`] it was built with and passes the result
//! through untouched.

use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::{Result, ServiceError};

/// One process invocation: command path plus arguments.
///
/// Output is decoded as lossy UTF-8 by the default invoker; callers that
/// need raw output bytes need a different facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecSpec {
    pub command: String,
    pub args: Vec<String>,
    /// Fold stderr into stdout, leaving stderr empty.
    pub merge_stderr: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// External process-invocation facility.
///
/// Runs on the blocking pool, so implementations may block.
pub trait ProcessInvoker: Send + Sync {
    fn invoke(&self, spec: &ExecSpec) -> Result<ExecResult>;
}

/// Default facility: `std::process::Command`, executed off the caller
/// thread by the service.
#[derive(Debug, Default)]
pub struct CommandInvoker;

impl ProcessInvoker for CommandInvoker {
    fn invoke(&self, spec: &ExecSpec) -> Result<ExecResult> {
        let output = Command::new(&spec.command)
            .args(&spec.args)
            .output()
            .map_err(|e| ServiceError::Exec(e.to_string()))?;

        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if spec.merge_stderr {
            stdout.push_str(&stderr);
            stderr = String::new();
        }

        Ok(ExecResult {
            // Signal-terminated processes carry no exit code.
            exit_code: output.status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}
