//! # osfile-platform
//!
//! Per-OS constants for the native file bridge: which C library to load,
//! which ABI values differ across platforms, and how seek origins map to
//! the platform's `SEEK_*` constants.
//!
//! The profile must be resolved before any foreign binding is declared;
//! the `rlim_t` ABI kind affects struct layout elsewhere in the OS-binding
//! surface, so the profile is the single source of platform truth even
//! where this crate's consumers don't use resource limits directly.

use std::str::FromStr;
use std::sync::OnceLock;

use libc::c_int;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during platform resolution
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("unsupported platform: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// The seven operating systems the bridge knows how to bind against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsName {
    Windows,
    MacOs,
    Linux,
    FreeBsd,
    OpenBsd,
    Solaris,
    Android,
}

impl OsName {
    pub const ALL: [OsName; 7] = [
        OsName::Windows,
        OsName::MacOs,
        OsName::Linux,
        OsName::FreeBsd,
        OsName::OpenBsd,
        OsName::Solaris,
        OsName::Android,
    ];

    /// The OS this process is running on.
    pub fn current() -> Result<Self> {
        std::env::consts::OS.parse()
    }
}

impl FromStr for OsName {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "windows" => Ok(OsName::Windows),
            "macos" => Ok(OsName::MacOs),
            "linux" => Ok(OsName::Linux),
            "freebsd" => Ok(OsName::FreeBsd),
            "openbsd" => Ok(OsName::OpenBsd),
            // illumos forked from OpenSolaris; same libc soname and ABI row
            "solaris" | "illumos" => Ok(OsName::Solaris),
            "android" => Ok(OsName::Android),
            other => Err(PlatformError::Unsupported(other.to_string())),
        }
    }
}

/// ABI kind of `rlim_t` on the target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RlimitKind {
    U64,
    I64,
    ULong,
}

/// Reference point for a relative seek offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeekOrigin {
    FromStart,
    FromEnd,
    FromCurrent,
}

/// Platform-specific constants resolved once per process.
///
/// Immutable; exactly one profile is active for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    /// Soname of the C library `fopen`/`fread`/... are bound from.
    pub library_name: &'static str,
    /// `O_NONBLOCK` (zero on Windows: the CRT has no such flag).
    pub non_blocking_flag: c_int,
    /// ABI kind of `rlim_t`.
    pub rlimit_kind: RlimitKind,
    /// Index of the `RLIMIT_NOFILE` slot.
    pub rlimit_nofile_index: usize,
    seek_set: c_int,
    seek_cur: c_int,
    seek_end: c_int,
}

impl PlatformProfile {
    /// Pure lookup over the fixed per-OS table.
    pub fn resolve(os: OsName) -> PlatformProfile {
        // SEEK_* happen to agree across all seven rows, but the binding
        // layer must only ever read them through the profile.
        let (library_name, non_blocking_flag, rlimit_kind, rlimit_nofile_index) = match os {
            OsName::Windows => ("msvcrt.dll", 0, RlimitKind::U64, 0),
            OsName::MacOs => ("libSystem.B.dylib", 0x0004, RlimitKind::U64, 8),
            OsName::Linux => ("libc.so.6", 0o4000, RlimitKind::ULong, 7),
            OsName::FreeBsd => ("libc.so.7", 0x0004, RlimitKind::I64, 8),
            OsName::OpenBsd => ("libc.so", 0x0004, RlimitKind::U64, 8),
            OsName::Solaris => ("libc.so.1", 0x80, RlimitKind::ULong, 5),
            OsName::Android => ("libc.so", 0o4000, RlimitKind::ULong, 7),
        };
        PlatformProfile {
            library_name,
            non_blocking_flag,
            rlimit_kind,
            rlimit_nofile_index,
            seek_set: 0,
            seek_cur: 1,
            seek_end: 2,
        }
    }

    /// Resolve from an untrusted OS-name string.
    pub fn resolve_str(os: &str) -> Result<PlatformProfile> {
        Ok(Self::resolve(os.parse()?))
    }

    /// The process-wide profile, resolved once from the running OS.
    pub fn current() -> Result<&'static PlatformProfile> {
        static PROFILE: OnceLock<PlatformProfile> = OnceLock::new();
        if let Some(profile) = PROFILE.get() {
            return Ok(profile);
        }
        let resolved = Self::resolve(OsName::current()?);
        Ok(PROFILE.get_or_init(|| resolved))
    }

    /// Native `whence` value for a seek origin.
    pub fn seek_whence(&self, origin: SeekOrigin) -> c_int {
        match origin {
            SeekOrigin::FromStart => self.seek_set,
            SeekOrigin::FromEnd => self.seek_end,
            SeekOrigin::FromCurrent => self.seek_cur,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_all_supported() {
        for os in OsName::ALL {
            let profile = PlatformProfile::resolve(os);
            assert!(!profile.library_name.is_empty(), "{os:?} has no soname");
        }
    }

    #[test]
    fn test_seek_whence_bijection() {
        for os in OsName::ALL {
            let profile = PlatformProfile::resolve(os);
            let mut whences = vec![
                profile.seek_whence(SeekOrigin::FromStart),
                profile.seek_whence(SeekOrigin::FromEnd),
                profile.seek_whence(SeekOrigin::FromCurrent),
            ];
            whences.sort_unstable();
            whences.dedup();
            assert_eq!(whences.len(), 3, "{os:?} seek mapping is not injective");
        }
    }

    #[test]
    fn test_unknown_os_rejected() {
        let err = PlatformProfile::resolve_str("beos").unwrap_err();
        assert!(matches!(err, PlatformError::Unsupported(ref s) if s == "beos"));
    }

    #[test]
    fn test_current_is_singleton() {
        let a = PlatformProfile::current().unwrap();
        let b = PlatformProfile::current().unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_linux_row() {
        let profile = PlatformProfile::resolve(OsName::Linux);
        assert_eq!(profile.library_name, "libc.so.6");
        assert_eq!(profile.non_blocking_flag, 0o4000);
        assert_eq!(profile.rlimit_kind, RlimitKind::ULong);
        assert_eq!(profile.rlimit_nofile_index, 7);
    }
}
