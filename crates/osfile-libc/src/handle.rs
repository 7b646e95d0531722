//! Single-owner wrapper around one open native descriptor.

use libc::{c_long, c_void};
use std::ffi::CString;

use osfile_platform::SeekOrigin;
use tracing::warn;

use crate::binding::LibcBinding;
use crate::{Encoding, FileContent, FileError, Result};

/// Mode passed to `fopen` when the caller does not specify one.
pub const DEFAULT_MODE: &str = "rb+";

/// Fixed chunk size for capped reads.
const READ_CHUNK: usize = 32 * 1024;

/// One open native file descriptor.
///
/// Exactly one `FileHandle` owns a given descriptor; ownership transfers
/// only at creation. After [`close`](FileHandle::close) the handle is
/// terminally closed and every data operation fails with
/// [`FileError::UseAfterClose`] without reaching the native layer. A
/// still-open handle closes itself best-effort on drop.
pub struct FileHandle {
    raw: *mut c_void,
    closed: bool,
    path: String,
}

// The descriptor has no thread affinity; the owning caller serializes
// operations by holding the handle (&mut self on every data op).
unsafe impl Send for FileHandle {}

impl FileHandle {
    /// `fopen(path, mode)`. A null descriptor is an open failure; mode
    /// strings pass through uninterpreted beyond what `fopen` enforces.
    pub fn open(path: &str, mode: Option<&str>) -> Result<FileHandle> {
        let binding = LibcBinding::global()?;
        let open_err = || FileError::Open {
            path: path.to_string(),
        };
        // Embedded NUL can't be represented in a C path or mode string.
        let c_path = CString::new(path).map_err(|_| open_err())?;
        let c_mode = CString::new(mode.unwrap_or(DEFAULT_MODE)).map_err(|_| open_err())?;

        let raw = unsafe { (binding.fopen)(c_path.as_ptr(), c_mode.as_ptr()) };
        if raw.is_null() {
            return Err(open_err());
        }
        Ok(FileHandle {
            raw,
            closed: false,
            path: path.to_string(),
        })
    }

    /// Read up to `max_bytes`, decoded per `encoding`.
    ///
    /// Issues fixed-size `fread` chunks until a chunk comes back short or
    /// the cap is reached, then truncates any overshoot (the native
    /// cursor may end up past the cap; seek afterwards if the position
    /// matters). A short chunk is treated as end-of-stream; `fread`
    /// itself does not distinguish end-of-stream from a read error, and
    /// neither does this layer.
    pub fn read(&mut self, max_bytes: usize, encoding: Encoding) -> Result<FileContent> {
        let raw = self.descriptor()?;
        let binding = LibcBinding::global()?;

        let mut out = Vec::new();
        let mut chunk = vec![0u8; READ_CHUNK];
        while out.len() < max_bytes {
            let got =
                unsafe { (binding.fread)(chunk.as_mut_ptr() as *mut c_void, 1, READ_CHUNK, raw) };
            out.extend_from_slice(&chunk[..got]);
            if got < READ_CHUNK {
                break;
            }
        }
        out.truncate(max_bytes);
        FileContent::decode(out, encoding)
    }

    /// Write the full payload with a single `fwrite`. A written count
    /// short of the requested length fails with
    /// [`FileError::ShortWrite`]; no partial-write retry is attempted.
    pub fn write(&mut self, data: &FileContent) -> Result<()> {
        let raw = self.descriptor()?;
        let bytes = data.as_bytes();
        if bytes.is_empty() {
            return Ok(());
        }
        let binding = LibcBinding::global()?;
        let wrote =
            unsafe { (binding.fwrite)(bytes.as_ptr() as *const c_void, 1, bytes.len(), raw) };
        if wrote != bytes.len() {
            return Err(FileError::ShortWrite {
                requested: bytes.len(),
                actual: wrote,
            });
        }
        Ok(())
    }

    /// `fseek` relative to `origin`, translated to the platform `SEEK_*`
    /// constant from the resolved profile.
    pub fn set_position(&mut self, offset: i64, origin: SeekOrigin) -> Result<()> {
        let raw = self.descriptor()?;
        let binding = LibcBinding::global()?;
        let offset = c_long::try_from(offset).map_err(|_| FileError::Seek { code: -1 })?;
        let whence = binding.profile().seek_whence(origin);
        let code = unsafe { (binding.fseek)(raw, offset, whence) };
        if code != 0 {
            return Err(FileError::Seek { code });
        }
        Ok(())
    }

    /// `fclose`. The handle is marked closed whatever the native call
    /// returns; some character devices report nonzero on close without
    /// any real failure. A nonzero code is still surfaced as
    /// [`FileError::Close`]. Closing twice is a no-op success.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let binding = LibcBinding::global()?;
        let code = unsafe { (binding.fclose)(self.raw) };
        if code != 0 {
            return Err(FileError::Close { code });
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    // Contract placeholders inherited from the bridge surface; the
    // native backend does not implement them.

    pub fn position(&self) -> Result<u64> {
        Err(FileError::NotImplemented("getPosition"))
    }

    pub fn flush(&mut self) -> Result<()> {
        Err(FileError::NotImplemented("flush"))
    }

    pub fn set_dates(&mut self, _access_ms: i64, _modify_ms: i64) -> Result<()> {
        Err(FileError::NotImplemented("setDates"))
    }

    pub fn stat(&self) -> Result<()> {
        Err(FileError::NotImplemented("stat"))
    }

    fn descriptor(&self) -> Result<*mut c_void> {
        if self.closed {
            return Err(FileError::UseAfterClose);
        }
        Ok(self.raw)
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Implicit teardown close; there is no channel left to report on.
        if let Err(error) = self.close() {
            warn!(path = %self.path, error = %error, "implicit close failed");
        }
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.path)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn path_in(dir: &tempfile::TempDir, name: &str) -> String {
        dir.path().join(name).to_str().unwrap().to_string()
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempdir().unwrap();
        let path = path_in(&dir, "absent.bin");
        let err = FileHandle::open(&path, Some("rb")).unwrap_err();
        assert!(matches!(err, FileError::Open { path: p } if p.contains("absent.bin")));
    }

    #[test]
    fn test_open_path_with_nul_fails_before_native_call() {
        let err = FileHandle::open("bad\0path", Some("rb")).unwrap_err();
        assert!(matches!(err, FileError::Open { .. }));
    }

    #[test]
    fn test_write_seek_read_roundtrip_text() {
        let dir = tempdir().unwrap();
        let path = path_in(&dir, "hello.txt");

        let mut handle = FileHandle::open(&path, Some("wb+")).unwrap();
        handle
            .write(&FileContent::Text("hello".to_string()))
            .unwrap();
        handle.set_position(0, SeekOrigin::FromStart).unwrap();
        let content = handle.read(5, Encoding::Utf8).unwrap();
        assert_eq!(content, FileContent::Text("hello".to_string()));
        handle.close().unwrap();
    }

    #[test]
    fn test_roundtrip_multibyte_text() {
        let dir = tempdir().unwrap();
        let path = path_in(&dir, "multibyte.txt");
        let text = "héllo wörld 漢字";

        let mut handle = FileHandle::open(&path, Some("wb+")).unwrap();
        handle.write(&FileContent::Text(text.to_string())).unwrap();
        handle.set_position(0, SeekOrigin::FromStart).unwrap();
        let content = handle.read(usize::MAX, Encoding::Utf8).unwrap();
        assert_eq!(content, FileContent::Text(text.to_string()));
    }

    #[test]
    fn test_roundtrip_binary() {
        let dir = tempdir().unwrap();
        let path = path_in(&dir, "blob.bin");
        let bytes = vec![0u8, 0xff, 0x7f, 0x80, 0x01];

        let mut handle = FileHandle::open(&path, Some("wb+")).unwrap();
        handle.write(&FileContent::Bytes(bytes.clone())).unwrap();
        handle.set_position(0, SeekOrigin::FromStart).unwrap();
        let content = handle.read(bytes.len(), Encoding::Binary).unwrap();
        assert_eq!(content, FileContent::Bytes(bytes));
    }

    #[test]
    fn test_read_cap_smaller_than_file() {
        let dir = tempdir().unwrap();
        let path = path_in(&dir, "capped.bin");
        std::fs::write(&path, vec![7u8; 1000]).unwrap();

        let mut handle = FileHandle::open(&path, Some("rb")).unwrap();
        let content = handle.read(100, Encoding::Binary).unwrap();
        assert_eq!(content.len(), 100);
    }

    #[test]
    fn test_read_cap_larger_than_file() {
        let dir = tempdir().unwrap();
        let path = path_in(&dir, "small.bin");
        std::fs::write(&path, b"tiny").unwrap();

        let mut handle = FileHandle::open(&path, Some("rb")).unwrap();
        let content = handle.read(1 << 20, Encoding::Binary).unwrap();
        assert_eq!(content, FileContent::Bytes(b"tiny".to_vec()));
    }

    #[test]
    fn test_read_spanning_multiple_chunks() {
        let dir = tempdir().unwrap();
        let path = path_in(&dir, "big.bin");
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let mut handle = FileHandle::open(&path, Some("rb")).unwrap();
        let content = handle.read(usize::MAX, Encoding::Binary).unwrap();
        assert_eq!(content, FileContent::Bytes(data));
    }

    #[test]
    fn test_read_invalid_utf8_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = path_in(&dir, "invalid.bin");
        std::fs::write(&path, [0xffu8, 0xfe, 0x01]).unwrap();

        let mut handle = FileHandle::open(&path, Some("rb")).unwrap();
        let err = handle.read(usize::MAX, Encoding::Utf8).unwrap_err();
        assert!(matches!(err, FileError::Decode(_)));
    }

    #[test]
    fn test_write_to_readonly_stream_is_short_write() {
        let dir = tempdir().unwrap();
        let path = path_in(&dir, "ro.bin");
        std::fs::write(&path, b"data").unwrap();

        // fwrite on a stream opened "rb" accepts nothing; the written
        // count falls short of the request and must not report success.
        let mut handle = FileHandle::open(&path, Some("rb")).unwrap();
        let err = handle.write(&FileContent::Bytes(vec![1, 2, 3])).unwrap_err();
        assert!(matches!(
            err,
            FileError::ShortWrite {
                requested: 3,
                actual: 0
            }
        ));
    }

    #[test]
    fn test_use_after_close() {
        let dir = tempdir().unwrap();
        let path = path_in(&dir, "closed.bin");

        let mut handle = FileHandle::open(&path, Some("wb+")).unwrap();
        handle.close().unwrap();
        assert!(handle.is_closed());

        assert!(matches!(
            handle.read(1, Encoding::Binary).unwrap_err(),
            FileError::UseAfterClose
        ));
        assert!(matches!(
            handle.write(&FileContent::Bytes(vec![1])).unwrap_err(),
            FileError::UseAfterClose
        ));
        assert!(matches!(
            handle.set_position(0, SeekOrigin::FromStart).unwrap_err(),
            FileError::UseAfterClose
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = path_in(&dir, "twice.bin");

        let mut handle = FileHandle::open(&path, Some("wb")).unwrap();
        handle.close().unwrap();
        handle.close().unwrap();
    }

    #[test]
    fn test_seek_from_end_and_current() {
        let dir = tempdir().unwrap();
        let path = path_in(&dir, "seek.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let mut handle = FileHandle::open(&path, Some("rb")).unwrap();
        handle.set_position(-4, SeekOrigin::FromEnd).unwrap();
        let tail = handle.read(4, Encoding::Utf8).unwrap();
        assert_eq!(tail, FileContent::Text("6789".to_string()));

        handle.set_position(2, SeekOrigin::FromStart).unwrap();
        handle.set_position(3, SeekOrigin::FromCurrent).unwrap();
        let mid = handle.read(2, Encoding::Utf8).unwrap();
        assert_eq!(mid, FileContent::Text("56".to_string()));
    }

    #[test]
    fn test_unimplemented_surface() {
        let dir = tempdir().unwrap();
        let path = path_in(&dir, "stub.bin");
        let mut handle = FileHandle::open(&path, Some("wb")).unwrap();

        assert!(matches!(
            handle.position().unwrap_err(),
            FileError::NotImplemented("getPosition")
        ));
        assert!(matches!(
            handle.flush().unwrap_err(),
            FileError::NotImplemented("flush")
        ));
        assert!(matches!(
            handle.set_dates(0, 0).unwrap_err(),
            FileError::NotImplemented("setDates")
        ));
        assert!(matches!(
            handle.stat().unwrap_err(),
            FileError::NotImplemented("stat")
        ));
    }
}
