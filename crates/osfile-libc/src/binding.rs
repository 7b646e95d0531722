//! Dynamic binding of the platform C library's stdio calls.

use std::sync::OnceLock;

use libc::{c_char, c_int, c_long, c_void, size_t};
use libloading::Library;
use osfile_platform::PlatformProfile;

use crate::{FileError, Result};

pub(crate) type FopenFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut c_void;
pub(crate) type FreadFn = unsafe extern "C" fn(*mut c_void, size_t, size_t, *mut c_void) -> size_t;
pub(crate) type FwriteFn =
    unsafe extern "C" fn(*const c_void, size_t, size_t, *mut c_void) -> size_t;
pub(crate) type FseekFn = unsafe extern "C" fn(*mut c_void, c_long, c_int) -> c_int;
pub(crate) type FcloseFn = unsafe extern "C" fn(*mut c_void) -> c_int;

/// The loaded C library plus its five bound calls.
///
/// Process-wide singleton: created lazily on first use, after profile
/// resolution, and never unloaded. The bound pointers are stateless, so
/// every handle and service instance shares the one binding. A load or
/// bind failure is fatal to the whole file surface: there is no
/// degraded mode, every operation in this crate goes through it.
#[derive(Debug)]
pub struct LibcBinding {
    profile: &'static PlatformProfile,
    // Keeps the symbols below valid; never dropped in normal operation.
    _library: Library,
    pub(crate) fopen: FopenFn,
    pub(crate) fread: FreadFn,
    pub(crate) fwrite: FwriteFn,
    pub(crate) fseek: FseekFn,
    pub(crate) fclose: FcloseFn,
}

impl LibcBinding {
    /// Load the library named by `profile` and bind all five symbols.
    pub fn load(profile: &'static PlatformProfile) -> Result<Self> {
        let library_name = profile.library_name;
        let library = unsafe { Library::new(library_name) }.map_err(|source| {
            FileError::LibraryLoad {
                library: library_name,
                source,
            }
        })?;

        let fopen = bind::<FopenFn>(&library, library_name, "fopen", b"fopen\0")?;
        let fread = bind::<FreadFn>(&library, library_name, "fread", b"fread\0")?;
        let fwrite = bind::<FwriteFn>(&library, library_name, "fwrite", b"fwrite\0")?;
        let fseek = bind::<FseekFn>(&library, library_name, "fseek", b"fseek\0")?;
        let fclose = bind::<FcloseFn>(&library, library_name, "fclose", b"fclose\0")?;

        Ok(LibcBinding {
            profile,
            _library: library,
            fopen,
            fread,
            fwrite,
            fseek,
            fclose,
        })
    }

    /// The process-wide binding, loading it on first use.
    ///
    /// Initialization order: the platform profile is resolved first; the
    /// library load depends on it and must never happen before it.
    pub fn global() -> Result<&'static LibcBinding> {
        static BINDING: OnceLock<LibcBinding> = OnceLock::new();
        if let Some(binding) = BINDING.get() {
            return Ok(binding);
        }
        let profile = PlatformProfile::current()?;
        let binding = LibcBinding::load(profile)?;
        // A racing loader may win; both loaded the same library.
        Ok(BINDING.get_or_init(|| binding))
    }

    pub fn profile(&self) -> &'static PlatformProfile {
        self.profile
    }
}

fn bind<T: Copy>(
    library: &Library,
    library_name: &'static str,
    symbol: &'static str,
    symbol_z: &[u8],
) -> Result<T> {
    let bound = unsafe { library.get::<T>(symbol_z) }.map_err(|source| {
        FileError::MissingSymbol {
            symbol,
            library: library_name,
            source,
        }
    })?;
    Ok(*bound)
}
