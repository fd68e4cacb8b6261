//! OS module loader primitives.
//!
//! [`ModuleApi`] is the seam between this crate and the host's dynamic
//! loader. [`SystemModules`] is the real implementation; tests substitute a
//! recording fake.

// This module owns the FFI boundary with the OS loader.
#![allow(unsafe_code)]

use std::ffi::c_void;
use std::num::NonZeroUsize;

/// Opaque reference to a module mapped into the process.
///
/// Stored as an address so it can cross threads; it is never dereferenced
/// by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleHandle(NonZeroUsize);

impl ModuleHandle {
    /// Wrap a raw OS handle, `None` if it is null.
    pub fn from_raw(raw: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(raw as usize).map(Self)
    }

    /// Wrap a handle given as a plain address, `None` if it is zero.
    pub fn from_addr(addr: usize) -> Option<Self> {
        NonZeroUsize::new(addr).map(Self)
    }

    pub fn as_raw(self) -> *mut c_void {
        self.0.get() as *mut c_void
    }

    pub fn addr(self) -> usize {
        self.0.get()
    }
}

/// Address of an exported symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolAddress(NonZeroUsize);

impl SymbolAddress {
    /// Wrap a raw symbol address, `None` if it is null.
    pub fn from_raw(raw: *const c_void) -> Option<Self> {
        NonZeroUsize::new(raw as usize).map(Self)
    }

    /// Wrap an address, `None` if it is zero.
    pub fn from_addr(addr: usize) -> Option<Self> {
        NonZeroUsize::new(addr).map(Self)
    }

    pub fn as_ptr(self) -> *const c_void {
        self.0.get() as *const c_void
    }

    pub fn addr(self) -> usize {
        self.0.get()
    }
}

/// The host's native module loading API.
///
/// Every call is a direct, completing OS call. Failures are reported as
/// `None`; the OS error state is left for [`last_error`] to inspect.
pub trait ModuleApi: Send + Sync {
    /// Map the module at `path` into the process.
    fn load(&self, path: &str) -> Option<ModuleHandle>;

    /// Drop one reference to a module obtained from [`ModuleApi::load`].
    fn unload(&self, handle: ModuleHandle);

    /// Look up a module already mapped into the process by name.
    ///
    /// Must not load anything and must not leave an extra reference behind.
    fn find_resident(&self, name: &str) -> Option<ModuleHandle>;

    /// Resolve an exported symbol.
    fn resolve(&self, handle: ModuleHandle, name: &str) -> Option<SymbolAddress>;
}

/// [`ModuleApi`] backed by the operating system's loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemModules;

#[cfg(windows)]
fn to_wide(s: &str) -> Option<Vec<u16>> {
    if s.contains('\0') {
        return None;
    }
    Some(s.encode_utf16().chain(std::iter::once(0)).collect())
}

#[cfg(windows)]
impl ModuleApi for SystemModules {
    fn load(&self, path: &str) -> Option<ModuleHandle> {
        use windows_sys::Win32::System::LibraryLoader::LoadLibraryW;

        let wide = to_wide(path)?;
        // SAFETY: `wide` is a NUL-terminated UTF-16 buffer that outlives the call.
        let module = unsafe { LoadLibraryW(wide.as_ptr()) };
        ModuleHandle::from_raw(module)
    }

    fn unload(&self, handle: ModuleHandle) {
        use windows_sys::Win32::System::LibraryLoader::FreeLibrary;

        // SAFETY: callers only pass handles obtained from `load`, each exactly once.
        unsafe {
            FreeLibrary(handle.as_raw());
        }
    }

    fn find_resident(&self, name: &str) -> Option<ModuleHandle> {
        use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;

        let wide = to_wide(name)?;
        // SAFETY: `wide` is NUL-terminated. GetModuleHandleW does not bump the
        // module reference count.
        let module = unsafe { GetModuleHandleW(wide.as_ptr()) };
        ModuleHandle::from_raw(module)
    }

    fn resolve(&self, handle: ModuleHandle, name: &str) -> Option<SymbolAddress> {
        use windows_sys::Win32::System::LibraryLoader::GetProcAddress;

        let name = std::ffi::CString::new(name).ok()?;
        // SAFETY: `name` is NUL-terminated and `handle` came from the loader.
        let proc = unsafe { GetProcAddress(handle.as_raw(), name.as_ptr() as *const u8) };
        proc.and_then(|f| SymbolAddress::from_addr(f as usize))
    }
}

#[cfg(unix)]
impl ModuleApi for SystemModules {
    fn load(&self, path: &str) -> Option<ModuleHandle> {
        let path = std::ffi::CString::new(path).ok()?;
        // SAFETY: `path` is NUL-terminated and outlives the call.
        let module = unsafe { libc::dlopen(path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        ModuleHandle::from_raw(module)
    }

    fn unload(&self, handle: ModuleHandle) {
        // SAFETY: callers only pass handles obtained from `load`, each exactly once.
        unsafe {
            libc::dlclose(handle.as_raw());
        }
    }

    fn find_resident(&self, name: &str) -> Option<ModuleHandle> {
        let name = std::ffi::CString::new(name).ok()?;
        // SAFETY: `name` is NUL-terminated. RTLD_NOLOAD never maps a new module.
        let module =
            unsafe { libc::dlopen(name.as_ptr(), libc::RTLD_NOW | libc::RTLD_NOLOAD) };
        let handle = ModuleHandle::from_raw(module)?;
        // dlopen took a reference even with RTLD_NOLOAD; hand it straight back.
        // The module stays mapped because its owner still holds one.
        // SAFETY: `module` is a live handle returned by dlopen above.
        unsafe {
            libc::dlclose(module);
        }
        Some(handle)
    }

    fn resolve(&self, handle: ModuleHandle, name: &str) -> Option<SymbolAddress> {
        let name = std::ffi::CString::new(name).ok()?;
        // SAFETY: `name` is NUL-terminated and `handle` came from the loader.
        let symbol = unsafe { libc::dlsym(handle.as_raw(), name.as_ptr()) };
        SymbolAddress::from_raw(symbol)
    }
}

/// The OS loader's description of the most recent failure, if any.
///
/// On Unix this reads (and clears) `dlerror`. On Windows it formats
/// `GetLastError`.
pub fn last_error() -> Option<String> {
    #[cfg(unix)]
    {
        // SAFETY: dlerror returns null or a NUL-terminated string that stays
        // valid until the next dl* call on this thread; it is copied at once.
        unsafe {
            let message = libc::dlerror();
            if message.is_null() {
                None
            } else {
                Some(
                    std::ffi::CStr::from_ptr(message)
                        .to_string_lossy()
                        .into_owned(),
                )
            }
        }
    }

    #[cfg(windows)]
    {
        let err = std::io::Error::last_os_error();
        match err.raw_os_error() {
            Some(0) | None => None,
            Some(_) => Some(err.to_string()),
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        None
    }
}
