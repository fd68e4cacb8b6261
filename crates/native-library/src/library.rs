//! A loaded native library, or a reference to one already in the process.

use crate::loader::LibraryLoader;
use crate::platform::{ModuleHandle, SymbolAddress};
use std::fmt;

/// Where a [`DynamicLibrary`] gets its module from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    /// A handle this instance loaded or adopted, and must unload.
    Owned(Option<ModuleHandle>),
    /// A module some other part of the process loaded, looked up by name.
    Resident(String),
}

/// A native library handle.
///
/// An instance either owns a module handle, unloading it when dropped or
/// reset, or refers by name to a module that is already resident in the
/// process. A resident reference never loads or unloads anything and its
/// validity is re-checked on every call.
///
/// # Example
///
/// ```rust,no_run
/// use native_library::DynamicLibrary;
///
/// let library = DynamicLibrary::open("plugins/libexample.so");
/// if library.is_valid() {
///     let init = library.resolve_symbol("example_init");
///     println!("example_init at {:?}", init);
/// }
/// ```
pub struct DynamicLibrary {
    loader: LibraryLoader,
    source: Source,
}

impl DynamicLibrary {
    /// An empty, invalid library bound to the system loader.
    pub fn new() -> Self {
        Self::empty_with(&LibraryLoader::system())
    }

    /// An empty, invalid library bound to `loader`.
    pub fn empty_with(loader: &LibraryLoader) -> Self {
        Self::from_handle_with(loader, None)
    }

    /// Adopt an already loaded module handle.
    pub fn from_handle(handle: Option<ModuleHandle>) -> Self {
        Self::from_handle_with(&LibraryLoader::system(), handle)
    }

    /// Adopt an already loaded module handle, unloading it through `loader`.
    pub fn from_handle_with(loader: &LibraryLoader, handle: Option<ModuleHandle>) -> Self {
        Self {
            loader: loader.clone(),
            source: Source::Owned(handle),
        }
    }

    /// Load the library at `path` with the system loader.
    ///
    /// The result may be invalid if the load failed.
    pub fn open(path: &str) -> Self {
        Self::open_with(&LibraryLoader::system(), path)
    }

    /// Load the library at `path` with `loader`.
    pub fn open_with(loader: &LibraryLoader, path: &str) -> Self {
        let handle = loader.load(path);
        Self::from_handle_with(loader, handle)
    }

    /// Refer to a library already resident in the process. Nothing is loaded.
    pub fn well_known(name: impl Into<String>) -> Self {
        Self::well_known_with(&LibraryLoader::system(), name)
    }

    /// Refer to a resident library, looking it up through `loader`.
    pub fn well_known_with(loader: &LibraryLoader, name: impl Into<String>) -> Self {
        Self {
            loader: loader.clone(),
            source: Source::Resident(name.into()),
        }
    }

    pub fn loader(&self) -> &LibraryLoader {
        &self.loader
    }

    /// The resident library's name, `None` for an owned handle.
    pub fn library_name(&self) -> Option<&str> {
        match &self.source {
            Source::Resident(name) => Some(name),
            Source::Owned(_) => None,
        }
    }

    /// The owned handle, without giving up ownership.
    pub fn handle(&self) -> Option<ModuleHandle> {
        match &self.source {
            Source::Owned(handle) => *handle,
            Source::Resident(_) => None,
        }
    }

    /// Whether this instance holds a handle, or names a resident module.
    pub fn is_owned(&self) -> bool {
        matches!(self.source, Source::Owned(_))
    }

    /// Whether symbols can currently be resolved.
    ///
    /// Owned handles are valid while non-null. Resident references are valid
    /// while the named module is mapped, checked live on each call.
    pub fn is_valid(&self) -> bool {
        match &self.source {
            Source::Owned(handle) => handle.is_some(),
            Source::Resident(name) => self.loader.is_resident(name),
        }
    }

    /// Resolve an exported symbol.
    ///
    /// `None` for an empty name, an invalid library, or a missing symbol.
    pub fn resolve_symbol(&self, name: &str) -> Option<SymbolAddress> {
        if name.is_empty() {
            return None;
        }
        match &self.source {
            Source::Owned(handle) => self.loader.resolve((*handle)?, name),
            Source::Resident(library) => self.loader.resolve_resident(library, name),
        }
    }

    /// Unload the owned handle, if any, and adopt `handle`.
    ///
    /// Leaves the instance in owned mode even if it was a resident reference.
    pub fn reset(&mut self, handle: Option<ModuleHandle>) {
        let previous = std::mem::replace(&mut self.source, Source::Owned(handle));
        if let Source::Owned(previous) = previous {
            self.loader.unload(previous);
        }
    }

    /// Give up ownership of the handle without unloading it.
    ///
    /// The caller becomes responsible for unloading the returned handle.
    /// Resident references own nothing and return `None`.
    #[must_use = "the released handle must be unloaded by the caller"]
    pub fn release(&mut self) -> Option<ModuleHandle> {
        match &mut self.source {
            Source::Owned(handle) => handle.take(),
            Source::Resident(_) => None,
        }
    }
}

impl Default for DynamicLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DynamicLibrary {
    fn drop(&mut self) {
        if let Source::Owned(handle) = &mut self.source {
            self.loader.unload(handle.take());
        }
    }
}

impl fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicLibrary")
            .field("source", &self.source)
            .finish()
    }
}
