//! Library loading with working-directory redirection.
//!
//! Libraries often resolve co-located dependencies relative to the process
//! working directory. [`LibraryLoader::load`] points the working directory at
//! the library's own folder for the duration of the OS load call, then puts
//! it back.
//!
//! The capture, switch, load, restore sequence is not atomic. Callers that
//! load libraries from several threads must serialize those loads against
//! each other and against anything else that touches the working directory.

use crate::config::LoaderConfig;
use crate::path;
use crate::platform::{
    DirectoryContext, ModuleApi, ModuleHandle, ProcessDirectory, SymbolAddress, SystemModules,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Loads, unloads and inspects native modules.
///
/// Cloning is cheap; clones share the same backends.
#[derive(Clone)]
pub struct LibraryLoader {
    modules: Arc<dyn ModuleApi>,
    directory: Arc<dyn DirectoryContext>,
    config: LoaderConfig,
}

impl LibraryLoader {
    /// A loader backed by the OS loader and the process working directory.
    pub fn system() -> Self {
        Self::builder().build()
    }

    /// Create a builder for configuring a loader.
    pub fn builder() -> LibraryLoaderBuilder {
        LibraryLoaderBuilder::new()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load the library at `library_path`.
    ///
    /// The path is handed to the OS unmodified. Returns `None` if the OS
    /// refuses the load; no reason is captured, see
    /// [`last_error`](crate::platform::last_error).
    pub fn load(&self, library_path: &str) -> Option<ModuleHandle> {
        let restore = if self.config.redirect_working_directory {
            self.redirect_to_parent(library_path)
        } else {
            None
        };

        let handle = self.modules.load(library_path);

        if let Some(previous) = restore {
            if !self.directory.set_current_directory(&previous) {
                warn!("Failed to restore working directory to {}", previous);
            }
        }

        match handle {
            Some(handle) => debug!("Loaded native library {} ({:#x})", library_path, handle.addr()),
            // The OS error state is left untouched for the caller.
            None => warn!("Failed to load native library {}", library_path),
        }

        handle
    }

    /// Switch to the parent of `library_path`, returning the directory that
    /// must be restored afterwards. `None` if no switch is owed.
    fn redirect_to_parent(&self, library_path: &str) -> Option<String> {
        let current = match self.directory.current_directory() {
            Ok(current) => current,
            Err(e) => {
                debug!("Skipping working directory redirect: {}", e);
                return None;
            }
        };

        let parent = path::parent(library_path);
        if parent.is_empty() {
            return None;
        }

        debug!("Redirecting working directory to {} for load", parent);
        if !self.directory.set_current_directory(&parent) {
            debug!("Could not enter {}, loading from {}", parent, current);
        }
        Some(current)
    }

    /// Unload a module. Does nothing for `None`.
    pub fn unload(&self, handle: Option<ModuleHandle>) {
        if let Some(handle) = handle {
            trace!("Unloading native library {:#x}", handle.addr());
            self.modules.unload(handle);
        }
    }

    /// Whether a module named `name` is already mapped into the process.
    ///
    /// An empty name is never resident.
    pub fn is_resident(&self, name: &str) -> bool {
        !name.is_empty() && self.modules.find_resident(name).is_some()
    }

    /// Look up a resident module by name without taking ownership.
    pub fn find_resident(&self, name: &str) -> Option<ModuleHandle> {
        if name.is_empty() {
            return None;
        }
        self.modules.find_resident(name)
    }

    /// Resolve `name` in a loaded module. `None` for an empty name.
    pub fn resolve(&self, handle: ModuleHandle, name: &str) -> Option<SymbolAddress> {
        if name.is_empty() {
            return None;
        }
        let symbol = self.modules.resolve(handle, name);
        if symbol.is_none() {
            trace!("Symbol {} not found in {:#x}", name, handle.addr());
        }
        symbol
    }

    /// Resolve `name` in the resident module called `library_name`.
    pub fn resolve_resident(&self, library_name: &str, name: &str) -> Option<SymbolAddress> {
        if name.is_empty() {
            return None;
        }
        let handle = self.find_resident(library_name)?;
        self.resolve(handle, name)
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for LibraryLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryLoader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for configuring a [`LibraryLoader`].
///
/// # Example
///
/// ```rust,no_run
/// use native_library::{LibraryLoader, ProcessDirectory, SystemModules};
///
/// let loader = LibraryLoader::builder()
///     .modules(SystemModules)
///     .directory(ProcessDirectory)
///     .redirect_working_directory(false)
///     .build();
/// let handle = loader.load("plugins/libexample.so");
/// loader.unload(handle);
/// ```
pub struct LibraryLoaderBuilder {
    modules: Arc<dyn ModuleApi>,
    directory: Arc<dyn DirectoryContext>,
    config: LoaderConfig,
}

impl LibraryLoaderBuilder {
    /// Start from the OS backends and the default configuration.
    pub fn new() -> Self {
        Self {
            modules: Arc::new(SystemModules),
            directory: Arc::new(ProcessDirectory),
            config: LoaderConfig::default(),
        }
    }

    /// Use a different module API backend.
    pub fn modules(mut self, modules: impl ModuleApi + 'static) -> Self {
        self.modules = Arc::new(modules);
        self
    }

    /// Use a shared module API backend.
    pub fn shared_modules(mut self, modules: Arc<dyn ModuleApi>) -> Self {
        self.modules = modules;
        self
    }

    /// Use a different working directory context.
    pub fn directory(mut self, directory: impl DirectoryContext + 'static) -> Self {
        self.directory = Arc::new(directory);
        self
    }

    /// Use a shared working directory context.
    pub fn shared_directory(mut self, directory: Arc<dyn DirectoryContext>) -> Self {
        self.directory = directory;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable or disable working directory redirection during loads.
    ///
    /// Default: `true`
    pub fn redirect_working_directory(mut self, enable: bool) -> Self {
        self.config.redirect_working_directory = enable;
        self
    }

    pub fn build(self) -> LibraryLoader {
        LibraryLoader {
            modules: self.modules,
            directory: self.directory,
            config: self.config,
        }
    }
}

impl Default for LibraryLoaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
