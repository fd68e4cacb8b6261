//! Native Library - runtime loading of shared libraries.
//!
//! This crate loads native shared libraries at runtime, resolves their
//! exported symbols, and keeps the process working directory pointed at the
//! library's own folder while it loads, so dependencies shipped next to the
//! library are found.
//!
//! Libraries that are already resident in the process (loaded by someone
//! else) can be referenced by name. Such references never load or unload
//! anything, unlike handles this crate loaded itself and therefore owns.
//!
//! # Example
//!
//! ```rust,ignore
//! use native_library::DynamicLibrary;
//!
//! let library = DynamicLibrary::open("plugins/libexample.so");
//! type Version = unsafe extern "system" fn() -> u32;
//!
//! // SAFETY: `example_version` is exported with this exact signature.
//! if let Some(version) = unsafe { library.function::<Version>("example_version") } {
//!     println!("plugin version {}", unsafe { version() });
//! }
//! ```
//!
//! The working directory redirect during a load is not atomic. Serialize
//! loads if several threads may load libraries or change the working
//! directory at the same time.

pub mod config;
pub mod error;
pub mod function;
pub mod library;
pub mod loader;
pub mod object;
pub mod path;
pub mod platform;
pub mod symbol;

// Re-export commonly used types
pub use config::{LoaderConfig, PathConfig};
pub use error::{LibraryError, Result};
pub use function::LibraryFunction;
pub use library::DynamicLibrary;
pub use loader::{LibraryLoader, LibraryLoaderBuilder};
pub use object::{DestroyStyle, NativeObject};
pub use platform::{
    DirectoryContext, ModuleApi, ModuleHandle, ProcessDirectory, SymbolAddress, SystemModules,
};
pub use symbol::{cast_symbol, function, function_from_handle, function_from_weak};
