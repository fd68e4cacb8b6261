//! Platform abstraction layer for the OS module loader and working directory.
//!
//! This module centralizes all platform-specific code. All `#[cfg]` blocks
//! for OS-specific behavior live here rather than in the loader or the
//! library handle, which only ever talk to the traits below.
//!
//! # Architecture
//!
//! - `modules` - Load, unload, resident lookup and symbol resolution
//! - `directory` - Process working directory get/set
//!
//! # Supported Platforms
//!
//! - **Windows**: `LoadLibraryW` family via `windows-sys`
//! - **Linux/macOS**: `dlopen` family via `libc`

pub mod directory;
pub mod modules;

pub use directory::{DirectoryContext, ProcessDirectory};
pub use modules::{last_error, ModuleApi, ModuleHandle, SymbolAddress, SystemModules};
