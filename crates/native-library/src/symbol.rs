//! Typed function pointer resolution.
//!
//! Thin casts from a resolved [`SymbolAddress`] to a caller-chosen function
//! pointer type such as `unsafe extern "system" fn(i32) -> i32`. They add no
//! runtime behavior beyond what [`DynamicLibrary::resolve_symbol`] does.

// Reinterpreting symbol addresses as function pointers is inherently unsafe.
#![allow(unsafe_code)]

use crate::library::DynamicLibrary;
use crate::loader::LibraryLoader;
use crate::platform::{ModuleHandle, SymbolAddress};
use std::ffi::c_void;
use std::marker::PhantomData;
use std::mem::size_of;
use std::sync::Weak;

struct PointerSized<F>(PhantomData<F>);

impl<F> PointerSized<F> {
    const CHECK: () = assert!(
        size_of::<F>() == size_of::<*const c_void>(),
        "symbol type must be a function pointer"
    );
}

/// Reinterpret `symbol` as a value of type `F`.
///
/// # Safety
///
/// `F` must be a function pointer type whose signature and calling
/// convention match the exported symbol. The pointer is only valid while the
/// module that exports it stays loaded.
pub unsafe fn cast_symbol<F: Copy>(symbol: SymbolAddress) -> F {
    let () = PointerSized::<F>::CHECK;
    let ptr = symbol.as_ptr();
    // SAFETY: `F` is pointer sized (checked at compile time) and the caller
    // guarantees it is the symbol's real function type.
    unsafe { std::mem::transmute_copy::<*const c_void, F>(&ptr) }
}

/// Resolve `name` in a raw module handle as a function of type `F`.
///
/// `None` for a null handle, an empty name or a missing symbol.
///
/// # Safety
///
/// See [`cast_symbol`].
pub unsafe fn function_from_handle<F: Copy>(
    loader: &LibraryLoader,
    handle: Option<ModuleHandle>,
    name: &str,
) -> Option<F> {
    let symbol = loader.resolve(handle?, name)?;
    // SAFETY: forwarded to the caller.
    Some(unsafe { cast_symbol(symbol) })
}

/// Resolve `name` in `library` as a function of type `F`.
///
/// `None` if there is no library, or under the same conditions as
/// [`DynamicLibrary::resolve_symbol`].
///
/// # Safety
///
/// See [`cast_symbol`].
pub unsafe fn function<F: Copy>(library: Option<&DynamicLibrary>, name: &str) -> Option<F> {
    // SAFETY: forwarded to the caller.
    unsafe { library?.function(name) }
}

/// Resolve `name` through a weak observation of a library.
///
/// `None` if the library has already been dropped.
///
/// # Safety
///
/// See [`cast_symbol`]. The returned pointer does not keep the library
/// alive.
pub unsafe fn function_from_weak<F: Copy>(library: &Weak<DynamicLibrary>, name: &str) -> Option<F> {
    let library = library.upgrade()?;
    // SAFETY: forwarded to the caller.
    unsafe { library.function(name) }
}

impl DynamicLibrary {
    /// Resolve `name` as a function of type `F`.
    ///
    /// # Safety
    ///
    /// See [`cast_symbol`].
    pub unsafe fn function<F: Copy>(&self, name: &str) -> Option<F> {
        let symbol = self.resolve_symbol(name)?;
        // SAFETY: forwarded to the caller.
        Some(unsafe { cast_symbol(symbol) })
    }
}
