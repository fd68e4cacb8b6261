//! Native objects created and destroyed through a library's exports.
//!
//! Plugin-style libraries commonly export a factory (`create_*`) returning an
//! opaque pointer and a matching destructor (`destroy_*`). [`NativeObject`]
//! pairs the two so the destructor runs exactly once, when the object is
//! dropped.

// Calls through exported factory and destructor symbols.
#![allow(unsafe_code)]

use crate::library::DynamicLibrary;
use crate::loader::LibraryLoader;
use crate::symbol::function_from_weak;
use std::fmt;
use std::ptr;
use std::sync::{Arc, Weak};
use tracing::debug;

/// How an exported destructor expects to receive the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyStyle {
    /// `extern "system" fn(*mut T)`
    Pointer,
    /// `extern "system" fn(*mut *mut T)`
    DoublePointer,
}

type Destructor<T> = Box<dyn FnOnce(*mut T)>;

/// An object owned through a native library's factory and destructor.
pub struct NativeObject<T> {
    ptr: *mut T,
    destructor: Option<Destructor<T>>,
    /// Set when the object came from a resident library reference.
    resident: Option<(LibraryLoader, String)>,
}

impl<T: 'static> NativeObject<T> {
    /// Adopt `ptr`, releasing it with `destructor` on drop.
    ///
    /// The destructor is not called for a null pointer.
    pub fn from_raw(ptr: *mut T, destructor: impl FnOnce(*mut T) + 'static) -> Self {
        Self {
            ptr,
            destructor: Some(Box::new(destructor)),
            resident: None,
        }
    }

    /// Call the no-argument factory `create` and arrange for `destroy` to
    /// release the result.
    ///
    /// The destructor is looked up when the object is dropped, through a weak
    /// reference: if the library is gone by then, nothing is called. A
    /// missing factory yields a null object.
    ///
    /// # Safety
    ///
    /// `create` must be an `extern "system" fn() -> *mut T`, and `destroy`
    /// must take the object in the ABI selected by `style`.
    pub unsafe fn create(
        library: &Arc<DynamicLibrary>,
        create: &str,
        destroy: &str,
        style: DestroyStyle,
    ) -> Self {
        // SAFETY: forwarded to the caller.
        unsafe {
            Self::create_with(
                library,
                create,
                destroy,
                style,
                |factory: unsafe extern "system" fn() -> *mut T| factory(),
            )
        }
    }

    /// Resolve the factory `create` as `C` and let `invoke` call it, passing
    /// whatever arguments the factory takes.
    ///
    /// `invoke` is not called if the factory is missing; the object is null.
    ///
    /// # Safety
    ///
    /// `C` must be the factory's function pointer type, and `destroy` must
    /// take the object in the ABI selected by `style`.
    pub unsafe fn create_with<C: Copy>(
        library: &Arc<DynamicLibrary>,
        create: &str,
        destroy: &str,
        style: DestroyStyle,
        invoke: impl FnOnce(C) -> *mut T,
    ) -> Self {
        // SAFETY: the caller guarantees the factory's signature.
        let ptr = match unsafe { library.function::<C>(create) } {
            Some(factory) => invoke(factory),
            None => {
                debug!("Factory {} not found, object is null", create);
                ptr::null_mut()
            }
        };

        Self {
            ptr,
            destructor: Some(destroyer(Arc::downgrade(library), destroy.to_string(), style)),
            resident: library
                .library_name()
                .map(|name| (library.loader().clone(), name.to_string())),
        }
    }

    /// Destroy the current object and create a new one in its place.
    ///
    /// # Safety
    ///
    /// See [`create`](Self::create).
    pub unsafe fn reset(
        &mut self,
        library: &Arc<DynamicLibrary>,
        create: &str,
        destroy: &str,
        style: DestroyStyle,
    ) {
        // The previous object is dropped, and destroyed, by the assignment.
        // SAFETY: forwarded to the caller.
        *self = unsafe { Self::create(library, create, destroy, style) };
    }
}

/// Build a destructor that resolves `name` through `library` at drop time.
fn destroyer<T: 'static>(
    library: Weak<DynamicLibrary>,
    name: String,
    style: DestroyStyle,
) -> Destructor<T> {
    Box::new(move |object: *mut T| match style {
        DestroyStyle::Pointer => {
            // SAFETY: the signature was vouched for in `NativeObject::create`.
            let destroy =
                unsafe { function_from_weak::<unsafe extern "system" fn(*mut T)>(&library, &name) };
            if let Some(destroy) = destroy {
                // SAFETY: `object` came from the matching factory and is destroyed once.
                unsafe { destroy(object) };
            }
        }
        DestroyStyle::DoublePointer => {
            // SAFETY: the signature was vouched for in `NativeObject::create`.
            let destroy = unsafe {
                function_from_weak::<unsafe extern "system" fn(*mut *mut T)>(&library, &name)
            };
            if let Some(destroy) = destroy {
                let mut object = object;
                // SAFETY: as above; `object` lives on this stack frame for the call.
                unsafe { destroy(&mut object) };
            }
        }
    })
}

impl<T> NativeObject<T> {
    /// The object pointer.
    ///
    /// Null if creation failed, or if the object came from a resident
    /// library that is no longer mapped (checked on every call).
    pub fn get(&self) -> *mut T {
        if let Some((loader, name)) = &self.resident {
            if !loader.is_resident(name) {
                return ptr::null_mut();
            }
        }
        self.ptr
    }

    pub fn is_null(&self) -> bool {
        self.get().is_null()
    }

    /// Hand the pointer back without destroying it.
    #[must_use = "the returned object must be destroyed by the caller"]
    pub fn take(mut self) -> *mut T {
        self.destructor = None;
        std::mem::replace(&mut self.ptr, ptr::null_mut())
    }
}

impl<T> Drop for NativeObject<T> {
    fn drop(&mut self) {
        let object = std::mem::replace(&mut self.ptr, ptr::null_mut());
        if object.is_null() {
            return;
        }
        if let Some(destructor) = self.destructor.take() {
            destructor(object);
        }
    }
}

impl<T> fmt::Debug for NativeObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeObject")
            .field("ptr", &self.ptr)
            .field("resident", &self.resident.as_ref().map(|(_, name)| name))
            .finish()
    }
}
