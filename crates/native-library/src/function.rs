//! A library function bound together with the library that exports it.

// Binding asserts the function type of a symbol, which only the caller can vouch for.
#![allow(unsafe_code)]

use crate::library::DynamicLibrary;
use std::fmt;
use std::sync::Arc;

/// A resolved function pointer that keeps its library loaded.
///
/// The function is only handed out while a library is held. A failed bind
/// drops the library reference, so an unresolvable name reports unbound
/// instead of leaving a dangling pointer around.
pub struct LibraryFunction<F: Copy> {
    library: Option<Arc<DynamicLibrary>>,
    name: String,
    function: Option<F>,
}

impl<F: Copy> LibraryFunction<F> {
    /// An unbound function with no name.
    pub fn new() -> Self {
        Self {
            library: None,
            name: String::new(),
            function: None,
        }
    }

    /// An unbound function that remembers `name` for a later
    /// [`rebind_library`](Self::rebind_library).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new()
        }
    }

    /// Resolve `name` in `library`.
    ///
    /// # Safety
    ///
    /// `F` must be the function pointer type of the exported symbol,
    /// including its calling convention.
    pub unsafe fn bind(library: Arc<DynamicLibrary>, name: impl Into<String>) -> Self {
        let mut function = Self::named(name);
        // SAFETY: forwarded to the caller.
        unsafe { function.rebind(Some(library)) };
        function
    }

    /// Resolve a different name in the current library.
    ///
    /// # Safety
    ///
    /// See [`bind`](Self::bind).
    pub unsafe fn rebind_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        let library = self.library.take();
        // SAFETY: forwarded to the caller.
        unsafe { self.rebind(library) };
    }

    /// Resolve the current name in a different library.
    ///
    /// # Safety
    ///
    /// See [`bind`](Self::bind).
    pub unsafe fn rebind_library(&mut self, library: Arc<DynamicLibrary>) {
        // SAFETY: forwarded to the caller.
        unsafe { self.rebind(Some(library)) };
    }

    unsafe fn rebind(&mut self, library: Option<Arc<DynamicLibrary>>) {
        self.function = None;
        self.library = None;
        let Some(library) = library else {
            return;
        };
        if self.name.is_empty() {
            return;
        }
        // SAFETY: forwarded to the caller.
        self.function = unsafe { library.function::<F>(&self.name) };
        if self.function.is_some() {
            self.library = Some(library);
        }
    }

    /// The bound function, `None` while unbound.
    pub fn get(&self) -> Option<F> {
        self.library.as_ref()?;
        self.function
    }

    pub fn is_bound(&self) -> bool {
        self.get().is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn library(&self) -> Option<&Arc<DynamicLibrary>> {
        self.library.as_ref()
    }

    /// Forget the library, the name and the function.
    pub fn clear(&mut self) {
        self.library = None;
        self.name.clear();
        self.function = None;
    }
}

impl<F: Copy> Default for LibraryFunction<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Copy> fmt::Debug for LibraryFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryFunction")
            .field("name", &self.name)
            .field("bound", &self.is_bound())
            .finish()
    }
}
