//! Recording fakes for the OS loader and the working directory.
//!
//! Both fakes append to one shared [`EventLog`] so tests can assert the exact
//! order of directory switches and loader calls.

#![allow(dead_code)]

use native_library::{DirectoryContext, LibraryError, ModuleApi, ModuleHandle, SymbolAddress};
use native_library::{LibraryLoader, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    GetDir,
    SetDir(String),
    Load(String),
    Unload(usize),
    FindResident(String),
    Resolve(usize, String),
}

#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[derive(Debug, Default)]
struct ModuleState {
    /// Paths that load successfully, and the handle each one yields.
    loadable: HashMap<String, usize>,
    /// Modules mapped by someone else.
    resident: HashMap<String, usize>,
    /// Symbol name to address, shared by every module.
    symbols: HashMap<String, usize>,
    /// Outstanding loads per handle.
    references: HashMap<usize, i64>,
    unloads: HashMap<usize, usize>,
}

/// In-memory [`ModuleApi`].
#[derive(Debug)]
pub struct MockModules {
    log: Arc<EventLog>,
    state: Mutex<ModuleState>,
}

impl MockModules {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self {
            log,
            state: Mutex::new(ModuleState::default()),
        }
    }

    pub fn with_library(self, path: &str, handle: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .loadable
            .insert(path.to_string(), handle);
        self
    }

    pub fn with_resident(self, name: &str, handle: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .resident
            .insert(name.to_string(), handle);
        self
    }

    pub fn with_symbol(self, name: &str, address: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .symbols
            .insert(name.to_string(), address);
        self
    }

    /// Simulate the owner of a resident module unloading it.
    pub fn evict_resident(&self, name: &str) {
        self.state.lock().unwrap().resident.remove(name);
    }

    /// Loads minus unloads for `handle`.
    pub fn references(&self, handle: usize) -> i64 {
        *self
            .state
            .lock()
            .unwrap()
            .references
            .get(&handle)
            .unwrap_or(&0)
    }

    pub fn unload_count(&self, handle: usize) -> usize {
        *self.state.lock().unwrap().unloads.get(&handle).unwrap_or(&0)
    }
}

impl ModuleApi for MockModules {
    fn load(&self, path: &str) -> Option<ModuleHandle> {
        self.log.push(Event::Load(path.to_string()));
        let mut state = self.state.lock().unwrap();
        let handle = *state.loadable.get(path)?;
        *state.references.entry(handle).or_insert(0) += 1;
        ModuleHandle::from_addr(handle)
    }

    fn unload(&self, handle: ModuleHandle) {
        self.log.push(Event::Unload(handle.addr()));
        let mut state = self.state.lock().unwrap();
        *state.references.entry(handle.addr()).or_insert(0) -= 1;
        *state.unloads.entry(handle.addr()).or_insert(0) += 1;
    }

    fn find_resident(&self, name: &str) -> Option<ModuleHandle> {
        self.log.push(Event::FindResident(name.to_string()));
        let state = self.state.lock().unwrap();
        state
            .resident
            .get(name)
            .and_then(|handle| ModuleHandle::from_addr(*handle))
    }

    fn resolve(&self, handle: ModuleHandle, name: &str) -> Option<SymbolAddress> {
        self.log.push(Event::Resolve(handle.addr(), name.to_string()));
        let state = self.state.lock().unwrap();
        state
            .symbols
            .get(name)
            .and_then(|address| SymbolAddress::from_addr(*address))
    }
}

/// In-memory [`DirectoryContext`].
#[derive(Debug)]
pub struct MockDirectory {
    log: Arc<EventLog>,
    current: Mutex<Option<String>>,
    accept_set: bool,
}

impl MockDirectory {
    pub fn new(log: Arc<EventLog>, current: &str) -> Self {
        Self {
            log,
            current: Mutex::new(Some(current.to_string())),
            accept_set: true,
        }
    }

    /// A directory whose current value cannot be read.
    pub fn unreadable(log: Arc<EventLog>) -> Self {
        Self {
            log,
            current: Mutex::new(None),
            accept_set: true,
        }
    }

    /// Refuse every directory change.
    pub fn rejecting_set(mut self) -> Self {
        self.accept_set = false;
        self
    }

    pub fn current(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }
}

impl DirectoryContext for MockDirectory {
    fn current_directory(&self) -> Result<String> {
        self.log.push(Event::GetDir);
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| {
                LibraryError::from(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "working directory unavailable",
                ))
            })
    }

    fn set_current_directory(&self, path: &str) -> bool {
        self.log.push(Event::SetDir(path.to_string()));
        if !self.accept_set {
            return false;
        }
        *self.current.lock().unwrap() = Some(path.to_string());
        true
    }
}

/// A log, fake backends and a loader wired to them.
pub struct Fixture {
    pub log: Arc<EventLog>,
    pub modules: Arc<MockModules>,
    pub directory: Arc<MockDirectory>,
    pub loader: LibraryLoader,
}

impl Fixture {
    pub fn new(configure: impl FnOnce(MockModules) -> MockModules, cwd: &str) -> Self {
        init_tracing();
        let log = Arc::new(EventLog::default());
        let modules = Arc::new(configure(MockModules::new(log.clone())));
        let directory = Arc::new(MockDirectory::new(log.clone(), cwd));
        let loader = LibraryLoader::builder()
            .shared_modules(modules.clone())
            .shared_directory(directory.clone())
            .build();
        Self {
            log,
            modules,
            directory,
            loader,
        }
    }
}

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
