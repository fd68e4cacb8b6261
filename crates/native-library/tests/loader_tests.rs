//! Integration tests for LibraryLoader's working directory handling.

mod common;

use common::{Event, EventLog, Fixture, MockDirectory, MockModules};
use native_library::{DirectoryContext, LibraryError, LibraryLoader};
use std::sync::Arc;

const PLUGIN: &str = r"C:\plugins\foo.dll";

#[test]
fn test_load_redirects_and_restores_directory() {
    let fx = Fixture::new(|m| m.with_library(PLUGIN, 0x10), r"D:\work");

    let handle = fx.loader.load(PLUGIN);

    assert_eq!(handle.map(|h| h.addr()), Some(0x10));
    assert_eq!(
        fx.log.events(),
        vec![
            Event::GetDir,
            Event::SetDir(r"C:\plugins".into()),
            Event::Load(PLUGIN.into()),
            Event::SetDir(r"D:\work".into()),
        ]
    );
    assert_eq!(fx.directory.current().as_deref(), Some(r"D:\work"));
}

#[test]
fn test_failed_load_still_restores_directory() {
    let fx = Fixture::new(|m| m, r"D:\work");

    assert!(fx.loader.load(PLUGIN).is_none());
    assert_eq!(
        fx.log.events(),
        vec![
            Event::GetDir,
            Event::SetDir(r"C:\plugins".into()),
            Event::Load(PLUGIN.into()),
            Event::SetDir(r"D:\work".into()),
        ]
    );
}

#[test]
fn test_path_is_passed_to_os_unmodified() {
    let path = r"C:\plugins\\sub\\foo.dll";
    let fx = Fixture::new(|m| m.with_library(path, 0x10), r"D:\work");

    assert!(fx.loader.load(path).is_some());
    assert!(fx.log.events().contains(&Event::Load(path.into())));
    assert!(fx.log.events().contains(&Event::SetDir(r"C:\plugins\\sub".into())));
}

#[test]
fn test_bare_file_name_redirects_to_current_directory_marker() {
    let fx = Fixture::new(|m| m.with_library("foo.dll", 0x10), "/home/user");

    fx.loader.load("foo.dll");

    assert_eq!(
        fx.log.events(),
        vec![
            Event::GetDir,
            Event::SetDir(".".into()),
            Event::Load("foo.dll".into()),
            Event::SetDir("/home/user".into()),
        ]
    );
}

#[test]
fn test_unreadable_directory_skips_redirect() {
    common::init_tracing();
    let log = Arc::new(EventLog::default());
    let modules = Arc::new(MockModules::new(log.clone()).with_library(PLUGIN, 0x10));
    let loader = LibraryLoader::builder()
        .shared_modules(modules)
        .directory(MockDirectory::unreadable(log.clone()))
        .build();

    assert!(loader.load(PLUGIN).is_some());
    assert_eq!(log.events(), vec![Event::GetDir, Event::Load(PLUGIN.into())]);
}

#[test]
fn test_unreadable_directory_reports_io_error() {
    let directory = MockDirectory::unreadable(Arc::new(EventLog::default()));

    match directory.current_directory() {
        Err(LibraryError::Io { message, path, .. }) => {
            assert_eq!(message, "working directory unavailable");
            assert!(path.is_none());
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_rejected_switch_still_attempts_restore() {
    common::init_tracing();
    let log = Arc::new(EventLog::default());
    let loader = LibraryLoader::builder()
        .modules(MockModules::new(log.clone()).with_library(PLUGIN, 0x10))
        .directory(MockDirectory::new(log.clone(), r"D:\work").rejecting_set())
        .build();

    assert!(loader.load(PLUGIN).is_some());
    assert_eq!(
        log.events(),
        vec![
            Event::GetDir,
            Event::SetDir(r"C:\plugins".into()),
            Event::Load(PLUGIN.into()),
            Event::SetDir(r"D:\work".into()),
        ]
    );
}

#[test]
fn test_redirect_can_be_disabled() {
    common::init_tracing();
    let log = Arc::new(EventLog::default());
    let loader = LibraryLoader::builder()
        .modules(MockModules::new(log.clone()).with_library(PLUGIN, 0x10))
        .directory(MockDirectory::new(log.clone(), r"D:\work"))
        .redirect_working_directory(false)
        .build();

    assert!(!loader.config().redirect_working_directory);
    assert!(loader.load(PLUGIN).is_some());
    assert_eq!(log.events(), vec![Event::Load(PLUGIN.into())]);
}

#[test]
fn test_load_does_not_retry() {
    let fx = Fixture::new(|m| m, "/tmp");

    assert!(fx.loader.load("/opt/missing.so").is_none());
    let loads = fx
        .log
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Load(_)))
        .count();
    assert_eq!(loads, 1);
}

#[test]
fn test_unload_none_is_noop() {
    let fx = Fixture::new(|m| m, "/tmp");

    fx.loader.unload(None);
    assert!(fx.log.events().is_empty());
}

#[test]
fn test_unload_forwards_to_os() {
    let fx = Fixture::new(|m| m.with_library("/opt/libfoo.so", 0x20), "/tmp");

    let handle = fx.loader.load("/opt/libfoo.so");
    assert_eq!(fx.modules.references(0x20), 1);

    fx.loader.unload(handle);
    assert_eq!(fx.modules.references(0x20), 0);
    assert_eq!(fx.modules.unload_count(0x20), 1);
}

#[test]
fn test_is_resident() {
    let fx = Fixture::new(|m| m.with_resident("kernel32.dll", 0x30), "/tmp");

    assert!(fx.loader.is_resident("kernel32.dll"));
    assert!(!fx.loader.is_resident("user32.dll"));

    fx.log.clear();
    assert!(!fx.loader.is_resident(""));
    assert!(fx.log.events().is_empty(), "empty name must not reach the OS");
}

#[test]
fn test_resolve_rejects_empty_name() {
    let fx = Fixture::new(|m| m.with_symbol("", 0x99), "/tmp");
    let handle = native_library::ModuleHandle::from_addr(0x10).unwrap();

    assert!(fx.loader.resolve(handle, "").is_none());
    assert!(fx.log.events().is_empty());
}

#[test]
fn test_resolve_resident_looks_up_module_each_time() {
    let fx = Fixture::new(
        |m| m.with_resident("kernel32.dll", 0x30).with_symbol("Sleep", 0x31),
        "/tmp",
    );

    let first = fx.loader.resolve_resident("kernel32.dll", "Sleep");
    let second = fx.loader.resolve_resident("kernel32.dll", "Sleep");

    assert_eq!(first.map(|s| s.addr()), Some(0x31));
    assert_eq!(first, second);
    assert_eq!(
        fx.log.events(),
        vec![
            Event::FindResident("kernel32.dll".into()),
            Event::Resolve(0x30, "Sleep".into()),
            Event::FindResident("kernel32.dll".into()),
            Event::Resolve(0x30, "Sleep".into()),
        ]
    );
}
