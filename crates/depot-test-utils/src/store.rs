//! [`TestStore`] builder for depot test scenarios.
//!
//! Wraps a temporary directory in a filesystem-backed manager and adds
//! direct-disk helpers, so tests can make out-of-band changes the manager
//! has not observed and then assert how the depot layer reacts.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use depot_core::{FilesystemDriver, Manager, MemoryDriver};
use depot_fs::VirtualPath;

/// A throwaway in-process store.
pub fn memory_store(name: &str) -> Manager {
    Manager::new(Box::new(MemoryDriver::new(name)))
}

/// A temporary filesystem store with helper methods for test setup and
/// assertion.
///
/// # Example
///
/// ```rust,no_run
/// use depot_test_utils::TestStore;
///
/// let store = TestStore::new();
/// store.manager().put(b"hello", "/greeting.txt", false).unwrap();
/// store.assert_exists("/greeting.txt");
/// ```
pub struct TestStore {
    temp_dir: TempDir,
    manager: Manager,
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStore {
    /// Create an empty store in a fresh temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let driver = FilesystemDriver::new(temp_dir.path())
            .expect("TestStore: failed to open filesystem driver");
        Self {
            temp_dir,
            manager: Manager::new(Box::new(driver)),
        }
    }

    /// The manager over the store.
    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// The native root of the store.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Native location of a store path.
    pub fn native(&self, path: &str) -> PathBuf {
        VirtualPath::new(path).to_native_under(self.temp_dir.path())
    }

    /// Write straight to disk, bypassing the manager.
    ///
    /// The manager's cache does not observe the write; tests use this to
    /// simulate a second actor editing the store.
    pub fn write_native(&self, path: &str, content: &[u8]) {
        let native = self.native(path);
        if let Some(parent) = native.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&native, content)
            .unwrap_or_else(|_| panic!("TestStore: could not write {}", native.display()));
    }

    /// Read straight from disk, bypassing the manager.
    pub fn read_native(&self, path: &str) -> Vec<u8> {
        let native = self.native(path);
        fs::read(&native)
            .unwrap_or_else(|_| panic!("TestStore: could not read {}", native.display()))
    }

    /// Delete straight from disk, bypassing the manager.
    pub fn remove_native(&self, path: &str) {
        let native = self.native(path);
        if native.is_dir() {
            fs::remove_dir_all(&native)
        } else {
            fs::remove_file(&native)
        }
        .unwrap_or_else(|_| panic!("TestStore: could not remove {}", native.display()));
    }

    /// Assert that an artefact exists at `path`.
    ///
    /// # Panics
    /// Panics with a descriptive message if nothing exists there.
    pub fn assert_exists(&self, path: &str) {
        assert!(
            self.native(path).exists(),
            "Expected artefact to exist: {}",
            path
        );
    }

    /// Assert that no artefact exists at `path`.
    ///
    /// # Panics
    /// Panics with a descriptive message if something exists there.
    pub fn assert_not_exists(&self, path: &str) {
        assert!(
            !self.native(path).exists(),
            "Expected artefact NOT to exist: {}",
            path
        );
    }

    /// Assert the content of the file at `path`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or holds different bytes.
    pub fn assert_content(&self, path: &str, expected: &[u8]) {
        let actual = self.read_native(path);
        assert!(
            actual == expected,
            "Content mismatch at {}.\nExpected: {:?}\nActual: {:?}",
            path,
            String::from_utf8_lossy(expected),
            String::from_utf8_lossy(&actual)
        );
    }
}
