//! # Persisted State
//!
//! A store holds the tests of one session and writes them back out after
//! every mutating operation. The on-disk shape is a plain list of test
//! documents, so a state file doubles as a readable report.
//!
//! Opening a path that does not exist yet is not an error; it reads as an
//! empty collection and the file appears on the first persist. Every other
//! I/O problem propagates.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::debug;

use crate::errors::RunbookError;
use crate::hooks::HookRegistry;
use crate::run::Status;
use crate::spec::{self, Format, TestSpec};
use crate::test::Test;

/// The persistence contract the engine consumes: load, lookup, add,
/// persist. Nothing in the core assumes a particular backing medium.
pub trait Store {
    /// Reloads state from the backing medium.
    fn load(&mut self) -> Result<(), RunbookError>;

    /// Every test currently held, in insertion order.
    fn tests(&self) -> &[Test];

    fn get(&self, uid: &str) -> Option<&Test> {
        self.tests().iter().find(|test| test.uid() == uid)
    }

    fn get_mut(&mut self, uid: &str) -> Option<&mut Test>;

    /// Inserts the test, replacing any existing one with the same uid,
    /// then persists.
    fn add(&mut self, test: Test) -> Result<(), RunbookError>;

    /// Writes current state out. The uid names the test that changed and
    /// must be present.
    fn persist(&mut self, uid: &str) -> Result<(), RunbookError>;

    /// Uids of every held test, in insertion order.
    fn uids(&self) -> Vec<String> {
        self.tests()
            .iter()
            .map(|test| test.uid().to_string())
            .collect()
    }

    /// Executes a stored test in place and persists its updated history.
    fn execute(&mut self, uid: &str, registry: &HookRegistry) -> Result<Status, RunbookError> {
        let test = self.get_mut(uid).ok_or_else(|| RunbookError::UnknownTest {
            uid: uid.to_string(),
        })?;
        test.execute(registry)?;
        let status = test.status();
        self.persist(uid)?;
        Ok(status)
    }
}

// ============================================================================
// FILE STORE
// ============================================================================

/// State in a single YAML or JSON file, rewritten whole on every persist.
pub struct FileStore {
    path: PathBuf,
    format: Format,
    registry: HookRegistry,
    tests: Vec<Test>,
}

impl std::fmt::Debug for FileStore {
    // Manual impl: the registry field holds trait objects, which are not Debug.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("tests", &self.tests)
            .finish_non_exhaustive()
    }
}

impl FileStore {
    /// Opens a state file and loads whatever it holds. A missing file is
    /// simply an empty session.
    pub fn open(path: impl Into<PathBuf>, registry: HookRegistry) -> Result<Self, RunbookError> {
        let path = path.into();
        let format = Format::for_path(&path);
        let mut store = Self {
            path,
            format,
            registry,
            tests: Vec::new(),
        };
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn write_all(&self) -> Result<(), RunbookError> {
        let specs: Vec<TestSpec> = self.tests.iter().map(Test::to_spec).collect();
        let text = spec::encode(self.format, &specs, &self.path)?;
        fs::write(&self.path, text).map_err(|e| RunbookError::io(&self.path, e))?;
        debug!(path = %self.path.display(), tests = self.tests.len(), "state persisted");
        Ok(())
    }
}

impl Store for FileStore {
    fn load(&mut self) -> Result<(), RunbookError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no prior state");
                self.tests.clear();
                return Ok(());
            }
            Err(err) => return Err(RunbookError::io(&self.path, err)),
        };
        let specs: Vec<TestSpec> = spec::decode(self.format, &text, &self.path)?;
        self.tests = specs
            .into_iter()
            .map(|spec| Test::from_spec(spec, &self.registry))
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    fn tests(&self) -> &[Test] {
        &self.tests
    }

    fn get_mut(&mut self, uid: &str) -> Option<&mut Test> {
        self.tests.iter_mut().find(|test| test.uid() == uid)
    }

    fn add(&mut self, test: Test) -> Result<(), RunbookError> {
        match self.tests.iter_mut().find(|t| t.uid() == test.uid()) {
            Some(existing) => *existing = test,
            None => self.tests.push(test),
        }
        self.write_all()
    }

    fn persist(&mut self, uid: &str) -> Result<(), RunbookError> {
        if !self.tests.iter().any(|t| t.uid() == uid) {
            return Err(RunbookError::UnknownTest {
                uid: uid.to_string(),
            });
        }
        self.write_all()
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// State held in memory only. Useful for embedding and for tests; persists
/// are validated but write nowhere.
#[derive(Default)]
pub struct MemoryStore {
    tests: Vec<Test>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn load(&mut self) -> Result<(), RunbookError> {
        Ok(())
    }

    fn tests(&self) -> &[Test] {
        &self.tests
    }

    fn get_mut(&mut self, uid: &str) -> Option<&mut Test> {
        self.tests.iter_mut().find(|test| test.uid() == uid)
    }

    fn add(&mut self, test: Test) -> Result<(), RunbookError> {
        match self.tests.iter_mut().find(|t| t.uid() == test.uid()) {
            Some(existing) => *existing = test,
            None => self.tests.push(test),
        }
        Ok(())
    }

    fn persist(&mut self, uid: &str) -> Result<(), RunbookError> {
        if !self.tests.iter().any(|t| t.uid() == uid) {
            return Err(RunbookError::UnknownTest {
                uid: uid.to_string(),
            });
        }
        Ok(())
    }
}
