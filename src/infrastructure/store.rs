//! Member stores: a JSON roster file and an in-memory list.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::domain::{apply_patches, Member, MemberPatch};
use crate::infrastructure::traits::{FileSystem, MemberStore};

/// Roster kept as a JSON array of member records.
///
/// Writes go through [`FileSystem::write`]; a lock serializes
/// read-modify-write cycles within the process.
pub struct JsonFileStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> io::Result<Vec<Member>> {
        if !self.fs.exists(&self.path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("roster file not found: {}", self.path.display()),
            ));
        }
        let content = self.fs.read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("parse roster {}: {}", self.path.display(), e),
            )
        })
    }

    fn write(&self, members: &[Member]) -> io::Result<()> {
        let content = serde_json::to_string_pretty(members)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.fs.ensure_parent(&self.path)?;
        self.fs.write(&self.path, &(content + "\n"))
    }

    /// Write an initial roster, refusing to clobber an existing one.
    pub fn create(&self, members: &[Member]) -> io::Result<()> {
        let _guard = lock(&self.lock)?;
        if self.fs.exists(&self.path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("roster file exists: {}", self.path.display()),
            ));
        }
        self.write(members)
    }
}

impl MemberStore for JsonFileStore {
    fn load(&self) -> io::Result<Vec<Member>> {
        let _guard = lock(&self.lock)?;
        self.read()
    }

    fn persist(&self, patches: &[MemberPatch]) -> io::Result<Vec<Member>> {
        let _guard = lock(&self.lock)?;
        let mut members = self.read()?;
        apply_patches(&mut members, patches)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
        self.write(&members)?;
        debug!(
            "persisted {} patches to {}",
            patches.len(),
            self.path.display()
        );
        Ok(members)
    }
}

/// Member list held in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    members: Mutex<Vec<Member>>,
}

impl InMemoryStore {
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members: Mutex::new(members),
        }
    }
}

impl MemberStore for InMemoryStore {
    fn load(&self) -> io::Result<Vec<Member>> {
        Ok(lock(&self.members)?.clone())
    }

    fn persist(&self, patches: &[MemberPatch]) -> io::Result<Vec<Member>> {
        let mut members = lock(&self.members)?;
        apply_patches(&mut members, patches)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
        Ok(members.clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> io::Result<std::sync::MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "member store lock poisoned"))
}
