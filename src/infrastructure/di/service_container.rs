//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::AssignmentService;
use crate::config::Settings;
use crate::infrastructure::store::JsonFileStore;
use crate::infrastructure::traits::{FileSystem, MemberStore, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Member records
    pub store: Arc<dyn MemberStore>,
}

impl ServiceContainer {
    /// Create a new service container backed by the configured roster file.
    pub fn new(settings: Settings) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let store = Arc::new(JsonFileStore::new(
            settings.roster_file.clone(),
            Arc::clone(&fs),
        ));
        Self::with_deps(settings, fs, store)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn MemberStore>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self { settings, fs, store }
    }

    pub fn assignment_service(&self) -> AssignmentService {
        AssignmentService::new(Arc::clone(&self.store), self.settings.hierarchy.policy())
    }
}
