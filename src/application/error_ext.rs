//! Error conversion helpers for member store calls
//!
//! Provides an extension trait for cleaner error handling with store context.

use std::io;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting store `io::Result` to `ApplicationResult` with context.
pub trait StoreResultExt<T> {
    /// Add context to a store error.
    ///
    /// # Example
    /// ```ignore
    /// store.persist(&patches)
    ///     .with_store_context("persist 3 patches")?;
    /// ```
    fn with_store_context(self, action: &str) -> ApplicationResult<T>;
}

impl<T> StoreResultExt<T> for io::Result<T> {
    fn with_store_context(self, action: &str) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: action.to_string(),
            source: Box::new(e),
        })
    }
}
