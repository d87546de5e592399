use crate::cli::CommandLineArgs;
use crate::error::StudentPerfError;
use crate::store::StudentStore;

use std::sync::Arc;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Student record store.
    pub store: StudentStore,
}

impl AppState {
    /// Create and return an [AppState], opening the database named in the arguments.
    pub fn new(args: &CommandLineArgs) -> Result<Self, StudentPerfError> {
        let store = StudentStore::open(&args.database)?;
        Ok(Self::with_store(store))
    }

    /// Create and return an [AppState] around an already opened store.
    pub fn with_store(store: StudentStore) -> Self {
        Self { store }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
