//! Collaborator interfaces for buffer transport. The core never touches
//! the filesystem or network itself; fetch/store is delegated to whatever
//! backs these traits (blob storage in production, a directory in the dev
//! CLI, memory in tests).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{PackError, Result};

/// Resolves an opaque reference to the raw bytes of a stored file.
pub trait BufferSource: Send + Sync {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>>;
}

/// Persists raw bytes under a destination path and returns a retrievable
/// reference.
pub trait BufferSink: Send + Sync {
    fn store(&self, path: &str, data: &[u8]) -> Result<String>;
}

/// In-memory store, primarily a test double for the orchestrator.
#[derive(Default)]
pub struct MemStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, reference: &str, data: Vec<u8>) {
        self.entries
            .lock()
            .expect("mem store poisoned")
            .insert(reference.to_string(), data);
    }

    pub fn get(&self, reference: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .expect("mem store poisoned")
            .get(reference)
            .cloned()
    }
}

impl BufferSource for MemStore {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        self.get(reference)
            .ok_or_else(|| PackError::Storage(format!("no such entry: {reference}")))
    }
}

impl BufferSink for MemStore {
    fn store(&self, path: &str, data: &[u8]) -> Result<String> {
        self.insert(path, data.to_vec());
        Ok(path.to_string())
    }
}
