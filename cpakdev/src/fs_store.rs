//! Directory-rooted buffer store for driving the core from the CLI.

use std::fs;
use std::path::PathBuf;

use cpak_core::error::Result;
use cpak_core::store::{BufferSink, BufferSource};

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl BufferSource for FsStore {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.root.join(reference))?)
    }
}

impl BufferSink for FsStore {
    fn store(&self, path: &str, data: &[u8]) -> Result<String> {
        let dest = self.root.join(path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, data)?;
        Ok(dest.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_fetch_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().to_path_buf());
        store.store("out/a.cpi", &[1, 2, 3]).unwrap();
        assert_eq!(store.fetch("out/a.cpi").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn fetch_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().to_path_buf());
        assert!(store.fetch("nope.bin").is_err());
    }
}
