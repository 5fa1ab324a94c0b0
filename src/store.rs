use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub mod grf_store;
pub mod local_store;

pub use grf_store::GrfStore;
pub use local_store::LocalStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("archive {0} is not registered")]
    UnknownArchive(usize),
}

/// A registered archive. The index never changes and is never reused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveHandle {
    pub index: usize,
    pub path: PathBuf,
}

/// Archives in the order they were registered.
///
/// Registration order is what decides shadowing: entries of a later archive
/// overwrite same-named entries of an earlier one.
#[derive(Clone, Debug, Default)]
pub struct ArchiveRegistry {
    archives: Vec<ArchiveHandle>,
}

impl ArchiveRegistry {
    pub fn new() -> ArchiveRegistry {
        ArchiveRegistry::default()
    }

    /// Registers `path` and returns its index.
    pub fn register<P: AsRef<Path>>(&mut self, path: P) -> usize {
        let index = self.archives.len();
        self.archives.push(ArchiveHandle {
            index,
            path: path.as_ref().to_path_buf(),
        });
        index
    }

    pub fn get(&self, index: usize) -> Result<&ArchiveHandle, StoreError> {
        self.archives
            .get(index)
            .ok_or(StoreError::UnknownArchive(index))
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArchiveHandle> {
        self.archives.iter()
    }

    pub fn clear(&mut self) {
        self.archives.clear();
    }
}
