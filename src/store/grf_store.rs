use super::StoreError;
use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

/// An archive file opened for payload reads.
pub struct GrfStore {
    file: File,
}

impl GrfStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<GrfStore, StoreError> {
        Ok(GrfStore {
            file: File::open(path)?,
        })
    }

    /// Reads exactly `len` bytes starting at `offset`.
    pub fn read(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, StoreError> {
        let mut buf = vec![0; len];

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buf)?;

        Ok(buf)
    }
}
