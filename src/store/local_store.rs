use super::StoreError;
use std::{fs, path::PathBuf};

/// The override directory. Files here shadow archive entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalStore {
    data_dir: String,
}

impl LocalStore {
    pub fn new<S: Into<String>>(data_dir: S) -> LocalStore {
        LocalStore {
            data_dir: data_dir.into().replace('\\', "/"),
        }
    }

    pub fn data_dir(&self) -> &str {
        &self.data_dir
    }

    /// Filesystem path of resource `name`, with every `\` turned into `/`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let joined = if self.data_dir.is_empty() || self.data_dir.ends_with('/') {
            format!("{}{}", self.data_dir, name)
        } else {
            format!("{}/{}", self.data_dir, name)
        };

        PathBuf::from(joined.replace('\\', "/"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Reads resource `name`, or `None` if there is no such file.
    pub fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Ok(None);
        }

        Ok(Some(fs::read(path)?))
    }
}
