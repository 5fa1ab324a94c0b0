use crate::{
    archive::{self, ArchiveError},
    codec::{self, CodecError},
    config::Config,
    file_table::{FileEntry, Source},
    store::{ArchiveRegistry, GrfStore, LocalStore, StoreError},
    ArchiveIndex,
};
use std::{io, path::Path};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("file `{0}` not found")]
    NotFound(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ArchiveIndex {
    /// An empty index with no archives and the current directory as the
    /// override directory.
    pub fn new() -> ArchiveIndex {
        ArchiveIndex::default()
    }

    /// Builds an index from the config file at `config_path`.
    ///
    /// An unreadable config is logged and yields an index without archives,
    /// which still serves files from the default override directory.
    ///
    /// # Arguments
    ///
    /// * `config_path` - The path to the config file
    pub fn init<P: AsRef<Path>>(config_path: P) -> ArchiveIndex {
        let config_path = config_path.as_ref();

        let config = match Config::load(config_path) {
            Ok(config) => {
                info!("Done reading '{}'.", config_path.display());
                config
            }
            Err(e) => {
                error!("failed reading config '{}': {}", config_path.display(), e);
                Config::default()
            }
        };

        Self::from_config(&config)
    }

    /// Builds an index from an already parsed config: loads every archive in
    /// order, then the alias table.
    ///
    /// # Arguments
    ///
    /// * `config` - The archives and override directory to use
    pub fn from_config(config: &Config) -> ArchiveIndex {
        let mut index = ArchiveIndex::new();
        index.set_data_dir(&config.data_dir);

        let mut loaded = 0;
        for path in &config.archives {
            if index.add_archive(path).is_ok() {
                loaded += 1;
            }
        }
        if loaded == 0 {
            info!("No GRF loaded, using default data directory");
        }

        index.table.shrink_to_fit();
        index.load_aliases();
        index
    }

    pub fn set_data_dir(&mut self, data_dir: &str) {
        self.local = LocalStore::new(data_dir);
    }

    pub fn data_dir(&self) -> &str {
        self.local.data_dir()
    }

    /// Registers the archive at `path` and merges its entries into the table.
    ///
    /// The archive keeps its registry slot even when parsing fails; in that
    /// case none of its entries are added and earlier archives are unaffected.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the archive
    pub fn add_archive<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, ArchiveError> {
        let path = path.as_ref();
        let index = self.archives.register(path);

        if !path.is_file() {
            warn!("GRF data file not found: '{}'", path.display());
            return Err(ArchiveError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "archive not found",
            )));
        }
        info!("GRF data file found: '{}'", path.display());

        let entries = archive::read_archive(path, index).map_err(|e| {
            error!("GRF '{}' read error: {}", path.display(), e);
            e
        })?;

        let count = entries.len();
        for entry in entries {
            self.table.upsert(entry);
        }
        debug!("loaded {} entries from '{}'", count, path.display());

        Ok(index)
    }

    /// Reads file `name`, from the override directory or an archive.
    ///
    /// # Arguments
    ///
    /// * `name` - The virtual file name, matched case-insensitively
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>, IndexError> {
        trace!("read `{}`", name);

        let Some(entry) = self.table.get(name) else {
            return self
                .local
                .read(name)?
                .ok_or_else(|| Self::not_found(name));
        };

        match entry.source {
            Source::LocalConfirmed => self
                .local
                .read(entry.canonical_name())?
                .ok_or_else(|| Self::not_found(name)),
            Source::LocalPending(archive) => {
                let local = self.local.read(entry.canonical_name())?;
                let resolved = match local {
                    Some(_) => Source::LocalConfirmed,
                    None => Source::Archive(archive),
                };
                if let Some(entry) = self.table.get_mut(name) {
                    entry.source = resolved;
                }

                match local {
                    Some(buf) => Ok(buf),
                    None => self.read(name),
                }
            }
            Source::Archive(archive) => self.read_archived(entry, archive),
        }
    }

    fn read_archived(&self, entry: &FileEntry, archive: usize) -> Result<Vec<u8>, IndexError> {
        let handle = self.archives.get(archive)?;
        let mut buf = GrfStore::open(&handle.path)?.read(entry.offset, entry.padded_len as usize)?;

        if !entry.is_file {
            buf.truncate(entry.decompressed_len as usize);
            return Ok(buf);
        }

        codec::decode(&mut buf, entry.mode, entry.compressed_len);

        let compressed = &buf[..(entry.compressed_len as usize).min(buf.len())];
        codec::inflate(compressed, entry.decompressed_len as usize).map_err(|e| {
            error!("failed inflating `{}`: {}", entry.name, e);
            IndexError::Codec(e)
        })
    }

    fn not_found(name: &str) -> IndexError {
        debug!("`{}` not found", name);
        IndexError::NotFound(name.to_string())
    }

    /// The name `name` resolves to: the alias target if `name` is an alias,
    /// otherwise the stored spelling of `name`.
    pub fn find_canonical_name(&self, name: &str) -> Option<&str> {
        self.table.get(name).map(FileEntry::canonical_name)
    }

    pub fn entry(&self, name: &str) -> Option<&FileEntry> {
        self.table.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.table.iter()
    }

    pub fn archives(&self) -> &ArchiveRegistry {
        &self.archives
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Drops every entry, alias and archive registration.
    pub fn clear(&mut self) {
        self.table.clear();
        self.table.shrink_to_fit();
        self.archives.clear();
        self.local = LocalStore::default();
    }
}
