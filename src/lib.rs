//! A virtual file layer over GRF archives.
//!
//! Several archives plus a local override directory are merged into one
//! namespace. Later archives shadow earlier ones, override files shadow
//! everything, and archived payloads are deobfuscated and inflated on read.
//!
//! ```no_run
//! use grfvfs::ArchiveIndex;
//!
//! let mut index = ArchiveIndex::init("conf/grf-files.txt");
//! let gat = index.read("data\\prontera.gat")?;
//! # Ok::<(), grfvfs::IndexError>(())
//! ```

pub mod archive;
pub mod codec;
pub mod config;
pub mod des;
pub mod ffi;
pub mod file_table;
mod index;
pub mod resnametable;
pub mod store;

pub use archive::{ArchiveError, ArchiveHeader, IndexCodec};
pub use codec::{CodecError, EncryptionMode};
pub use config::{Config, ConfigError};
pub use file_table::{FileEntry, FileTable, Source};
pub use index::IndexError;
pub use store::{ArchiveHandle, ArchiveRegistry, StoreError};

use store::LocalStore;

/// The merged view of every loaded archive and the override directory.
#[derive(Default)]
pub struct ArchiveIndex {
    /// Entries by name
    table: FileTable,

    /// Archives in load order
    archives: ArchiveRegistry,

    /// Override directory
    local: LocalStore,
}
