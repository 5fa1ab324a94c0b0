//! GRF container parsing.
//!
//! An archive starts with a fixed header naming the position of its entry
//! table. The table layout depends on the archive generation, so parsing is
//! split into one [`IndexCodec`] per generation.

use crate::{
    codec::{CodecError, EncryptionMode},
    des::BLOCK_SIZE,
    file_table::{FileEntry, Source},
};
use byteorder::{ByteOrder, LE};
use memmap2::Mmap;
use std::{fs::File, io, path::Path};
use thiserror::Error;
use tracing::{debug, warn};

pub mod compressed_index;
pub mod flat_index;

pub use compressed_index::CompressedIndex;
pub use flat_index::FlatIndex;

pub const HEADER_SIZE: usize = 0x2e;
pub const MAGIC: &[u8; 16] = b"Master of Magic\0";

/// Longest accepted entry name, in bytes.
pub const MAX_NAME_LEN: usize = 107;

/// Size of the metadata block following every entry name.
pub(crate) const METADATA_SIZE: usize = 17;

const TABLE_OFFSET_POS: usize = 0x1e;
const SEED_POS: usize = 0x22;
const FILE_COUNT_POS: usize = 0x26;
const VERSION_POS: usize = 0x2a;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid magic header")]
    InvalidMagic,
    #[error("unsupported archive version {0:#06x}")]
    UnsupportedVersion(u32),
    #[error("truncated data (needed {needed} bytes at offset {offset})")]
    Truncated { offset: usize, needed: usize },
    #[error("file name `{name}` is too long ({len} bytes)")]
    NameTooLong { name: String, len: usize },
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// The fixed header at the start of every archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Table position relative to the end of the header.
    pub table_offset: u32,
    pub seed: u32,
    pub raw_file_count: u32,
    pub version: u32,
}

impl ArchiveHeader {
    pub fn read(buf: &[u8]) -> Result<ArchiveHeader, ArchiveError> {
        let header = slice(buf, 0, HEADER_SIZE)?;
        if &header[..MAGIC.len()] != MAGIC {
            return Err(ArchiveError::InvalidMagic);
        }

        Ok(ArchiveHeader {
            table_offset: LE::read_u32(&header[TABLE_OFFSET_POS..]),
            seed: LE::read_u32(&header[SEED_POS..]),
            raw_file_count: LE::read_u32(&header[FILE_COUNT_POS..]),
            version: LE::read_u32(&header[VERSION_POS..]),
        })
    }

    /// Layout generation, the high byte of the version.
    pub fn generation(&self) -> u32 {
        self.version >> 8
    }

    /// Absolute position of the entry table.
    pub fn table_position(&self) -> usize {
        HEADER_SIZE + self.table_offset as usize
    }
}

/// Parses the entry table of one archive generation.
pub trait IndexCodec {
    /// Returns every file entry of `archive`, tagged with registry index `index`.
    fn parse(
        &self,
        header: &ArchiveHeader,
        archive: &[u8],
        index: usize,
    ) -> Result<Vec<FileEntry>, ArchiveError>;
}

/// Picks the table codec for the header's generation.
pub fn codec_for(header: &ArchiveHeader) -> Result<Box<dyn IndexCodec>, ArchiveError> {
    match header.generation() {
        0x01 => Ok(Box::new(FlatIndex)),
        0x02 => Ok(Box::new(CompressedIndex)),
        _ => Err(ArchiveError::UnsupportedVersion(header.version)),
    }
}

/// Parses a whole archive held in memory.
pub fn parse_archive(archive: &[u8], index: usize) -> Result<Vec<FileEntry>, ArchiveError> {
    let header = ArchiveHeader::read(archive)?;
    debug!(
        "archive {} header: version {:#06x}, table at {}",
        index,
        header.version,
        header.table_position()
    );

    codec_for(&header)?.parse(&header, archive, index)
}

/// Maps the archive at `path` and parses it.
pub fn read_archive<P: AsRef<Path>>(path: P, index: usize) -> Result<Vec<FileEntry>, ArchiveError> {
    let data = unsafe { Mmap::map(&File::open(path.as_ref())?) }?;
    parse_archive(&data, index)
}

/// Bounds-checked sub-slice.
pub(crate) fn slice(buf: &[u8], offset: usize, len: usize) -> Result<&[u8], ArchiveError> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or(ArchiveError::Truncated {
            offset,
            needed: len,
        })
}

/// The 17 bytes that follow each name in the entry table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RawMetadata {
    pub compressed: u32,
    pub padded: u32,
    pub decompressed: u32,
    pub flags: u8,
    pub offset: u32,
}

impl RawMetadata {
    pub fn read(table: &[u8], pos: usize) -> Result<RawMetadata, ArchiveError> {
        let buf = slice(table, pos, METADATA_SIZE)?;

        Ok(RawMetadata {
            compressed: LE::read_u32(&buf[0..]),
            padded: LE::read_u32(&buf[4..]),
            decompressed: LE::read_u32(&buf[8..]),
            flags: buf[12],
            offset: LE::read_u32(&buf[13..]),
        })
    }
}

pub(crate) fn check_name_len(name: &[u8]) -> Result<(), ArchiveError> {
    if name.len() > MAX_NAME_LEN {
        return Err(ArchiveError::NameTooLong {
            name: decode_name_bytes(&name[..MAX_NAME_LEN]),
            len: name.len(),
        });
    }
    Ok(())
}

/// Archive names are EUC-KR byte strings.
pub(crate) fn decode_name_bytes(name: &[u8]) -> String {
    encoding_rs::EUC_KR
        .decode_without_bom_handling(name)
        .0
        .into_owned()
}

/// Builds a table entry, or `None` if its sizes are inconsistent or its
/// payload does not fit the archive.
///
/// `compressed` and `padded` are passed separately from `meta` because
/// generation 1 stores them biased.
pub(crate) fn make_entry(
    name: String,
    compressed: i64,
    padded: i64,
    meta: &RawMetadata,
    mode: EncryptionMode,
    archive_len: usize,
    index: usize,
) -> Option<FileEntry> {
    let offset = HEADER_SIZE as u64 + meta.offset as u64;

    if compressed < 0
        || padded < 0
        || compressed > padded
        || padded > u32::MAX as i64
        || padded % BLOCK_SIZE as i64 != 0
    {
        warn!(
            "skipping `{}`: bad sizes (compressed {}, padded {})",
            name, compressed, padded
        );
        return None;
    }
    if offset + padded as u64 > archive_len as u64 {
        warn!(
            "skipping `{}`: payload {}+{} beyond archive end {}",
            name, offset, padded, archive_len
        );
        return None;
    }

    Some(FileEntry {
        name,
        compressed_len: compressed as u32,
        padded_len: padded as u32,
        decompressed_len: meta.decompressed,
        offset,
        is_file: true,
        mode,
        source: Source::LocalPending(index),
        alias_of: None,
    })
}
