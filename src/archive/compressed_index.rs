use super::{
    check_name_len, decode_name_bytes, make_entry, slice, ArchiveError, ArchiveHeader,
    IndexCodec, RawMetadata, METADATA_SIZE,
};
use crate::{
    codec::{self, EncryptionMode, FLAG_FILE},
    file_table::FileEntry,
};
use byteorder::{ByteOrder, LE};
use tracing::trace;

const FILE_COUNT_BIAS: i64 = 7;

/// Generation 2 (0x2xx) tables: a zlib stream of plaintext, NUL-terminated
/// names, each followed by raw metadata carrying its own mode flags.
pub struct CompressedIndex;

impl CompressedIndex {
    /// Reads and inflates the entry table.
    pub fn inflate_table(header: &ArchiveHeader, archive: &[u8]) -> Result<Vec<u8>, ArchiveError> {
        let pos = header.table_position();
        let sizes = slice(archive, pos, 8)?;
        let compressed_len = LE::read_u32(&sizes[0..]) as usize;
        let inflated_len = LE::read_u32(&sizes[4..]) as usize;

        let compressed = slice(archive, pos + 8, compressed_len)?;
        Ok(codec::inflate(compressed, inflated_len)?)
    }
}

impl IndexCodec for CompressedIndex {
    fn parse(
        &self,
        header: &ArchiveHeader,
        archive: &[u8],
        index: usize,
    ) -> Result<Vec<FileEntry>, ArchiveError> {
        let table = Self::inflate_table(header, archive)?;

        let count = header.raw_file_count as i64 - FILE_COUNT_BIAS;
        // The count is untrusted; the table bounds end the loop.
        let mut entries = Vec::new();

        let mut pos = 0;
        for _ in 0..count.max(0) {
            let rest = table.get(pos..).unwrap_or_default();
            let name_len = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or(ArchiveError::Truncated {
                    offset: pos,
                    needed: rest.len() + 1,
                })?;
            let raw_name = &rest[..name_len];
            check_name_len(raw_name)?;

            let meta_pos = pos + name_len + 1;
            let meta = RawMetadata::read(&table, meta_pos)?;

            if meta.flags & FLAG_FILE != 0 {
                let name = decode_name_bytes(raw_name);
                trace!("compressed index entry `{}` at {}", name, meta.offset);

                entries.extend(make_entry(
                    name,
                    meta.compressed as i64,
                    meta.padded as i64,
                    &meta,
                    EncryptionMode::from_flags(meta.flags),
                    archive.len(),
                    index,
                ));
            }

            pos = meta_pos + METADATA_SIZE;
        }

        Ok(entries)
    }
}
