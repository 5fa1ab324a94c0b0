use super::{
    check_name_len, decode_name_bytes, make_entry, slice, ArchiveError, ArchiveHeader,
    IndexCodec, RawMetadata, METADATA_SIZE,
};
use crate::{
    codec::{self, EncryptionMode, FLAG_ENCRYPT_HEADER, FLAG_ENCRYPT_MIXED, FLAG_FILE},
    des::BLOCK_SIZE,
    file_table::FileEntry,
};
use byteorder::{ByteOrder, LE};
use tracing::trace;

const FILE_COUNT_BIAS: i64 = 7;
const COMPRESSED_LEN_BIAS: i64 = 715;
const PADDED_LEN_BIAS: i64 = 37579;

/// Name bytes that precede the enciphered name inside the name field.
const NAME_SKIP: usize = 2;
/// The name field length byte counts six bytes that are not name.
const NAME_LEN_BIAS: usize = 6;

/// Extensions that only get their header enciphered.
const HEADER_ONLY_EXTENSIONS: [&str; 4] = [".gnd", ".gat", ".act", ".str"];

/// Generation 1 (0x1xx) tables: uncompressed, with enciphered names and
/// biased sizes. The extension implies a mode bit that is merged with the
/// stored flags.
pub struct FlatIndex;

/// Mode a generation 1 entry is stored with, from its extension.
pub fn mode_for_name(name: &str) -> EncryptionMode {
    let header_only = name.rfind('.').map_or(false, |dot| {
        let ext = &name[dot..];
        HEADER_ONLY_EXTENSIONS
            .iter()
            .any(|candidate| ext.eq_ignore_ascii_case(candidate))
    });

    if header_only {
        EncryptionMode::Header
    } else {
        EncryptionMode::Full
    }
}

fn read_name(table: &[u8], pos: usize, field_end: usize) -> Result<Vec<u8>, ArchiveError> {
    let name_len = (slice(table, pos, 1)?[0] as usize)
        .checked_sub(NAME_LEN_BIAS)
        .ok_or(ArchiveError::Truncated {
            offset: pos,
            needed: NAME_LEN_BIAS,
        })?;
    let start = pos + 4 + NAME_SKIP;

    // The cipher works on whole blocks, so decode the padded span when the
    // field has room for it.
    let padded_len = name_len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    let span = padded_len.min(field_end.saturating_sub(start)).max(name_len);

    let mut name = slice(table, start, span)?.to_vec();
    codec::decode_name(&mut name);
    name.truncate(name_len);

    if let Some(nul) = name.iter().position(|&b| b == 0) {
        name.truncate(nul);
    }
    Ok(name)
}

impl IndexCodec for FlatIndex {
    fn parse(
        &self,
        header: &ArchiveHeader,
        archive: &[u8],
        index: usize,
    ) -> Result<Vec<FileEntry>, ArchiveError> {
        let table = archive
            .get(header.table_position()..)
            .ok_or(ArchiveError::Truncated {
                offset: header.table_position(),
                needed: 0,
            })?;

        let count =
            header.raw_file_count as i64 - header.seed as i64 - FILE_COUNT_BIAS;
        // The count is untrusted; the table bounds end the loop.
        let mut entries = Vec::new();

        let mut pos = 0;
        for _ in 0..count.max(0) {
            let field_len = LE::read_u32(slice(table, pos, 4)?) as usize;
            let meta_pos = pos.saturating_add(field_len).saturating_add(4);
            let meta = RawMetadata::read(table, meta_pos)?;

            if meta.flags & FLAG_FILE != 0 {
                let raw_name = read_name(table, pos, meta_pos)?;
                check_name_len(&raw_name)?;
                let name = decode_name_bytes(&raw_name);
                trace!("flat index entry `{}` at {}", name, meta.offset);

                // The extension adds to, never clears, the stored mode bits.
                let implied = match mode_for_name(&name) {
                    EncryptionMode::Header => FLAG_ENCRYPT_HEADER,
                    _ => FLAG_ENCRYPT_MIXED,
                };
                let mode = EncryptionMode::from_flags(meta.flags | implied);
                let compressed =
                    meta.compressed as i64 - meta.decompressed as i64 - COMPRESSED_LEN_BIAS;
                let padded = meta.padded as i64 - PADDED_LEN_BIAS;

                entries.extend(make_entry(
                    name,
                    compressed,
                    padded,
                    &meta,
                    mode,
                    archive.len(),
                    index,
                ));
            }

            pos = meta_pos + METADATA_SIZE;
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_for_name() {
        assert_eq!(EncryptionMode::Header, mode_for_name("data\\prontera.gat"));
        assert_eq!(EncryptionMode::Header, mode_for_name("data\\prontera.GND"));
        assert_eq!(EncryptionMode::Header, mode_for_name("data\\sprite\\poring.act"));
        assert_eq!(EncryptionMode::Full, mode_for_name("data\\sprite\\poring.spr"));
        assert_eq!(EncryptionMode::Full, mode_for_name("data\\prontera.gat.bak"));
        assert_eq!(EncryptionMode::Full, mode_for_name("data\\readme"));
    }
}
