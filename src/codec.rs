//! Deobfuscation and inflation of archived payloads.
//!
//! Entries are stored zlib-compressed, padded to the block size and then
//! obfuscated in one of two ways. Decoding reverses the obfuscation in place
//! and [`inflate`] restores the original bytes.

use crate::des::{self, BLOCK_SIZE};
use flate2::bufread::ZlibDecoder;
use std::io::{self, Read};
use thiserror::Error;

/// Number of leading blocks that are always enciphered.
pub const HEADER_BLOCKS: usize = 20;

/// One of every `SHUFFLE_CYCLE` plaintext blocks past the header is shuffled.
const SHUFFLE_CYCLE: usize = 7;

/// Flag bit marking an entry as a regular file.
pub const FLAG_FILE: u8 = 0x01;
/// Flag bit selecting full periodic obfuscation.
pub const FLAG_ENCRYPT_MIXED: u8 = 0x02;
/// Flag bit selecting header-only obfuscation.
pub const FLAG_ENCRYPT_HEADER: u8 = 0x04;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("inflate error: {0}")]
    Inflate(#[from] io::Error),
    #[error("decompressed size mismatch (expected {expected}, found {actual})")]
    SizeMismatch { expected: usize, actual: usize },
}

/// How an entry's padded payload is obfuscated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncryptionMode {
    None,
    /// Only the first [`HEADER_BLOCKS`] blocks are enciphered.
    Header,
    /// Header blocks plus periodic cipher and shuffle rounds.
    Full,
}

impl EncryptionMode {
    /// Reads the mode from an entry's flag byte. Full takes precedence.
    pub fn from_flags(flags: u8) -> EncryptionMode {
        if flags & FLAG_ENCRYPT_MIXED != 0 {
            EncryptionMode::Full
        } else if flags & FLAG_ENCRYPT_HEADER != 0 {
            EncryptionMode::Header
        } else {
            EncryptionMode::None
        }
    }
}

/// Byte substitution used by the shuffle round. Applying it twice is a no-op.
pub fn substitution(b: u8) -> u8 {
    match b {
        0x00 => 0x2b,
        0x2b => 0x00,
        0x6c => 0x80,
        0x80 => 0x6c,
        0x01 => 0x68,
        0x68 => 0x01,
        0x48 => 0x77,
        0x77 => 0x48,
        0x60 => 0xff,
        0xff => 0x60,
        0xb9 => 0xc0,
        0xc0 => 0xb9,
        0xfe => 0xeb,
        0xeb => 0xfe,
        other => other,
    }
}

fn shuffle_dec(block: &mut [u8]) {
    let src = [
        block[0], block[1], block[2], block[3], block[4], block[5], block[6], block[7],
    ];

    block[0] = src[3];
    block[1] = src[4];
    block[2] = src[6];
    block[3] = src[0];
    block[4] = src[1];
    block[5] = src[2];
    block[6] = src[5];
    block[7] = substitution(src[7]);
}

/// Gap between two enciphered blocks past the header, derived from the
/// number of decimal digits in the entry's unpadded length.
pub fn decrypt_cycle(true_len: u32) -> usize {
    let digits = true_len.checked_ilog10().map_or(1, |d| d + 1) as usize;

    match digits {
        0..=2 => 1,
        3..=4 => digits + 1,
        5..=6 => digits + 9,
        _ => digits + 15,
    }
}

fn decode_header(buf: &mut [u8]) {
    let header_len = buf.len().min(HEADER_BLOCKS * BLOCK_SIZE);
    des::decrypt(&mut buf[..header_len]);
}

fn decode_full(buf: &mut [u8], cycle: usize) {
    decode_header(buf);

    let mut plain = 0;
    for (i, block) in buf.chunks_exact_mut(BLOCK_SIZE).enumerate().skip(HEADER_BLOCKS) {
        if i % cycle == 0 {
            des::decrypt(block);
            continue;
        }

        let j = plain;
        plain += 1;
        if j != 0 && j % SHUFFLE_CYCLE == 0 {
            shuffle_dec(block);
        }
    }
}

/// Reverses the obfuscation of a padded payload in place.
///
/// # Arguments
///
/// * `buf` - The padded payload as read from the archive
/// * `mode` - The entry's obfuscation mode
/// * `true_len` - The entry's compressed (unpadded) length
pub fn decode(buf: &mut [u8], mode: EncryptionMode, true_len: u32) {
    match mode {
        EncryptionMode::Full => decode_full(buf, decrypt_cycle(true_len)),
        EncryptionMode::Header => decode_header(buf),
        EncryptionMode::None => {}
    }
}

/// Decodes an enciphered generation 1 file name in place: every byte is
/// nibble-swapped, then each whole block is deciphered.
pub fn decode_name(buf: &mut [u8]) {
    for b in buf.iter_mut() {
        *b = b.rotate_left(4);
    }
    des::decrypt(buf);
}

/// Inflates a zlib stream that must produce exactly `expected` bytes.
pub fn inflate(input: &[u8], expected: usize) -> Result<Vec<u8>, CodecError> {
    let mut output = Vec::new();

    // One byte of slack so an oversized stream is reported instead of cut.
    ZlibDecoder::new(input)
        .take(expected as u64 + 1)
        .read_to_end(&mut output)?;

    if output.len() != expected {
        return Err(CodecError::SizeMismatch {
            expected,
            actual: output.len(),
        });
    }

    Ok(output)
}

/// zlib CRC-32 of `buf`.
pub fn crc32(buf: &[u8]) -> u32 {
    crc32fast::hash(buf)
}
