#![allow(dead_code)]

use byteorder::{ByteOrder, LE};
use flate2::{write::ZlibEncoder, Compression};
use grfvfs::{
    archive::{flat_index, HEADER_SIZE, MAGIC},
    codec::{self, EncryptionMode, FLAG_ENCRYPT_HEADER, FLAG_ENCRYPT_MIXED, FLAG_FILE, HEADER_BLOCKS},
    des::{self, BLOCK_SIZE},
};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub fn setup() {
    // a builder for `FmtSubscriber`.
    let subscriber = FmtSubscriber::builder()
        // all spans/events with a level higher than TRACE (e.g, debug, info, warn, etc.)
        // will be written to stdout.
        .with_max_level(Level::TRACE)
        // completes the builder.
        .finish();

    tracing::subscriber::set_global_default(subscriber).ok();
}

/// Deterministic, poorly compressible bytes.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn shuffle_enc(block: &mut [u8]) {
    let src = [
        block[0], block[1], block[2], block[3], block[4], block[5], block[6], block[7],
    ];

    block[0] = src[3];
    block[1] = src[4];
    block[2] = src[5];
    block[3] = src[0];
    block[4] = src[1];
    block[5] = src[6];
    block[6] = src[2];
    block[7] = codec::substitution(src[7]);
}

/// The inverse of `codec::decode`.
pub fn encode(buf: &mut [u8], mode: EncryptionMode, true_len: u32) {
    if mode == EncryptionMode::None {
        return;
    }

    let cycle = codec::decrypt_cycle(true_len);
    let mut plain = 0;
    for (i, block) in buf.chunks_exact_mut(BLOCK_SIZE).enumerate() {
        if i < HEADER_BLOCKS || (mode == EncryptionMode::Full && i % cycle == 0) {
            des::decrypt(block);
            continue;
        }
        if mode == EncryptionMode::Header {
            break;
        }

        let j = plain;
        plain += 1;
        if j != 0 && j % 7 == 0 {
            shuffle_enc(block);
        }
    }
}

/// Enciphers a generation 1 name: NUL-terminated, padded to whole blocks,
/// block-transformed and nibble-swapped.
pub fn encode_name(name: &[u8]) -> Vec<u8> {
    let mut buf = name.to_vec();
    buf.push(0);
    buf.resize(buf.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, 0);

    des::decrypt(&mut buf);
    for b in buf.iter_mut() {
        *b = b.rotate_left(4);
    }
    buf
}

pub fn euc_kr(name: &str) -> Vec<u8> {
    encoding_rs::EUC_KR.encode(name).0.into_owned()
}

/// A payload as it sits in an archive.
struct Stored {
    compressed_len: u32,
    padded_len: u32,
    decompressed_len: u32,
    offset: u32,
}

/// Appends the compressed, padded and obfuscated payload of `data` to `body`.
fn store(body: &mut Vec<u8>, data: &[u8], mode: EncryptionMode) -> Stored {
    let mut payload = zlib(data);
    let compressed_len = payload.len() as u32;
    payload.resize(payload.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, 0);
    encode(&mut payload, mode, compressed_len);

    let offset = body.len() as u32;
    body.extend_from_slice(&payload);

    Stored {
        compressed_len,
        padded_len: payload.len() as u32,
        decompressed_len: data.len() as u32,
        offset,
    }
}

fn header(table_offset: u32, seed: u32, raw_file_count: u32, version: u32) -> Vec<u8> {
    let mut buf = vec![0; HEADER_SIZE];
    buf[..MAGIC.len()].copy_from_slice(MAGIC);
    LE::write_u32(&mut buf[0x1e..], table_offset);
    LE::write_u32(&mut buf[0x22..], seed);
    LE::write_u32(&mut buf[0x26..], raw_file_count);
    LE::write_u32(&mut buf[0x2a..], version);
    buf
}

fn metadata(a: u32, b: u32, decompressed: u32, flags: u8, offset: u32) -> [u8; 17] {
    let mut buf = [0; 17];
    LE::write_u32(&mut buf[0..], a);
    LE::write_u32(&mut buf[4..], b);
    LE::write_u32(&mut buf[8..], decompressed);
    buf[12] = flags;
    LE::write_u32(&mut buf[13..], offset);
    buf
}

pub struct TestFile {
    /// Raw (EUC-KR) name bytes.
    pub name: Vec<u8>,
    pub data: Vec<u8>,
    pub mode: EncryptionMode,
}

impl TestFile {
    pub fn new(name: &str, data: &[u8], mode: EncryptionMode) -> TestFile {
        TestFile {
            name: euc_kr(name),
            data: data.to_vec(),
            mode,
        }
    }
}

/// A generation 2 archive, with a non-file row per entry of `directories`.
pub fn grf_v2(files: &[TestFile], directories: &[&str]) -> Vec<u8> {
    let mut body = Vec::new();
    let mut table = Vec::new();

    for file in files {
        let stored = store(&mut body, &file.data, file.mode);
        let flags = FLAG_FILE
            | match file.mode {
                EncryptionMode::None => 0,
                EncryptionMode::Header => FLAG_ENCRYPT_HEADER,
                EncryptionMode::Full => FLAG_ENCRYPT_MIXED,
            };

        table.extend_from_slice(&file.name);
        table.push(0);
        table.extend_from_slice(&metadata(
            stored.compressed_len,
            stored.padded_len,
            stored.decompressed_len,
            flags,
            stored.offset,
        ));
    }
    for dir in directories {
        table.extend_from_slice(&euc_kr(dir));
        table.push(0);
        table.extend_from_slice(&metadata(0, 0, 0, 0, 0));
    }

    let compressed_table = zlib(&table);
    let count = (files.len() + directories.len()) as u32;

    let mut archive = header(body.len() as u32, 0, count + 7, 0x200);
    archive.extend_from_slice(&body);
    let mut sizes = [0; 8];
    LE::write_u32(&mut sizes[0..], compressed_table.len() as u32);
    LE::write_u32(&mut sizes[4..], table.len() as u32);
    archive.extend_from_slice(&sizes);
    archive.extend_from_slice(&compressed_table);
    archive
}

/// A generation 1 archive. Modes are implied by the file extensions.
pub fn grf_v1(files: &[(&str, &[u8])], directories: &[&str]) -> Vec<u8> {
    let files: Vec<(&str, &[u8], u8)> = files
        .iter()
        .map(|&(name, data)| (name, data, FLAG_FILE))
        .collect();
    grf_v1_flagged(&files, directories)
}

/// A generation 1 archive whose rows carry explicit flag bytes on top of the
/// mode implied by the extension.
pub fn grf_v1_flagged(files: &[(&str, &[u8], u8)], directories: &[&str]) -> Vec<u8> {
    const SEED: u32 = 3;

    let mut body = Vec::new();
    let mut table = Vec::new();

    let push_row = |table: &mut Vec<u8>, name: &str, meta: [u8; 17]| {
        let encoded = encode_name(&euc_kr(name));
        let field_len = encoded.len() as u32 + 6;

        let mut len = [0; 4];
        LE::write_u32(&mut len, field_len);
        table.extend_from_slice(&len);
        table.extend_from_slice(&[0, 0]);
        table.extend_from_slice(&encoded);
        table.extend_from_slice(&[0, 0, 0, 0]);
        table.extend_from_slice(&meta);
    };

    for &(name, data, flags) in files {
        let implied = match flat_index::mode_for_name(name) {
            EncryptionMode::Header => FLAG_ENCRYPT_HEADER,
            _ => FLAG_ENCRYPT_MIXED,
        };
        let mode = EncryptionMode::from_flags(flags | implied);
        let stored = store(&mut body, data, mode);
        let meta = metadata(
            stored.compressed_len + stored.decompressed_len + 715,
            stored.padded_len + 37579,
            stored.decompressed_len,
            flags,
            stored.offset,
        );
        push_row(&mut table, name, meta);
    }
    for dir in directories {
        push_row(&mut table, dir, metadata(715, 37579, 0, 0, 0));
    }

    let count = (files.len() + directories.len()) as u32;
    let mut archive = header(body.len() as u32, SEED, count + SEED + 7, 0x102);
    archive.extend_from_slice(&body);
    archive.extend_from_slice(&table);
    archive
}

pub fn write_file<P: AsRef<Path>>(dir: P, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.as_ref().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    path
}

/// Writes `data/<name>` under the override directory `dir`.
pub fn write_local<P: AsRef<Path>>(dir: P, name: &str, bytes: &[u8]) -> PathBuf {
    write_file(dir, &name.replace('\\', "/"), bytes)
}
