//! C ABI for embedding the index in the server.
//!
//! Names cross the boundary as NUL-terminated EUC-KR strings, the encoding
//! used inside the archives.

use crate::{codec, ArchiveIndex, IndexError};
use encoding_rs::EUC_KR;
use std::{
    borrow::Cow,
    ffi::{CStr, CString},
    os::raw::c_char,
    ptr, slice,
};
use tracing::error;

unsafe fn name_arg<'a>(name: *const c_char) -> Option<Cow<'a, str>> {
    if name.is_null() {
        return None;
    }
    let bytes = CStr::from_ptr(name).to_bytes();
    Some(EUC_KR.decode_without_bom_handling(bytes).0)
}

/// Build an index from a config file
///
/// # Arguments
///
/// * `config_path` - The path to the config file
///
/// # Returns
///
/// A pointer to the index, to be released with `grfio_final`. Null if the
/// path is null or not valid UTF-8.
///
/// # Safety
///
/// `config_path` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn grfio_init(config_path: *const c_char) -> *mut ArchiveIndex {
    if config_path.is_null() {
        return ptr::null_mut();
    }

    let Ok(config_path) = CStr::from_ptr(config_path).to_str() else {
        error!("grfio_init: config path is not valid UTF-8");
        return ptr::null_mut();
    };

    Box::into_raw(Box::new(ArchiveIndex::init(config_path)))
}

/// Read a file from the index
///
/// # Arguments
///
/// * `index_ptr` - The index to read from
/// * `name` - The virtual file name
/// * `out_len` - The length of the returned buffer
///
/// # Returns
///
/// A pointer to the file data, where the length is stored in `out_len`, or
/// null if the file could not be read. The caller is responsible for freeing
/// the buffer using `grfio_free`.
///
/// # Safety
///
/// `index_ptr` must come from `grfio_init`, `name` must be null or a valid
/// NUL-terminated string and `out_len` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn grfio_reads(
    index_ptr: *mut ArchiveIndex,
    name: *const c_char,
    out_len: *mut u32,
) -> *mut u8 {
    if index_ptr.is_null() {
        return ptr::null_mut();
    }
    let index = &mut *index_ptr;

    let Some(name) = name_arg(name) else {
        return ptr::null_mut();
    };

    let buf = match index.read(&name) {
        Ok(buf) => buf.into_boxed_slice(),
        Err(IndexError::NotFound(_)) => return ptr::null_mut(),
        Err(e) => {
            error!("grfio_reads: {}", e);
            return ptr::null_mut();
        }
    };

    if !out_len.is_null() {
        *out_len = buf.len() as u32;
    }
    Box::into_raw(buf) as *mut u8
}

/// Resolve a name to the name it is stored under
///
/// # Returns
///
/// A new string, to be released with `grfio_free_name`, or null if the name
/// is unknown.
///
/// # Safety
///
/// `index_ptr` must come from `grfio_init` and `name` must be null or a
/// valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn grfio_find_file(
    index_ptr: *const ArchiveIndex,
    name: *const c_char,
) -> *mut c_char {
    if index_ptr.is_null() {
        return ptr::null_mut();
    }
    let index = &*index_ptr;

    let Some(name) = name_arg(name) else {
        return ptr::null_mut();
    };

    index
        .find_canonical_name(&name)
        .and_then(|found| CString::new(EUC_KR.encode(found).0.into_owned()).ok())
        .map_or(ptr::null_mut(), CString::into_raw)
}

/// Release a buffer returned by `grfio_reads`
///
/// # Safety
///
/// `buffer` and `len` must be exactly as returned by `grfio_reads`.
#[no_mangle]
pub unsafe extern "C" fn grfio_free(buffer: *mut u8, len: u32) {
    if !buffer.is_null() {
        drop(Box::from_raw(slice::from_raw_parts_mut(
            buffer,
            len as usize,
        )))
    }
}

/// Release a string returned by `grfio_find_file`
///
/// # Safety
///
/// `name` must be null or returned by `grfio_find_file`.
#[no_mangle]
pub unsafe extern "C" fn grfio_free_name(name: *mut c_char) {
    if !name.is_null() {
        drop(CString::from_raw(name))
    }
}

/// zlib CRC-32 of a buffer
///
/// # Safety
///
/// `buf` must be null or valid for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn grfio_crc32(buf: *const u8, len: u32) -> u32 {
    if buf.is_null() {
        return codec::crc32(&[]);
    }
    codec::crc32(slice::from_raw_parts(buf, len as usize))
}

/// Tear down an index
///
/// # Safety
///
/// `index_ptr` must be null or come from `grfio_init`, and must not be used
/// afterwards.
#[no_mangle]
pub unsafe extern "C" fn grfio_final(index_ptr: *mut ArchiveIndex) {
    // If the pointer to the index is not null, drop the box
    if !index_ptr.is_null() {
        drop(Box::from_raw(index_ptr))
    }
}
