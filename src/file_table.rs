use crate::codec::EncryptionMode;
use encoding_rs::EUC_KR;

const BUCKETS: usize = 256;

/// Where an entry's bytes come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    /// Served from the override directory.
    LocalConfirmed,
    /// Archive entry whose override file has not been probed yet.
    LocalPending(usize),
    /// Served from the archive at this registry index.
    Archive(usize),
}

/// Metadata for one named payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    /// Name as stored in the archive or alias table.
    pub name: String,
    pub compressed_len: u32,
    pub padded_len: u32,
    pub decompressed_len: u32,
    /// Absolute payload offset within the owning archive.
    pub offset: u64,
    pub is_file: bool,
    pub mode: EncryptionMode,
    pub source: Source,
    /// Real entry this virtual name resolves to.
    pub alias_of: Option<String>,
}

impl FileEntry {
    /// An alias backed only by a file in the override directory.
    pub fn local_alias(name: String, target: String) -> FileEntry {
        FileEntry {
            name,
            compressed_len: 0,
            padded_len: 0,
            decompressed_len: 0,
            offset: 0,
            is_file: false,
            mode: EncryptionMode::None,
            source: Source::LocalConfirmed,
            alias_of: Some(target),
        }
    }

    /// The name to use when looking on disk: the alias target if any.
    pub fn canonical_name(&self) -> &str {
        self.alias_of.as_deref().unwrap_or(&self.name)
    }
}

/// Lower-cases ASCII letters and turns `\` into `/`.
pub fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' => '/',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// 8-bit rolling hash selecting a table bucket, taken over the EUC-KR bytes
/// of `name` as stored in the archives.
pub fn file_hash(name: &str) -> u8 {
    let (bytes, _, _) = EUC_KR.encode(name);

    let mut hash: u32 = 0;
    for &b in bytes.iter() {
        hash = (hash << 1)
            .wrapping_add((hash >> 7).wrapping_mul(9))
            .wrapping_add(b.to_ascii_lowercase() as u32);
    }
    (hash & 0xff) as u8
}

struct Slot {
    key: String,
    entry: FileEntry,
}

/// Name to entry table with insert-or-replace semantics.
///
/// Entries live in one growing store; each of the 256 buckets lists the
/// slots whose normalized name hashes to it, newest first. Replacing an
/// entry overwrites its slot and leaves the bucket untouched, which is how
/// a later archive shadows an earlier one.
pub struct FileTable {
    slots: Vec<Slot>,
    buckets: Vec<Vec<usize>>,
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTable {
    pub fn new() -> FileTable {
        FileTable {
            slots: Vec::new(),
            buckets: vec![Vec::new(); BUCKETS],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.buckets[file_hash(key) as usize]
            .iter()
            .rev()
            .copied()
            .find(|&slot| self.slots[slot].key == key)
    }

    pub fn get(&self, name: &str) -> Option<&FileEntry> {
        self.position(&normalize(name))
            .map(|slot| &self.slots[slot].entry)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FileEntry> {
        self.position(&normalize(name))
            .map(move |slot| &mut self.slots[slot].entry)
    }

    /// Inserts `entry`, or overwrites the entry of the same name in place.
    ///
    /// Returns `true` if a new slot was created.
    pub fn upsert(&mut self, entry: FileEntry) -> bool {
        let key = normalize(&entry.name);

        if let Some(slot) = self.position(&key) {
            self.slots[slot].entry = entry;
            return false;
        }

        let slot = self.slots.len();
        self.buckets[file_hash(&key) as usize].push(slot);
        self.slots.push(Slot { key, entry });
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.slots.iter().map(|slot| &slot.entry)
    }

    /// Bucket sizes, indexed by hash.
    pub fn bucket_lens(&self) -> Vec<usize> {
        self.buckets.iter().map(Vec::len).collect()
    }

    pub fn shrink_to_fit(&mut self) {
        self.slots.shrink_to_fit();
        for bucket in self.buckets.iter_mut() {
            bucket.shrink_to_fit();
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
    }
}
