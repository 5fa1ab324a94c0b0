//! Name aliases from `data\resnametable.txt`.
//!
//! Each row reads `real#virtual#`. Only map geometry (`.gat`) and map
//! resource (`.rsw`) aliases are registered; the server never asks for the
//! other kinds.

use crate::{file_table::FileEntry, index::IndexError, ArchiveIndex};
use encoding_rs::EUC_KR;
use tracing::{debug, info, warn};

/// Virtual name of the alias table.
pub const RESNAMETABLE: &str = "data\\resnametable.txt";

/// Longest accepted field, in bytes.
const MAX_FIELD_LEN: usize = 255;

const ALIAS_EXTENSIONS: [&str; 2] = [".gat", ".rsw"];

/// One parsed `real#virtual#` row, without the `data\` prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AliasRow<'a> {
    pub real: &'a str,
    pub alias: &'a str,
}

/// Takes a non-empty field that ends at `#`, CR, LF or the end of input.
fn field(input: &str) -> Option<(&str, &str)> {
    let end = input.find(&['#', '\r', '\n'][..]).unwrap_or(input.len());
    if end == 0 || end > MAX_FIELD_LEN {
        return None;
    }
    Some((&input[..end], &input[end..]))
}

/// Parses one row, keeping it only if the virtual name is a `.gat` or `.rsw`.
pub fn parse_row(row: &str) -> Option<AliasRow<'_>> {
    let (real, rest) = field(row)?;
    let rest = rest.strip_prefix('#')?;
    let (alias, _) = field(rest)?;

    if !ALIAS_EXTENSIONS.iter().any(|ext| alias.contains(ext)) {
        return None;
    }

    Some(AliasRow { real, alias })
}

impl ArchiveIndex {
    /// Registers `data\<alias>` as another name for `data\<real>`.
    ///
    /// The alias shares the archive entry of `real`. If `real` is only present
    /// in the override directory the alias is local-only. Returns `false` if
    /// `real` exists nowhere.
    pub fn add_alias(&mut self, real: &str, alias: &str) -> bool {
        let src = format!("data\\{}", real);
        let dst = format!("data\\{}", alias);

        if let Some(entry) = self.table.get(&src) {
            let aliased = FileEntry {
                name: dst,
                alias_of: Some(src),
                ..entry.clone()
            };
            self.table.upsert(aliased);
            return true;
        }

        if self.local.exists(&src) {
            self.table.upsert(FileEntry::local_alias(dst, src));
            return true;
        }

        false
    }

    /// Reads the alias table and registers its rows. The table itself is
    /// resolved like any other file, so an override copy wins.
    ///
    /// Returns the number of aliases registered.
    pub fn load_aliases(&mut self) -> usize {
        let buf = match self.read(RESNAMETABLE) {
            Ok(buf) => buf,
            Err(IndexError::NotFound(_)) => {
                debug!("no {}, skipping aliases", RESNAMETABLE);
                return 0;
            }
            Err(e) => {
                warn!("failed reading {}: {}", RESNAMETABLE, e);
                return 0;
            }
        };

        // Rows name archive entries, so they share the entries' encoding.
        let (text, _) = EUC_KR.decode_without_bom_handling(&buf);
        let mut count = 0;
        for row in text.split('\n').filter_map(parse_row) {
            if self.add_alias(row.real, row.alias) {
                count += 1;
            }
        }

        info!("Done reading '{}' entries in '{}'.", count, RESNAMETABLE);
        count
    }
}
