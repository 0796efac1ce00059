#[cfg(test)]
mod reader;
mod writer;

use std::path::{Path, PathBuf};

/// The single file downloaded content is written to. Writes go straight to their byte offset
/// (`index * piece_length + offset`) and never read the file first, so concurrent writes to
/// disjoint ranges do not interfere with each other.
#[derive(Debug)]
pub struct Storage {
    path: PathBuf,
    piece_length: usize,
}

impl Storage {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn global_offset(&self, piece: usize, offset: usize) -> u64 {
        (piece * self.piece_length + offset) as u64
    }
}
