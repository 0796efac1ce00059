use std::sync::{Mutex, MutexGuard};

use crate::core::Sha1;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PieceState {
    Unclaimed,
    Claimed,
    Verified,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("piece index {0} out of range")]
pub struct IndexOutOfRange(pub usize);

/// Hands out piece indices to peer sessions and tracks which pieces were verified.
///
/// Claims move a forward-only cursor: every index is handed out exactly once, in order, and a
/// claimed piece is never offered again even if the session that claimed it fails to download
/// it. States only move forward (`Unclaimed -> Claimed -> Verified`).
#[derive(Debug)]
pub struct Coordinator {
    hashes: Vec<Sha1>,
    pieces: Mutex<Pieces>,
}

#[derive(Debug)]
struct Pieces {
    states: Vec<PieceState>,
    cursor: usize,
    verified: usize,
}

impl Coordinator {
    pub fn new(hashes: Vec<Sha1>) -> Self {
        let states = vec![PieceState::Unclaimed; hashes.len()];
        Self {
            hashes,
            pieces: Mutex::new(Pieces {
                states,
                cursor: 0,
                verified: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pieces> {
        // Every critical section leaves the state consistent, so a poisoned lock is still usable
        self.pieces
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn total_pieces(&self) -> usize {
        self.hashes.len()
    }

    /// Claims the next unclaimed piece, or `None` once every piece was handed out.
    pub fn claim_next(&self) -> Option<usize> {
        let mut pieces = self.lock();
        let index = pieces.cursor;
        if index >= pieces.states.len() {
            return None;
        }
        pieces.cursor += 1;
        pieces.states[index] = PieceState::Claimed;
        Some(index)
    }

    pub fn expected_hash(&self, index: usize) -> Result<&Sha1, IndexOutOfRange> {
        self.hashes.get(index).ok_or(IndexOutOfRange(index))
    }

    /// Marks a claimed piece as verified. Returns `false` (leaving the state untouched) if the
    /// piece was not in the claimed state.
    pub fn mark_verified(&self, index: usize) -> Result<bool, IndexOutOfRange> {
        let mut pieces = self.lock();
        let state = pieces
            .states
            .get_mut(index)
            .ok_or(IndexOutOfRange(index))?;
        if *state != PieceState::Claimed {
            return Ok(false);
        }
        *state = PieceState::Verified;
        pieces.verified += 1;
        Ok(true)
    }

    #[allow(dead_code)]
    pub fn state(&self, index: usize) -> Result<PieceState, IndexOutOfRange> {
        self.lock()
            .states
            .get(index)
            .copied()
            .ok_or(IndexOutOfRange(index))
    }

    pub fn verified_count(&self) -> usize {
        self.lock().verified
    }

    #[allow(dead_code)]
    pub fn is_complete(&self) -> bool {
        self.verified_count() == self.total_pieces()
    }
}
