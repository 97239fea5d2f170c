//! Proof-of-work predicate and nonce searches.
//!
//! Difficulty is counted in leading zero *hex digits* of the lowercase digest,
//! so each step multiplies the expected work by 16.

use rayon::prelude::*;

use crate::HexDigest;

pub fn count_leading_zero_digits(hash: &str) -> u32 {
    hash.bytes().take_while(|b| *b == b'0').count() as u32
}

pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    count_leading_zero_digits(hash) >= difficulty
}

/// Try nonces `start, start + 1, ...` until `digest_at(nonce)` meets the
/// difficulty. Returns `None` if the `u64` range runs out first.
pub fn search_sequential<F>(start: u64, difficulty: u32, digest_at: F) -> Option<(u64, HexDigest)>
where
    F: Fn(u64) -> HexDigest,
{
    let mut nonce = start;
    loop {
        let hash = digest_at(nonce);
        if meets_difficulty(&hash, difficulty) {
            return Some((nonce, hash));
        }
        nonce = nonce.checked_add(1)?;
    }
}

/// Same contract as [`search_sequential`], spread across the rayon pool.
///
/// `find_first` keeps the lowest satisfying nonce, so both searches agree.
pub fn search_parallel<F>(start: u64, difficulty: u32, digest_at: F) -> Option<(u64, HexDigest)>
where
    F: Fn(u64) -> HexDigest + Sync,
{
    (start..=u64::MAX)
        .into_par_iter()
        .map(|nonce| (nonce, digest_at(nonce)))
        .find_first(|(_, hash)| meets_difficulty(hash, difficulty))
}
