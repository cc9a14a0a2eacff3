use std::hash::Hasher;

use docsearch_core::types::TermId;
use twox_hash::XxHash32;

/// Stable 32-bit term id (xxHash32, seed 0). Collisions are accepted.
pub fn term_id(token: &str) -> TermId {
    let mut hasher = XxHash32::with_seed(0);
    hasher.write(token.as_bytes());
    hasher.finish() as TermId
}
