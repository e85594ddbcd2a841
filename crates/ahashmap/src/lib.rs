//! Thin re-export of [`ahash`]'s hasher-parameterized collections, so the
//! rest of the workspace can write `ahashmap::AHashMap` instead of pulling
//! in `ahash` directly everywhere a fast, non-DoS-resistant hash map is
//! wanted (the linker never hashes untrusted external input, so the
//! `ahash` speed/DoS tradeoff is the right one).

pub use ahash::{AHashMap, AHashSet, RandomState as ARandomState};

/// Re-exported so callers can match on `ahashmap::hash_map::Entry` without
/// depending on `std::collections` directly for the entry API shape.
pub mod hash_map {
    pub use std::collections::hash_map::Entry;
}
