//! Minimal Perfect Hash Module
//!
//! Maps a fixed set of N integer keys onto ranks `[0, N)` with no collisions.
//!
//! ## Responsibilities
//! - Construct a hash function over the key set at build time
//! - Serialize it into the index block ahead of the offset table
//! - Reload it on the read side and evaluate keys to ranks
//!
//! The index builder and reader only talk to the [`PerfectHash`] trait, so
//! other constructions (CHD, RecSplit, ...) can be swapped in without touching
//! the file layout around the key data.

mod bbhash;

use bytes::BytesMut;

use crate::error::Result;

pub use bbhash::{BbHash, BbHashEvaluator, BbHashKeyData};

/// A minimal perfect hash construction
pub trait PerfectHash {
    /// Built hash function, ready to serialize
    type KeyData: KeyData;

    /// Query-side view of the hash function
    type Evaluator: Evaluator;

    /// Build a hash function over `keys`.
    ///
    /// Keys must be distinct. Implementations report keys they cannot
    /// separate as [`IkvError::HashConstruction`](crate::IkvError::HashConstruction).
    fn generate(&self, keys: &[i32]) -> Result<Self::KeyData>;

    /// Turn freshly built key data into an evaluator
    fn build_evaluator(&self, data: Self::KeyData) -> Self::Evaluator;

    /// Reload an evaluator from the bytes written by [`KeyData::write_to`]
    fn load(&self, bytes: &[u8]) -> Result<Self::Evaluator>;
}

/// Serializable form of a built hash function
pub trait KeyData {
    /// Exact number of bytes [`write_to`](Self::write_to) appends
    fn serialized_size(&self) -> usize;

    /// Append the serialized form to `buf` (little-endian)
    fn write_to(&self, buf: &mut BytesMut);
}

/// Maps keys to ranks
pub trait Evaluator {
    /// Rank of `key` in `[0, len())`.
    ///
    /// Only keys of the build set are guaranteed a correct rank. Other keys
    /// may return `None` or the rank of an unrelated key.
    fn evaluate(&self, key: i32) -> Option<usize>;

    /// Number of keys the function was built over
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
