//! BBHash-style minimal perfect hash
//!
//! Keys are thrown into `gamma × remaining` bins per level. Bins hit by exactly
//! one key keep that key; every other key falls through to the next level with
//! a fresh seed. A key's rank is the number of kept bins before its own bin,
//! counted across all levels.
//!
//! ## Serialized Layout
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │ LevelCount: u32                                     │
//! ├────────────────────────────────────────────────────┤
//! │ Level (repeated LevelCount times)                   │
//! │   Seed: u64 | BinCount: u32 | Bitset: u64 × ⌈B/64⌉  │
//! └────────────────────────────────────────────────────┘
//! ```

use bytes::{Buf, BufMut, BytesMut};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::config::IkvConfig;
use crate::error::{IkvError, Result};

use super::{Evaluator, KeyData, PerfectHash};

/// Golden-ratio increment used to derive per-level seeds
const SEED_STEP: u64 = 0xA24B_AED4_963E_E407;

/// Level header: Seed (8) + BinCount (4)
const LEVEL_HEADER_SIZE: usize = 12;

/// Multi-level BBHash construction
#[derive(Debug, Clone)]
pub struct BbHash {
    seed: u64,
    gamma: f64,
    max_levels: usize,
}

impl Default for BbHash {
    fn default() -> Self {
        Self::from_config(&IkvConfig::default())
    }
}

impl BbHash {
    pub fn new(seed: u64, gamma: f64, max_levels: usize) -> Self {
        Self {
            seed,
            gamma,
            max_levels,
        }
    }

    pub fn from_config(config: &IkvConfig) -> Self {
        Self::new(config.hash_seed, config.gamma, config.max_levels)
    }

    fn level_seed(&self, level: usize) -> u64 {
        self.seed ^ (level as u64 + 1).wrapping_mul(SEED_STEP)
    }
}

/// One level of the hash: bins owned by exactly one key
#[derive(Debug, Clone, PartialEq, Eq)]
struct Level {
    seed: u64,
    bins: u32,
    bits: Vec<u64>,
}

impl Level {
    fn serialized_size(&self) -> usize {
        LEVEL_HEADER_SIZE + self.bits.len() * 8
    }

    #[inline]
    fn bin(&self, key: i32) -> usize {
        bin_of(key, self.seed, self.bins)
    }
}

/// Key widened to 64 bits, hashed with the level seed, mapped onto `bins`
#[inline]
fn bin_of(key: i32, seed: u64, bins: u32) -> usize {
    let hash = xxh3_64_with_seed(&(key as i64).to_le_bytes(), seed);
    ((hash as u128 * bins as u128) >> 64) as usize
}

#[inline]
fn bit_get(bits: &[u64], idx: usize) -> bool {
    (bits[idx >> 6] >> (idx & 63)) & 1 == 1
}

#[inline]
fn bit_set(bits: &mut [u64], idx: usize) {
    bits[idx >> 6] |= 1u64 << (idx & 63);
}

/// Built BBHash levels, not yet rank-indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BbHashKeyData {
    levels: Vec<Level>,
    key_count: usize,
}

impl BbHashKeyData {
    /// Number of levels the construction needed
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

impl KeyData for BbHashKeyData {
    fn serialized_size(&self) -> usize {
        4 + self.levels.iter().map(Level::serialized_size).sum::<usize>()
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.levels.len() as u32);
        for level in &self.levels {
            buf.put_u64_le(level.seed);
            buf.put_u32_le(level.bins);
            for word in &level.bits {
                buf.put_u64_le(*word);
            }
        }
    }
}

/// Level plus the rank bookkeeping needed to answer queries
#[derive(Debug, Clone)]
struct RankedLevel {
    level: Level,
    /// Keys owned by all earlier levels
    rank_base: usize,
    /// Set bits in this level before each word
    word_ranks: Vec<u32>,
}

/// Query-side BBHash
#[derive(Debug, Clone)]
pub struct BbHashEvaluator {
    levels: Vec<RankedLevel>,
    key_count: usize,
}

impl BbHashEvaluator {
    fn from_levels(levels: Vec<Level>) -> Self {
        let mut rank_base = 0usize;
        let mut ranked = Vec::with_capacity(levels.len());
        for level in levels {
            let mut word_ranks = Vec::with_capacity(level.bits.len());
            let mut in_level = 0u32;
            for word in &level.bits {
                word_ranks.push(in_level);
                in_level += word.count_ones();
            }
            ranked.push(RankedLevel {
                level,
                rank_base,
                word_ranks,
            });
            rank_base += in_level as usize;
        }
        Self {
            levels: ranked,
            key_count: rank_base,
        }
    }
}

impl Evaluator for BbHashEvaluator {
    fn evaluate(&self, key: i32) -> Option<usize> {
        for ranked in &self.levels {
            let bin = ranked.level.bin(key);
            let word = ranked.level.bits[bin >> 6];
            let bit = bin & 63;
            if (word >> bit) & 1 == 1 {
                let below = (word & ((1u64 << bit) - 1)).count_ones();
                return Some(ranked.rank_base + (ranked.word_ranks[bin >> 6] + below) as usize);
            }
        }
        None
    }

    fn len(&self) -> usize {
        self.key_count
    }
}

impl PerfectHash for BbHash {
    type KeyData = BbHashKeyData;
    type Evaluator = BbHashEvaluator;

    fn generate(&self, keys: &[i32]) -> Result<BbHashKeyData> {
        let mut remaining: Vec<i32> = keys.to_vec();
        let mut levels: Vec<Level> = Vec::new();

        while !remaining.is_empty() {
            if levels.len() >= self.max_levels {
                return Err(IkvError::HashConstruction(format!(
                    "{} of {} keys still colliding after {} levels (duplicate keys?)",
                    remaining.len(),
                    keys.len(),
                    self.max_levels
                )));
            }

            let wanted = (remaining.len() as f64 * self.gamma).ceil().max(1.0);
            if wanted > u32::MAX as f64 {
                return Err(IkvError::HashConstruction(format!(
                    "{} keys need more than {} bins",
                    remaining.len(),
                    u32::MAX
                )));
            }
            let bins = wanted as u32;
            let seed = self.level_seed(levels.len());
            let words = (bins as usize).div_ceil(64);

            // `hit` ends up holding bins with exactly one key
            let mut hit = vec![0u64; words];
            let mut collided = vec![0u64; words];
            for &key in &remaining {
                let bin = bin_of(key, seed, bins);
                if bit_get(&hit, bin) {
                    bit_set(&mut collided, bin);
                } else {
                    bit_set(&mut hit, bin);
                }
            }
            for (word, clash) in hit.iter_mut().zip(&collided) {
                *word &= !clash;
            }

            remaining.retain(|&key| !bit_get(&hit, bin_of(key, seed, bins)));
            tracing::trace!(
                level = levels.len(),
                bins,
                left = remaining.len(),
                "bbhash level built"
            );
            levels.push(Level {
                seed,
                bins,
                bits: hit,
            });
        }

        Ok(BbHashKeyData {
            levels,
            key_count: keys.len(),
        })
    }

    fn build_evaluator(&self, data: BbHashKeyData) -> BbHashEvaluator {
        debug_assert_eq!(
            data.levels
                .iter()
                .flat_map(|l| &l.bits)
                .map(|w| w.count_ones() as usize)
                .sum::<usize>(),
            data.key_count
        );
        BbHashEvaluator::from_levels(data.levels)
    }

    fn load(&self, bytes: &[u8]) -> Result<BbHashEvaluator> {
        let mut buf = bytes;
        if buf.remaining() < 4 {
            return Err(IkvError::Corrupted(
                "key data shorter than level count".to_string(),
            ));
        }
        let level_count = buf.get_u32_le() as usize;
        let mut levels = Vec::with_capacity(level_count.min(buf.remaining() / LEVEL_HEADER_SIZE));

        for index in 0..level_count {
            if buf.remaining() < LEVEL_HEADER_SIZE {
                return Err(IkvError::Corrupted(format!(
                    "level {} header truncated",
                    index
                )));
            }
            let seed = buf.get_u64_le();
            let bins = buf.get_u32_le();
            if bins == 0 {
                return Err(IkvError::Corrupted(format!("level {} has no bins", index)));
            }
            let words = (bins as usize).div_ceil(64);
            if buf.remaining() < words * 8 {
                return Err(IkvError::Corrupted(format!(
                    "level {} bitset truncated",
                    index
                )));
            }
            let bits: Vec<u64> = (0..words).map(|_| buf.get_u64_le()).collect();
            // Bits at or past `bins` in the last word must be clear
            let tail = bins % 64;
            if tail != 0 && bits[words - 1] >> tail != 0 {
                return Err(IkvError::Corrupted(format!(
                    "level {} has bits set past bin {}",
                    index, bins
                )));
            }
            levels.push(Level { seed, bins, bits });
        }

        if buf.has_remaining() {
            return Err(IkvError::Corrupted(format!(
                "{} trailing bytes after hash levels",
                buf.remaining()
            )));
        }

        Ok(BbHashEvaluator::from_levels(levels))
    }
}
