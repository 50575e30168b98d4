//! # ikv
//!
//! Integer-keyed indexed value files:
//! - Payloads appended back to back through a positional channel
//! - A minimal perfect hash over the keys, written after the payloads
//! - O(1) key → `(offset, size)` lookups from a memory-mapped file
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  IkvWriter                    │
//! │     write(key, data) → channel @ position     │
//! └───────────────┬──────────────────────────────┘
//!                 │ Entry(key, offset, size)
//!                 ▼
//! ┌──────────────────────────────────────────────┐
//! │               IkvIndexBuilder                 │
//! │  PerfectHash → key data | table | footer      │
//! └───────────────┬──────────────────────────────┘
//!                 │ index block appended on close
//!                 ▼
//! ┌──────────────────────────────────────────────┐
//! │                     Ikv                       │
//! │  footer → evaluator → table[rank] → payload   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ```
//! use ikv::{Ikv, IkvWriter};
//!
//! # fn main() -> ikv::Result<()> {
//! let mut writer = IkvWriter::new(Vec::new(), true);
//! writer.write(1, b"a")?;
//! writer.write(2, b"bb")?;
//! let (bytes, _info) = writer.finish()?;
//!
//! let ikv = Ikv::from_bytes(bytes)?;
//! assert_eq!(ikv.get(2)?, Some(&b"bb"[..]));
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod mphf;
pub mod index;
pub mod writer;
pub mod reader;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{IkvError, Result};
pub use config::IkvConfig;
pub use index::{Entry, Footer, IkvIndexBuilder, IndexInfo};
pub use writer::{IkvChannel, IkvInfo, IkvWriter};
pub use reader::Ikv;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ikv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
