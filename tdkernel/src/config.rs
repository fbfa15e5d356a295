//! Kernel-level tunables.
//!
//! These are knobs for the engine kernel itself, as distinct from any tuning a
//! concrete record-layer backend exposes for its own storage files.

use serde::{Deserialize, Serialize};

/// Configuration for the engine kernel.
///
/// Mirrors the shape of a backend options struct: a `#[non_exhaustive]`,
/// serde-derived bag of fields with documented defaults and an explicit
/// [`Default`] impl.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct EngineConfig {
    /// Minimum growth step, in bytes, used by `append_string`/`append_byte` to
    /// amortize byte-string growth.
    ///
    /// Defaults to `64`.
    pub string_grow_increment: usize,
    /// Whether the query engine installs `optinfo` index bounds on `where` clauses
    /// over indexed attributes, or always performs a full scan.
    ///
    /// Defaults to `true`.
    pub index_planning: bool,
    /// Maximum number of possreps a scalar type registration may declare.
    ///
    /// Defaults to `8`.
    pub max_possreps: usize,
    /// Optional cap on the number of fixpoint rounds `tclose` will perform before
    /// raising [`crate::Error::NotSupported`].
    ///
    /// Defaults to `None`, meaning the transitive closure runs to quiescence.
    pub tclose_round_limit: Option<usize>,
}

impl EngineConfig {
    /// Creates a new `EngineConfig`.
    pub fn new(
        string_grow_increment: usize,
        index_planning: bool,
        max_possreps: usize,
        tclose_round_limit: Option<usize>,
    ) -> Self {
        Self {
            string_grow_increment,
            index_planning,
            max_possreps,
            tclose_round_limit,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(64, true, 8, None)
    }
}
