//! Decoder configuration
//!
//! This module provides the limits and consistency checks applied while decoding an NRBF
//! stream. The structural checks that the format itself requires (known tags, non-negative
//! lengths, unique identifiers) are always performed; the options here cover resource limits
//! against adversarial input and cross-record checks that well-formed producers never violate.

/// Default maximum nesting depth of member and slot values.
///
/// Every level costs several stack frames of the recursive dispatcher, so the limit must stay
/// well within the 2 MiB stacks of spawned and rayon worker threads.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default maximum number of slots a single array may declare (16 Mi).
pub const DEFAULT_MAX_ARRAY_SLOTS: usize = 16 * 1024 * 1024;

/// Configuration for one decode pass
///
/// The decoder always rejects:
/// - Unknown and remoting-only record tags
/// - Invalid binary, primitive and array type tags
/// - Negative counts, lengths and ranks
/// - Identifiers registered twice
///
/// The checks and limits below come on top of that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Maximum nesting depth of records decoded as member or slot values (default: 64)
    /// Exceeding it fails the pass with [`crate::Error::RecursionLimit`]
    pub max_depth: usize,

    /// Maximum number of slots of a single array, the product of its lengths (default: 16 Mi)
    /// Exceeding it fails the pass with [`crate::Error::Malformed`]
    pub max_array_slots: usize,

    /// Verify after the end-of-stream record that every stored reference names a decoded entity
    pub verify_references: bool,

    /// Verify that a class record's library has been declared before the class record
    pub verify_libraries: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_array_slots: DEFAULT_MAX_ARRAY_SLOTS,
            verify_references: true,
            verify_libraries: true,
        }
    }
}

impl DecoderConfig {
    /// Creates a configuration for untrusted input
    ///
    /// Enables all checks and halves the nesting depth.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH / 2,
            max_array_slots: DEFAULT_MAX_ARRAY_SLOTS,
            verify_references: true,
            verify_libraries: true,
        }
    }

    /// Creates a configuration that accepts incomplete graphs
    ///
    /// Disables the cross-record checks, so that truncated captures or streams with references
    /// into a second stream can still be inspected. Limits are raised but still enforced, and the
    /// nesting depth stays low enough for the default thread stack.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH * 2,
            max_array_slots: 256 * 1024 * 1024,
            verify_references: false,
            verify_libraries: false,
        }
    }
}
