//! Run-length state for `ObjectNullMultiple` records.
//!
//! A run of `N` nulls is encoded as a single record. The record itself stands for the first
//! null of the run; the remaining `N - 1` are produced by the next record steps without
//! reading any bytes.

use crate::Result;

/// Number of synthetic nulls still owed to the record dispatcher.
///
/// Zero means the next record step reads a record from the stream. A positive count means the
/// next record steps each produce a null, consuming no bytes, until the count is exhausted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NullRun {
    pending: u32,
}

impl NullRun {
    /// Create an empty run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run of `count` nulls, the first of which is produced by the current step.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a run of zero nulls, which no producer emits.
    pub fn start(&mut self, count: u32) -> Result<()> {
        if count == 0 {
            return Err(malformed_error!("Null run with a count of 0"));
        }
        self.pending = count - 1;
        Ok(())
    }

    /// Consume one pending null. Returns `false` if none was pending.
    pub fn take(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }

    /// Number of nulls still pending.
    #[must_use]
    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Returns `true` if no nulls are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }
}
