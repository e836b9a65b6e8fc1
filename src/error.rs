use thiserror::Error;

use crate::records::{ObjectId, RecordType};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    ($offset:expr, $needed:expr) => {
        crate::Error::PrematureEndOfStream {
            offset: $offset,
            needed: $needed,
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every error is fatal for the decode pass that produced it: the decoder never resynchronizes
/// on a damaged stream, and the partially built registry is dropped together with the pass.
/// All variants that originate from the byte stream carry the absolute offset at which the
/// problem was detected, so that a failure can be located with a hex editor.
///
/// # Error Categories
///
/// ## Protocol Errors
/// - [`Error::UnknownRecordType`] - A record tag outside the known set
/// - [`Error::UnsupportedRecordType`] - A remoting-only record (method call/return)
/// - [`Error::DanglingReference`] - A schema source, library or object id that was never registered
/// - [`Error::DuplicateIdentifier`] - An identifier registered twice
/// - [`Error::Malformed`] - Structurally invalid content (bad type tags, negative lengths, ...)
///
/// ## Input Errors
/// - [`Error::PrematureEndOfStream`] - The byte source ended in the middle of a record
/// - [`Error::Io`] - The byte source failed for any other reason
///
/// ## Resource Limits
/// - [`Error::RecursionLimit`] - Object graph nesting exceeded the configured maximum
///
/// # Examples
///
/// ```rust
/// use nrbfscope::{decode_bytes, Error};
///
/// match decode_bytes(&[99]) {
///     Err(Error::UnknownRecordType { tag, offset }) => {
///         assert_eq!(tag, 99);
///         assert_eq!(offset, 0);
///     }
///     other => panic!("unexpected result: {:?}", other.map(|_| ())),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The record tag byte is not assigned by the format.
    ///
    /// Usually this means the decoder lost synchronization with the stream, either because the
    /// input is not an NRBF stream at all or because a previous record was truncated or corrupt.
    #[error("Unknown record type 0x{tag:02X} at offset {offset}")]
    UnknownRecordType {
        /// The tag byte that was read
        tag: u8,
        /// Offset of the tag byte
        offset: u64,
    },

    /// The record tag is valid, but belongs to the remoting message protocol.
    ///
    /// `MethodCall`, `MethodReturn` and `MemberPrimitiveTyped` records are never produced by
    /// plain object graph serialization and are reported distinctly, so that callers can tell
    /// out-of-scope input apart from corruption.
    #[error("Unsupported record type {record:?} at offset {offset}")]
    UnsupportedRecordType {
        /// The record kind that was encountered
        record: RecordType,
        /// Offset of the tag byte
        offset: u64,
    },

    /// An identifier was looked up but never registered.
    ///
    /// Lookups made after the decode pass (through [`crate::ObjectRegistry::resolve`]) have no
    /// stream position and carry no offset.
    #[error("Dangling reference to id {id}{}", at_offset(.offset))]
    DanglingReference {
        /// The identifier that could not be resolved
        id: ObjectId,
        /// Offset at which the lookup was performed, if it happened during decoding
        offset: Option<u64>,
    },

    /// An identifier was registered for a second, genuinely new entity.
    #[error("Duplicate identifier {id} at offset {offset}")]
    DuplicateIdentifier {
        /// The identifier that was already taken
        id: ObjectId,
        /// Offset at which the second registration happened
        offset: u64,
    },

    /// The byte source ended before a record or value was fully read.
    #[error("Premature end of stream at offset {offset}, needed {needed} more byte(s)")]
    PrematureEndOfStream {
        /// Offset at which the incomplete value started
        offset: u64,
        /// Number of bytes the value required
        needed: usize,
    },

    /// The stream is damaged and could not be decoded.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Recursion limit reached.
    ///
    /// Nested member values are decoded recursively, so the depth of the call stack follows the
    /// nesting depth of the object graph. To prevent stack overflows on adversarial input a
    /// maximum depth is enforced, see [`crate::DecoderConfig::max_depth`].
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// I/O error of the underlying byte source.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the stream offset associated with this error, if there is one.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        match self {
            Error::UnknownRecordType { offset, .. }
            | Error::UnsupportedRecordType { offset, .. }
            | Error::DuplicateIdentifier { offset, .. }
            | Error::PrematureEndOfStream { offset, .. } => Some(*offset),
            Error::DanglingReference { offset, .. } => *offset,
            Error::Malformed { .. } | Error::RecursionLimit(_) | Error::Io(_) => None,
        }
    }
}

fn at_offset(offset: &Option<u64>) -> String {
    offset.map_or_else(String::new, |offset| format!(" at offset {offset}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_offsets() {
        let err = Error::UnknownRecordType {
            tag: 0x63,
            offset: 17,
        };
        assert_eq!(err.offset(), Some(17));
        assert_eq!(err.to_string(), "Unknown record type 0x63 at offset 17");

        let err = Error::DanglingReference {
            id: 5,
            offset: None,
        };
        assert_eq!(err.offset(), None);
        assert_eq!(err.to_string(), "Dangling reference to id 5");

        let err = Error::DanglingReference {
            id: 5,
            offset: Some(9),
        };
        assert_eq!(err.to_string(), "Dangling reference to id 5 at offset 9");

        let err = out_of_bounds_error!(4, 2);
        assert_eq!(err.offset(), Some(4));

        let err = malformed_error!("bad rank {}", -1);
        assert_eq!(err.offset(), None);
        assert!(err.to_string().contains("bad rank -1"));
    }
}
