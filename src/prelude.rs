//! # nrbfscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and functions
//! of the nrbfscope library. Import this module to get quick access to everything needed to
//! decode and inspect an NRBF stream.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all nrbfscope operations
pub use crate::Error;

/// The result type used throughout nrbfscope
pub use crate::Result;

/// Configuration of a decode pass
pub use crate::DecoderConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Decoding functions
pub use crate::{decode, decode_bytes, decode_many, decode_with};

/// Record dispatcher over a borrowed or owned byte source
pub use crate::records::Decoder;

/// Graph statistics
pub use crate::analysis::{analyze, ClassTally, Report, Tally};

// ================================================================================================
// Decoded Graph
// ================================================================================================

/// Decoded tables
pub use crate::records::{LibraryTable, ObjectRegistry};

/// Entities and their content
pub use crate::records::{
    ArrayRecord, ClassRecord, Entity, EntityKind, Library, Member, SerializationHeader,
    StringRecord,
};

/// Values and their types
pub use crate::records::{
    BinaryArrayType, ObjectId, PrimitiveType, PrimitiveValue, TypeDescriptor, Value,
};
