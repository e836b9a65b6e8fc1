//! The NRBF record layer: protocol types, decoded entities and the record dispatcher.
//!
//! # Stream Structure
//!
//! An NRBF stream is a sequence of records, each starting with a [`RecordType`] tag byte:
//!
//! ```text
//! SerializedStreamHeader      root id, header id, major and minor version
//! BinaryLibrary               library id, assembly name
//! *Class*                     object id, class metadata or schema source, member values
//! BinaryObjectString          object id, string
//! BinaryArray, ArraySingle*   object id, shape, element type, slot values
//! MemberReference             id of another object
//! ObjectNull*                 one or more nulls
//! MessageEnd                  end of the stream
//! ```
//!
//! Member and slot values that are not inline primitives are records themselves, nested inside
//! the record that owns them.
//!
//! # Key Components
//!
//! - [`Decoder`] - Record dispatcher, decodes one stream into the tables below
//! - [`ObjectRegistry`] - Decoded entities keyed by object id
//! - [`LibraryTable`] - Declared libraries keyed by library id
//! - [`Entity`] - One decoded class instance, array or string
//! - [`TypeDescriptor`] / [`PrimitiveValue`] - Member types and inline values
//! - [`NullRun`] - Pending nulls of an `ObjectNullMultiple` record

mod decoder;
mod entity;
mod nullrun;
mod registry;
mod types;
mod value;

pub use decoder::Decoder;
pub use entity::{
    ArrayRecord, ClassRecord, ClassSchema, ClassSchemaRc, Entity, EntityKind, Library, Member,
    MemberSchema, SerializationHeader, StringRecord,
};
pub use nullrun::NullRun;
pub use registry::{LibraryTable, ObjectRegistry};
pub use types::{
    BinaryArrayType, BinaryType, ClassTypeInfo, PrimitiveType, RecordType, TypeDescriptor,
};
pub use value::{DateTimeKind, PrimitiveValue, Value};

/// Producer-assigned identifier of an object, unique within one stream
pub type ObjectId = i32;

/// Producer-assigned identifier of a library, unique within one stream
pub type LibraryId = i32;
