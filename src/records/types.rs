//! Protocol enumerations and member type descriptors.
//!
//! This module defines the closed sets of tag values used by the NRBF format, exactly as they
//! appear on the wire, together with [`TypeDescriptor`] which describes how the value of a
//! class member or array element is encoded.
//!
//! # Key Types
//! - [`RecordType`] - The tag byte that starts every record
//! - [`BinaryType`] - Coarse classification of a member's type
//! - [`PrimitiveType`] - The scalar kinds that are stored inline
//! - [`BinaryArrayType`] - Shape of a generic array record
//! - [`TypeDescriptor`] - A [`BinaryType`] together with its additional type information
//!
//! # Additional Type Information
//!
//! For records that carry member types (`ClassWithMembersAndTypes`,
//! `SystemClassWithMembersAndTypes`, `BinaryArray`), every [`BinaryType`] tag may be followed
//! by additional information in the stream:
//!
//! ```text
//! BinaryType        Additional information
//! ==============    =====================================
//! Primitive         PrimitiveType (1 byte)
//! String            -
//! Object            -
//! SystemClass       type name (length-prefixed string)
//! Class             type name, library id (i32)
//! ObjectArray       -
//! StringArray       -
//! PrimitiveArray    PrimitiveType (1 byte)
//! ```
//!
//! For class records the tags of all members come first, followed by the additional
//! information of all members, in member order.

use std::{fmt, io::Read};

use strum::{EnumCount, EnumIter, FromRepr};

use crate::{records::LibraryId, stream::StreamReader, Result};

/// The record tag byte that starts every record in an NRBF stream.
///
/// Values 18-20 (cross-app-domain records) are not assigned by this decoder and are treated as
/// unknown, like any other unassigned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, FromRepr)]
#[repr(u8)]
pub enum RecordType {
    /// `SerializationHeaderRecord`, 16 bytes of format metadata
    SerializedStreamHeader = 0,
    /// Class instance reusing the metadata of a previously read class
    ClassWithId = 1,
    /// System class with member names, without member types
    SystemClassWithMembers = 2,
    /// Class with member names and library id, without member types
    ClassWithMembers = 3,
    /// System class with member names and types
    SystemClassWithMembersAndTypes = 4,
    /// Class with member names, types and library id
    ClassWithMembersAndTypes = 5,
    /// A string object
    BinaryObjectString = 6,
    /// Generic array with explicit shape and element type
    BinaryArray = 7,
    /// Untyped primitive value, remoting only
    MemberPrimitiveTyped = 8,
    /// Reference to an object identifier
    MemberReference = 9,
    /// A single null value
    ObjectNull = 10,
    /// End of the serialization stream
    MessageEnd = 11,
    /// Library (assembly) name declaration
    BinaryLibrary = 12,
    /// Run of nulls with an 8-bit count
    ObjectNullMultiple256 = 13,
    /// Run of nulls with a 32-bit count
    ObjectNullMultiple = 14,
    /// One-dimensional array of a primitive type
    ArraySinglePrimitive = 15,
    /// One-dimensional array of objects
    ArraySingleObject = 16,
    /// One-dimensional array of strings
    ArraySingleString = 17,
    /// Remoting method call
    MethodCall = 21,
    /// Remoting method return
    MethodReturn = 22,
}

/// Coarse classification of a member or array element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, FromRepr)]
#[repr(u8)]
pub enum BinaryType {
    /// A primitive stored inline, see [`PrimitiveType`]
    Primitive = 0,
    /// A string object
    String = 1,
    /// Any object
    Object = 2,
    /// A class from the system library
    SystemClass = 3,
    /// A class from a declared library
    Class = 4,
    /// An array of objects
    ObjectArray = 5,
    /// An array of strings
    StringArray = 6,
    /// An array of primitives
    PrimitiveArray = 7,
}

impl BinaryType {
    /// Read a binary type tag from the stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an unassigned tag value, or a reader error.
    pub fn read<R: Read>(reader: &mut StreamReader<R>) -> Result<Self> {
        let offset = reader.pos();
        let tag = reader.read_le::<u8>()?;
        BinaryType::from_repr(tag).ok_or_else(|| {
            malformed_error!("Invalid binary type 0x{:02X} at offset {}", tag, offset)
        })
    }
}

/// The scalar kinds that are stored inline in member values and primitive arrays.
///
/// Value 4 is unassigned by the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, FromRepr)]
#[repr(u8)]
pub enum PrimitiveType {
    /// `System.Boolean`, 1 byte
    Boolean = 1,
    /// `System.Byte`, 1 byte
    Byte = 2,
    /// `System.Char`, one UTF-8 encoded character
    Char = 3,
    /// `System.Decimal`, length-prefixed string
    Decimal = 5,
    /// `System.Double`, 8 bytes
    Double = 6,
    /// `System.Int16`, 2 bytes
    Int16 = 7,
    /// `System.Int32`, 4 bytes
    Int32 = 8,
    /// `System.Int64`, 8 bytes
    Int64 = 9,
    /// `System.SByte`, 1 byte
    SByte = 10,
    /// `System.Single`, 4 bytes
    Single = 11,
    /// `System.TimeSpan`, 8 bytes of ticks
    TimeSpan = 12,
    /// `System.DateTime`, 8 bytes of ticks and kind
    DateTime = 13,
    /// `System.UInt16`, 2 bytes
    UInt16 = 14,
    /// `System.UInt32`, 4 bytes
    UInt32 = 15,
    /// `System.UInt64`, 8 bytes
    UInt64 = 16,
    /// Null, no bytes
    Null = 17,
    /// `System.String`, length-prefixed string
    String = 18,
}

impl PrimitiveType {
    /// Read a primitive type tag from the stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an unassigned tag value, or a reader error.
    pub fn read<R: Read>(reader: &mut StreamReader<R>) -> Result<Self> {
        let offset = reader.pos();
        let tag = reader.read_le::<u8>()?;
        PrimitiveType::from_repr(tag).ok_or_else(|| {
            malformed_error!("Invalid primitive type 0x{:02X} at offset {}", tag, offset)
        })
    }

    /// Returns the encoded size for fixed-width kinds, `None` for the variable-width ones.
    #[must_use]
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            PrimitiveType::Null => Some(0),
            PrimitiveType::Boolean | PrimitiveType::Byte | PrimitiveType::SByte => Some(1),
            PrimitiveType::Int16 | PrimitiveType::UInt16 => Some(2),
            PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::Single => Some(4),
            PrimitiveType::Int64
            | PrimitiveType::UInt64
            | PrimitiveType::Double
            | PrimitiveType::TimeSpan
            | PrimitiveType::DateTime => Some(8),
            PrimitiveType::Char | PrimitiveType::Decimal | PrimitiveType::String => None,
        }
    }
}

/// Shape of a generic [`RecordType::BinaryArray`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, FromRepr)]
#[repr(u8)]
pub enum BinaryArrayType {
    /// One dimension, zero based
    Single = 0,
    /// Array of arrays
    Jagged = 1,
    /// Multiple dimensions
    Rectangular = 2,
    /// One dimension with a lower bound
    SingleOffset = 3,
    /// Array of arrays with lower bounds
    JaggedOffset = 4,
    /// Multiple dimensions with lower bounds
    RectangularOffset = 5,
}

impl BinaryArrayType {
    /// Returns `true` if the record carries one lower bound per dimension.
    #[must_use]
    pub fn has_lower_bounds(self) -> bool {
        matches!(
            self,
            BinaryArrayType::SingleOffset
                | BinaryArrayType::JaggedOffset
                | BinaryArrayType::RectangularOffset
        )
    }
}

/// Name and library of a class-typed member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTypeInfo {
    /// Fully qualified type name
    pub type_name: String,
    /// Library the type lives in, `None` for system classes
    pub library_id: Option<LibraryId>,
}

/// How the value of a member or array element is encoded.
///
/// A [`BinaryType`] together with whatever additional information that kind carries. Only
/// [`TypeDescriptor::Primitive`] values are stored inline; every other kind is stored as a
/// separate record and decoded through the record dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// Inline primitive of the given kind
    Primitive(PrimitiveType),
    /// A string object
    String,
    /// Any object
    Object,
    /// A system class, by name
    SystemClass(String),
    /// A class from a declared library
    Class(ClassTypeInfo),
    /// An array of objects
    ObjectArray,
    /// An array of strings
    StringArray,
    /// An array of the given primitive kind
    PrimitiveArray(PrimitiveType),
}

impl TypeDescriptor {
    /// Read the additional type information for `binary_type` and build the descriptor.
    ///
    /// # Arguments
    /// * `binary_type` - The tag that was read before
    /// * `reader`      - The stream, positioned at the additional information
    ///
    /// # Errors
    /// Returns a reader error or [`crate::Error::Malformed`] for an invalid primitive kind.
    pub fn read_additional_info<R: Read>(
        binary_type: BinaryType,
        reader: &mut StreamReader<R>,
    ) -> Result<Self> {
        Ok(match binary_type {
            BinaryType::Primitive => TypeDescriptor::Primitive(PrimitiveType::read(reader)?),
            BinaryType::String => TypeDescriptor::String,
            BinaryType::Object => TypeDescriptor::Object,
            BinaryType::SystemClass => {
                TypeDescriptor::SystemClass(reader.read_prefixed_string_utf8()?)
            }
            BinaryType::Class => TypeDescriptor::Class(ClassTypeInfo {
                type_name: reader.read_prefixed_string_utf8()?,
                library_id: Some(reader.read_le::<i32>()?),
            }),
            BinaryType::ObjectArray => TypeDescriptor::ObjectArray,
            BinaryType::StringArray => TypeDescriptor::StringArray,
            BinaryType::PrimitiveArray => {
                TypeDescriptor::PrimitiveArray(PrimitiveType::read(reader)?)
            }
        })
    }

    /// The [`BinaryType`] tag of this descriptor.
    #[must_use]
    pub fn binary_type(&self) -> BinaryType {
        match self {
            TypeDescriptor::Primitive(_) => BinaryType::Primitive,
            TypeDescriptor::String => BinaryType::String,
            TypeDescriptor::Object => BinaryType::Object,
            TypeDescriptor::SystemClass(_) => BinaryType::SystemClass,
            TypeDescriptor::Class(_) => BinaryType::Class,
            TypeDescriptor::ObjectArray => BinaryType::ObjectArray,
            TypeDescriptor::StringArray => BinaryType::StringArray,
            TypeDescriptor::PrimitiveArray(_) => BinaryType::PrimitiveArray,
        }
    }

    /// The primitive kind, for `Primitive` and `PrimitiveArray` descriptors.
    #[must_use]
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self {
            TypeDescriptor::Primitive(kind) | TypeDescriptor::PrimitiveArray(kind) => Some(*kind),
            _ => None,
        }
    }

    /// The class type information, for `SystemClass` and `Class` descriptors.
    #[must_use]
    pub fn class_info(&self) -> Option<ClassTypeInfo> {
        match self {
            TypeDescriptor::SystemClass(type_name) => Some(ClassTypeInfo {
                type_name: type_name.clone(),
                library_id: None,
            }),
            TypeDescriptor::Class(info) => Some(info.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(kind) => write!(f, "{kind:?}"),
            TypeDescriptor::String => write!(f, "String"),
            TypeDescriptor::Object => write!(f, "Object"),
            TypeDescriptor::SystemClass(name) => write!(f, "{name}"),
            TypeDescriptor::Class(info) => match info.library_id {
                Some(library_id) => write!(f, "{} (library {library_id})", info.type_name),
                None => write!(f, "{}", info.type_name),
            },
            TypeDescriptor::ObjectArray => write!(f, "Object[]"),
            TypeDescriptor::StringArray => write!(f, "String[]"),
            TypeDescriptor::PrimitiveArray(kind) => write!(f, "{kind:?}[]"),
        }
    }
}
