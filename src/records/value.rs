//! Decoded member and array element values.
//!
//! A value slot of a class member or array element holds one of three things:
//!
//! - an inline scalar ([`PrimitiveValue`]) for members typed as [`PrimitiveType`],
//! - a reference to another entity by identifier, for every other member type,
//! - a null.
//!
//! References never own the entity they point to. They are plain identifiers that are
//! resolved against [`crate::ObjectRegistry`] after the decode pass, which is how shared
//! sub-objects and cycles are represented without cyclic ownership.
//!
//! # Primitive Encodings
//!
//! ```text
//! PrimitiveType     Encoding
//! ==============    ================================================
//! Boolean           1 byte, non-zero is true
//! Byte / SByte      1 byte
//! Char              1-4 bytes, one UTF-8 encoded character
//! Int16 / UInt16    2 bytes, little-endian
//! Int32 / UInt32    4 bytes, little-endian
//! Int64 / UInt64    8 bytes, little-endian
//! Single / Double   IEEE 754, 4 / 8 bytes, little-endian
//! TimeSpan          i64 tick count (100ns units)
//! DateTime          i64, ticks in bits 0-61, DateTimeKind in bits 62-63
//! Decimal           length-prefixed string ("123.45")
//! String            length-prefixed string
//! Null              no bytes
//! ```

use std::{fmt, io::Read};

use crate::{
    records::{ObjectId, PrimitiveType},
    stream::StreamReader,
    Result,
};

/// Mask selecting the tick count of a binary `DateTime`.
const DATETIME_TICKS_MASK: i64 = 0x3FFF_FFFF_FFFF_FFFF;

/// The `DateTimeKind` stored in the top two bits of a binary `DateTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeKind {
    /// No time zone information
    Unspecified,
    /// Coordinated universal time
    Utc,
    /// Local time of the producer
    Local,
}

/// An inline scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// `System.Boolean`
    Boolean(bool),
    /// `System.Byte`
    Byte(u8),
    /// `System.SByte`
    SByte(i8),
    /// `System.Char`
    Char(char),
    /// `System.Int16`
    Int16(i16),
    /// `System.UInt16`
    UInt16(u16),
    /// `System.Int32`
    Int32(i32),
    /// `System.UInt32`
    UInt32(u32),
    /// `System.Int64`
    Int64(i64),
    /// `System.UInt64`
    UInt64(u64),
    /// `System.Single`
    Single(f32),
    /// `System.Double`
    Double(f64),
    /// `System.Decimal`, kept in its invariant-culture textual form
    Decimal(String),
    /// `System.DateTime` in the binary form of `DateTime.ToBinary()`
    DateTime(i64),
    /// `System.TimeSpan` as a tick count
    TimeSpan(i64),
    /// `System.String`
    String(String),
    /// A primitive typed as `Null`
    Null,
}

impl PrimitiveValue {
    /// Read an inline value of the given kind.
    ///
    /// # Arguments
    /// * `kind`   - The primitive kind from the member's or array's type descriptor
    /// * `reader` - The stream, positioned at the value
    ///
    /// # Errors
    /// Returns a reader error if the value is truncated or a string is not valid UTF-8.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nrbfscope::records::{PrimitiveType, PrimitiveValue};
    /// use nrbfscope::stream::StreamReader;
    ///
    /// let data = [0x2A, 0x00, 0x00, 0x00];
    /// let mut reader = StreamReader::new(&data[..]);
    /// let value = PrimitiveValue::read(PrimitiveType::Int32, &mut reader)?;
    /// assert_eq!(value, PrimitiveValue::Int32(42));
    /// # Ok::<(), nrbfscope::Error>(())
    /// ```
    pub fn read<R: Read>(kind: PrimitiveType, reader: &mut StreamReader<R>) -> Result<Self> {
        Ok(match kind {
            PrimitiveType::Boolean => PrimitiveValue::Boolean(reader.read_le::<u8>()? != 0),
            PrimitiveType::Byte => PrimitiveValue::Byte(reader.read_le::<u8>()?),
            PrimitiveType::SByte => PrimitiveValue::SByte(reader.read_le::<i8>()?),
            PrimitiveType::Char => PrimitiveValue::Char(reader.read_char_utf8()?),
            PrimitiveType::Int16 => PrimitiveValue::Int16(reader.read_le::<i16>()?),
            PrimitiveType::UInt16 => PrimitiveValue::UInt16(reader.read_le::<u16>()?),
            PrimitiveType::Int32 => PrimitiveValue::Int32(reader.read_le::<i32>()?),
            PrimitiveType::UInt32 => PrimitiveValue::UInt32(reader.read_le::<u32>()?),
            PrimitiveType::Int64 => PrimitiveValue::Int64(reader.read_le::<i64>()?),
            PrimitiveType::UInt64 => PrimitiveValue::UInt64(reader.read_le::<u64>()?),
            PrimitiveType::Single => PrimitiveValue::Single(reader.read_le::<f32>()?),
            PrimitiveType::Double => PrimitiveValue::Double(reader.read_le::<f64>()?),
            PrimitiveType::Decimal => PrimitiveValue::Decimal(reader.read_prefixed_string_utf8()?),
            PrimitiveType::DateTime => PrimitiveValue::DateTime(reader.read_le::<i64>()?),
            PrimitiveType::TimeSpan => PrimitiveValue::TimeSpan(reader.read_le::<i64>()?),
            PrimitiveType::String => PrimitiveValue::String(reader.read_prefixed_string_utf8()?),
            PrimitiveType::Null => PrimitiveValue::Null,
        })
    }

    /// The primitive kind of this value.
    #[must_use]
    pub fn kind(&self) -> PrimitiveType {
        match self {
            PrimitiveValue::Boolean(_) => PrimitiveType::Boolean,
            PrimitiveValue::Byte(_) => PrimitiveType::Byte,
            PrimitiveValue::SByte(_) => PrimitiveType::SByte,
            PrimitiveValue::Char(_) => PrimitiveType::Char,
            PrimitiveValue::Int16(_) => PrimitiveType::Int16,
            PrimitiveValue::UInt16(_) => PrimitiveType::UInt16,
            PrimitiveValue::Int32(_) => PrimitiveType::Int32,
            PrimitiveValue::UInt32(_) => PrimitiveType::UInt32,
            PrimitiveValue::Int64(_) => PrimitiveType::Int64,
            PrimitiveValue::UInt64(_) => PrimitiveType::UInt64,
            PrimitiveValue::Single(_) => PrimitiveType::Single,
            PrimitiveValue::Double(_) => PrimitiveType::Double,
            PrimitiveValue::Decimal(_) => PrimitiveType::Decimal,
            PrimitiveValue::DateTime(_) => PrimitiveType::DateTime,
            PrimitiveValue::TimeSpan(_) => PrimitiveType::TimeSpan,
            PrimitiveValue::String(_) => PrimitiveType::String,
            PrimitiveValue::Null => PrimitiveType::Null,
        }
    }

    /// For `DateTime` values, the tick count (100ns intervals since 0001-01-01).
    #[must_use]
    pub fn datetime_ticks(&self) -> Option<i64> {
        match self {
            PrimitiveValue::DateTime(binary) => Some(binary & DATETIME_TICKS_MASK),
            _ => None,
        }
    }

    /// For `DateTime` values, the `DateTimeKind` encoded in the top two bits.
    ///
    /// Kind value 3 is written by .NET for local times that were ambiguous during a daylight
    /// saving transition and is reported as [`DateTimeKind::Local`].
    #[must_use]
    pub fn datetime_kind(&self) -> Option<DateTimeKind> {
        match self {
            PrimitiveValue::DateTime(binary) => Some(match (binary >> 62) & 0x3 {
                0 => DateTimeKind::Unspecified,
                1 => DateTimeKind::Utc,
                _ => DateTimeKind::Local,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::Boolean(v) => write!(f, "{v}"),
            PrimitiveValue::Byte(v) => write!(f, "{v}"),
            PrimitiveValue::SByte(v) => write!(f, "{v}"),
            PrimitiveValue::Char(v) => write!(f, "'{v}'"),
            PrimitiveValue::Int16(v) => write!(f, "{v}"),
            PrimitiveValue::UInt16(v) => write!(f, "{v}"),
            PrimitiveValue::Int32(v) => write!(f, "{v}"),
            PrimitiveValue::UInt32(v) => write!(f, "{v}"),
            PrimitiveValue::Int64(v) => write!(f, "{v}"),
            PrimitiveValue::UInt64(v) => write!(f, "{v}"),
            PrimitiveValue::Single(v) => write!(f, "{v}"),
            PrimitiveValue::Double(v) => write!(f, "{v}"),
            PrimitiveValue::Decimal(v) => write!(f, "{v}m"),
            PrimitiveValue::DateTime(v) => write!(f, "DateTime(0x{v:016X})"),
            PrimitiveValue::TimeSpan(v) => write!(f, "TimeSpan({v} ticks)"),
            PrimitiveValue::String(v) => write!(f, "{v:?}"),
            PrimitiveValue::Null => write!(f, "null"),
        }
    }
}

/// The decoded content of one member or array slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An inline scalar
    Primitive(PrimitiveValue),
    /// The identifier of another entity, either decoded in place or named by a
    /// `MemberReference` record
    Reference(ObjectId),
    /// No value
    Null,
}

impl Value {
    /// The referenced identifier, if this value is a reference.
    #[must_use]
    pub fn reference(&self) -> Option<ObjectId> {
        match self {
            Value::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// The inline scalar, if this value is a primitive.
    #[must_use]
    pub fn primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Value::Primitive(value) => Some(value),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<Option<ObjectId>> for Value {
    fn from(id: Option<ObjectId>) -> Self {
        id.map_or(Value::Null, Value::Reference)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Primitive(value) => value.fmt(f),
            Value::Reference(id) => write!(f, "#{id}"),
            Value::Null => write!(f, "null"),
        }
    }
}
