//! Shared helpers for unit tests
//!
//! [`StreamBuilder`] assembles NRBF streams byte by byte, the way a producer would write them,
//! so that decoder tests can state their input record by record.

use crate::records::{PrimitiveType, RecordType};

/// Incremental writer for NRBF test streams.
#[derive(Debug, Default, Clone)]
pub struct StreamBuilder {
    data: Vec<u8>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.data.push(value);
        self
    }

    pub fn i32(mut self, value: i32) -> Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i64(mut self, value: i64) -> Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn f64(mut self, value: f64) -> Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn bytes(mut self, value: &[u8]) -> Self {
        self.data.extend_from_slice(value);
        self
    }

    /// Length-prefixed UTF-8 string with a 7-bit encoded length
    pub fn string(mut self, value: &str) -> Self {
        let mut length = value.len();
        while length >= 0x80 {
            self.data.push((length as u8 & 0x7F) | 0x80);
            length >>= 7;
        }
        self.data.push(length as u8);
        self.data.extend_from_slice(value.as_bytes());
        self
    }

    pub fn record(self, record: RecordType) -> Self {
        self.u8(record as u8)
    }

    pub fn primitive_type(self, kind: PrimitiveType) -> Self {
        self.u8(kind as u8)
    }

    pub fn header(self, root_id: i32) -> Self {
        self.record(RecordType::SerializedStreamHeader)
            .i32(root_id)
            .i32(-1)
            .i32(1)
            .i32(0)
    }

    pub fn library(self, id: i32, name: &str) -> Self {
        self.record(RecordType::BinaryLibrary).i32(id).string(name)
    }

    pub fn object_string(self, id: i32, value: &str) -> Self {
        self.record(RecordType::BinaryObjectString)
            .i32(id)
            .string(value)
    }

    pub fn reference(self, id: i32) -> Self {
        self.record(RecordType::MemberReference).i32(id)
    }

    pub fn null(self) -> Self {
        self.record(RecordType::ObjectNull)
    }

    pub fn null_multiple_256(self, count: u8) -> Self {
        self.record(RecordType::ObjectNullMultiple256).u8(count)
    }

    pub fn null_multiple(self, count: i32) -> Self {
        self.record(RecordType::ObjectNullMultiple).i32(count)
    }

    /// Tag, id, class name and member names of any of the four class declaring records
    pub fn class_header(self, record: RecordType, id: i32, name: &str, members: &[&str]) -> Self {
        let mut builder = self
            .record(record)
            .i32(id)
            .string(name)
            .i32(members.len() as i32);
        for member in members {
            builder = builder.string(member);
        }
        builder
    }

    pub fn class_with_id(self, id: i32, metadata_id: i32) -> Self {
        self.record(RecordType::ClassWithId).i32(id).i32(metadata_id)
    }

    /// Header of an `ArraySinglePrimitive` record, the values follow
    pub fn array_single_primitive(self, id: i32, kind: PrimitiveType, length: i32) -> Self {
        self.record(RecordType::ArraySinglePrimitive)
            .i32(id)
            .i32(length)
            .primitive_type(kind)
    }

    pub fn end(self) -> Self {
        self.record(RecordType::MessageEnd)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

/// Header, library 2 and one `Point` (id 1) with the Int32 members `x = 3` and `y = 4`.
pub fn point_stream() -> Vec<u8> {
    StreamBuilder::new()
        .header(1)
        .library(2, "Geometry, Version=1.0.0.0")
        .class_header(RecordType::ClassWithMembersAndTypes, 1, "Point", &["x", "y"])
        .u8(0)
        .u8(0)
        .primitive_type(PrimitiveType::Int32)
        .primitive_type(PrimitiveType::Int32)
        .i32(2)
        .i32(3)
        .i32(4)
        .end()
        .build()
}
