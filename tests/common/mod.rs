//! Byte-level writer for hand-assembled NRBF streams.

#![allow(dead_code)]

pub const HEADER: u8 = 0;
pub const CLASS_WITH_ID: u8 = 1;
pub const SYSTEM_CLASS_WITH_MEMBERS: u8 = 2;
pub const CLASS_WITH_MEMBERS: u8 = 3;
pub const SYSTEM_CLASS_WITH_MEMBERS_AND_TYPES: u8 = 4;
pub const CLASS_WITH_MEMBERS_AND_TYPES: u8 = 5;
pub const OBJECT_STRING: u8 = 6;
pub const BINARY_ARRAY: u8 = 7;
pub const MEMBER_REFERENCE: u8 = 9;
pub const OBJECT_NULL: u8 = 10;
pub const MESSAGE_END: u8 = 11;
pub const BINARY_LIBRARY: u8 = 12;
pub const OBJECT_NULL_MULTIPLE_256: u8 = 13;
pub const OBJECT_NULL_MULTIPLE: u8 = 14;
pub const ARRAY_SINGLE_PRIMITIVE: u8 = 15;
pub const ARRAY_SINGLE_OBJECT: u8 = 16;
pub const ARRAY_SINGLE_STRING: u8 = 17;

#[derive(Default)]
pub struct Nrbf {
    data: Vec<u8>,
}

impl Nrbf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length, the offset of the next record
    pub fn offset(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.data.push(value);
        self
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn bytes(&mut self, value: &[u8]) -> &mut Self {
        self.data.extend_from_slice(value);
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        let mut length = value.len();
        while length >= 0x80 {
            self.data.push((length as u8 & 0x7F) | 0x80);
            length >>= 7;
        }
        self.data.push(length as u8);
        self.data.extend_from_slice(value.as_bytes());
        self
    }

    pub fn header(&mut self, root_id: i32) -> &mut Self {
        self.u8(HEADER).i32(root_id).i32(-1).i32(1).i32(0)
    }

    pub fn library(&mut self, id: i32, name: &str) -> &mut Self {
        self.u8(BINARY_LIBRARY).i32(id).string(name)
    }

    pub fn class(&mut self, tag: u8, id: i32, name: &str, members: &[&str]) -> &mut Self {
        self.u8(tag).i32(id).string(name).i32(members.len() as i32);
        for member in members {
            self.string(member);
        }
        self
    }

    pub fn object_string(&mut self, id: i32, value: &str) -> &mut Self {
        self.u8(OBJECT_STRING).i32(id).string(value)
    }

    pub fn reference(&mut self, id: i32) -> &mut Self {
        self.u8(MEMBER_REFERENCE).i32(id)
    }

    pub fn null(&mut self) -> &mut Self {
        self.u8(OBJECT_NULL)
    }

    pub fn end(&mut self) -> &mut Self {
        self.u8(MESSAGE_END)
    }

    pub fn build(&self) -> Vec<u8> {
        self.data.clone()
    }
}
