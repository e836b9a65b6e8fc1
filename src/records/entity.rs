//! Decoded entities, libraries and the stream header.
//!
//! Every object record in an NRBF stream decodes to one [`Entity`], identified by the object
//! identifier the producer assigned to it. An entity is one of three kinds:
//!
//! - [`ClassRecord`] - an instance of a class, with named member values
//! - [`ArrayRecord`] - an array of any shape, with its slot values flattened row-major
//! - [`StringRecord`] - a string object
//!
//! Class instances share their metadata: the [`ClassSchema`] (name, library, member names and
//! types) is read once from the first instance of a class and reused by every later
//! `ClassWithId` record that names that instance as its schema source.

use std::sync::Arc;

use crate::records::{
    BinaryArrayType, LibraryId, ObjectId, RecordType, TypeDescriptor, Value,
};

/// Name and type of one class member.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSchema {
    /// The member (field) name
    pub name: String,
    /// The member type; `None` for records that carry no member types, in which case every
    /// value is a separate record
    pub ty: Option<TypeDescriptor>,
}

/// Class metadata shared by every instance of a class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSchema {
    /// The object id of the record that declared this schema
    pub object_id: ObjectId,
    /// Fully qualified class name
    pub name: String,
    /// Library the class lives in, `None` for system classes
    pub library_id: Option<LibraryId>,
    /// Members in declaration order
    pub members: Vec<MemberSchema>,
    /// The record kind that declared this schema
    pub record_type: RecordType,
}

/// Shared reference to a [`ClassSchema`]
pub type ClassSchemaRc = Arc<ClassSchema>;

/// A borrowed view of one class member together with its decoded value.
#[derive(Debug, Clone, Copy)]
pub struct Member<'a> {
    /// The member name
    pub name: &'a str,
    /// The member type, if the record declared one
    pub ty: Option<&'a TypeDescriptor>,
    /// The decoded value
    pub value: &'a Value,
}

/// An instance of a class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRecord {
    /// Class metadata, possibly shared with other instances
    pub schema: ClassSchemaRc,
    /// One value per schema member, in member order
    pub values: Vec<Value>,
    /// For `ClassWithId` instances, the object id whose schema was reused
    pub metadata_id: Option<ObjectId>,
    /// Number of `MemberReference` records in the stream naming this instance
    pub reference_count: u32,
}

impl ClassRecord {
    /// The class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// The library the class lives in, `None` for system classes.
    #[must_use]
    pub fn library_id(&self) -> Option<LibraryId> {
        self.schema.library_id
    }

    /// Iterate the members with their values, in declaration order.
    pub fn members(&self) -> impl Iterator<Item = Member<'_>> {
        self.schema
            .members
            .iter()
            .zip(self.values.iter())
            .map(|(member, value)| Member {
                name: &member.name,
                ty: member.ty.as_ref(),
                value,
            })
    }

    /// Look up a member by name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<Member<'_>> {
        self.members().find(|member| member.name == name)
    }
}

/// An array of any shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayRecord {
    /// The array shape
    pub array_type: BinaryArrayType,
    /// Number of dimensions
    pub rank: usize,
    /// Length of every dimension
    pub lengths: Vec<usize>,
    /// Lower bound of every dimension, for the `*Offset` shapes
    pub lower_bounds: Option<Vec<i32>>,
    /// The element type
    pub element_type: TypeDescriptor,
    /// Slot values flattened in row-major order, `product(lengths)` entries
    pub values: Vec<Value>,
    /// The record kind that produced this array (generic or one of the shorthand forms)
    pub record_type: RecordType,
}

impl ArrayRecord {
    /// Total number of slots, the product of all dimension lengths.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.lengths.iter().product()
    }

    /// Get the value at a multi-dimensional index, honoring lower bounds.
    ///
    /// Returns `None` if the index has the wrong rank or lies outside the array.
    #[must_use]
    pub fn get(&self, index: &[i64]) -> Option<&Value> {
        if index.len() != self.rank {
            return None;
        }

        let mut flat = 0usize;
        for (dim, &position) in index.iter().enumerate() {
            let lower = self
                .lower_bounds
                .as_ref()
                .map_or(0, |bounds| i64::from(bounds[dim]));
            let relative = usize::try_from(position.checked_sub(lower)?).ok()?;
            if relative >= self.lengths[dim] {
                return None;
            }
            flat = flat * self.lengths[dim] + relative;
        }

        self.values.get(flat)
    }
}

/// A string object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRecord {
    /// The string content
    pub value: String,
}

/// The kind-specific content of an [`Entity`].
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    /// A class instance
    Class(ClassRecord),
    /// An array
    Array(ArrayRecord),
    /// A string object
    String(StringRecord),
}

/// One decoded object record.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// The producer-assigned object identifier, unique within the stream
    pub object_id: ObjectId,
    /// The entity whose member or slot caused this record to be decoded, `None` for top-level
    /// entities
    pub parent_id: Option<ObjectId>,
    /// Offset of the record tag byte in the stream
    pub offset: u64,
    /// Number of bytes the record occupied, including every nested record decoded while
    /// reading its values
    pub record_length: u64,
    /// The kind-specific content
    pub kind: EntityKind,
}

impl Entity {
    /// Returns `true` if the entity was not reached through another entity's member or slot.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The class content, if this is a class instance.
    #[must_use]
    pub fn as_class(&self) -> Option<&ClassRecord> {
        match &self.kind {
            EntityKind::Class(class) => Some(class),
            _ => None,
        }
    }

    /// The array content, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayRecord> {
        match &self.kind {
            EntityKind::Array(array) => Some(array),
            _ => None,
        }
    }

    /// The string content, if this is a string object.
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match &self.kind {
            EntityKind::String(string) => Some(&string.value),
            _ => None,
        }
    }

    /// The values stored in this entity's members or slots; empty for strings.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        match &self.kind {
            EntityKind::Class(class) => &class.values,
            EntityKind::Array(array) => &array.values,
            EntityKind::String(_) => &[],
        }
    }

    /// Iterate the identifiers this entity refers to through its members or slots.
    pub fn references(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.values().iter().filter_map(Value::reference)
    }
}

/// A library (assembly) declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    /// The library identifier, referenced by class records
    pub library_id: LibraryId,
    /// The assembly display name
    pub name: String,
    /// Offset of the record tag byte in the stream
    pub offset: u64,
    /// Number of bytes the record occupied
    pub record_length: u64,
}

/// The content of the `SerializedStreamHeader` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializationHeader {
    /// Identifier of the root object of the graph
    pub root_id: ObjectId,
    /// Identifier of the header (remoting only, usually -1)
    pub header_id: i32,
    /// Format major version, 1 for all known producers
    pub major_version: i32,
    /// Format minor version, 0 for all known producers
    pub minor_version: i32,
}
