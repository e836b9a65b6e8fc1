//! The NRBF record dispatcher.
//!
//! This module provides [`Decoder`], the recursive-descent engine that pulls one record at a
//! time from a [`StreamReader`] and wires the decoded entities into an [`ObjectRegistry`] and a
//! [`LibraryTable`].
//!
//! # Decoding Model
//!
//! A stream is a flat sequence of tagged records ending with a `MessageEnd` record. Member and
//! array slot values whose type is not an inline primitive are themselves encoded as records,
//! so decoding such a value is a recursive call into the same dispatch routine. That call
//! returns one of:
//!
//! - the id of a freshly decoded entity (which is registered with the current entity as its
//!   parent)
//! - the id named by a `MemberReference` record, which may point at an entity that is still
//!   being decoded further up the call stack (cycles) or that only appears later in the stream
//! - a null, possibly one of a run of nulls encoded by a single `ObjectNullMultiple` record
//!
//! References are stored as plain ids and are never followed by the decoder, so cycles need no
//! special handling.
//!
//! # Record Lengths
//!
//! Every entity records the offset of its tag byte and the number of bytes consumed until it
//! was fully read, including all records decoded while reading its values. An entity is only
//! registered once it is complete, so a failing pass never leaves a half-read entity behind.
//!
//! # Examples
//!
//! ```rust
//! use nrbfscope::{records::Decoder, DecoderConfig};
//!
//! // Header, BinaryObjectString id 1 "hi", MessageEnd, trailing byte
//! let data = [
//!     0x00, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
//!     0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x06, 0x01, 0x00, 0x00, 0x00, 0x02, b'h', b'i',
//!     0x0B, 0xAA,
//! ];
//!
//! let mut source = &data[..];
//! let (registry, libraries) = Decoder::new(&mut source, DecoderConfig::default()).decode()?;
//!
//! assert_eq!(registry.len(), 1);
//! assert!(libraries.is_empty());
//! assert_eq!(source, &[0xAA]);
//! # Ok::<(), nrbfscope::Error>(())
//! ```

use std::{collections::HashMap, io::Read, sync::Arc};

use crate::{
    config::DecoderConfig,
    records::{
        ArrayRecord, BinaryArrayType, BinaryType, ClassRecord, ClassSchema, Entity, EntityKind,
        Library, LibraryId, LibraryTable, MemberSchema, NullRun, ObjectId, ObjectRegistry,
        PrimitiveType, PrimitiveValue, RecordType, SerializationHeader, StringRecord,
        TypeDescriptor, Value,
    },
    stream::StreamReader,
    Error, Result,
};

/// Highest array rank the runtime supports.
const MAX_ARRAY_RANK: usize = 32;

/// What one record step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// A new entity was decoded and registered
    Entity(ObjectId),
    /// A `MemberReference` to an existing or later entity
    Reference(ObjectId),
    /// A null, either read or owed by a null run
    Null,
    /// A library declaration was registered
    Library,
    /// The stream header was read
    Header,
    /// The end-of-stream record was read
    End,
}

/// Record dispatcher for one decode pass.
///
/// A `Decoder` owns the state of exactly one pass: the reader, the registry and library table
/// being built, the null run counter and the recursion depth. It is consumed by
/// [`Decoder::decode`], so a registry is never shared between passes.
pub struct Decoder<R> {
    reader: StreamReader<R>,
    config: DecoderConfig,
    registry: ObjectRegistry,
    libraries: LibraryTable,
    nulls: NullRun,
    depth: usize,
    reference_counts: HashMap<ObjectId, u32>,
}

impl<R: Read> Decoder<R> {
    /// Create a decoder reading from the current position of `source`.
    ///
    /// # Arguments
    /// * `source` - The byte source, positioned at the first record of the stream
    /// * `config` - Limits and checks for this pass
    #[must_use]
    pub fn new(source: R, config: DecoderConfig) -> Self {
        Decoder {
            reader: StreamReader::new(source),
            config,
            registry: ObjectRegistry::new(),
            libraries: LibraryTable::new(),
            nulls: NullRun::new(),
            depth: 0,
            reference_counts: HashMap::new(),
        }
    }

    /// Decode records until the end-of-stream record and return the populated tables.
    ///
    /// Bytes following the end-of-stream record are left unread in the source.
    ///
    /// # Errors
    /// Returns the first protocol, input or limit error encountered; the partially built
    /// tables are dropped.
    pub fn decode(mut self) -> Result<(ObjectRegistry, LibraryTable)> {
        log::debug!("Decoding NRBF stream");

        let mut records = 0usize;
        loop {
            records += 1;
            if self.parse_record(None)? == Outcome::End {
                break;
            }
        }

        if self.config.verify_references {
            if let Some((owner, target)) = self.registry.dangling_references().next() {
                return Err(Error::DanglingReference {
                    id: target,
                    offset: self.registry.get(owner).map(|entity| entity.offset),
                });
            }
        }

        self.registry.finish(&self.reference_counts);

        log::debug!(
            "Decoded {} entities and {} libraries from {} records, {} bytes",
            self.registry.len(),
            self.libraries.len(),
            records,
            self.reader.pos()
        );

        Ok((self.registry, self.libraries))
    }

    /// One record step: either produce a pending null, or read and dispatch one record.
    ///
    /// # Arguments
    /// * `parent` - The entity whose member or slot is being decoded, `None` at top level
    fn parse_record(&mut self, parent: Option<ObjectId>) -> Result<Outcome> {
        if self.nulls.take() {
            return Ok(Outcome::Null);
        }

        let offset = self.reader.pos();
        let tag = self.reader.read_le::<u8>()?;
        let record =
            RecordType::from_repr(tag).ok_or(Error::UnknownRecordType { tag, offset })?;

        log::trace!("{:?} at offset {}", record, offset);

        let kind = match record {
            RecordType::SerializedStreamHeader => {
                let header = SerializationHeader {
                    root_id: self.reader.read_le::<i32>()?,
                    header_id: self.reader.read_le::<i32>()?,
                    major_version: self.reader.read_le::<i32>()?,
                    minor_version: self.reader.read_le::<i32>()?,
                };
                if self.registry.header().is_some() {
                    return Err(malformed_error!(
                        "Second stream header at offset {}",
                        offset
                    ));
                }
                self.registry.set_header(header);
                return Ok(Outcome::Header);
            }
            RecordType::ClassWithId => self.read_class_with_id(offset)?,
            RecordType::SystemClassWithMembers
            | RecordType::ClassWithMembers
            | RecordType::SystemClassWithMembersAndTypes
            | RecordType::ClassWithMembersAndTypes => self.read_class(record, offset)?,
            RecordType::BinaryObjectString => {
                let object_id = self.reader.read_le::<i32>()?;
                let value = self.reader.read_prefixed_string_utf8()?;
                (object_id, EntityKind::String(StringRecord { value }))
            }
            RecordType::BinaryArray => self.read_binary_array()?,
            RecordType::ArraySinglePrimitive => self.read_array_single_primitive()?,
            RecordType::ArraySingleObject => self.read_array_single(
                record,
                TypeDescriptor::ObjectArray,
                TypeDescriptor::Object,
            )?,
            RecordType::ArraySingleString => self.read_array_single(
                record,
                TypeDescriptor::StringArray,
                TypeDescriptor::String,
            )?,
            RecordType::MemberReference => {
                let id = self.reader.read_le::<i32>()?;
                let count = self.reference_counts.entry(id).or_insert(0);
                *count = count.saturating_add(1);
                return Ok(Outcome::Reference(id));
            }
            RecordType::ObjectNull => return Ok(Outcome::Null),
            RecordType::ObjectNullMultiple256 => {
                let count = self.reader.read_le::<u8>()?;
                self.nulls.start(u32::from(count))?;
                return Ok(Outcome::Null);
            }
            RecordType::ObjectNullMultiple => {
                let count = self.reader.read_le::<i32>()?;
                let count = u32::try_from(count).map_err(|_| {
                    malformed_error!("Negative null count {} at offset {}", count, offset)
                })?;
                self.nulls.start(count)?;
                return Ok(Outcome::Null);
            }
            RecordType::BinaryLibrary => {
                let library_id = self.reader.read_le::<i32>()?;
                let name = self.reader.read_prefixed_string_utf8()?;
                self.libraries.insert(Library {
                    library_id,
                    name,
                    offset,
                    record_length: self.reader.pos() - offset,
                })?;
                return Ok(Outcome::Library);
            }
            RecordType::MessageEnd => return Ok(Outcome::End),
            RecordType::MemberPrimitiveTyped | RecordType::MethodCall | RecordType::MethodReturn => {
                return Err(Error::UnsupportedRecordType { record, offset })
            }
        };

        let (object_id, kind) = kind;
        let entity = Entity {
            object_id,
            parent_id: parent,
            offset,
            record_length: self.reader.pos() - offset,
            kind,
        };

        log::trace!(
            "Registered object {} ({} bytes at offset {})",
            object_id,
            entity.record_length,
            offset
        );

        self.registry.insert(entity)?;
        Ok(Outcome::Entity(object_id))
    }

    /// Decode one member or slot value of `owner`.
    fn read_value(&mut self, ty: Option<&TypeDescriptor>, owner: ObjectId) -> Result<Value> {
        match ty {
            Some(TypeDescriptor::Primitive(kind)) => Ok(Value::Primitive(PrimitiveValue::read(
                *kind,
                &mut self.reader,
            )?)),
            _ => self.read_record_value(owner),
        }
    }

    /// Decode a value that is encoded as a record of its own.
    fn read_record_value(&mut self, owner: ObjectId) -> Result<Value> {
        if self.depth >= self.config.max_depth {
            return Err(Error::RecursionLimit(self.config.max_depth));
        }

        self.depth += 1;
        let value = self.read_record_value_inner(owner);
        self.depth -= 1;
        value
    }

    fn read_record_value_inner(&mut self, owner: ObjectId) -> Result<Value> {
        loop {
            let offset = self.reader.pos();
            match self.parse_record(Some(owner))? {
                Outcome::Entity(id) | Outcome::Reference(id) => return Ok(Value::Reference(id)),
                Outcome::Null => return Ok(Value::Null),
                // Libraries may be declared right before the first class that needs them
                Outcome::Library => {}
                Outcome::Header => {
                    return Err(malformed_error!(
                        "Stream header inside the value of object {} at offset {}",
                        owner,
                        offset
                    ))
                }
                Outcome::End => {
                    return Err(malformed_error!(
                        "End of stream inside the value of object {} at offset {}",
                        owner,
                        offset
                    ))
                }
            }
        }
    }

    /// `ClassWithId`: a new instance reusing the schema of an earlier one.
    fn read_class_with_id(&mut self, offset: u64) -> Result<(ObjectId, EntityKind)> {
        let object_id = self.reader.read_le::<i32>()?;
        let metadata_id = self.reader.read_le::<i32>()?;

        let schema = match self.registry.schema(metadata_id) {
            Some(schema) => Arc::clone(schema),
            None => {
                return Err(Error::DanglingReference {
                    id: metadata_id,
                    offset: Some(offset),
                })
            }
        };
        self.registry
            .register_schema(object_id, Arc::clone(&schema), offset)?;

        let values = self.read_members(&schema, object_id)?;
        Ok((
            object_id,
            EntityKind::Class(ClassRecord {
                schema,
                values,
                metadata_id: Some(metadata_id),
                reference_count: 0,
            }),
        ))
    }

    /// The four records that declare a class schema and carry the first instance.
    fn read_class(&mut self, record: RecordType, offset: u64) -> Result<(ObjectId, EntityKind)> {
        let object_id = self.reader.read_le::<i32>()?;
        let name = self.reader.read_prefixed_string_utf8()?;

        let member_count = self.reader.read_le::<i32>()?;
        let member_count = usize::try_from(member_count).map_err(|_| {
            malformed_error!(
                "Negative member count {} for class '{}' at offset {}",
                member_count,
                name,
                offset
            )
        })?;

        let mut names = Vec::new();
        for _ in 0..member_count {
            names.push(self.reader.read_prefixed_string_utf8()?);
        }

        let types = if matches!(
            record,
            RecordType::SystemClassWithMembersAndTypes | RecordType::ClassWithMembersAndTypes
        ) {
            let mut binary_types = Vec::with_capacity(names.len());
            for _ in 0..names.len() {
                binary_types.push(BinaryType::read(&mut self.reader)?);
            }

            let mut types = Vec::with_capacity(names.len());
            for binary_type in binary_types {
                types.push(Some(TypeDescriptor::read_additional_info(
                    binary_type,
                    &mut self.reader,
                )?));
            }
            types
        } else {
            vec![None; names.len()]
        };

        let library_id = if matches!(
            record,
            RecordType::ClassWithMembers | RecordType::ClassWithMembersAndTypes
        ) {
            Some(self.read_library_id()?)
        } else {
            None
        };

        let schema = Arc::new(ClassSchema {
            object_id,
            name,
            library_id,
            members: names
                .into_iter()
                .zip(types)
                .map(|(name, ty)| MemberSchema { name, ty })
                .collect(),
            record_type: record,
        });
        self.registry
            .register_schema(object_id, Arc::clone(&schema), offset)?;

        let values = self.read_members(&schema, object_id)?;
        Ok((
            object_id,
            EntityKind::Class(ClassRecord {
                schema,
                values,
                metadata_id: None,
                reference_count: 0,
            }),
        ))
    }

    fn read_library_id(&mut self) -> Result<LibraryId> {
        let offset = self.reader.pos();
        let library_id = self.reader.read_le::<i32>()?;
        if self.config.verify_libraries && !self.libraries.contains(library_id) {
            return Err(Error::DanglingReference {
                id: library_id,
                offset: Some(offset),
            });
        }
        Ok(library_id)
    }

    /// Decode one value per schema member, in declaration order.
    fn read_members(&mut self, schema: &ClassSchema, object_id: ObjectId) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(schema.members.len());
        for member in &schema.members {
            values.push(self.read_value(member.ty.as_ref(), object_id)?);
        }
        Ok(values)
    }

    /// Read a signed length or rank and reject negative values.
    fn read_length(&mut self, what: &str) -> Result<usize> {
        let offset = self.reader.pos();
        let value = self.reader.read_le::<i32>()?;
        usize::try_from(value)
            .map_err(|_| malformed_error!("Negative {} {} at offset {}", what, value, offset))
    }

    fn check_slots(&self, lengths: &[usize], offset: u64) -> Result<usize> {
        let slots = lengths
            .iter()
            .try_fold(1usize, |acc, &length| acc.checked_mul(length))
            .filter(|&slots| slots <= self.config.max_array_slots);

        slots.ok_or_else(|| {
            malformed_error!(
                "Array dimensions {:?} at offset {} exceed the limit of {} slots",
                lengths,
                offset,
                self.config.max_array_slots
            )
        })
    }

    /// `BinaryArray`: the generic array record, any shape and element type.
    fn read_binary_array(&mut self) -> Result<(ObjectId, EntityKind)> {
        let object_id = self.reader.read_le::<i32>()?;

        let shape_offset = self.reader.pos();
        let shape = self.reader.read_le::<u8>()?;
        let array_type = BinaryArrayType::from_repr(shape).ok_or_else(|| {
            malformed_error!(
                "Invalid binary array type 0x{:02X} at offset {}",
                shape,
                shape_offset
            )
        })?;

        let rank_offset = self.reader.pos();
        let rank = self.read_length("array rank")?;
        if rank == 0 || rank > MAX_ARRAY_RANK {
            return Err(malformed_error!(
                "Invalid array rank {} at offset {}",
                rank,
                rank_offset
            ));
        }

        let mut lengths = Vec::with_capacity(rank);
        for _ in 0..rank {
            lengths.push(self.read_length("array length")?);
        }

        let lower_bounds = if array_type.has_lower_bounds() {
            let mut bounds = Vec::with_capacity(rank);
            for _ in 0..rank {
                bounds.push(self.reader.read_le::<i32>()?);
            }
            Some(bounds)
        } else {
            None
        };

        let binary_type = BinaryType::read(&mut self.reader)?;
        let element_type = TypeDescriptor::read_additional_info(binary_type, &mut self.reader)?;

        let slots = self.check_slots(&lengths, rank_offset)?;
        let mut values = Vec::new();
        for _ in 0..slots {
            values.push(self.read_value(Some(&element_type), object_id)?);
        }

        Ok((
            object_id,
            EntityKind::Array(ArrayRecord {
                array_type,
                rank,
                lengths,
                lower_bounds,
                element_type,
                values,
                record_type: RecordType::BinaryArray,
            }),
        ))
    }

    /// `ArraySinglePrimitive`: a one dimensional array of inline primitives.
    fn read_array_single_primitive(&mut self) -> Result<(ObjectId, EntityKind)> {
        let object_id = self.reader.read_le::<i32>()?;
        let length_offset = self.reader.pos();
        let length = self.read_length("array length")?;
        let slots = self.check_slots(&[length], length_offset)?;
        let kind = PrimitiveType::read(&mut self.reader)?;

        let mut values = Vec::new();
        for _ in 0..slots {
            values.push(Value::Primitive(PrimitiveValue::read(kind, &mut self.reader)?));
        }

        Ok((
            object_id,
            EntityKind::Array(ArrayRecord {
                array_type: BinaryArrayType::Single,
                rank: 1,
                lengths: vec![length],
                lower_bounds: None,
                element_type: TypeDescriptor::Primitive(kind),
                values,
                record_type: RecordType::ArraySinglePrimitive,
            }),
        ))
    }

    /// `ArraySingleObject` and `ArraySingleString`: one dimensional arrays whose slots are
    /// records.
    fn read_array_single(
        &mut self,
        record: RecordType,
        array_kind: TypeDescriptor,
        element_type: TypeDescriptor,
    ) -> Result<(ObjectId, EntityKind)> {
        let object_id = self.reader.read_le::<i32>()?;
        let length_offset = self.reader.pos();
        let length = self.read_length("array length")?;
        let slots = self.check_slots(&[length], length_offset)?;

        log::warn!(
            "Decoding {} of object {} ({} slots); this record kind has limited producer coverage",
            array_kind,
            object_id,
            slots
        );

        let mut values = Vec::new();
        for _ in 0..slots {
            values.push(self.read_value(Some(&element_type), object_id)?);
        }

        Ok((
            object_id,
            EntityKind::Array(ArrayRecord {
                array_type: BinaryArrayType::Single,
                rank: 1,
                lengths: vec![length],
                lower_bounds: None,
                element_type,
                values,
                record_type: record,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{point_stream, StreamBuilder};

    fn decode(data: &[u8]) -> Result<(ObjectRegistry, LibraryTable)> {
        Decoder::new(data, DecoderConfig::default()).decode()
    }

    #[test]
    fn test_point() {
        let (registry, libraries) = decode(&point_stream()).unwrap();

        assert!(registry.is_complete());
        assert_eq!(registry.len(), 1);
        assert_eq!(libraries.len(), 1);
        assert_eq!(registry.header().unwrap().root_id, 1);

        let point = registry.root().unwrap();
        assert_eq!(point.object_id, 1);
        assert!(point.is_top_level());

        let class = point.as_class().unwrap();
        assert_eq!(class.name(), "Point");
        assert_eq!(class.library_id(), Some(2));
        assert_eq!(class.reference_count, 0);
        assert_eq!(
            class.member("x").unwrap().value,
            &Value::Primitive(PrimitiveValue::Int32(3))
        );
        assert_eq!(
            class.member("y").unwrap().value,
            &Value::Primitive(PrimitiveValue::Int32(4))
        );
    }

    #[test]
    fn test_record_lengths() {
        let data = point_stream();
        let (registry, libraries) = decode(&data).unwrap();

        let library = libraries.get(2).unwrap();
        let point = registry.get(1).unwrap();

        assert_eq!(library.offset, 17);
        assert_eq!(point.offset, library.offset + library.record_length);
        // Everything but the trailing MessageEnd tag
        assert_eq!(point.offset + point.record_length, data.len() as u64 - 1);
    }

    #[test]
    fn test_null_run_consumes_no_bytes() {
        let members = ["a", "b", "c", "d", "e"];
        let class_start = StreamBuilder::new().header(1).len() as u64;
        let data = StreamBuilder::new()
            .header(1)
            .class_header(RecordType::SystemClassWithMembersAndTypes, 1, "Five", &members)
            .bytes(&[2, 2, 2, 2, 2])
            .null_multiple_256(5)
            .end()
            .build();

        let (registry, _) = decode(&data).unwrap();
        let entity = registry.get(1).unwrap();
        let class = entity.as_class().unwrap();

        assert_eq!(class.values, vec![Value::Null; 5]);
        // The whole run is the two bytes of the record
        assert_eq!(entity.offset, class_start);
        assert_eq!(
            entity.offset + entity.record_length,
            data.len() as u64 - 1
        );
    }

    #[test]
    fn test_null_run_in_array() {
        let data = StreamBuilder::new()
            .header(1)
            .record(RecordType::BinaryArray)
            .i32(1)
            .u8(BinaryArrayType::Single as u8)
            .i32(1)
            .i32(4)
            .u8(BinaryType::String as u8)
            .object_string(2, "first")
            .null_multiple(2)
            .reference(2)
            .end()
            .build();

        let (registry, _) = decode(&data).unwrap();
        let array = registry.get(1).unwrap().as_array().unwrap();
        assert_eq!(
            array.values,
            vec![
                Value::Reference(2),
                Value::Null,
                Value::Null,
                Value::Reference(2)
            ]
        );
        assert_eq!(registry.get(2).unwrap().parent_id, Some(1));
    }

    #[test]
    fn test_empty_null_run() {
        let data = StreamBuilder::new().header(1).null_multiple_256(0).end().build();
        assert!(matches!(decode(&data), Err(Error::Malformed { .. })));

        let data = StreamBuilder::new().header(1).null_multiple(-3).end().build();
        assert!(matches!(decode(&data), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_cycle() {
        let data = StreamBuilder::new()
            .header(1)
            .class_header(RecordType::SystemClassWithMembersAndTypes, 1, "Node", &["next"])
            .u8(BinaryType::Object as u8)
            .reference(1)
            .end()
            .build();

        let (registry, _) = decode(&data).unwrap();
        let node = registry.get(1).unwrap();
        let class = node.as_class().unwrap();

        assert_eq!(class.values, vec![Value::Reference(1)]);
        assert_eq!(class.reference_count, 1);
        assert_eq!(registry.resolve(1).unwrap().object_id, 1);
    }

    #[test]
    fn test_forward_reference() {
        let data = StreamBuilder::new()
            .header(1)
            .class_header(RecordType::SystemClassWithMembersAndTypes, 1, "Holder", &["s"])
            .u8(BinaryType::String as u8)
            .reference(5)
            .object_string(5, "later")
            .end()
            .build();

        let (registry, _) = decode(&data).unwrap();
        assert_eq!(registry.get(5).unwrap().parent_id, None);
        assert_eq!(registry.top_level().count(), 2);
    }

    #[test]
    fn test_dangling_reference_verification() {
        let data = StreamBuilder::new()
            .header(1)
            .class_header(RecordType::SystemClassWithMembersAndTypes, 1, "Holder", &["s"])
            .u8(BinaryType::Object as u8)
            .reference(9)
            .end()
            .build();

        assert!(matches!(
            decode(&data),
            Err(Error::DanglingReference {
                id: 9,
                offset: Some(17)
            })
        ));

        let (registry, _) = Decoder::new(&data[..], DecoderConfig::permissive())
            .decode()
            .unwrap();
        assert_eq!(registry.dangling_references().count(), 1);
    }

    #[test]
    fn test_schema_reuse() {
        let data = StreamBuilder::new()
            .header(1)
            .library(2, "Geometry")
            .record(RecordType::BinaryArray)
            .i32(1)
            .u8(BinaryArrayType::Single as u8)
            .i32(1)
            .i32(2)
            .u8(BinaryType::Class as u8)
            .string("Point")
            .i32(2)
            .class_header(RecordType::ClassWithMembersAndTypes, 3, "Point", &["x", "y"])
            .bytes(&[0, 0])
            .primitive_type(PrimitiveType::Int32)
            .primitive_type(PrimitiveType::Int32)
            .i32(2)
            .i32(1)
            .i32(2)
            .class_with_id(4, 3)
            .i32(5)
            .i32(6)
            .end()
            .build();

        let (registry, _) = decode(&data).unwrap();
        let first = registry.get(3).unwrap().as_class().unwrap();
        let second = registry.get(4).unwrap().as_class().unwrap();

        assert_eq!(first.name(), "Point");
        assert_eq!(second.name(), "Point");
        assert_eq!(second.metadata_id, Some(3));
        assert!(Arc::ptr_eq(&first.schema, &second.schema));
        assert_eq!(
            second.member("y").unwrap().value,
            &Value::Primitive(PrimitiveValue::Int32(6))
        );
        assert_eq!(
            first.member("y").unwrap().value,
            &Value::Primitive(PrimitiveValue::Int32(2))
        );
        assert_eq!(registry.children_of(1).count(), 2);
    }

    #[test]
    fn test_schema_reuse_inside_declaring_instance() {
        // Node { next: Node { next: null } } where the inner node reuses the outer schema
        let data = StreamBuilder::new()
            .header(1)
            .class_header(RecordType::SystemClassWithMembersAndTypes, 1, "Node", &["next"])
            .u8(BinaryType::SystemClass as u8)
            .string("Node")
            .class_with_id(2, 1)
            .null()
            .end()
            .build();

        let (registry, _) = decode(&data).unwrap();
        let inner = registry.get(2).unwrap();
        assert_eq!(inner.parent_id, Some(1));
        assert_eq!(inner.as_class().unwrap().values, vec![Value::Null]);
        assert_eq!(registry.iter().map(|e| e.object_id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn test_missing_schema_source() {
        let data = StreamBuilder::new().header(1).class_with_id(2, 7).end().build();
        assert!(matches!(
            decode(&data),
            Err(Error::DanglingReference {
                id: 7,
                offset: Some(17)
            })
        ));
    }

    #[test]
    fn test_missing_library() {
        let data = StreamBuilder::new()
            .header(1)
            .class_header(RecordType::ClassWithMembers, 1, "Empty", &[])
            .i32(4)
            .end()
            .build();

        assert!(matches!(
            decode(&data),
            Err(Error::DanglingReference { id: 4, .. })
        ));

        let (registry, _) = Decoder::new(&data[..], DecoderConfig::permissive())
            .decode()
            .unwrap();
        assert_eq!(registry.get(1).unwrap().as_class().unwrap().library_id(), Some(4));
    }

    #[test]
    fn test_untyped_members() {
        let data = StreamBuilder::new()
            .header(1)
            .library(2, "Lib")
            .class_header(RecordType::ClassWithMembers, 1, "Pair", &["left", "right"])
            .i32(2)
            .object_string(3, "l")
            .null()
            .end()
            .build();

        let (registry, _) = decode(&data).unwrap();
        let class = registry.get(1).unwrap().as_class().unwrap();
        assert!(class.members().all(|member| member.ty.is_none()));
        assert_eq!(class.values, vec![Value::Reference(3), Value::Null]);
    }

    #[test]
    fn test_nested_library_is_skipped() {
        let data = StreamBuilder::new()
            .header(1)
            .class_header(RecordType::SystemClassWithMembersAndTypes, 1, "Box", &["item"])
            .u8(BinaryType::Object as u8)
            .library(2, "Lib")
            .class_header(RecordType::ClassWithMembers, 3, "Item", &[])
            .i32(2)
            .end()
            .build();

        let (registry, libraries) = decode(&data).unwrap();
        assert!(libraries.contains(2));
        assert_eq!(
            registry.get(1).unwrap().as_class().unwrap().values,
            vec![Value::Reference(3)]
        );
    }

    #[test]
    fn test_duplicate_identifiers() {
        let data = StreamBuilder::new()
            .header(1)
            .object_string(1, "a")
            .object_string(1, "b")
            .end()
            .build();
        assert!(matches!(
            decode(&data),
            Err(Error::DuplicateIdentifier { id: 1, .. })
        ));

        let data = StreamBuilder::new()
            .header(1)
            .library(2, "a")
            .library(2, "b")
            .end()
            .build();
        assert!(matches!(
            decode(&data),
            Err(Error::DuplicateIdentifier { id: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_record_type() {
        assert!(matches!(
            decode(&[99]),
            Err(Error::UnknownRecordType {
                tag: 99,
                offset: 0
            })
        ));

        let data = StreamBuilder::new().header(1).u8(19).build();
        assert!(matches!(
            decode(&data),
            Err(Error::UnknownRecordType {
                tag: 19,
                offset: 17
            })
        ));
    }

    #[test]
    fn test_unsupported_record_types() {
        for record in [
            RecordType::MethodCall,
            RecordType::MethodReturn,
            RecordType::MemberPrimitiveTyped,
        ] {
            let data = StreamBuilder::new().header(1).record(record).build();
            match decode(&data) {
                Err(Error::UnsupportedRecordType { record: found, offset }) => {
                    assert_eq!(found, record);
                    assert_eq!(offset, 17);
                }
                other => panic!("unexpected result for {record:?}: {:?}", other.map(|_| ())),
            }
        }
    }

    #[test]
    fn test_premature_end() {
        let data = point_stream();
        for cut in [0, 5, 20, data.len() - 5, data.len() - 1] {
            let result = decode(&data[..cut]);
            assert!(
                matches!(result, Err(Error::PrematureEndOfStream { .. })),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_end_inside_value() {
        let data = StreamBuilder::new()
            .header(1)
            .class_header(RecordType::SystemClassWithMembersAndTypes, 1, "Box", &["item"])
            .u8(BinaryType::Object as u8)
            .end()
            .build();
        assert!(matches!(decode(&data), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_second_header() {
        let data = StreamBuilder::new()
            .header(1)
            .object_string(1, "first")
            .header(2)
            .end()
            .build();

        match decode(&data) {
            Err(Error::Malformed { message, .. }) => {
                assert!(message.contains("offset 28"), "{message}");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_recursion_limit() {
        let depth = 40;
        let mut builder = StreamBuilder::new().header(1);
        for id in 1..=depth {
            builder = builder
                .class_header(RecordType::SystemClassWithMembersAndTypes, id, "Node", &["next"])
                .u8(BinaryType::Object as u8);
        }
        let data = builder.null().end().build();

        let config = DecoderConfig {
            max_depth: 16,
            ..DecoderConfig::default()
        };
        assert!(matches!(
            Decoder::new(&data[..], config).decode(),
            Err(Error::RecursionLimit(16))
        ));

        let (registry, _) = decode(&data).unwrap();
        assert_eq!(registry.len(), depth as usize);
        assert_eq!(registry.top_level().count(), 1);
    }

    #[test]
    fn test_rectangular_offset_array() {
        let data = StreamBuilder::new()
            .header(1)
            .record(RecordType::BinaryArray)
            .i32(1)
            .u8(BinaryArrayType::RectangularOffset as u8)
            .i32(2)
            .i32(2)
            .i32(3)
            .i32(1)
            .i32(-1)
            .u8(BinaryType::Primitive as u8)
            .primitive_type(PrimitiveType::Int16)
            .bytes(&[0, 0, 1, 0, 2, 0, 3, 0, 4, 0, 5, 0])
            .end()
            .build();

        let (registry, _) = decode(&data).unwrap();
        let array = registry.get(1).unwrap().as_array().unwrap();

        assert_eq!(array.rank, 2);
        assert_eq!(array.lengths, vec![2, 3]);
        assert_eq!(array.lower_bounds, Some(vec![1, -1]));
        assert_eq!(array.slot_count(), 6);
        assert_eq!(
            array.get(&[2, 0]),
            Some(&Value::Primitive(PrimitiveValue::Int16(4)))
        );
    }

    #[test]
    fn test_jagged_array() {
        let data = StreamBuilder::new()
            .header(1)
            .record(RecordType::BinaryArray)
            .i32(1)
            .u8(BinaryArrayType::Jagged as u8)
            .i32(1)
            .i32(2)
            .u8(BinaryType::PrimitiveArray as u8)
            .primitive_type(PrimitiveType::Byte)
            .array_single_primitive(2, PrimitiveType::Byte, 2)
            .bytes(&[7, 8])
            .null()
            .end()
            .build();

        let (registry, _) = decode(&data).unwrap();
        let outer = registry.get(1).unwrap().as_array().unwrap();
        assert_eq!(outer.array_type, BinaryArrayType::Jagged);
        assert_eq!(
            outer.element_type,
            TypeDescriptor::PrimitiveArray(PrimitiveType::Byte)
        );
        assert_eq!(outer.values, vec![Value::Reference(2), Value::Null]);

        let inner = registry.get(2).unwrap();
        assert_eq!(inner.parent_id, Some(1));
        assert_eq!(inner.as_array().unwrap().record_type, RecordType::ArraySinglePrimitive);
    }

    #[test]
    fn test_invalid_arrays() {
        let negative = StreamBuilder::new()
            .header(1)
            .array_single_primitive(1, PrimitiveType::Int32, -1)
            .build();
        assert!(matches!(decode(&negative), Err(Error::Malformed { .. })));

        let rank = StreamBuilder::new()
            .header(1)
            .record(RecordType::BinaryArray)
            .i32(1)
            .u8(BinaryArrayType::Rectangular as u8)
            .i32(0)
            .build();
        assert!(matches!(decode(&rank), Err(Error::Malformed { .. })));

        let shape = StreamBuilder::new()
            .header(1)
            .record(RecordType::BinaryArray)
            .i32(1)
            .u8(9)
            .build();
        assert!(matches!(decode(&shape), Err(Error::Malformed { .. })));

        let huge = StreamBuilder::new()
            .header(1)
            .record(RecordType::BinaryArray)
            .i32(1)
            .u8(BinaryArrayType::Rectangular as u8)
            .i32(2)
            .i32(i32::MAX)
            .i32(i32::MAX)
            .u8(BinaryType::Object as u8)
            .build();
        assert!(matches!(decode(&huge), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_array_single_object() {
        let data = StreamBuilder::new()
            .header(1)
            .record(RecordType::ArraySingleObject)
            .i32(1)
            .i32(3)
            .object_string(2, "two")
            .reference(1)
            .null()
            .end()
            .build();

        let (registry, _) = decode(&data).unwrap();
        let array = registry.get(1).unwrap().as_array().unwrap();
        assert_eq!(array.record_type, RecordType::ArraySingleObject);
        assert_eq!(array.element_type, TypeDescriptor::Object);
        assert_eq!(
            array.values,
            vec![Value::Reference(2), Value::Reference(1), Value::Null]
        );
    }

    #[test]
    fn test_array_single_string() {
        let data = StreamBuilder::new()
            .header(1)
            .record(RecordType::ArraySingleString)
            .i32(1)
            .i32(4)
            .object_string(2, "a")
            .null_multiple_256(2)
            .reference(2)
            .end()
            .build();

        let (registry, _) = decode(&data).unwrap();
        let array = registry.get(1).unwrap().as_array().unwrap();
        assert_eq!(array.element_type, TypeDescriptor::String);
        assert_eq!(array.values.iter().filter(|v| v.is_null()).count(), 2);
        assert_eq!(registry.strings().count(), 1);
    }

    #[test]
    fn test_trailing_bytes_unread() {
        let mut data = point_stream();
        data.extend_from_slice(&[1, 2, 3]);

        let mut source = &data[..];
        let decoder = Decoder::new(&mut source, DecoderConfig::default());
        decoder.decode().unwrap();
        assert_eq!(source, &[1, 2, 3]);
    }
}
