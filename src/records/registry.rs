//! Identifier-keyed storage for decoded entities and libraries.
//!
//! This module provides the two tables a decode pass produces:
//!
//! - [`ObjectRegistry`] - every decoded [`Entity`] keyed by its object identifier, the class
//!   schemas available for reuse, the stream header and the end-of-stream flag
//! - [`LibraryTable`] - every [`Library`] keyed by its library identifier
//!
//! # Insert-once semantics
//!
//! Object identifiers are assigned by the producer and are unique across the whole stream.
//! Both tables refuse a second insertion under an existing identifier with
//! [`crate::Error::DuplicateIdentifier`]. Reusing the schema of an earlier class instance is a
//! lookup, not a reinsertion: the reusing instance is stored under its own new identifier.
//!
//! # Ordering
//!
//! Iteration follows insertion order. The decoder inserts an entity once it has been fully
//! read, so nested entities appear before the entity that contains them.
//!
//! # Examples
//!
//! ```rust
//! use nrbfscope::decode_bytes;
//!
//! // Header, BinaryObjectString id 1 "hi", MessageEnd
//! let data = [
//!     0x00, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
//!     0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x06, 0x01, 0x00, 0x00, 0x00, 0x02, b'h', b'i',
//!     0x0B,
//! ];
//!
//! let (registry, _libraries) = decode_bytes(&data)?;
//! assert!(registry.is_complete());
//! assert_eq!(registry.resolve(1)?.as_string(), Some("hi"));
//! # Ok::<(), nrbfscope::Error>(())
//! ```

use std::collections::{hash_map::Entry, HashMap};

use crate::{
    records::{
        ArrayRecord, ClassRecord, ClassSchemaRc, Entity, EntityKind, Library, LibraryId,
        ObjectId, SerializationHeader,
    },
    Error, Result,
};

/// Maximum number of `ClassWithId` hops followed when resolving a schema source.
const MAX_SCHEMA_CHAIN: usize = 64;

/// The decoded object graph of one NRBF stream.
#[derive(Debug, Default, Clone)]
pub struct ObjectRegistry {
    /// Entities keyed by object id
    entities: HashMap<ObjectId, Entity>,
    /// Object ids in insertion order
    order: Vec<ObjectId>,
    /// Class schemas keyed by the id of the instance that carries them
    schemas: HashMap<ObjectId, ClassSchemaRc>,
    /// The stream header, if one was present
    header: Option<SerializationHeader>,
    /// Set once the end-of-stream record has been observed
    complete: bool,
}

impl ObjectRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully decoded entity.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateIdentifier`] if an entity with the same id already exists.
    pub fn insert(&mut self, entity: Entity) -> Result<()> {
        match self.entities.entry(entity.object_id) {
            Entry::Occupied(_) => Err(Error::DuplicateIdentifier {
                id: entity.object_id,
                offset: entity.offset,
            }),
            Entry::Vacant(slot) => {
                self.order.push(entity.object_id);
                slot.insert(entity);
                Ok(())
            }
        }
    }

    /// Make a class schema available for reuse under the id of the instance that carries it.
    ///
    /// Schemas are registered as soon as the class header has been read, before any member
    /// value, so that instances nested inside the declaring instance can reuse it. A
    /// `ClassWithId` instance registers the schema it reused under its own id as well.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateIdentifier`] if `id` is already taken by a schema or an entity.
    pub fn register_schema(
        &mut self,
        id: ObjectId,
        schema: ClassSchemaRc,
        offset: u64,
    ) -> Result<()> {
        if self.entities.contains_key(&id) {
            return Err(Error::DuplicateIdentifier { id, offset });
        }

        match self.schemas.entry(id) {
            Entry::Occupied(_) => Err(Error::DuplicateIdentifier { id, offset }),
            Entry::Vacant(slot) => {
                slot.insert(schema);
                Ok(())
            }
        }
    }

    /// Look up the schema carried by the instance with the given id.
    #[must_use]
    pub fn schema(&self, id: ObjectId) -> Option<&ClassSchemaRc> {
        self.schemas.get(&id)
    }

    /// Get an entity by id.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get an entity by id, failing if it was never registered.
    ///
    /// # Errors
    /// Returns [`Error::DanglingReference`] if no entity has the given id.
    pub fn resolve(&self, id: ObjectId) -> Result<&Entity> {
        self.get(id).ok_or(Error::DanglingReference { id, offset: None })
    }

    /// Returns `true` if an entity with the given id exists.
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Iterate all entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if no entity was decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate the entities that were not reached through another entity.
    pub fn top_level(&self) -> impl Iterator<Item = &Entity> {
        self.iter().filter(|entity| entity.is_top_level())
    }

    /// Iterate the entities decoded while reading a member or slot of `parent`.
    pub fn children_of(&self, parent: ObjectId) -> impl Iterator<Item = &Entity> {
        self.iter().filter(move |entity| entity.parent_id == Some(parent))
    }

    /// Iterate all class instances with their ids.
    pub fn classes(&self) -> impl Iterator<Item = (ObjectId, &ClassRecord)> {
        self.iter()
            .filter_map(|entity| entity.as_class().map(|class| (entity.object_id, class)))
    }

    /// Iterate all arrays with their ids.
    pub fn arrays(&self) -> impl Iterator<Item = (ObjectId, &ArrayRecord)> {
        self.iter()
            .filter_map(|entity| entity.as_array().map(|array| (entity.object_id, array)))
    }

    /// Iterate all string objects with their ids.
    pub fn strings(&self) -> impl Iterator<Item = (ObjectId, &str)> {
        self.iter()
            .filter_map(|entity| entity.as_string().map(|string| (entity.object_id, string)))
    }

    /// Follow the schema-source chain of a class instance to the instance that declared the
    /// metadata.
    ///
    /// Returns the instance itself if it declared its own schema, or `None` if a link of the
    /// chain is missing, is not a class, or the chain does not terminate.
    #[must_use]
    pub fn schema_source(&self, id: ObjectId) -> Option<&ClassRecord> {
        let mut current = self.get(id)?.as_class()?;
        for _ in 0..MAX_SCHEMA_CHAIN {
            match current.metadata_id {
                None => return Some(current),
                Some(source) => current = self.get(source)?.as_class()?,
            }
        }
        None
    }

    /// Iterate `(owner, target)` pairs for every stored reference whose target was never
    /// registered.
    pub fn dangling_references(&self) -> impl Iterator<Item = (ObjectId, ObjectId)> + '_ {
        self.iter().flat_map(move |entity| {
            entity
                .references()
                .filter(move |target| !self.contains(*target))
                .map(move |target| (entity.object_id, target))
        })
    }

    /// The stream header, if the stream carried one.
    #[must_use]
    pub fn header(&self) -> Option<&SerializationHeader> {
        self.header.as_ref()
    }

    /// The root object of the graph as named by the stream header.
    #[must_use]
    pub fn root(&self) -> Option<&Entity> {
        self.header.and_then(|header| self.get(header.root_id))
    }

    /// Returns `true` once the end-of-stream record has been observed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub(crate) fn set_header(&mut self, header: SerializationHeader) {
        self.header = Some(header);
    }

    /// Store the accumulated `MemberReference` counts and mark the registry complete.
    pub(crate) fn finish(&mut self, reference_counts: &HashMap<ObjectId, u32>) {
        for (id, count) in reference_counts {
            if let Some(Entity {
                kind: EntityKind::Class(class),
                ..
            }) = self.entities.get_mut(id)
            {
                class.reference_count = *count;
            }
        }
        self.complete = true;
    }
}

/// The libraries (assemblies) declared by one NRBF stream.
#[derive(Debug, Default, Clone)]
pub struct LibraryTable {
    libraries: HashMap<LibraryId, Library>,
    order: Vec<LibraryId>,
}

impl LibraryTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateIdentifier`] if the library id is already registered.
    pub fn insert(&mut self, library: Library) -> Result<()> {
        match self.libraries.entry(library.library_id) {
            Entry::Occupied(_) => Err(Error::DuplicateIdentifier {
                id: library.library_id,
                offset: library.offset,
            }),
            Entry::Vacant(slot) => {
                self.order.push(library.library_id);
                slot.insert(library);
                Ok(())
            }
        }
    }

    /// Get a library by id.
    #[must_use]
    pub fn get(&self, id: LibraryId) -> Option<&Library> {
        self.libraries.get(&id)
    }

    /// Get a library by id, failing if it was never registered.
    ///
    /// # Errors
    /// Returns [`Error::DanglingReference`] if no library has the given id.
    pub fn resolve(&self, id: LibraryId) -> Result<&Library> {
        self.get(id).ok_or(Error::DanglingReference { id, offset: None })
    }

    /// Returns `true` if a library with the given id exists.
    #[must_use]
    pub fn contains(&self, id: LibraryId) -> bool {
        self.libraries.contains_key(&id)
    }

    /// Iterate all libraries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Library> {
        self.order.iter().filter_map(|id| self.libraries.get(id))
    }

    /// Number of libraries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    /// Returns `true` if the stream declared no library.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}
