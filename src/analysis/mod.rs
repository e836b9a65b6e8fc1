//! Statistics over a decoded object graph.
//!
//! The analyzer is a pure pass over a completed [`ObjectRegistry`]: it never touches the byte
//! stream and never fails. It tallies top-level entities by kind and top-level class instances
//! by class name, so that the bytes of a stream can be attributed to the classes that occupy
//! them.
//!
//! Class instances that reused the metadata of an earlier instance (`ClassWithId` records) are
//! grouped under the name of the class that declared the metadata.
//!
//! # Examples
//!
//! ```rust
//! use nrbfscope::{analyze, decode_bytes};
//!
//! // Header, BinaryObjectString id 1 "hi", MessageEnd
//! let data = [
//!     0x00, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
//!     0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x06, 0x01, 0x00, 0x00, 0x00, 0x02, b'h', b'i',
//!     0x0B,
//! ];
//!
//! let (registry, _) = decode_bytes(&data)?;
//! let report = analyze(&registry);
//!
//! assert_eq!(report.strings.count, 1);
//! assert_eq!(report.strings.length, 8);
//! assert!(report.to_string().starts_with("Total Objects: 1\n"));
//! # Ok::<(), nrbfscope::Error>(())
//! ```

mod report;

pub use report::{ClassTally, Report, Tally};

use std::collections::HashMap;

use crate::records::{EntityKind, ObjectRegistry};

/// Tally the top-level entities of a decoded stream.
///
/// # Arguments
/// * `registry` - The registry produced by a completed decode pass
#[must_use]
pub fn analyze(registry: &ObjectRegistry) -> Report {
    let mut report = Report {
        total_objects: registry.len(),
        ..Report::default()
    };
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for entity in registry.top_level() {
        match &entity.kind {
            EntityKind::Class(class) => {
                report.classes.add(entity.record_length);

                let name = registry
                    .schema_source(entity.object_id)
                    .map_or_else(|| class.name(), |source| source.name());

                let position = *positions.entry(name).or_insert_with(|| {
                    report.by_name.push(ClassTally {
                        name: name.to_string(),
                        tally: Tally::default(),
                    });
                    report.by_name.len() - 1
                });
                report.by_name[position].tally.add(entity.record_length);
            }
            EntityKind::Array(_) => report.arrays.add(entity.record_length),
            EntityKind::String(_) => report.strings.add(entity.record_length),
        }
    }

    report
}
