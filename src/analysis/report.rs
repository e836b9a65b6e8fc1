//! Aggregate statistics over a decoded object graph.

use std::fmt;

/// Number of entities and the bytes they occupy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    /// Number of entities
    pub count: usize,
    /// Sum of their record lengths in bytes
    pub length: u64,
}

impl Tally {
    pub(crate) fn add(&mut self, length: u64) {
        self.count += 1;
        self.length += length;
    }
}

impl std::ops::Add for Tally {
    type Output = Tally;

    fn add(self, other: Tally) -> Tally {
        Tally {
            count: self.count + other.count,
            length: self.length + other.length,
        }
    }
}

/// Top-level instances of one class, grouped by the name of the class that declared the
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTally {
    /// Fully qualified class name
    pub name: String,
    /// Number of top-level instances and their bytes
    pub tally: Tally,
}

/// Statistics of one decoded stream, produced by [`crate::analyze`].
///
/// Only top-level entities are tallied: nested entities are already part of the record length
/// of the entity that contains them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    /// Number of decoded entities, nested ones included
    pub total_objects: usize,
    /// Top-level class instances
    pub classes: Tally,
    /// Top-level arrays
    pub arrays: Tally,
    /// Top-level string objects
    pub strings: Tally,
    /// Top-level class instances per class name, in first-seen order
    pub by_name: Vec<ClassTally>,
}

impl Report {
    /// All top-level entities.
    #[must_use]
    pub fn top_level(&self) -> Tally {
        self.classes + self.arrays + self.strings
    }

    /// The tally of one class name.
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&Tally> {
        self.by_name
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.tally)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let top_level = self.top_level();

        writeln!(f, "Total Objects: {}", self.total_objects)?;
        writeln!(f, "Total Top-Level Objects: {}", top_level.count)?;
        writeln!(f, "Total Top-Level Length: {}", top_level.length)?;

        for (kind, tally) in [
            ("Class", self.classes),
            ("Array", self.arrays),
            ("String", self.strings),
        ] {
            writeln!(f)?;
            writeln!(f, "Top-Level {kind} Count: {}", tally.count)?;
            writeln!(f, "Top-Level {kind} Length: {}", tally.length)?;
        }

        writeln!(f)?;
        writeln!(f, "Top-Level Object Counts by Name:")?;
        for entry in &self.by_name {
            writeln!(f, "{}: {}", entry.name, entry.tally.count)?;
        }

        writeln!(f)?;
        writeln!(f, "Top-Level Object Lengths by Name:")?;
        for entry in &self.by_name {
            writeln!(f, "{}: {}", entry.name, entry.tally.length)?;
        }

        Ok(())
    }
}
