// Copyright 2025 The nrbfscope Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # nrbfscope
//!
//! A decoder and analyzer for the .NET Remoting Binary Format (NRBF), the wire format written
//! by `BinaryFormatter` and .NET Remoting. Built in pure Rust, `nrbfscope` reconstructs the
//! serialized object graph (classes, arrays, strings and the references between them) from a
//! forward-only byte stream, without requiring Windows or the .NET runtime, and attributes the
//! bytes of a stream to the classes that occupy them.
//!
//! ## Features
//!
//! - **Forward-only decoding** - Works on any [`std::io::Read`], never seeks and never reads past
//!   the end-of-stream record
//! - **Complete object graphs** - Schema reuse, shared sub-objects, cycles, null runs and all
//!   six array shapes
//! - **Precise byte accounting** - Every entity records its offset and length, nested records
//!   included
//! - **Hardened against hostile input** - Bounded recursion and array sizes, every malformation
//!   reported with its stream offset
//!
//! ## Quick Start
//!
//! ```rust
//! use nrbfscope::prelude::*;
//!
//! // Header, BinaryObjectString id 1 "hi", MessageEnd
//! let data = [
//!     0x00, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
//!     0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x06, 0x01, 0x00, 0x00, 0x00, 0x02, b'h', b'i',
//!     0x0B,
//! ];
//!
//! let (registry, libraries) = decode_bytes(&data)?;
//! let report = analyze(&registry);
//!
//! println!("{report}");
//! assert_eq!(report.total_objects, 1);
//! assert!(libraries.is_empty());
//! # Ok::<(), nrbfscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`stream`] - Forward-only byte reader with offset tracking
//! - [`records`] - Protocol types, decoded entities, the registry and the record dispatcher
//! - [`analysis`] - Statistics over a decoded graph
//! - [`DecoderConfig`] - Limits and consistency checks of a decode pass
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Logging
//!
//! `nrbfscope` logs through the [`log`](https://docs.rs/log) facade and never installs a logger.
//! Decode passes are logged at `debug`, individual records at `trace`.
//!
//! ## Error Handling
//!
//! Every error aborts the decode pass and carries the stream offset at which it was detected:
//!
//! ```rust
//! use nrbfscope::{decode_bytes, Error};
//!
//! match decode_bytes(&[0x15]) {
//!     Err(Error::UnsupportedRecordType { record, offset }) => {
//!         println!("{record:?} at offset {offset} is a remoting message, not an object graph");
//!     }
//!     Err(e) => println!("Malformed stream: {e}"),
//!     Ok(_) => println!("Decoded"),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! cargo +nightly fuzz run decode --release
//! ```

use std::io::Read;

use rayon::prelude::*;

#[macro_use]
pub(crate) mod error;

#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use nrbfscope::prelude::*;
///
/// let (registry, _) = decode_bytes(&[0x0B])?;
/// assert!(registry.is_complete());
/// # Ok::<(), nrbfscope::Error>(())
/// ```
pub mod prelude;

/// Byte source access
///
/// [`stream::StreamReader`] wraps any [`std::io::Read`] and provides the little-endian,
/// 7-bit length and UTF-8 reads the format is built from.
pub mod stream;

/// NRBF records, entities and the record dispatcher
///
/// # Key Types
///
/// - [`records::Decoder`] - Decodes one stream into an [`ObjectRegistry`] and a [`LibraryTable`]
/// - [`records::Entity`] - One decoded class instance, array or string
/// - [`records::Value`] - A member or slot value: inline primitive, reference or null
pub mod records;

/// Statistics over a decoded object graph
pub mod analysis;

mod config;

/// `nrbfscope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `nrbfscope` Error type
///
/// The main error type for all operations in this crate. See [`Error`] for the individual
/// variants.
pub use error::Error;

/// Configuration of a decode pass
pub use config::{DecoderConfig, DEFAULT_MAX_ARRAY_SLOTS, DEFAULT_MAX_DEPTH};

/// Decoded tables
pub use records::{Decoder, LibraryTable, ObjectRegistry};

/// Graph statistics
pub use analysis::{analyze, Report};

/// Decode one NRBF stream with the default configuration.
///
/// Reads from the current position of `source` up to and including the first end-of-stream
/// record. Pass `&mut reader` to keep using the source afterwards.
///
/// # Errors
/// Returns the first protocol, input or limit error of the pass.
///
/// # Examples
///
/// ```rust,no_run
/// use std::{fs::File, io::BufReader};
///
/// let file = BufReader::new(File::open("state.bin")?);
/// let (registry, libraries) = nrbfscope::decode(file)?;
///
/// for library in libraries.iter() {
///     println!("{}: {}", library.library_id, library.name);
/// }
/// println!("{} objects", registry.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn decode<R: Read>(source: R) -> Result<(ObjectRegistry, LibraryTable)> {
    decode_with(source, DecoderConfig::default())
}

/// Decode one NRBF stream with the given configuration.
///
/// # Errors
/// Returns the first protocol, input or limit error of the pass.
pub fn decode_with<R: Read>(
    source: R,
    config: DecoderConfig,
) -> Result<(ObjectRegistry, LibraryTable)> {
    Decoder::new(source, config).decode()
}

/// Decode one NRBF stream held in memory, with the default configuration.
///
/// # Errors
/// Returns the first protocol, input or limit error of the pass.
pub fn decode_bytes(data: &[u8]) -> Result<(ObjectRegistry, LibraryTable)> {
    decode(data)
}

/// Decode independent in-memory streams in parallel.
///
/// Every stream gets its own decoder, registry and null run state. The results are returned in
/// input order, one per input; a failing stream does not affect the others.
///
/// # Examples
///
/// ```rust
/// use nrbfscope::{decode_many, DecoderConfig};
///
/// let inputs = vec![vec![0x0B], vec![99]];
/// let results = decode_many(&inputs, DecoderConfig::default());
///
/// assert!(results[0].is_ok());
/// assert!(results[1].is_err());
/// ```
pub fn decode_many<T>(
    inputs: &[T],
    config: DecoderConfig,
) -> Vec<Result<(ObjectRegistry, LibraryTable)>>
where
    T: AsRef<[u8]> + Sync,
{
    inputs
        .par_iter()
        .map(|input| decode_with(input.as_ref(), config))
        .collect()
}
