//! Byte source access for NRBF decoding.
//!
//! NRBF streams are consumed strictly forward: the decoder reads every byte exactly once and
//! never rewinds. This module provides the reading layer the record decoder is built on:
//!
//! - [`StreamReader`] - forward-only cursor over any [`std::io::Read`] with offset tracking
//! - [`StreamIO`] - little-endian decoding of fixed-width primitives

mod io;
mod reader;

pub use io::StreamIO;
pub use reader::StreamReader;
