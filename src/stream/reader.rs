//! Forward-only byte stream reader for NRBF decoding.
//!
//! This module provides the [`StreamReader`] type, a cursor over any [`std::io::Read`] source
//! that keeps track of the absolute number of bytes consumed. NRBF streams carry no outer
//! framing, so the reader never reads ahead: every method consumes exactly the bytes of the
//! value it returns, and whatever follows the end-of-stream record stays unread in the source.
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`StreamReader::pos`] - Number of bytes consumed so far
//!
//! ## Data Access Methods
//! - [`StreamReader::read_le`] - Read primitive types (little-endian)
//! - [`StreamReader::read_7bit_encoded_int`] - Read 7-bit encoded integers
//! - [`StreamReader::read_prefixed_string_utf8`] - Read length-prefixed UTF-8 strings
//! - [`StreamReader::read_char_utf8`] - Read a single UTF-8 encoded character
//!
//! # Usage Examples
//!
//! ```rust
//! use nrbfscope::stream::StreamReader;
//!
//! let data = [0x01, 0x00, 0x00, 0x00, 5, b'H', b'e', b'l', b'l', b'o'];
//! let mut reader = StreamReader::new(&data[..]);
//!
//! assert_eq!(reader.read_le::<i32>()?, 1);
//! assert_eq!(reader.read_prefixed_string_utf8()?, "Hello");
//! assert_eq!(reader.pos(), 10);
//! # Ok::<(), nrbfscope::Error>(())
//! ```

use std::io::{ErrorKind, Read};

use crate::{stream::StreamIO, Result};

/// A forward-only binary reader over an arbitrary byte source.
///
/// `StreamReader` never seeks and never buffers beyond the value being read, which makes it
/// safe to use on sockets, pipes or a `BufReader` shared with other consumers. Short reads
/// are reported as [`crate::Error::PrematureEndOfStream`] carrying the offset at which the
/// incomplete value started.
pub struct StreamReader<R> {
    /// The underlying byte source
    inner: R,
    /// Number of bytes consumed from `inner`
    position: u64,
}

impl<R: Read> StreamReader<R> {
    /// Create a new [`StreamReader`] positioned at offset 0 of `inner`.
    ///
    /// # Arguments
    /// * `inner` - The byte source to read from
    #[must_use]
    pub fn new(inner: R) -> Self {
        StreamReader { inner, position: 0 }
    }

    /// Get the number of bytes consumed so far.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nrbfscope::stream::StreamReader;
    /// let data = [0x01, 0x02, 0x03];
    /// let mut reader = StreamReader::new(&data[..]);
    ///
    /// assert_eq!(reader.pos(), 0);
    /// let _byte = reader.read_le::<u8>()?;
    /// assert_eq!(reader.pos(), 1);
    /// # Ok::<(), nrbfscope::Error>(())
    /// ```
    #[must_use]
    pub fn pos(&self) -> u64 {
        self.position
    }

    /// Unwrap the reader, returning the underlying byte source.
    ///
    /// The source is positioned right after the last byte consumed.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Fill `buf` completely from the source.
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = self.position;
        let mut filled = 0;

        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => return Err(out_of_bounds_error!(start, buf.len())),
                Ok(n) => {
                    filled += n;
                    self.position += n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Read a type `T` in little-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::PrematureEndOfStream`] if the source ends before `T` is complete.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nrbfscope::stream::StreamReader;
    /// let data = [0x01, 0x02, 0x03, 0x04];
    /// let mut reader = StreamReader::new(&data[..]);
    ///
    /// let value: u16 = reader.read_le()?;
    /// assert_eq!(value, 0x0201);
    /// assert_eq!(reader.pos(), 2);
    /// # Ok::<(), nrbfscope::Error>(())
    /// ```
    pub fn read_le<T: StreamIO>(&mut self) -> Result<T> {
        let mut bytes = T::Bytes::default();
        self.fill(bytes.as_mut())?;
        Ok(T::from_le_bytes(bytes))
    }


    /// Read a 7-bit encoded integer, as written by .NET's `BinaryWriter.Write7BitEncodedInt`.
    ///
    /// Each byte carries 7 bits of payload, least significant group first; the high bit
    /// signals that another byte follows. At most five bytes are accepted.
    ///
    /// # Errors
    /// Returns [`crate::Error::PrematureEndOfStream`] if the source ends inside the value or
    /// [`crate::Error::Malformed`] for an encoding that overflows 32 bits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nrbfscope::stream::StreamReader;
    ///
    /// let data = [0x80, 0x01];
    /// let mut reader = StreamReader::new(&data[..]);
    /// assert_eq!(reader.read_7bit_encoded_int()?, 128);
    /// # Ok::<(), nrbfscope::Error>(())
    /// ```
    pub fn read_7bit_encoded_int(&mut self) -> Result<u32> {
        let mut value = 0u32;
        let mut shift = 0;

        loop {
            let offset = self.position;
            let byte = self.read_le::<u8>()?;

            // The 5th byte holds the top 4 bits and must not continue
            if shift == 28 && byte > 0x0F {
                return Err(malformed_error!(
                    "7-bit encoded integer overflow at offset {}: value exceeds u32 capacity",
                    offset
                ));
            }

            value |= u32::from(byte & 0x7F) << shift;
            shift += 7;

            if (byte & 0x80) == 0 {
                break;
            }
        }

        Ok(value)
    }

    /// Read a length-prefixed UTF-8 string.
    ///
    /// The string length in bytes is encoded as a 7-bit encoded integer, followed by that
    /// many UTF-8 bytes. This is the encoding of every string in an NRBF stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::PrematureEndOfStream`] if the source ends inside the string or
    /// [`crate::Error::Malformed`] for invalid UTF-8 encoding.
    pub fn read_prefixed_string_utf8(&mut self) -> Result<String> {
        let length = self.read_7bit_encoded_int()? as usize;
        let start = self.position;

        // Grows with the bytes actually delivered, never with the claimed length
        let mut string_data = Vec::new();
        let read = (&mut self.inner)
            .take(length as u64)
            .read_to_end(&mut string_data)?;
        self.position += read as u64;

        if read < length {
            return Err(out_of_bounds_error!(start, length));
        }

        String::from_utf8(string_data).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                start,
                self.position,
                e.utf8_error()
            )
        })
    }

    /// Read a single UTF-8 encoded character (1 to 4 bytes).
    ///
    /// # Errors
    /// Returns [`crate::Error::PrematureEndOfStream`] if the source ends inside the character
    /// or [`crate::Error::Malformed`] for an invalid UTF-8 sequence.
    pub fn read_char_utf8(&mut self) -> Result<char> {
        let start = self.position;
        let lead = self.read_le::<u8>()?;

        let width = match lead {
            0x00..=0x7F => return Ok(char::from(lead)),
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => {
                return Err(malformed_error!(
                    "Invalid UTF-8 lead byte 0x{:02X} at offset {}",
                    lead,
                    start
                ))
            }
        };

        let mut encoded = [lead, 0, 0, 0];
        self.fill(&mut encoded[1..width])?;

        std::str::from_utf8(&encoded[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or_else(|| {
                malformed_error!(
                    "Invalid UTF-8 character at offset {} - {:?}",
                    start,
                    &encoded[..width]
                )
            })
    }
}
