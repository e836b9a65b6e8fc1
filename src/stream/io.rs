//! Little-endian primitive decoding for NRBF streams.
//!
//! Every fixed-width value in an NRBF stream (identifiers, lengths, integers, floating point
//! numbers and tick counts) is stored in little-endian byte order. The [`StreamIO`] trait
//! abstracts over the conversion from a fixed-size byte array to the typed value, so that
//! [`crate::stream::StreamReader::read_le`] can be generic over the target type.
//!
//! # Supported Types
//! - **Unsigned integers**: `u8`, `u16`, `u32`, `u64`
//! - **Signed integers**: `i8`, `i16`, `i32`, `i64`
//! - **Floating point**: `f32`, `f64`

/// Trait for type-specific little-endian decoding of primitive values.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size
/// byte array required for that particular type (e.g., `[u8; 4]` for `u32`).
///
/// # Examples
///
/// ```rust
/// use nrbfscope::stream::StreamIO;
///
/// let value = <u32 as StreamIO>::from_le_bytes([0x01, 0x00, 0x00, 0x00]);
/// assert_eq!(value, 1);
/// assert_eq!(<u32 as StreamIO>::SIZE, 4);
/// ```
pub trait StreamIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + Default + AsMut<[u8]>;

    /// Encoded size in bytes
    const SIZE: usize;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_stream_io {
    ($($ty:ty),*) => {
        $(
            impl StreamIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_stream_io!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);
