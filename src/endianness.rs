//! Byte order handling for chunk headers and element payloads.
//!
//! N5 header words are always big-endian on disk.
//! Element payloads are big-endian for N5 and follow the dtype byte order for zarr.

use std::fmt::Display;

/// The byte order of multi-byte values, either `big` or `little`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Endianness {
    /// Little endian.
    Little,
    /// Big endian.
    Big,
}

impl Endianness {
    /// Return true if the endianness matches the endianness of the CPU.
    #[must_use]
    pub fn is_native(self) -> bool {
        self == NATIVE_ENDIAN
    }
}

impl Display for Endianness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Little => write!(f, "little"),
            Self::Big => write!(f, "big"),
        }
    }
}

/// The endianness of the CPU.
pub const NATIVE_ENDIAN: Endianness = if cfg!(target_endian = "big") {
    Endianness::Big
} else {
    Endianness::Little
};

/// An unsigned integer that can appear as a fixed-width word in a chunk header.
pub trait HeaderWord: Copy {
    const SIZE: usize;

    /// Reverse the byte order of the value.
    fn reverse_endianness(self) -> Self;

    fn to_ne_bytes_vec(self) -> Vec<u8>;

    /// Panics if `bytes` is not exactly [`Self::SIZE`] long.
    fn from_ne_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_header_word {
    ($ty:ty) => {
        impl HeaderWord for $ty {
            const SIZE: usize = size_of::<$ty>();

            fn reverse_endianness(self) -> Self {
                self.swap_bytes()
            }

            fn to_ne_bytes_vec(self) -> Vec<u8> {
                self.to_ne_bytes().to_vec()
            }

            fn from_ne_slice(bytes: &[u8]) -> Self {
                let mut buf = [0u8; size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_ne_bytes(buf)
            }
        }
    };
}

impl_header_word!(u16);
impl_header_word!(u32);
impl_header_word!(u64);

/// Convert between a native value and a value whose in-memory bytes are in `endianness` order.
///
/// The conversion is its own inverse.
#[must_use]
pub fn convert_word<T: HeaderWord>(value: T, endianness: Endianness) -> T {
    if endianness.is_native() {
        value
    } else {
        value.reverse_endianness()
    }
}

/// Append `value` to `buffer` with the given byte order.
pub fn write_word<T: HeaderWord>(buffer: &mut Vec<u8>, value: T, endianness: Endianness) {
    buffer.extend(convert_word(value, endianness).to_ne_bytes_vec());
}

/// Read a word with the given byte order at `*offset`, advancing the offset.
///
/// Returns [`None`] if `bytes` is too short.
#[must_use]
pub fn read_word<T: HeaderWord>(
    bytes: &[u8],
    offset: &mut usize,
    endianness: Endianness,
) -> Option<T> {
    let end = offset.checked_add(T::SIZE)?;
    let word = bytes.get(*offset..end)?;
    *offset = end;
    Some(convert_word(T::from_ne_slice(word), endianness))
}

/// Reverse the byte order of every `element_size`-byte element in `bytes`.
pub fn reverse_endianness_inplace(bytes: &mut [u8], element_size: usize) {
    if element_size < 2 {
        return;
    }
    for element in bytes.chunks_exact_mut(element_size) {
        element.reverse();
    }
}

/// Convert native element bytes to `endianness`, or back; the conversion is its own inverse.
pub fn convert_elements_inplace(bytes: &mut [u8], element_size: usize, endianness: Endianness) {
    if !endianness.is_native() {
        reverse_endianness_inplace(bytes, element_size);
    }
}
