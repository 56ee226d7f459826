//! Conversion between in-memory chunk data and the on-disk chunk bytes of each format flavor.
//!
//! zarr chunks are the compressed payload only.
//! N5 chunks are a big-endian header followed by the compressed payload:
//!
//! ```text
//! mode: u16 | ndim: u16 | shape: u32 * ndim | [num_el: u32, if mode == 1] | payload
//! ```
//!
//! Shape words are in F order.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::chunk::N5ChunkHeader;
use crate::codec::CodecTraits;
use crate::data_type::DataType;
use crate::endianness::{Endianness, convert_elements_inplace};
use crate::fill_value::FillValue;

/// The on-disk convention of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    Zarr,
    N5,
}

impl Flavor {
    /// Whether chunks can declare their own element count.
    #[must_use]
    pub fn supports_varlen(self) -> bool {
        matches!(self, Self::N5)
    }

    /// The byte order of element payloads, if not given by the metadata.
    #[must_use]
    pub fn default_endianness(self) -> Endianness {
        match self {
            Self::Zarr => Endianness::Little,
            Self::N5 => Endianness::Big,
        }
    }
}

impl Display for Flavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zarr => f.write_str("zarr"),
            Self::N5 => f.write_str("n5"),
        }
    }
}

/// The result of encoding a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedChunk {
    /// The bytes to store.
    Written(Vec<u8>),
    /// Every element is the fill value, so nothing is stored.
    Elided,
}

/// A decoded chunk with an element count taken from its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedChunk {
    /// Native-endian element bytes.
    pub bytes: Vec<u8>,
    pub is_varlen: bool,
}

/// Encodes and decodes chunks for one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkFormat {
    flavor: Flavor,
    data_type: DataType,
    endianness: Endianness,
}

impl ChunkFormat {
    /// `endianness` is the byte order of element payloads on disk.
    #[must_use]
    pub fn new(flavor: Flavor, data_type: DataType, endianness: Endianness) -> Self {
        Self {
            flavor,
            data_type,
            endianness,
        }
    }

    #[must_use]
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    #[must_use]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    fn byte_len(&self, num_elements: u64) -> crate::Result<usize> {
        usize::try_from(num_elements)
            .ok()
            .and_then(|n| n.checked_mul(self.data_type.size()))
            .ok_or_else(|| {
                crate::Error::invalid_chunk(format!("{num_elements} elements do not fit in memory"))
            })
    }

    /// Encode the native-endian element bytes of a chunk with shape `chunk_shape`.
    ///
    /// `varlen` gives the element count of a variable-length chunk.
    /// Returns [`EncodedChunk::Elided`] if every element equals `fill_value`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidChunk`] if `varlen` is given for zarr,
    /// or `data` does not hold exactly the expected number of elements.
    pub fn data_to_buffer(
        &self,
        codec: &dyn CodecTraits,
        fill_value: &FillValue,
        chunk_shape: &[u64],
        data: &[u8],
        varlen: Option<u32>,
    ) -> crate::Result<EncodedChunk> {
        if varlen.is_some() && !self.flavor.supports_varlen() {
            return Err(crate::Error::invalid_chunk(format!(
                "variable-length chunks are not supported in {}",
                self.flavor
            )));
        }

        let num_elements = match varlen {
            Some(n) => u64::from(n),
            None => chunk_shape.iter().product::<u64>(),
        };
        let expected = self.byte_len(num_elements)?;
        if data.len() != expected {
            return Err(crate::Error::invalid_chunk(format!(
                "chunk of {num_elements} elements needs {expected} bytes, got {}",
                data.len()
            )));
        }

        if fill_value.equals_all(data) {
            return Ok(EncodedChunk::Elided);
        }

        let encoded = if self.endianness.is_native() || self.data_type.size() == 1 {
            codec.encode(data)?
        } else {
            let mut swapped = data.to_vec();
            convert_elements_inplace(&mut swapped, self.data_type.size(), self.endianness);
            codec.encode(&swapped)?
        };

        let out = match self.flavor {
            Flavor::Zarr => encoded,
            Flavor::N5 => {
                let header = N5ChunkHeader::new(chunk_shape, varlen)?;
                let mut out = header.to_bytes()?;
                out.extend_from_slice(&encoded);
                out
            }
        };
        Ok(EncodedChunk::Written(out))
    }

    /// Decode stored chunk bytes for a chunk of shape `chunk_shape`.
    ///
    /// Variable-length N5 chunks yield the element count declared in their header.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptChunk`] if the N5 header is malformed or disagrees with
    /// `chunk_shape`, and [`crate::Error::Codec`] if the payload cannot be decompressed.
    pub fn decode(
        &self,
        codec: &dyn CodecTraits,
        bytes: &[u8],
        chunk_shape: &[u64],
    ) -> crate::Result<DecodedChunk> {
        let (payload, num_elements, is_varlen) = match self.flavor {
            Flavor::Zarr => (bytes, chunk_shape.iter().product::<u64>(), false),
            Flavor::N5 => {
                let header = N5ChunkHeader::from_bytes(bytes)?;
                check_ndim(&header, chunk_shape)?;
                if !header.is_varlen() && header.c_order_shape() != chunk_shape {
                    log::warn!(
                        "N5 chunk header has shape {:?}, expected {chunk_shape:?}",
                        header.c_order_shape()
                    );
                    return Err(crate::Error::corrupt_chunk(format!(
                        "N5 chunk header has shape {:?}, expected {chunk_shape:?}",
                        header.c_order_shape()
                    )));
                }
                (
                    &bytes[header.data_offset()..],
                    header.num_elements(),
                    header.is_varlen(),
                )
            }
        };

        let mut decoded = codec.decode(payload, self.byte_len(num_elements)?)?;
        convert_elements_inplace(&mut decoded, self.data_type.size(), self.endianness);
        Ok(DecodedChunk {
            bytes: decoded,
            is_varlen,
        })
    }

    /// Decode stored chunk bytes into `out`, returning whether the chunk was variable-length.
    ///
    /// `out` must hold exactly the expected bytes of a fixed chunk, and at least the declared
    /// bytes of a variable-length chunk; a variable-length chunk fills a prefix of `out`.
    ///
    /// # Errors
    /// As [`ChunkFormat::decode`], and [`crate::Error::InvalidChunk`] if `out` has the wrong size.
    pub fn buffer_to_data(
        &self,
        codec: &dyn CodecTraits,
        bytes: &[u8],
        chunk_shape: &[u64],
        out: &mut [u8],
    ) -> crate::Result<bool> {
        let decoded = self.decode(codec, bytes, chunk_shape)?;
        let fits = if decoded.is_varlen {
            out.len() >= decoded.bytes.len()
        } else {
            out.len() == decoded.bytes.len()
        };
        if !fits {
            return Err(crate::Error::invalid_chunk(format!(
                "output buffer holds {} bytes, chunk has {}",
                out.len(),
                decoded.bytes.len()
            )));
        }
        out[..decoded.bytes.len()].copy_from_slice(&decoded.bytes);
        Ok(decoded.is_varlen)
    }

    /// The number of leading bytes [`ChunkFormat::peek_varlen`] needs for a chunk of rank `ndim`.
    #[must_use]
    pub fn header_prefix_len(&self, ndim: usize) -> u64 {
        match self.flavor {
            Flavor::Zarr => 0,
            Flavor::N5 => (2 * size_of::<u16>() + (ndim + 1) * size_of::<u32>()) as u64,
        }
    }

    /// Report whether a chunk is variable-length and how many elements it holds,
    /// reading only its header.
    ///
    /// `header_prefix` is [`None`] for a chunk that does not exist; that, a zarr chunk, or a
    /// fixed N5 chunk reports the element count of `chunk_shape`.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptChunk`] if the header is malformed or its rank differs from
    /// the rank of `chunk_shape`.
    pub fn peek_varlen(
        &self,
        header_prefix: Option<&[u8]>,
        chunk_shape: &[u64],
    ) -> crate::Result<(bool, u64)> {
        let default_size = chunk_shape.iter().product::<u64>();
        let Some(prefix) = header_prefix else {
            return Ok((false, default_size));
        };
        if self.flavor == Flavor::Zarr {
            return Ok((false, default_size));
        }
        let header = N5ChunkHeader::from_bytes(prefix)?;
        check_ndim(&header, chunk_shape)?;
        if header.is_varlen() {
            Ok((true, header.num_elements()))
        } else {
            Ok((false, default_size))
        }
    }
}

fn check_ndim(header: &N5ChunkHeader, chunk_shape: &[u64]) -> crate::Result<()> {
    if header.ndim() == chunk_shape.len() {
        Ok(())
    } else {
        Err(crate::Error::corrupt_chunk(format!(
            "N5 chunk header has {} dimensions, expected {}",
            header.ndim(),
            chunk_shape.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Compression, create_codec};

    fn raw() -> Box<dyn CodecTraits> {
        create_codec(&Compression::Raw).unwrap()
    }

    fn u16_bytes(values: &[u16]) -> Vec<u8> {
        bytemuck::cast_slice(values).to_vec()
    }

    #[test]
    fn n5_fixed_chunk_layout() {
        let format = ChunkFormat::new(Flavor::N5, DataType::UInt16, Endianness::Big);
        let data = u16_bytes(&[1, 2, 3, 4, 5, 6]);
        let EncodedChunk::Written(bytes) = format
            .data_to_buffer(raw().as_ref(), &FillValue::from(0u16), &[2, 3], &data, None)
            .unwrap()
        else {
            panic!("chunk should be written");
        };
        assert_eq!(
            &bytes[..12],
            &[0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 2],
            "mode 0, ndim 2, F-order shape"
        );
        assert_eq!(&bytes[12..], &[0, 1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6]);

        let mut out = vec![0u8; data.len()];
        let is_varlen = format
            .buffer_to_data(raw().as_ref(), &bytes, &[2, 3], &mut out)
            .unwrap();
        assert!(!is_varlen);
        assert_eq!(out, data);
    }

    #[test]
    fn zarr_chunk_is_payload_only() {
        let format = ChunkFormat::new(Flavor::Zarr, DataType::UInt16, Endianness::Little);
        let data = u16_bytes(&[0x0102, 0x0304]);
        let encoded = format
            .data_to_buffer(raw().as_ref(), &FillValue::from(0u16), &[2], &data, None)
            .unwrap();
        assert_eq!(encoded, EncodedChunk::Written(vec![2, 1, 4, 3]));
    }

    #[test]
    fn all_fill_is_elided() {
        for flavor in [Flavor::Zarr, Flavor::N5] {
            let format = ChunkFormat::new(flavor, DataType::Float32, flavor.default_endianness());
            let data: Vec<u8> = bytemuck::cast_slice(&[7.0f32; 8]).to_vec();
            let encoded = format
                .data_to_buffer(raw().as_ref(), &FillValue::from(7.0f32), &[2, 4], &data, None)
                .unwrap();
            assert_eq!(encoded, EncodedChunk::Elided);
        }
    }

    #[test]
    fn varlen_is_rejected_for_zarr() {
        let format = ChunkFormat::new(Flavor::Zarr, DataType::UInt8, Endianness::Little);
        let result =
            format.data_to_buffer(raw().as_ref(), &FillValue::from(0u8), &[4], &[1, 2], Some(2));
        assert!(matches!(result, Err(crate::Error::InvalidChunk(_))));
    }

    #[test]
    fn wrong_data_length_is_rejected() {
        let format = ChunkFormat::new(Flavor::N5, DataType::UInt8, Endianness::Big);
        let result =
            format.data_to_buffer(raw().as_ref(), &FillValue::from(0u8), &[4], &[1, 2], None);
        assert!(matches!(result, Err(crate::Error::InvalidChunk(_))));
    }

    #[test]
    fn n5_varlen_round_trip_and_peek() {
        let format = ChunkFormat::new(Flavor::N5, DataType::UInt8, Endianness::Big);
        let data = vec![9u8, 8, 7];
        let EncodedChunk::Written(bytes) = format
            .data_to_buffer(raw().as_ref(), &FillValue::from(0u8), &[4, 4], &data, Some(3))
            .unwrap()
        else {
            panic!("chunk should be written");
        };
        assert_eq!(&bytes[..2], &[0, 1]);

        let prefix = &bytes[..format.header_prefix_len(2) as usize];
        assert_eq!(format.peek_varlen(Some(prefix), &[4, 4]).unwrap(), (true, 3));

        let decoded = format.decode(raw().as_ref(), &bytes, &[4, 4]).unwrap();
        assert!(decoded.is_varlen);
        assert_eq!(decoded.bytes, data);

        let mut out = vec![0u8; 16];
        assert!(format.buffer_to_data(raw().as_ref(), &bytes, &[4, 4], &mut out).unwrap());
        assert_eq!(&out[..3], &[9, 8, 7]);

        let mut small = vec![0u8; 2];
        assert!(matches!(
            format.buffer_to_data(raw().as_ref(), &bytes, &[4, 4], &mut small),
            Err(crate::Error::InvalidChunk(_))
        ));
    }

    #[test]
    fn peek_fallbacks() {
        let n5 = ChunkFormat::new(Flavor::N5, DataType::UInt8, Endianness::Big);
        assert_eq!(n5.peek_varlen(None, &[2, 5]).unwrap(), (false, 10));
        let fixed_header = [0, 0, 0, 2, 0, 0, 0, 5, 0, 0, 0, 2, 1, 1, 1, 1];
        assert_eq!(n5.peek_varlen(Some(&fixed_header), &[2, 5]).unwrap(), (false, 10));

        let zarr = ChunkFormat::new(Flavor::Zarr, DataType::UInt8, Endianness::Little);
        assert_eq!(zarr.peek_varlen(Some(&[0, 1, 0, 2]), &[3]).unwrap(), (false, 3));
    }

    #[test]
    fn rank_mismatch_is_corrupt() {
        let format = ChunkFormat::new(Flavor::N5, DataType::UInt8, Endianness::Big);
        // varlen header of rank 1
        let bytes = [0, 1, 0, 1, 0, 0, 0, 4, 0, 0, 0, 2, 5, 6];
        assert!(matches!(
            format.peek_varlen(Some(&bytes), &[4, 1]),
            Err(crate::Error::CorruptChunk(_))
        ));
        assert!(matches!(
            format.decode(raw().as_ref(), &bytes, &[4, 1]),
            Err(crate::Error::CorruptChunk(_))
        ));
    }

    #[test]
    fn shape_mismatch_is_corrupt() {
        let format = ChunkFormat::new(Flavor::N5, DataType::UInt8, Endianness::Big);
        let bytes = [0, 0, 0, 1, 0, 0, 0, 2, 5, 6];
        assert!(format.decode(raw().as_ref(), &bytes, &[2]).is_ok());
        assert!(matches!(
            format.decode(raw().as_ref(), &bytes, &[3]),
            Err(crate::Error::CorruptChunk(_))
        ));
    }

    #[test]
    fn truncated_payload_is_a_codec_error() {
        let format = ChunkFormat::new(Flavor::Zarr, DataType::UInt16, Endianness::Little);
        assert!(matches!(
            format.decode(raw().as_ref(), &[1, 2, 3], &[2]),
            Err(crate::Error::Codec(_))
        ));
    }
}
