use lz4::block::CompressionMode;

use super::{
    CodecError, CodecPlugin, CodecTraits, Compression, check_decoded_size, wrong_compression,
};

const IDENTIFIER: &str = "lz4";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, create_codec_lz4)
}

fn create_codec_lz4(compression: &Compression) -> Result<Box<dyn CodecTraits>, CodecError> {
    match compression {
        Compression::Lz4 { acceleration } => Ok(Box::new(Lz4Codec::new(*acceleration)?)),
        c => Err(wrong_compression(IDENTIFIER, c)),
    }
}

/// An `lz4` block codec.
///
/// The compressed block is prefixed with its decompressed size as a little-endian `i32`.
#[derive(Clone, Debug)]
pub struct Lz4Codec {
    acceleration: i32,
}

impl Lz4Codec {
    /// Create a new `lz4` codec.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidConfiguration`] if `acceleration` is not positive.
    pub fn new(acceleration: i32) -> Result<Self, CodecError> {
        if acceleration < 1 {
            return Err(CodecError::InvalidConfiguration {
                codec: IDENTIFIER,
                message: format!("invalid acceleration {acceleration}"),
            });
        }
        Ok(Self { acceleration })
    }
}

impl CodecTraits for Lz4Codec {
    fn compression(&self) -> Compression {
        Compression::Lz4 {
            acceleration: self.acceleration,
        }
    }

    fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mode = if self.acceleration == 1 {
            CompressionMode::DEFAULT
        } else {
            CompressionMode::FAST(self.acceleration)
        };
        Ok(lz4::block::compress(decoded_value, Some(mode), true)?)
    }

    fn decode(&self, encoded_value: &[u8], decoded_size: usize) -> Result<Vec<u8>, CodecError> {
        let (prefix, block) = encoded_value
            .split_first_chunk::<4>()
            .ok_or_else(|| CodecError::Other("lz4 block has no size prefix".into()))?;
        let size = i32::from_le_bytes(*prefix);
        let declared = usize::try_from(size)
            .map_err(|_| CodecError::Other(format!("lz4 block has negative size {size}")))?;
        if declared != decoded_size {
            return Err(CodecError::UnexpectedDecodedSize {
                expected: decoded_size,
                actual: declared,
            });
        }
        let out = lz4::block::decompress(block, Some(size))?;
        check_decoded_size(out, decoded_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_prefix_is_checked_first() {
        let codec = Lz4Codec::new(1).unwrap();
        let mut encoded = codec.encode(&[5u8; 32]).unwrap();
        assert_eq!(&encoded[..4], &32i32.to_le_bytes());
        assert_eq!(codec.decode(&encoded, 32).unwrap(), vec![5u8; 32]);

        encoded[..4].copy_from_slice(&i32::MAX.to_le_bytes());
        assert!(matches!(
            codec.decode(&encoded, 32),
            Err(CodecError::UnexpectedDecodedSize {
                expected: 32,
                actual: 0x7fff_ffff
            })
        ));
        encoded[..4].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            codec.decode(&encoded, 32),
            Err(CodecError::Other(_))
        ));
        assert!(matches!(codec.decode(&[1, 0], 1), Err(CodecError::Other(_))));
    }
}
