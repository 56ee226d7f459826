use std::io::Read;

use super::{
    CodecError, CodecPlugin, CodecTraits, Compression, read_decoded, wrong_compression,
};

const IDENTIFIER: &str = "bzip2";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, create_codec_bzip2)
}

fn create_codec_bzip2(compression: &Compression) -> Result<Box<dyn CodecTraits>, CodecError> {
    match compression {
        Compression::Bzip2 { block_size } => Ok(Box::new(Bzip2Codec::new(*block_size)?)),
        c => Err(wrong_compression(IDENTIFIER, c)),
    }
}

/// A `bzip2` codec implementation.
#[derive(Clone, Debug)]
pub struct Bzip2Codec {
    compression: bzip2::Compression,
}

impl Bzip2Codec {
    /// Create a new `bzip2` codec.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidConfiguration`] if `block_size` is not in 1..=9.
    pub fn new(block_size: u32) -> Result<Self, CodecError> {
        if !(1..=9).contains(&block_size) {
            return Err(CodecError::InvalidConfiguration {
                codec: IDENTIFIER,
                message: format!("invalid block size {block_size}"),
            });
        }
        Ok(Self {
            compression: bzip2::Compression::new(block_size),
        })
    }
}

impl CodecTraits for Bzip2Codec {
    fn compression(&self) -> Compression {
        Compression::Bzip2 {
            block_size: self.compression.level(),
        }
    }

    fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = bzip2::read::BzEncoder::new(decoded_value, self.compression);
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded_value: &[u8], decoded_size: usize) -> Result<Vec<u8>, CodecError> {
        read_decoded(bzip2::read::BzDecoder::new(encoded_value), decoded_size)
    }
}
