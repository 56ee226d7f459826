use std::io::Read;

use xz2::read::{XzDecoder, XzEncoder};

use super::{
    CodecError, CodecPlugin, CodecTraits, Compression, read_decoded, wrong_compression,
};

const IDENTIFIER: &str = "xz";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, create_codec_xz)
}

fn create_codec_xz(compression: &Compression) -> Result<Box<dyn CodecTraits>, CodecError> {
    match compression {
        Compression::Xz { preset } => Ok(Box::new(XzCodec::new(*preset)?)),
        c => Err(wrong_compression(IDENTIFIER, c)),
    }
}

/// An `xz` codec implementation.
#[derive(Clone, Debug)]
pub struct XzCodec {
    preset: u32,
}

impl XzCodec {
    /// Create a new `xz` codec.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidConfiguration`] if `preset` is not in 0..=9.
    pub fn new(preset: u32) -> Result<Self, CodecError> {
        if preset > 9 {
            return Err(CodecError::InvalidConfiguration {
                codec: IDENTIFIER,
                message: format!("invalid preset {preset}"),
            });
        }
        Ok(Self { preset })
    }
}

impl CodecTraits for XzCodec {
    fn compression(&self) -> Compression {
        Compression::Xz {
            preset: self.preset,
        }
    }

    fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out: Vec<u8> = Vec::new();
        XzEncoder::new(decoded_value, self.preset).read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded_value: &[u8], decoded_size: usize) -> Result<Vec<u8>, CodecError> {
        read_decoded(XzDecoder::new(encoded_value), decoded_size)
    }
}
