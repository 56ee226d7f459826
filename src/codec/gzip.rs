use std::io::Read;

use flate2::bufread::{GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};

use super::{
    CodecError, CodecPlugin, CodecTraits, Compression, read_decoded, wrong_compression,
};

const IDENTIFIER: &str = "gzip";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, create_codec_gzip)
}

fn create_codec_gzip(compression: &Compression) -> Result<Box<dyn CodecTraits>, CodecError> {
    match compression {
        Compression::Gzip { level, use_zlib } => Ok(Box::new(GzipCodec::new(*level, *use_zlib)?)),
        c => Err(wrong_compression(IDENTIFIER, c)),
    }
}

/// A deflate codec with either a gzip or a zlib header.
#[derive(Clone, Debug)]
pub struct GzipCodec {
    /// As configured; -1 is the default level.
    level: i32,
    compression: flate2::Compression,
    use_zlib: bool,
}

impl GzipCodec {
    /// Create a new `gzip` codec.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidConfiguration`] if `level` is not in -1..=9.
    pub fn new(level: i32, use_zlib: bool) -> Result<Self, CodecError> {
        let lvl_int: u32 = match level {
            -1 => 6,
            n @ 0..=9 => n.unsigned_abs(),
            n => {
                return Err(CodecError::InvalidConfiguration {
                    codec: IDENTIFIER,
                    message: format!("invalid compression level {n}"),
                });
            }
        };
        Ok(Self {
            level,
            compression: flate2::Compression::new(lvl_int),
            use_zlib,
        })
    }
}

impl CodecTraits for GzipCodec {
    fn compression(&self) -> Compression {
        Compression::Gzip {
            level: self.level,
            use_zlib: self.use_zlib,
        }
    }

    fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out: Vec<u8> = Vec::new();
        if self.use_zlib {
            ZlibEncoder::new(decoded_value, self.compression).read_to_end(&mut out)?;
        } else {
            GzEncoder::new(decoded_value, self.compression).read_to_end(&mut out)?;
        }
        Ok(out)
    }

    fn decode(&self, encoded_value: &[u8], decoded_size: usize) -> Result<Vec<u8>, CodecError> {
        if self.use_zlib {
            read_decoded(ZlibDecoder::new(encoded_value), decoded_size)
        } else {
            read_decoded(GzDecoder::new(encoded_value), decoded_size)
        }
    }
}
