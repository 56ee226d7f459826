use super::{
    CodecError, CodecPlugin, CodecTraits, Compression, check_decoded_size, wrong_compression,
};

const IDENTIFIER: &str = "raw";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, create_codec_raw)
}

fn create_codec_raw(compression: &Compression) -> Result<Box<dyn CodecTraits>, CodecError> {
    match compression {
        Compression::Raw => Ok(Box::new(RawCodec)),
        c => Err(wrong_compression(IDENTIFIER, c)),
    }
}

/// The identity codec.
#[derive(Debug, Clone, Copy)]
pub struct RawCodec;

impl CodecTraits for RawCodec {
    fn compression(&self) -> Compression {
        Compression::Raw
    }

    fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(decoded_value.to_vec())
    }

    fn decode(&self, encoded_value: &[u8], decoded_size: usize) -> Result<Vec<u8>, CodecError> {
        check_decoded_size(encoded_value.to_vec(), decoded_size)
    }
}
