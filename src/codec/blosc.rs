use std::ffi::{CString, c_char, c_int, c_void};

use blosc_sys::{
    blosc_cbuffer_sizes, blosc_compress_ctx, blosc_decompress_ctx, blosc_get_complib_info,
};

use super::{
    CodecError, CodecPlugin, CodecTraits, Compression, check_decoded_size, wrong_compression,
};

const IDENTIFIER: &str = "blosc";

/// The size of the blosc frame header, and the maximum expansion of incompressible input.
const BLOSC_MAX_OVERHEAD: usize = 16;

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, create_codec_blosc)
}

fn create_codec_blosc(compression: &Compression) -> Result<Box<dyn CodecTraits>, CodecError> {
    match compression {
        Compression::Blosc {
            cname,
            clevel,
            shuffle,
        } => Ok(Box::new(BloscCodec::new(cname, *clevel, *shuffle)?)),
        c => Err(wrong_compression(IDENTIFIER, c)),
    }
}

/// A `blosc` codec implementation.
///
/// Shuffling treats the input as single bytes, as this codec has no element size.
#[derive(Clone, Debug)]
pub struct BloscCodec {
    cname: CString,
    clevel: u8,
    shuffle: u8,
}

impl BloscCodec {
    /// Create a new `blosc` codec.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidConfiguration`] if the compressor is not supported by the
    /// linked blosc library, or `clevel` or `shuffle` are out of range.
    pub fn new(cname: &str, clevel: u8, shuffle: u8) -> Result<Self, CodecError> {
        let invalid = |message: String| CodecError::InvalidConfiguration {
            codec: IDENTIFIER,
            message,
        };
        if clevel > 9 {
            return Err(invalid(format!("invalid clevel {clevel}")));
        }
        if shuffle > 2 {
            return Err(invalid(format!("invalid shuffle {shuffle}")));
        }
        let cname = CString::new(cname).map_err(|e| invalid(e.to_string()))?;
        let support = unsafe {
            blosc_get_complib_info(
                cname.as_ptr().cast::<c_char>(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        if support < 0 {
            return Err(invalid(format!("compressor {cname:?} is not supported")));
        }
        Ok(Self {
            cname,
            clevel,
            shuffle,
        })
    }
}

impl CodecTraits for BloscCodec {
    fn compression(&self) -> Compression {
        Compression::Blosc {
            cname: self.cname.to_string_lossy().into_owned(),
            clevel: self.clevel,
            shuffle: self.shuffle,
        }
    }

    fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
        let destsize = decoded_value.len() + BLOSC_MAX_OVERHEAD;
        let mut dest: Vec<u8> = vec![0; destsize];
        let written = unsafe {
            blosc_compress_ctx(
                c_int::from(self.clevel),
                c_int::from(self.shuffle),
                1,
                decoded_value.len(),
                decoded_value.as_ptr().cast::<c_void>(),
                dest.as_mut_ptr().cast::<c_void>(),
                destsize,
                self.cname.as_ptr().cast::<c_char>(),
                0,
                1,
            )
        };
        let written = usize::try_from(written).map_err(|_| {
            CodecError::Other(format!("blosc compression failed with code {written}"))
        })?;
        if written == 0 {
            return Err(CodecError::Other("blosc output buffer too small".into()));
        }
        dest.truncate(written);
        Ok(dest)
    }

    fn decode(&self, encoded_value: &[u8], decoded_size: usize) -> Result<Vec<u8>, CodecError> {
        if encoded_value.len() < BLOSC_MAX_OVERHEAD {
            return Err(CodecError::Other("blosc frame is truncated".into()));
        }
        let mut nbytes: usize = 0;
        let mut cbytes: usize = 0;
        let mut blocksize: usize = 0;
        unsafe {
            blosc_cbuffer_sizes(
                encoded_value.as_ptr().cast::<c_void>(),
                &raw mut nbytes,
                &raw mut cbytes,
                &raw mut blocksize,
            );
        }
        if cbytes > encoded_value.len() {
            return Err(CodecError::Other(format!(
                "blosc frame declares {cbytes} bytes, got {}",
                encoded_value.len()
            )));
        }
        if nbytes != decoded_size {
            return Err(CodecError::UnexpectedDecodedSize {
                expected: decoded_size,
                actual: nbytes,
            });
        }
        let mut dest: Vec<u8> = vec![0; nbytes];
        let read = unsafe {
            blosc_decompress_ctx(
                encoded_value.as_ptr().cast::<c_void>(),
                dest.as_mut_ptr().cast::<c_void>(),
                nbytes,
                1,
            )
        };
        let read = usize::try_from(read).map_err(|_| {
            CodecError::Other(format!("blosc decompression failed with code {read}"))
        })?;
        dest.truncate(read);
        check_decoded_size(dest, decoded_size)
    }
}
