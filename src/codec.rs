//! Compression codecs and their flavor-specific names.
//!
//! Each codec registers a [`CodecPlugin`] when its cargo feature is enabled.
//! `raw` is always available.

use std::fmt::Debug;

use crate::format::Flavor;

mod raw;

#[cfg(feature = "blosc")]
mod blosc;
#[cfg(feature = "bzip2")]
mod bzip2;
#[cfg(feature = "gzip")]
mod gzip;
#[cfg(feature = "lz4")]
mod lz4;
#[cfg(feature = "xz")]
mod xz;

/// A codec error.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An IO error, usually from a malformed compressed stream.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("decoded {actual} bytes, expected {expected}")]
    UnexpectedDecodedSize { expected: usize, actual: usize },
    #[error("invalid configuration for {codec}: {message}")]
    InvalidConfiguration {
        codec: &'static str,
        message: String,
    },
    #[error("{0}")]
    Other(String),
}

/// Compressor configuration, independent of format flavor.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Compression {
    /// Uncompressed.
    #[default]
    Raw,
    /// Deflate with a gzip header, or a zlib header if `use_zlib`.
    Gzip {
        /// -1 means the implementation default (6).
        level: i32,
        use_zlib: bool,
    },
    Bzip2 {
        /// In the range 1..=9.
        block_size: u32,
    },
    Lz4 {
        /// 1 is the default; higher is faster with less compression.
        acceleration: i32,
    },
    Xz {
        /// In the range 0..=9.
        preset: u32,
    },
    Blosc {
        cname: String,
        clevel: u8,
        /// 0 no shuffle, 1 byte shuffle, 2 bit shuffle.
        shuffle: u8,
    },
}

impl Compression {
    /// The identifier of the codec plugin implementing this compression.
    #[must_use]
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Gzip { .. } => "gzip",
            Self::Bzip2 { .. } => "bzip2",
            Self::Lz4 { .. } => "lz4",
            Self::Xz { .. } => "xz",
            Self::Blosc { .. } => "blosc",
        }
    }

    /// The name of this compression in the metadata of `flavor`.
    #[must_use]
    pub fn name(&self, flavor: Flavor) -> &'static str {
        match (flavor, self) {
            (_, Self::Raw) => "raw",
            (Flavor::Zarr, Self::Gzip { use_zlib: true, .. }) => "zlib",
            (_, Self::Gzip { .. }) => "gzip",
            (Flavor::Zarr, Self::Bzip2 { .. }) => "bz2",
            (Flavor::N5, Self::Bzip2 { .. }) => "bzip2",
            (_, Self::Lz4 { .. }) => "lz4",
            (Flavor::Zarr, Self::Xz { .. }) => "lzma",
            (Flavor::N5, Self::Xz { .. }) => "xz",
            (_, Self::Blosc { .. }) => "blosc",
        }
    }

    /// The compression called `name` in the metadata of `flavor`, with default parameters.
    pub fn from_name(name: &str, flavor: Flavor) -> crate::Result<Self> {
        let out = match (flavor, name) {
            (_, "raw") => Self::Raw,
            (Flavor::Zarr, "zlib") => Self::Gzip {
                level: -1,
                use_zlib: true,
            },
            (_, "gzip") => Self::Gzip {
                level: -1,
                use_zlib: false,
            },
            (Flavor::Zarr, "bz2") | (Flavor::N5, "bzip2") => Self::Bzip2 { block_size: 9 },
            (_, "lz4") => Self::Lz4 { acceleration: 1 },
            (Flavor::Zarr, "lzma") | (Flavor::N5, "xz") => Self::Xz { preset: 6 },
            (_, "blosc") => Self::Blosc {
                cname: "lz4".into(),
                clevel: 5,
                shuffle: 1,
            },
            (flavor, name) => {
                return Err(crate::Error::UnsupportedCodec(format!(
                    "unknown {flavor} compression {name}"
                )));
            }
        };
        Ok(out)
    }
}

/// A compression codec mapping raw bytes to an encoded byte sequence and back.
pub trait CodecTraits: Debug + Send + Sync {
    /// The configuration this codec was created with.
    fn compression(&self) -> Compression;

    fn encode(&self, decoded_value: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decode `encoded_value`, which must yield exactly `decoded_size` bytes.
    fn decode(&self, encoded_value: &[u8], decoded_size: usize) -> Result<Vec<u8>, CodecError>;
}

/// A registered codec implementation.
pub struct CodecPlugin {
    identifier: &'static str,
    create: fn(&Compression) -> Result<Box<dyn CodecTraits>, CodecError>,
}

inventory::collect!(CodecPlugin);

impl CodecPlugin {
    pub const fn new(
        identifier: &'static str,
        create: fn(&Compression) -> Result<Box<dyn CodecTraits>, CodecError>,
    ) -> Self {
        Self { identifier, create }
    }

    #[must_use]
    pub fn identifier(&self) -> &'static str {
        self.identifier
    }
}

/// Create the codec implementing `compression`.
///
/// # Errors
/// Returns [`crate::Error::UnsupportedCodec`] if no codec for it was compiled in,
/// or [`crate::Error::Codec`] if the configuration is invalid.
pub fn create_codec(compression: &Compression) -> crate::Result<Box<dyn CodecTraits>> {
    let identifier = compression.identifier();
    let plugin = inventory::iter::<CodecPlugin>
        .into_iter()
        .find(|p| p.identifier == identifier)
        .ok_or_else(|| {
            crate::Error::UnsupportedCodec(format!("codec {identifier} is not available"))
        })?;
    Ok((plugin.create)(compression)?)
}

/// The identifiers of all codecs available in this build, sorted.
#[must_use]
pub fn available_codecs() -> Vec<&'static str> {
    let mut out: Vec<_> = inventory::iter::<CodecPlugin>
        .into_iter()
        .map(CodecPlugin::identifier)
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

pub(crate) fn check_decoded_size(decoded: Vec<u8>, expected: usize) -> Result<Vec<u8>, CodecError> {
    if decoded.len() == expected {
        Ok(decoded)
    } else {
        Err(CodecError::UnexpectedDecodedSize {
            expected,
            actual: decoded.len(),
        })
    }
}

/// Read `decoder` to its end, stopping one byte past `decoded_size`.
#[cfg(any(feature = "gzip", feature = "bzip2", feature = "xz"))]
pub(crate) fn read_decoded(
    decoder: impl std::io::Read,
    decoded_size: usize,
) -> Result<Vec<u8>, CodecError> {
    use std::io::Read;

    let limit = u64::try_from(decoded_size).map_or(u64::MAX, |n| n.saturating_add(1));
    let mut out: Vec<u8> = Vec::new();
    decoder.take(limit).read_to_end(&mut out)?;
    check_decoded_size(out, decoded_size)
}

pub(crate) fn wrong_compression(codec: &'static str, compression: &Compression) -> CodecError {
    CodecError::InvalidConfiguration {
        codec,
        message: format!("cannot be created from {compression:?}"),
    }
}
