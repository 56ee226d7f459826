//! Read-only dataset metadata and its N5 and zarr JSON representations.

use serde::{Deserialize, Serialize};

use crate::chunk_key_encoding::{ChunkKeyEncoding, ChunkKeySeparator};
use crate::codec::Compression;
use crate::data_type::DataType;
use crate::endianness::Endianness;
use crate::fill_value::FillValue;
use crate::format::Flavor;

/// Everything the chunk I/O path needs to know about a dataset.
///
/// Shapes are in C order for both flavors.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetMetadata {
    pub shape: Vec<u64>,
    pub chunk_shape: Vec<u64>,
    pub data_type: DataType,
    pub fill_value: FillValue,
    pub compression: Compression,
    pub flavor: Flavor,
    /// Byte order of element payloads.
    pub endianness: Endianness,
    /// Chunk key separator; only used by zarr.
    pub separator: ChunkKeySeparator,
}

impl DatasetMetadata {
    /// Uncompressed metadata with a zero fill value and the flavor's default payload byte order.
    #[must_use]
    pub fn new(
        flavor: Flavor,
        shape: Vec<u64>,
        chunk_shape: Vec<u64>,
        data_type: DataType,
    ) -> Self {
        Self {
            shape,
            chunk_shape,
            data_type,
            fill_value: FillValue::zero(data_type),
            compression: Compression::Raw,
            flavor,
            endianness: flavor.default_endianness(),
            separator: ChunkKeySeparator::default(),
        }
    }

    #[must_use]
    pub fn with_fill_value(mut self, fill_value: impl Into<FillValue>) -> Self {
        self.fill_value = fill_value.into();
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Ignored for N5, whose payloads are always big-endian.
    #[must_use]
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        if self.flavor == Flavor::Zarr {
            self.endianness = endianness;
        }
        self
    }

    #[must_use]
    pub fn with_separator(mut self, separator: ChunkKeySeparator) -> Self {
        self.separator = separator;
        self
    }

    #[must_use]
    pub fn key_encoding(&self) -> ChunkKeyEncoding {
        match self.flavor {
            Flavor::Zarr => ChunkKeyEncoding::Zarr(self.separator),
            Flavor::N5 => ChunkKeyEncoding::N5,
        }
    }

    /// The name of the metadata document within a dataset.
    #[must_use]
    pub fn metadata_key(flavor: Flavor) -> &'static str {
        match flavor {
            Flavor::Zarr => ".zarray",
            Flavor::N5 => "attributes.json",
        }
    }

    /// Parse a metadata document of `flavor`.
    ///
    /// # Errors
    /// Returns an error if the document is not valid JSON for that flavor,
    /// or it describes an unsupported data type, compressor or layout.
    pub fn from_json(flavor: Flavor, bytes: &[u8]) -> crate::Result<Self> {
        match flavor {
            Flavor::Zarr => serde_json::from_slice::<ZarrArrayMetadata>(bytes)?.try_into(),
            Flavor::N5 => serde_json::from_slice::<N5ArrayMetadata>(bytes)?.try_into(),
        }
    }
}

/// Representation of N5 array metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct N5ArrayMetadata {
    /// N5 version; present if this is a hierarchy root.
    #[serde(rename = "n5", default, skip_serializing_if = "Option::is_none")]
    pub n5_version: Option<String>,
    /// Array shape. Note that N5 uses F order, so the dimensions are reversed compared to Zarr.
    pub dimensions: Vec<u64>,
    /// Chunk shape. Note that N5 uses F order, so the dimensions are reversed compared to Zarr.
    pub block_size: Vec<u64>,
    /// Data type as a string.
    pub data_type: String,
    /// Chunk compression configuration.
    #[serde(default)]
    pub compression: N5Compression,
    /// Unstructured attributes.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// N5 chunk compression configuration.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum N5Compression {
    /// Uncompressed.
    #[default]
    Raw,
    #[serde(rename_all = "camelCase")]
    Bzip2 {
        /// Default 9. Must be in the range 1..=9.
        #[serde(default = "default_bzip2_block_size")]
        block_size: u32,
    },
    #[serde(rename_all = "camelCase")]
    Gzip {
        /// Default -1, meaning "implementation default" (usually 6).
        #[serde(default = "default_gzip_level")]
        level: i32,
        #[serde(default)]
        use_zlib: bool,
    },
    #[serde(rename_all = "camelCase")]
    Lz4 {
        /// Default 65536. Not used by the block codec.
        #[serde(default = "default_lz4_block_size")]
        block_size: u64,
    },
    Xz {
        /// Default 6.
        #[serde(default = "default_xz_preset")]
        preset: u32,
    },
    Blosc {
        #[serde(default = "default_blosc_cname")]
        cname: String,
        #[serde(default = "default_blosc_clevel")]
        clevel: u8,
        #[serde(default = "default_blosc_shuffle")]
        shuffle: u8,
    },
}

fn default_bzip2_block_size() -> u32 {
    9
}

fn default_gzip_level() -> i32 {
    -1
}

fn default_lz4_block_size() -> u64 {
    65536
}

fn default_xz_preset() -> u32 {
    6
}

fn default_blosc_cname() -> String {
    "lz4".to_string()
}

fn default_blosc_clevel() -> u8 {
    5
}

fn default_blosc_shuffle() -> u8 {
    1
}

impl From<N5Compression> for Compression {
    fn from(value: N5Compression) -> Self {
        match value {
            N5Compression::Raw => Self::Raw,
            N5Compression::Bzip2 { block_size } => Self::Bzip2 { block_size },
            N5Compression::Gzip { level, use_zlib } => Self::Gzip { level, use_zlib },
            N5Compression::Lz4 { .. } => Self::Lz4 { acceleration: 1 },
            N5Compression::Xz { preset } => Self::Xz { preset },
            N5Compression::Blosc {
                cname,
                clevel,
                shuffle,
            } => Self::Blosc {
                cname,
                clevel,
                shuffle,
            },
        }
    }
}

/// Reverse F-order N5 dimensions into C order.
fn reversed(dims: &[u64]) -> Vec<u64> {
    dims.iter().rev().copied().collect()
}

impl TryFrom<N5ArrayMetadata> for DatasetMetadata {
    type Error = crate::Error;

    fn try_from(value: N5ArrayMetadata) -> Result<Self, Self::Error> {
        let data_type = DataType::from_name(&value.data_type)?;
        let out = Self::new(
            Flavor::N5,
            reversed(&value.dimensions),
            reversed(&value.block_size),
            data_type,
        )
        .with_compression(value.compression.into());
        Ok(out)
    }
}

/// Representation of zarr array metadata (`.zarray`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZarrArrayMetadata {
    #[serde(default = "default_zarr_format")]
    pub zarr_format: u8,
    pub shape: Vec<u64>,
    pub chunks: Vec<u64>,
    /// A numpy-style type string such as `<f4`.
    pub dtype: String,
    /// A numcodecs compressor configuration with an `id`, or null.
    #[serde(default)]
    pub compressor: Option<serde_json::Value>,
    #[serde(default)]
    pub fill_value: serde_json::Value,
    #[serde(default = "default_zarr_order")]
    pub order: String,
    #[serde(default)]
    pub filters: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub dimension_separator: ChunkKeySeparator,
}

fn default_zarr_format() -> u8 {
    2
}

fn default_zarr_order() -> String {
    "C".to_string()
}

/// numcodecs compressor configurations.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "id", rename_all = "lowercase")]
enum ZarrCompressor {
    Raw,
    Zlib {
        #[serde(default = "default_gzip_level")]
        level: i32,
    },
    Gzip {
        #[serde(default = "default_gzip_level")]
        level: i32,
    },
    Bz2 {
        #[serde(default = "default_bzip2_block_size")]
        level: u32,
    },
    Lz4 {
        #[serde(default = "default_lz4_acceleration")]
        acceleration: i32,
    },
    Lzma {
        /// numcodecs writes null for the default preset.
        #[serde(default)]
        preset: Option<u32>,
    },
    Blosc {
        #[serde(default = "default_blosc_cname")]
        cname: String,
        #[serde(default = "default_blosc_clevel")]
        clevel: u8,
        /// -1 means automatic, which is byte shuffle for this codec.
        #[serde(default = "default_zarr_blosc_shuffle")]
        shuffle: i8,
    },
}

fn default_lz4_acceleration() -> i32 {
    1
}

fn default_zarr_blosc_shuffle() -> i8 {
    1
}

impl TryFrom<ZarrCompressor> for Compression {
    type Error = crate::Error;

    fn try_from(value: ZarrCompressor) -> Result<Self, Self::Error> {
        let out = match value {
            ZarrCompressor::Raw => Self::Raw,
            ZarrCompressor::Zlib { level } => Self::Gzip {
                level,
                use_zlib: true,
            },
            ZarrCompressor::Gzip { level } => Self::Gzip {
                level,
                use_zlib: false,
            },
            ZarrCompressor::Bz2 { level } => Self::Bzip2 { block_size: level },
            ZarrCompressor::Lz4 { acceleration } => Self::Lz4 { acceleration },
            ZarrCompressor::Lzma { preset } => Self::Xz {
                preset: preset.unwrap_or_else(default_xz_preset),
            },
            ZarrCompressor::Blosc {
                cname,
                clevel,
                shuffle,
            } => Self::Blosc {
                cname,
                clevel,
                shuffle: match shuffle {
                    -1 => 1,
                    n => u8::try_from(n).map_err(|_| {
                        crate::Error::InvalidMetadata(format!("invalid blosc shuffle {n}"))
                    })?,
                },
            },
        };
        Ok(out)
    }
}

fn zarr_compression(compressor: Option<serde_json::Value>) -> crate::Result<Compression> {
    let Some(compressor) = compressor.filter(|c| !c.is_null()) else {
        return Ok(Compression::Raw);
    };
    let id = compressor
        .get("id")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| crate::Error::InvalidMetadata("zarr compressor has no id".to_string()))?;
    // Unknown names are UnsupportedCodec rather than a parse error.
    Compression::from_name(id, Flavor::Zarr)?;
    serde_json::from_value::<ZarrCompressor>(compressor)?.try_into()
}

impl TryFrom<ZarrArrayMetadata> for DatasetMetadata {
    type Error = crate::Error;

    fn try_from(value: ZarrArrayMetadata) -> Result<Self, Self::Error> {
        if value.zarr_format != 2 {
            return Err(crate::Error::InvalidMetadata(format!(
                "unsupported zarr format {}",
                value.zarr_format
            )));
        }
        if value.order != "C" {
            return Err(crate::Error::InvalidMetadata(format!(
                "unsupported memory order {}",
                value.order
            )));
        }
        if value.filters.as_ref().is_some_and(|f| !f.is_empty()) {
            return Err(crate::Error::InvalidMetadata(
                "zarr filters are not supported".to_string(),
            ));
        }
        let (data_type, endianness) = DataType::from_zarr_dtype(&value.dtype)?;
        let fill_value = FillValue::from_json(&value.fill_value, data_type)?;
        let out = Self::new(Flavor::Zarr, value.shape, value.chunks, data_type)
            .with_fill_value(fill_value)
            .with_compression(zarr_compression(value.compressor)?)
            .with_endianness(endianness)
            .with_separator(value.dimension_separator);
        Ok(out)
    }
}
