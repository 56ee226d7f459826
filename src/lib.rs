//! Chunked, compressed N-dimensional arrays in the zarr and N5 formats.
//!
//! A [`Dataset`] reads and writes whole chunks, addressed by their index in the chunk grid.
//! Chunks whose elements all equal the fill value are not stored.
//!
//! ```
//! use std::sync::Arc;
//!
//! use z5::{DataType, Dataset, DatasetMetadata, Flavor, OpenMode, storage::MemoryStore};
//!
//! let store = Arc::new(MemoryStore::new());
//! let meta = DatasetMetadata::new(Flavor::N5, vec![10, 10], vec![4, 4], DataType::UInt8);
//! let ds = Dataset::new(store, "data", meta, OpenMode::Append)?;
//!
//! ds.write_chunk(&[0, 0], &[1u8; 16])?;
//! let mut out = [0u8; 16];
//! ds.read_chunk(&[0, 0], &mut out)?;
//! assert_eq!(out, [1u8; 16]);
//!
//! ds.write_chunk(&[2, 2], &[0u8; 4])?;
//! assert!(!ds.chunk_exists(&[2, 2])?);
//! # Ok::<(), z5::Error>(())
//! ```

pub mod chunk;
pub mod chunk_grid;
pub mod chunk_key_encoding;
pub mod codec;
pub mod data_type;
pub mod dataset;
pub mod endianness;
mod error;
pub mod fill_value;
pub mod format;
pub mod metadata;
pub mod storage;

pub use codec::{Compression, available_codecs};
pub use data_type::{DataType, Element};
pub use dataset::{Dataset, OpenMode};
pub use error::{Error, Result};
pub use fill_value::FillValue;
pub use format::{EncodedChunk, Flavor};
pub use metadata::DatasetMetadata;
