//! Chunk I/O on a single dataset.

use std::fmt::Display;
use std::str::FromStr;

use crate::chunk::Chunk;
use crate::chunk_grid::ChunkGrid;
use crate::chunk_key_encoding::ChunkKeyEncoding;
use crate::codec::{CodecTraits, Compression, create_codec};
use crate::data_type::{DataType, Element};
use crate::fill_value::FillValue;
use crate::format::{ChunkFormat, EncodedChunk, Flavor};
use crate::metadata::DatasetMetadata;
use crate::storage::{
    ByteRange, Bytes, ReadableStorageTraits, ReadableWritableStorage, StoreKey,
    WritableStorageTraits, node_key, normalize_path,
};

/// How a dataset was opened, using the usual file mode strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// `r`
    ReadOnly,
    /// `r+`
    ReadWrite,
    /// `w`
    Create,
    /// `w-`
    CreateExclusive,
    /// `a`
    #[default]
    Append,
}

impl OpenMode {
    #[must_use]
    pub fn can_write(self) -> bool {
        !matches!(self, Self::ReadOnly)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "r",
            Self::ReadWrite => "r+",
            Self::Create => "w",
            Self::CreateExclusive => "w-",
            Self::Append => "a",
        }
    }
}

impl Display for OpenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpenMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let out = match s {
            "r" => Self::ReadOnly,
            "r+" => Self::ReadWrite,
            "w" => Self::Create,
            "w-" => Self::CreateExclusive,
            "a" => Self::Append,
            _ => return Err(crate::Error::general(format!("invalid open mode {s:?}"))),
        };
        Ok(out)
    }
}

/// A chunked dataset bound to one element type, one codec and one store location.
///
/// A dataset owns its codec and cannot be cloned; share it by reference.
pub struct Dataset {
    store: ReadableWritableStorage,
    path: String,
    metadata: DatasetMetadata,
    grid: ChunkGrid,
    key_encoding: ChunkKeyEncoding,
    format: ChunkFormat,
    codec: Box<dyn CodecTraits>,
    mode: OpenMode,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("codec", &self.codec)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Dataset {
    /// Create a dataset at `path` in `store` from existing metadata.
    ///
    /// `path` is `/`-delimited; leading and trailing slashes are ignored.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidMetadata`] if the shapes or fill value are inconsistent,
    /// and [`crate::Error::UnsupportedCodec`] if the compression is not available in this build.
    pub fn new(
        store: ReadableWritableStorage,
        path: &str,
        metadata: DatasetMetadata,
        mode: OpenMode,
    ) -> crate::Result<Self> {
        let path = normalize_path(path);
        let grid = ChunkGrid::new(metadata.shape.clone(), metadata.chunk_shape.clone())?;
        if metadata.fill_value.size() != metadata.data_type.size() {
            return Err(crate::Error::InvalidMetadata(format!(
                "fill value {} is not a {}",
                metadata.fill_value, metadata.data_type
            )));
        }
        let codec = create_codec(&metadata.compression)?;
        let format = ChunkFormat::new(metadata.flavor, metadata.data_type, metadata.endianness);
        let key_encoding = metadata.key_encoding();
        log::debug!(
            "opened {} dataset {path:?} ({}, shape {:?}, chunks {:?}, compression {})",
            metadata.flavor,
            metadata.data_type,
            metadata.shape,
            metadata.chunk_shape,
            metadata.compression.name(metadata.flavor),
        );
        Ok(Self {
            store,
            path,
            metadata,
            grid,
            key_encoding,
            format,
            codec,
            mode,
        })
    }

    /// Open the dataset at `path` in `store`, reading its `attributes.json` or `.zarray`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidMetadata`] if there is no metadata document,
    /// or any error of parsing it or [`Dataset::new`].
    pub fn open(
        store: ReadableWritableStorage,
        path: &str,
        flavor: Flavor,
        mode: OpenMode,
    ) -> crate::Result<Self> {
        let key = node_key(&normalize_path(path), DatasetMetadata::metadata_key(flavor))?;
        let bytes = store.get(&key)?.ok_or_else(|| {
            crate::Error::InvalidMetadata(format!("no {flavor} metadata at {key}"))
        })?;
        let metadata = DatasetMetadata::from_json(flavor, &bytes)?;
        Self::new(store, path, metadata, mode)
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    #[must_use]
    pub fn flavor(&self) -> Flavor {
        self.metadata.flavor
    }

    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.metadata.data_type
    }

    #[must_use]
    pub fn fill_value(&self) -> &FillValue {
        &self.metadata.fill_value
    }

    #[must_use]
    pub fn compression(&self) -> &Compression {
        &self.metadata.compression
    }

    /// The name of the compressor in this dataset's metadata, e.g. `bz2` for zarr.
    #[must_use]
    pub fn compressor_name(&self) -> &'static str {
        self.metadata.compression.name(self.metadata.flavor)
    }

    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.grid.dimensionality()
    }

    /// The array shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        self.grid.array_shape()
    }

    /// The chunk shape away from the upper array boundary.
    #[must_use]
    pub fn nominal_chunk_shape(&self) -> &[u64] {
        self.grid.chunk_shape()
    }

    /// The number of chunks along each dimension.
    #[must_use]
    pub fn grid_shape(&self) -> &[u64] {
        self.grid.grid_shape()
    }

    #[must_use]
    pub fn num_chunks(&self) -> u64 {
        self.grid.num_chunks()
    }

    /// Check that a request for elements of `data_type` matches this dataset.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeMismatch`] if it does not.
    pub fn check_request_type(&self, data_type: DataType) -> crate::Result<()> {
        if data_type == self.metadata.data_type {
            Ok(())
        } else {
            Err(crate::Error::TypeMismatch {
                expected: self.metadata.data_type,
                requested: data_type,
            })
        }
    }

    fn chunk(&self, chunk_indices: &[u64]) -> crate::Result<Chunk> {
        Chunk::new(&self.grid, &self.key_encoding, &self.path, chunk_indices)
    }

    /// The effective shape of the chunk at `chunk_indices`, clipped to the array.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidChunk`] if the indices are outside the chunk grid.
    pub fn chunk_shape(&self, chunk_indices: &[u64]) -> crate::Result<Vec<u64>> {
        Ok(self.chunk(chunk_indices)?.shape().to_vec())
    }

    /// The number of elements in the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidChunk`] if the indices are outside the chunk grid.
    pub fn chunk_num_elements(&self, chunk_indices: &[u64]) -> crate::Result<u64> {
        Ok(self.chunk(chunk_indices)?.num_elements())
    }

    /// The storage key of the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidChunk`] if the indices are outside the chunk grid.
    pub fn chunk_key(&self, chunk_indices: &[u64]) -> crate::Result<StoreKey> {
        Ok(self.chunk(chunk_indices)?.key().clone())
    }

    /// Whether a chunk is stored at `chunk_indices`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidChunk`] if the indices are outside the chunk grid,
    /// or a storage error.
    pub fn chunk_exists(&self, chunk_indices: &[u64]) -> crate::Result<bool> {
        let chunk = self.chunk(chunk_indices)?;
        Ok(self.store.size_key(chunk.key())?.is_some())
    }

    /// The size in bytes of the stored chunk at `chunk_indices`, including any header.
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingChunk`] if the chunk is not stored,
    /// [`crate::Error::InvalidChunk`] if the indices are outside the chunk grid,
    /// or a storage error.
    pub fn chunk_byte_size(&self, chunk_indices: &[u64]) -> crate::Result<u64> {
        let chunk = self.chunk(chunk_indices)?;
        self.store
            .size_key(chunk.key())?
            .ok_or_else(|| crate::Error::MissingChunk(chunk.key().to_string()))
    }

    /// Whether the chunk at `chunk_indices` is variable-length, and its number of elements.
    ///
    /// Only the chunk header is read.
    /// Chunks which are not stored, and all zarr chunks, report their effective element count.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptChunk`] if the header is malformed,
    /// [`crate::Error::InvalidChunk`] if the indices are outside the chunk grid,
    /// or a storage error.
    pub fn check_varlen_chunk(&self, chunk_indices: &[u64]) -> crate::Result<(bool, u64)> {
        let chunk = self.chunk(chunk_indices)?;
        let prefix = match self.format.flavor() {
            Flavor::Zarr => None,
            Flavor::N5 => match self.store.size_key(chunk.key())? {
                Some(size) => {
                    let length = self.format.header_prefix_len(chunk.shape().len()).min(size);
                    self.store.get_partial(chunk.key(), ByteRange::FromStart(0, Some(length)))?
                }
                None => None,
            },
        };
        self.format.peek_varlen(prefix.as_deref(), chunk.shape())
    }

    /// Write a chunk of native-endian element bytes.
    ///
    /// `varlen` gives the element count of a variable-length N5 chunk.
    /// A chunk whose elements all equal the fill value is not stored,
    /// and any chunk previously stored at its key is erased.
    ///
    /// # Errors
    /// - [`crate::Error::TypeMismatch`] if `data_type` is not this dataset's data type,
    /// - [`crate::Error::ReadOnlyMode`] if the dataset was opened read-only,
    /// - [`crate::Error::InvalidChunk`] if the indices are outside the chunk grid,
    ///   `varlen` is given for zarr, or `data` has the wrong length,
    /// - a codec or storage error.
    pub fn write_chunk_bytes(
        &self,
        data_type: DataType,
        chunk_indices: &[u64],
        data: &[u8],
        varlen: Option<u32>,
    ) -> crate::Result<()> {
        self.check_request_type(data_type)?;
        if !self.mode.can_write() {
            return Err(crate::Error::ReadOnlyMode(self.mode));
        }
        if varlen.is_some() && !self.flavor().supports_varlen() {
            return Err(crate::Error::invalid_chunk(format!(
                "variable-length chunks are not supported in {}",
                self.flavor()
            )));
        }
        let chunk = self.chunk(chunk_indices)?;
        let key = chunk.key();

        let encoded = self.format.data_to_buffer(
            self.codec.as_ref(),
            &self.metadata.fill_value,
            chunk.shape(),
            data,
            varlen,
        )?;
        match encoded {
            EncodedChunk::Elided => {
                if self.store.size_key(key)?.is_some() {
                    log::debug!("chunk {key} is all fill value, erasing stored chunk");
                    self.store.erase(key)?;
                } else {
                    log::trace!("chunk {key} is all fill value, not writing");
                }
            }
            EncodedChunk::Written(bytes) => {
                log::trace!("writing {} bytes to chunk {key}", bytes.len());
                self.store.set(key, Bytes::from(bytes))?;
            }
        }
        Ok(())
    }

    /// Write a chunk holding exactly the effective number of elements.
    ///
    /// # Errors
    /// See [`Dataset::write_chunk_bytes`].
    pub fn write_chunk<T: Element>(&self, chunk_indices: &[u64], data: &[T]) -> crate::Result<()> {
        self.write_chunk_bytes(
            T::DATA_TYPE,
            chunk_indices,
            bytemuck::cast_slice(data),
            None,
        )
    }

    /// Write a variable-length N5 chunk of any number of elements.
    ///
    /// # Errors
    /// See [`Dataset::write_chunk_bytes`].
    pub fn write_chunk_varlen<T: Element>(
        &self,
        chunk_indices: &[u64],
        data: &[T],
    ) -> crate::Result<()> {
        let num_el = u32::try_from(data.len()).map_err(|_| {
            crate::Error::invalid_chunk(format!(
                "{} elements do not fit in a variable-length chunk",
                data.len()
            ))
        })?;
        self.write_chunk_bytes(
            T::DATA_TYPE,
            chunk_indices,
            bytemuck::cast_slice(data),
            Some(num_el),
        )
    }

    fn retrieve(
        &self,
        data_type: DataType,
        chunk_indices: &[u64],
    ) -> crate::Result<(Chunk, Bytes)> {
        self.check_request_type(data_type)?;
        let chunk = self.chunk(chunk_indices)?;
        let bytes = self
            .store
            .get(chunk.key())?
            .ok_or_else(|| crate::Error::MissingChunk(chunk.key().to_string()))?;
        log::trace!("read {} bytes from chunk {}", bytes.len(), chunk.key());
        Ok((chunk, bytes))
    }

    /// Read a chunk into native-endian element bytes, returning whether it was variable-length.
    ///
    /// `out` must hold exactly the effective number of elements of a fixed chunk,
    /// or at least the declared number of a variable-length chunk.
    ///
    /// # Errors
    /// - [`crate::Error::TypeMismatch`] if `data_type` is not this dataset's data type,
    /// - [`crate::Error::InvalidChunk`] if the indices are outside the chunk grid
    ///   or `out` has the wrong length,
    /// - [`crate::Error::MissingChunk`] if the chunk is not stored,
    /// - [`crate::Error::CorruptChunk`] if the stored chunk is malformed,
    /// - a codec or storage error.
    pub fn read_chunk_bytes(
        &self,
        data_type: DataType,
        chunk_indices: &[u64],
        out: &mut [u8],
    ) -> crate::Result<bool> {
        let (chunk, bytes) = self.retrieve(data_type, chunk_indices)?;
        self.format
            .buffer_to_data(self.codec.as_ref(), &bytes, chunk.shape(), out)
    }

    /// Read a chunk into `out`, returning whether it was variable-length.
    ///
    /// # Errors
    /// See [`Dataset::read_chunk_bytes`].
    pub fn read_chunk<T: Element>(
        &self,
        chunk_indices: &[u64],
        out: &mut [T],
    ) -> crate::Result<bool> {
        self.read_chunk_bytes(T::DATA_TYPE, chunk_indices, bytemuck::cast_slice_mut(out))
    }

    /// Read every element of a chunk, sized from its header if it is variable-length.
    ///
    /// # Errors
    /// See [`Dataset::read_chunk_bytes`].
    pub fn read_chunk_varlen<T: Element>(&self, chunk_indices: &[u64]) -> crate::Result<Vec<T>> {
        let (chunk, bytes) = self.retrieve(T::DATA_TYPE, chunk_indices)?;
        let decoded = self
            .format
            .decode(self.codec.as_ref(), &bytes, chunk.shape())?;
        Ok(bytemuck::pod_collect_to_vec(&decoded.bytes))
    }
}
