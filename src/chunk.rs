use crate::chunk_grid::ChunkGrid;
use crate::chunk_key_encoding::ChunkKeyEncoding;
use crate::endianness::{Endianness, read_word, write_word};
use crate::storage::{StoreKey, node_key};

/// N5 header words are always big-endian.
pub(crate) const HEADER_ENDIANNESS: Endianness = Endianness::Big;

/// A validated chunk: its grid indices, effective shape and storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    indices: Vec<u64>,
    shape: Vec<u64>,
    key: StoreKey,
}

impl Chunk {
    /// Locate the chunk at `indices` of `grid`, keyed under the node at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidChunk`] if the indices are outside the grid.
    pub fn new(
        grid: &ChunkGrid,
        key_encoding: &ChunkKeyEncoding,
        path: &str,
        indices: &[u64],
    ) -> crate::Result<Self> {
        let shape = grid.effective_shape(indices).ok_or_else(|| {
            crate::Error::invalid_chunk(format!(
                "chunk indices {indices:?} are outside the chunk grid {:?}",
                grid.grid_shape()
            ))
        })?;
        let key = node_key(path, &key_encoding.encode(indices))?;
        Ok(Self {
            indices: indices.to_vec(),
            shape,
            key,
        })
    }

    #[must_use]
    pub fn indices(&self) -> &[u64] {
        &self.indices
    }

    /// The effective chunk shape, in C order.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    #[must_use]
    pub fn key(&self) -> &StoreKey {
        &self.key
    }

    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct N5ChunkHeader {
    pub(crate) mode: N5ChunkMode,
    /// F order, i.e. reversed relative to the chunk shape.
    pub(crate) shape: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum N5ChunkMode {
    Default,
    VarLen { num_el: u32 },
}

impl N5ChunkMode {
    fn discriminant(self) -> u16 {
        match self {
            Self::Default => 0,
            Self::VarLen { .. } => 1,
        }
    }
}

impl N5ChunkHeader {
    /// Header for a chunk of the given C-order shape.
    pub(crate) fn new(shape: &[u64], varlen: Option<u32>) -> crate::Result<Self> {
        let shape = shape
            .iter()
            .rev()
            .map(|&n| {
                u32::try_from(n).map_err(|_| {
                    crate::Error::invalid_chunk(format!(
                        "chunk extent {n} does not fit in an N5 header"
                    ))
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;
        let mode = match varlen {
            Some(num_el) => N5ChunkMode::VarLen { num_el },
            None => N5ChunkMode::Default,
        };
        Ok(Self { mode, shape })
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        let truncated = || crate::Error::corrupt_chunk("N5 chunk header is truncated");
        let mut offset: usize = 0;

        let mode_num: u16 =
            read_word(bytes, &mut offset, HEADER_ENDIANNESS).ok_or_else(truncated)?;
        let ndim: u16 = read_word(bytes, &mut offset, HEADER_ENDIANNESS).ok_or_else(truncated)?;
        let mut shape = Vec::with_capacity(ndim as usize);
        for _ in 0..ndim {
            let extent: u32 =
                read_word(bytes, &mut offset, HEADER_ENDIANNESS).ok_or_else(truncated)?;
            shape.push(extent);
        }

        let mode = match mode_num {
            0 => N5ChunkMode::Default,
            1 => {
                let num_el =
                    read_word(bytes, &mut offset, HEADER_ENDIANNESS).ok_or_else(truncated)?;
                N5ChunkMode::VarLen { num_el }
            }
            n => {
                return Err(crate::Error::corrupt_chunk(format!(
                    "unsupported N5 chunk mode {n}"
                )));
            }
        };
        Ok(N5ChunkHeader { mode, shape })
    }

    pub(crate) fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        let ndim = u16::try_from(self.shape.len()).map_err(|_| {
            crate::Error::invalid_chunk(format!(
                "{} dimensions do not fit in an N5 header",
                self.shape.len()
            ))
        })?;
        let mut out = Vec::with_capacity(self.data_offset());
        write_word(&mut out, self.mode.discriminant(), HEADER_ENDIANNESS);
        write_word(&mut out, ndim, HEADER_ENDIANNESS);
        for &extent in &self.shape {
            write_word(&mut out, extent, HEADER_ENDIANNESS);
        }
        if let N5ChunkMode::VarLen { num_el } = self.mode {
            write_word(&mut out, num_el, HEADER_ENDIANNESS);
        }
        Ok(out)
    }

    pub(crate) fn data_offset(&self) -> usize {
        size_of::<u16>()  // mode discriminator
            + size_of::<u16>() // ndim
            + self.shape.len() * size_of::<u32>()  // shape
            + match self.mode {
                N5ChunkMode::VarLen { .. } => size_of::<u32>(),
                N5ChunkMode::Default => 0,
            }
    }

    pub(crate) fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub(crate) fn is_varlen(&self) -> bool {
        matches!(self.mode, N5ChunkMode::VarLen { .. })
    }

    /// The number of elements the payload holds.
    pub(crate) fn num_elements(&self) -> u64 {
        match self.mode {
            N5ChunkMode::VarLen { num_el } => u64::from(num_el),
            N5ChunkMode::Default => self.shape.iter().map(|&n| u64::from(n)).product(),
        }
    }

    /// The C-order shape recorded in the header.
    pub(crate) fn c_order_shape(&self) -> Vec<u64> {
        self.shape.iter().rev().map(|&n| u64::from(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_header_layout() {
        let header = N5ChunkHeader::new(&[2, 3], None).unwrap();
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 2]);
        assert_eq!(header.data_offset(), bytes.len());
        assert_eq!(header.num_elements(), 6);
        assert_eq!(header.c_order_shape(), vec![2, 3]);

        let parsed = N5ChunkHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert!(!parsed.is_varlen());
    }

    #[test]
    fn varlen_header_layout() {
        let header = N5ChunkHeader::new(&[4], Some(9)).unwrap();
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes, vec![0, 1, 0, 1, 0, 0, 0, 4, 0, 0, 0, 9]);
        let parsed = N5ChunkHeader::from_bytes(&bytes).unwrap();
        assert!(parsed.is_varlen());
        assert_eq!(parsed.num_elements(), 9);
        assert_eq!(parsed.data_offset(), 12);
    }

    #[test]
    fn malformed_headers_are_corrupt() {
        assert!(matches!(
            N5ChunkHeader::from_bytes(&[0, 2, 0, 0]),
            Err(crate::Error::CorruptChunk(_))
        ));
        assert!(matches!(
            N5ChunkHeader::from_bytes(&[0, 0, 0, 2, 0, 0, 0, 1]),
            Err(crate::Error::CorruptChunk(_))
        ));
        assert!(matches!(
            N5ChunkHeader::from_bytes(&[0, 1, 0, 1, 0, 0, 0, 1]),
            Err(crate::Error::CorruptChunk(_))
        ));
        assert!(matches!(
            N5ChunkHeader::from_bytes(&[0]),
            Err(crate::Error::CorruptChunk(_))
        ));
    }

    #[test]
    fn chunk_descriptor() {
        let grid = ChunkGrid::new(vec![10, 10], vec![4, 4]).unwrap();
        let chunk = Chunk::new(&grid, &ChunkKeyEncoding::N5, "data/ds", &[2, 1]).unwrap();
        assert_eq!(chunk.shape(), &[2, 4]);
        assert_eq!(chunk.num_elements(), 8);
        assert_eq!(chunk.key().as_str(), "data/ds/1/2");

        let root = Chunk::new(&grid, &ChunkKeyEncoding::N5, "", &[2, 1]).unwrap();
        assert_eq!(root.key().as_str(), "1/2");

        assert!(matches!(
            Chunk::new(&grid, &ChunkKeyEncoding::N5, "data/ds", &[3, 0]),
            Err(crate::Error::InvalidChunk(_))
        ));
    }
}
