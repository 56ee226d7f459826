use serde::{Deserialize, Serialize};

/// The separator between chunk indices in a zarr chunk key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChunkKeySeparator {
    #[default]
    #[serde(rename = ".")]
    Dot,
    #[serde(rename = "/")]
    Slash,
}

impl ChunkKeySeparator {
    fn as_str(self) -> &'static str {
        match self {
            Self::Dot => ".",
            Self::Slash => "/",
        }
    }
}

/// Maps chunk indices to a key relative to the dataset root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKeyEncoding {
    /// Indices in C order, joined by the separator.
    Zarr(ChunkKeySeparator),
    /// Indices in F order, joined by `/`.
    N5,
}

impl ChunkKeyEncoding {
    /// Encode `chunk_grid_indices` as a chunk key.
    ///
    /// A zero-dimensional chunk is keyed `0`.
    #[must_use]
    pub fn encode(&self, chunk_grid_indices: &[u64]) -> String {
        if chunk_grid_indices.is_empty() {
            return "0".to_string();
        }
        match self {
            Self::Zarr(separator) => join(chunk_grid_indices.iter(), separator.as_str()),
            Self::N5 => join(chunk_grid_indices.iter().rev(), "/"),
        }
    }
}

fn join<'a>(indices: impl Iterator<Item = &'a u64>, separator: &str) -> String {
    indices
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zarr_keys() {
        let dot = ChunkKeyEncoding::Zarr(ChunkKeySeparator::Dot);
        assert_eq!(dot.encode(&[1, 23, 0]), "1.23.0");
        assert_eq!(dot.encode(&[]), "0");
        let slash = ChunkKeyEncoding::Zarr(ChunkKeySeparator::Slash);
        assert_eq!(slash.encode(&[1, 23, 0]), "1/23/0");
    }

    #[test]
    fn n5_keys_are_reversed() {
        assert_eq!(ChunkKeyEncoding::N5.encode(&[1, 2, 3]), "3/2/1");
        assert_eq!(ChunkKeyEncoding::N5.encode(&[7]), "7");
    }

    #[test]
    fn scalar_chunk_key() {
        assert_eq!(ChunkKeyEncoding::N5.encode(&[]), "0");
        let grid = crate::chunk_grid::ChunkGrid::new(vec![], vec![]).unwrap();
        let chunk = crate::chunk::Chunk::new(&grid, &ChunkKeyEncoding::N5, "ds", &[]).unwrap();
        assert_eq!(chunk.key().as_str(), "ds/0");
    }

    #[test]
    fn keys_are_stable() {
        let enc = ChunkKeyEncoding::N5;
        assert_eq!(enc.encode(&[4, 5]), enc.encode(&[4, 5]));
    }

    #[test]
    fn separator_serde() {
        let sep: ChunkKeySeparator = serde_json::from_str("\"/\"").unwrap();
        assert_eq!(sep, ChunkKeySeparator::Slash);
    }
}
