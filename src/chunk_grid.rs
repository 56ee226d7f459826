//! The regular, bounded chunk grid of a dataset.

/// A regular chunk grid over an array, truncated at the array boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkGrid {
    array_shape: Vec<u64>,
    chunk_shape: Vec<u64>,
    grid_shape: Vec<u64>,
}

impl ChunkGrid {
    /// Create a chunk grid.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidMetadata`] if the ranks differ or any chunk extent is zero.
    pub fn new(array_shape: Vec<u64>, chunk_shape: Vec<u64>) -> crate::Result<Self> {
        if array_shape.len() != chunk_shape.len() {
            return Err(crate::Error::InvalidMetadata(format!(
                "array shape {array_shape:?} and chunk shape {chunk_shape:?} have different ranks"
            )));
        }
        if chunk_shape.contains(&0) {
            return Err(crate::Error::InvalidMetadata(format!(
                "chunk shape {chunk_shape:?} has a zero extent"
            )));
        }
        let grid_shape = array_shape
            .iter()
            .zip(&chunk_shape)
            .map(|(a, c)| a.div_ceil(*c))
            .collect();
        Ok(Self {
            array_shape,
            chunk_shape,
            grid_shape,
        })
    }

    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.array_shape.len()
    }

    #[must_use]
    pub fn array_shape(&self) -> &[u64] {
        &self.array_shape
    }

    /// The nominal chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> &[u64] {
        &self.chunk_shape
    }

    /// The number of chunks along each dimension.
    #[must_use]
    pub fn grid_shape(&self) -> &[u64] {
        &self.grid_shape
    }

    #[must_use]
    pub fn num_chunks(&self) -> u64 {
        self.grid_shape.iter().product()
    }

    /// Check that `chunk_indices` addresses a chunk inside the grid.
    #[must_use]
    pub fn validate(&self, chunk_indices: &[u64]) -> bool {
        chunk_indices.len() == self.grid_shape.len()
            && chunk_indices
                .iter()
                .zip(&self.grid_shape)
                .all(|(i, n)| i < n)
    }

    /// The shape of the chunk at `chunk_indices`, truncated at the array boundary.
    ///
    /// Returns [`None`] if the indices are not valid.
    #[must_use]
    pub fn effective_shape(&self, chunk_indices: &[u64]) -> Option<Vec<u64>> {
        if !self.validate(chunk_indices) {
            return None;
        }
        Some(
            chunk_indices
                .iter()
                .zip(&self.chunk_shape)
                .zip(&self.array_shape)
                .map(|((i, c), a)| (*c).min(a - i * c))
                .collect(),
        )
    }

    /// The number of elements in the chunk at `chunk_indices`.
    #[must_use]
    pub fn chunk_num_elements(&self, chunk_indices: &[u64]) -> Option<u64> {
        self.effective_shape(chunk_indices)
            .map(|shape| shape.iter().product())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_shape_rounds_up() {
        let grid = ChunkGrid::new(vec![10, 10, 3], vec![4, 5, 3]).unwrap();
        assert_eq!(grid.grid_shape(), &[3, 2, 1]);
        assert_eq!(grid.num_chunks(), 6);
    }

    #[test]
    fn validation() {
        let grid = ChunkGrid::new(vec![10, 10], vec![4, 4]).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert!(grid.validate(&[i, j]));
            }
        }
        assert!(!grid.validate(&[3, 0]));
        assert!(!grid.validate(&[0, 3]));
        assert!(!grid.validate(&[0]));
        assert!(!grid.validate(&[0, 0, 0]));
    }

    #[test]
    fn boundary_chunks_are_truncated() {
        let grid = ChunkGrid::new(vec![10, 10], vec![4, 4]).unwrap();
        assert_eq!(grid.effective_shape(&[0, 0]), Some(vec![4, 4]));
        assert_eq!(grid.effective_shape(&[1, 2]), Some(vec![4, 2]));
        assert_eq!(grid.effective_shape(&[2, 2]), Some(vec![2, 2]));
        assert_eq!(grid.effective_shape(&[3, 2]), None);
        assert_eq!(grid.chunk_num_elements(&[2, 1]), Some(8));
    }

    #[test]
    fn invalid_grids() {
        assert!(ChunkGrid::new(vec![10, 10], vec![4]).is_err());
        assert!(ChunkGrid::new(vec![10], vec![0]).is_err());
    }
}
