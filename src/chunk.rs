//! # Chunks
//!
//! The exchange only looks at a chunk's sizes: bytes for accounting
//! and metrics, rows for metrics

/// A batch of rows that can travel through an exchange channel
pub trait Chunk: Send + 'static {
    /// Number of rows in the batch
    fn rows(&self) -> usize;

    /// Logical (uncompressed) size of the data
    fn bytes(&self) -> usize;

    /// Memory held by the batch, including unused capacity
    ///
    /// This is what moves between the thread and the global memory budget
    fn allocated_bytes(&self) -> usize {
        self.bytes()
    }
}

/// Columnar batch of raw column buffers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataChunk {
    columns: Vec<Vec<u8>>,
    num_rows: usize,
}

impl DataChunk {
    /// Creates a chunk of `num_rows` rows from column buffers
    pub fn new(columns: Vec<Vec<u8>>, num_rows: usize) -> Self {
        Self { columns, num_rows }
    }

    /// Column buffers of the chunk
    pub fn columns(&self) -> &[Vec<u8>] {
        &self.columns
    }

    /// Takes the column buffers out of the chunk
    pub fn into_columns(self) -> Vec<Vec<u8>> {
        self.columns
    }
}

impl Chunk for DataChunk {
    fn rows(&self) -> usize {
        self.num_rows
    }

    fn bytes(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    fn allocated_bytes(&self) -> usize {
        self.columns.iter().map(Vec::capacity).sum()
    }
}
