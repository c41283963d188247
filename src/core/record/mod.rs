// Side-channel record: everything extraction needs that cannot be
// recovered from the watermarked image itself.
pub mod store;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::models::WatermarkError;

pub use store::{FileRecordStore, MemoryRecordStore, RecordStore};

/// A dense matrix in persistable form (row-major)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixData {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl MatrixData {
    pub fn from_dmatrix(matrix: &DMatrix<f64>) -> Self {
        let (rows, cols) = (matrix.nrows(), matrix.ncols());
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(matrix[(i, j)]);
            }
        }
        Self { rows, cols, data }
    }

    /// # Errors
    /// Returns `WatermarkError::Dimension` when the element count does not
    /// match the declared shape (a truncated or hand-edited record).
    pub fn to_dmatrix(&self) -> Result<DMatrix<f64>, WatermarkError> {
        if self.data.len() != self.rows * self.cols {
            return Err(WatermarkError::Dimension(format!(
                "Matrix data length {} does not match shape {}x{}",
                self.data.len(),
                self.rows,
                self.cols
            )));
        }
        Ok(DMatrix::from_row_slice(self.rows, self.cols, &self.data))
    }
}

/// The persisted bundle consumed by extraction
///
/// Created once by the embedder, immutable afterwards. Contains the
/// carrier LL subband's original singular values, the scrambled
/// watermark's singular vector factors, and the scrambling permutation.
/// Extraction borrows a record; it never mutates one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideChannelRecord {
    /// Singular values of the carrier's LL subband before modification
    pub carrier_singular_values: Vec<f64>,
    /// Left singular vectors of the scrambled watermark
    pub watermark_u: MatrixData,
    /// Transposed right singular vectors of the scrambled watermark
    pub watermark_v_t: MatrixData,
    /// Chaotic scrambling permutation, row-major pixel order
    pub permutation: Vec<u32>,
}

/// Store key: one record per (carrier identity, strength factor)
///
/// The blend is inverted with the same alpha that produced it, so records
/// embedded at different strengths must never collide.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordKey {
    pub image_id: String,
    pub alpha: f64,
}

impl RecordKey {
    pub fn new(image_id: impl Into<String>, alpha: f64) -> Self {
        Self {
            image_id: image_id.into(),
            alpha,
        }
    }

    /// Stable storage name of the form `{image_id}_{alpha}`
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.image_id, self.alpha)
    }
}
