use serde::Serialize;

use crate::error::{AfmError, Result};

/// Row-major 2-D array of floats
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Image {
    /// Wrap a flat row-major buffer; its length must equal `rows * cols`
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(AfmError::InvalidStructure(format!(
                "image of {}x{} cannot hold {} values",
                rows,
                cols,
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Flat row-major values
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Value at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col).copied()
    }

    /// One row as a slice
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        self.data.get(start..start + self.cols)
    }

    /// Iterate over rows
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks(0) panics; an image without columns has no rows to yield
        self.data.chunks(self.cols.max(1)).take(self.rows)
    }

    /// Smallest finite value, if any
    pub fn min(&self) -> Option<f64> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.min(v))))
    }

    /// Subtract the smallest finite value so the image starts at zero
    pub fn subtract_min(&mut self) {
        if let Some(min) = self.min() {
            self.data.iter_mut().for_each(|v| *v -= min);
        }
    }

    /// Reverse every odd-indexed row (bidirectional raster)
    pub fn flip_odd_rows(&mut self) {
        let cols = self.cols.max(1);
        for (i, row) in self.data.chunks_mut(cols).enumerate() {
            if i % 2 == 1 {
                row.reverse();
            }
        }
    }
}
