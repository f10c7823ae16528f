//! Decoded 2-D grids and pixel windows.

use serde::{Deserialize, Serialize};

use crate::{SceneError, SceneResult};

/// A row-major 2-D grid of decoded values.
///
/// Cropping never mutates a grid; it copies the window into a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedArray {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl DecodedArray {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> SceneResult<Self> {
        if data.len() != width * height {
            return Err(SceneError::InvalidRequest(format!(
                "grid of {}x{} needs {} values, got {}",
                height,
                width,
                width * height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.height && col < self.width {
            Some(self.data[row * self.width + col])
        } else {
            None
        }
    }

    /// Copy of the cells inside `window`, after clamping it to this grid.
    pub fn window(&self, window: &PixelWindow) -> DecodedArray {
        let w = window.clamp(self.width, self.height);
        let mut data = Vec::with_capacity(w.rows() * w.cols());
        for row in w.row_start..w.row_end {
            let start = row * self.width;
            data.extend_from_slice(&self.data[start + w.col_start..start + w.col_end]);
        }
        DecodedArray {
            width: w.cols(),
            height: w.rows(),
            data,
        }
    }

    /// Min/max/mean over finite cells; `None` when every cell is fill.
    pub fn finite_stats(&self) -> Option<ValueStats> {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for &v in self.data.iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
            count += 1;
        }
        (count > 0).then(|| ValueStats {
            min,
            max,
            mean: (sum / count as f64) as f32,
            count,
        })
    }
}

/// Summary of the finite values in a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub count: usize,
}

/// Half-open pixel index ranges `[row_start, row_end) x [col_start, col_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelWindow {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl PixelWindow {
    pub fn new(row_start: usize, row_end: usize, col_start: usize, col_end: usize) -> Self {
        Self {
            row_start,
            row_end,
            col_start,
            col_end,
        }
    }

    /// The whole of a `width` x `height` grid.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, height, 0, width)
    }

    /// Shrink to fit inside a `width` x `height` grid. Never fails; a window
    /// entirely outside the grid becomes empty.
    pub fn clamp(&self, width: usize, height: usize) -> Self {
        let row_end = self.row_end.min(height);
        let col_end = self.col_end.min(width);
        Self {
            row_start: self.row_start.min(row_end),
            row_end,
            col_start: self.col_start.min(col_end),
            col_end,
        }
    }

    pub fn rows(&self) -> usize {
        self.row_end.saturating_sub(self.row_start)
    }

    pub fn cols(&self) -> usize {
        self.col_end.saturating_sub(self.col_start)
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0 || self.cols() == 0
    }
}
