use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SceneError;

/// Grid dimensions: `width` columns by `height` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub width: usize,
    pub height: usize,
}

impl Shape {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A 2D raster stored row-major. Row 0 is the northernmost row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    pub width: usize,
    pub height: usize,
    pub data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Create a grid with every cell set to `value`.
    pub fn filled(shape: Shape, value: T) -> Self {
        Self {
            width: shape.width,
            height: shape.height,
            data: vec![value; shape.len()],
        }
    }
}

impl<T> Grid<T> {
    /// Wrap a row-major buffer, rejecting it if its length does not match
    /// `width × height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self, SceneError> {
        let expected = Shape::new(width, height);
        if data.len() != expected.len() {
            // Report the buffer as a single row so the mismatch is visible.
            return Err(SceneError::ShapeMismatch {
                expected,
                found: Shape::new(data.len(), 1),
            });
        }
        Ok(Self { width, height, data })
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        Shape::new(self.width, self.height)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &T {
        &self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: T) {
        self.data[row * self.width + col] = val;
    }

    /// Fail with `ShapeMismatch` unless this grid has shape `expected`.
    pub fn ensure_shape(&self, expected: Shape) -> Result<(), SceneError> {
        let found = self.shape();
        if found != expected {
            return Err(SceneError::ShapeMismatch { expected, found });
        }
        Ok(())
    }

    /// Build a same-shaped grid by mapping every cell.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = Grid::from_vec(3, 2, vec![0.0f32; 5]).unwrap_err();
        assert!(matches!(err, SceneError::ShapeMismatch { expected, .. } if expected == Shape::new(3, 2)));
    }

    #[test]
    fn get_set_are_row_major() {
        let mut g = Grid::filled(Shape::new(3, 2), 0u32);
        g.set(1, 2, 7);
        assert_eq!(g.data[5], 7);
        assert_eq!(*g.get(1, 2), 7);
    }

    #[test]
    fn ensure_shape_reports_both_shapes() {
        let g = Grid::filled(Shape::new(2, 2), false);
        assert!(g.ensure_shape(Shape::new(2, 2)).is_ok());
        assert_eq!(
            g.ensure_shape(Shape::new(3, 2)),
            Err(SceneError::ShapeMismatch {
                expected: Shape::new(3, 2),
                found: Shape::new(2, 2),
            })
        );
    }
}
