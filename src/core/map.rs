//! Dense per-pixel grids, batched.

/// A dense `(batch, height, width)` grid stored row-major.
///
/// Every per-pixel output of the pipeline (face-index map, depth map,
/// silhouette mask, upstream gradient, debug gradient map) is one of these.
/// Each call allocates fresh maps; nothing is shared for writing across
/// components.
#[derive(Clone, Debug, PartialEq)]
pub struct MapBatch<T> {
    data: Vec<T>,
    batch_size: usize,
    height: usize,
    width: usize,
}

impl<T: Copy> MapBatch<T> {
    /// A grid with every cell set to `value`.
    pub fn filled(batch_size: usize, height: usize, width: usize, value: T) -> Self {
        Self {
            data: vec![value; batch_size * height * width],
            batch_size,
            height,
            width,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn index(&self, batch: usize, y: usize, x: usize) -> usize {
        (batch * self.height + y) * self.width + x
    }

    #[inline]
    pub fn at(&self, batch: usize, y: usize, x: usize) -> T {
        self.data[self.index(batch, y, x)]
    }

    #[inline]
    pub fn at_mut(&mut self, batch: usize, y: usize, x: usize) -> &mut T {
        let i = self.index(batch, y, x);
        &mut self.data[i]
    }

    /// One batch element as a row-major `height * width` slice.
    pub fn batch(&self, batch: usize) -> &[T] {
        let start = batch * self.height * self.width;
        &self.data[start..start + self.height * self.width]
    }

    pub fn batch_mut(&mut self, batch: usize) -> &mut [T] {
        let start = batch * self.height * self.width;
        let len = self.height * self.width;
        &mut self.data[start..start + len]
    }

    /// True when another map has the same `(batch, height, width)` shape.
    pub fn same_shape<U: Copy>(&self, other: &MapBatch<U>) -> bool {
        self.batch_size == other.batch_size
            && self.height == other.height
            && self.width == other.width
    }
}
