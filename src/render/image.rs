//! Strided 2D views over caller-owned pixel storage.
//!
//! An [`Image`] does not own its buffer. It wraps a mutable slice with
//! width/height/stride metadata so color and depth targets can live in
//! padded allocations, or be sub-rectangles of a larger canvas.

/// A mutable view of `height` rows of `width` elements, rows `stride`
/// elements apart.
pub struct Image<'a, T> {
    buffer: &'a mut [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> Image<'a, T> {
    /// Create a tightly packed view (stride equals width).
    ///
    /// # Panics
    /// Debug builds panic if the buffer is too small for the dimensions.
    pub fn new(buffer: &'a mut [T], width: usize, height: usize) -> Self {
        Self::with_stride(buffer, width, height, width)
    }

    /// Create a view whose rows are `stride` elements apart.
    ///
    /// # Panics
    /// Debug builds panic if `stride < width` or the buffer is too small.
    pub fn with_stride(buffer: &'a mut [T], width: usize, height: usize, stride: usize) -> Self {
        debug_assert!(stride >= width, "stride {stride} is less than width {width}");
        debug_assert!(
            height == 0 || buffer.len() >= (height - 1) * stride + width,
            "buffer of {} elements is too small for {width}x{height} with stride {stride}",
            buffer.len()
        );
        Self {
            buffer,
            width,
            height,
            stride,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.stride + x)
    }

    /// The element at (x, y), or None if out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        self.index(x, y).map(|i| &self.buffer[i])
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        self.index(x, y).map(move |i| &mut self.buffer[i])
    }

    /// The `width` visible elements of row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.stride;
        &self.buffer[start..start + self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = y * self.stride;
        &mut self.buffer[start..start + self.width]
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.height).map(move |y| self.row(y))
    }

    /// A view of the `width` x `height` rectangle whose top-left corner is
    /// (x, y). Shares this view's stride.
    ///
    /// # Panics
    /// Panics if the rectangle does not fit inside this view.
    pub fn sub_image(&mut self, x: usize, y: usize, width: usize, height: usize) -> Image<'_, T> {
        assert!(
            x + width <= self.width && y + height <= self.height,
            "sub-image {width}x{height}+{x}+{y} exceeds {}x{}",
            self.width,
            self.height
        );
        let start = y * self.stride + x;
        let len = if height == 0 {
            0
        } else {
            (height - 1) * self.stride + width
        };
        Image::with_stride(&mut self.buffer[start..start + len], width, height, self.stride)
    }
}

impl<T: Clone> Image<'_, T> {
    /// Fill the visible area. Padding between rows is left untouched.
    pub fn clear(&mut self, value: T) {
        for y in 0..self.height {
            self.row_mut(y).fill(value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_leaves_padding_alone() {
        let mut storage = vec![0u8; 4 * 3];
        let mut image = Image::with_stride(&mut storage, 3, 3, 4);
        image.clear(7);
        assert_eq!(storage, vec![7, 7, 7, 0, 7, 7, 7, 0, 7, 7, 7, 0]);
    }

    #[test]
    fn get_is_bounds_checked() {
        let mut storage = vec![1u8; 6];
        let mut image = Image::new(&mut storage, 3, 2);
        assert_eq!(image.get(2, 1), Some(&1));
        assert_eq!(image.get(3, 0), None);
        assert_eq!(image.get(0, 2), None);
        *image.get_mut(1, 1).unwrap() = 9;
        assert_eq!(image.row(1), &[1, 9, 1]);
    }

    #[test]
    fn sub_image_addresses_parent_storage() {
        let mut storage = vec![0u8; 5 * 4];
        let mut image = Image::new(&mut storage, 5, 4);
        {
            let mut inner = image.sub_image(1, 1, 3, 2);
            assert_eq!(inner.stride(), 5);
            inner.clear(1);
        }
        let rows: Vec<&[u8]> = image.rows().collect();
        assert_eq!(rows[0], &[0, 0, 0, 0, 0]);
        assert_eq!(rows[1], &[0, 1, 1, 1, 0]);
        assert_eq!(rows[2], &[0, 1, 1, 1, 0]);
        assert_eq!(rows[3], &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn last_row_may_omit_padding() {
        // 2 rows of 3 with stride 4 need only 7 elements.
        let mut storage = vec![0u8; 7];
        let mut image = Image::with_stride(&mut storage, 3, 2, 4);
        image.clear(1);
        assert_eq!(storage, vec![1, 1, 1, 0, 1, 1, 1]);
    }
}
