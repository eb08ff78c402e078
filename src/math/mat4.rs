//! 4x4 transformation matrix using column-vector convention.
//!
//! # Convention
//! - Vectors are **column vectors** on the right: `Mat4 * Vec`
//! - Translation is stored in the **last column**
//! - Transforms chain **right-to-left**: `A * B * v` applies B first, then A
//!
//! # Example
//! ```ignore
//! let mvp = projection * view * model; // model applied first
//! let clip = mvp * Vec4::from(vertex);
//! ```

use std::ops::Mul;

use super::vec4::Vec4;

/// 4x4 matrix stored as `data[row][col]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    data: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat4 {
    pub fn new(data: [[f32; 4]; 4]) -> Self {
        Mat4 { data }
    }

    pub fn identity() -> Self {
        Mat4::new([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Access element at [row][col].
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row][col]
    }

    /// Set element at [row][col].
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row][col] = value;
    }
}

/// Matrix multiplication: Mat4 * Mat4.
///
/// `A * B * v` applies B first, then A.
impl Mul<Mat4> for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Self::Output {
        let mut result = [[0.0f32; 4]; 4];

        for (row, out) in result.iter_mut().enumerate() {
            for (col, cell) in out.iter_mut().enumerate() {
                *cell = self.data[row][0] * rhs.data[0][col]
                    + self.data[row][1] * rhs.data[1][col]
                    + self.data[row][2] * rhs.data[2][col]
                    + self.data[row][3] * rhs.data[3][col];
            }
        }

        Mat4::new(result)
    }
}

/// Transform a Vec4 by a matrix: Mat4 * Vec4 (column vector).
impl Mul<Vec4> for Mat4 {
    type Output = Vec4;

    fn mul(self, v: Vec4) -> Self::Output {
        let row = |r: usize| {
            self.data[r][0] * v.x + self.data[r][1] * v.y + self.data[r][2] * v.z + self.data[r][3] * v.w
        };
        Vec4::new(row(0), row(1), row(2), row(3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn points_pick_up_the_last_column_and_directions_do_not() {
        let mut m = Mat4::identity();
        m.set(0, 3, 1.0);
        m.set(1, 3, 2.0);
        m.set(2, 3, 3.0);

        let p = m * Vec4::point(0.0, 0.0, 0.0);
        assert_eq!(p, Vec4::new(1.0, 2.0, 3.0, 1.0));

        let d = m * Vec4::new(1.0, 0.0, 0.0, 0.0);
        assert_eq!(d, Vec4::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn multiplication_applies_right_operand_first() {
        let mut scale = Mat4::identity();
        for i in 0..3 {
            scale.set(i, i, 2.0);
        }
        let mut translate = Mat4::identity();
        translate.set(0, 3, 1.0);

        let p = (translate * scale) * Vec4::point(1.0, 1.0, 1.0);
        assert_relative_eq!(p.x, 3.0);
        assert_relative_eq!(p.y, 2.0);
        assert_eq!(translate.get(0, 3), 1.0);
    }
}
