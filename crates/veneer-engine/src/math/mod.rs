//! Transform math.
//!
//! `Matrix` is the 2D affine transform the paint pipeline works in;
//! `Matrix4x4` is the column-major form uploaded to shaders.

mod matrix;
mod matrix4;

pub use matrix::{Matrix, MATRIX_EPSILON};
pub use matrix4::Matrix4x4;
