//! Per-instance upload data
//!
//! Instanced render objects receive one `InstanceData` per instance in an
//! instance-rate vertex stream: the model matrix followed by the normal
//! matrix (inverse transpose of the upper 3x3, stored as three padded
//! columns).

use serde::{Deserialize, Serialize};
use void_math::{Mat3, Mat4};

/// Normal matrix of a singular model matrix
pub const IDENTITY_NORMAL_MATRIX: [[f32; 4]; 3] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
];

/// One instance as laid out on the GPU
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    /// Column-major model matrix
    pub model_matrix: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 3],
}

impl Default for InstanceData {
    fn default() -> Self {
        Self::from_matrix(Mat4::IDENTITY)
    }
}

impl InstanceData {
    /// Size of one instance in bytes
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub fn from_matrix(model: Mat4) -> Self {
        Self {
            model_matrix: model.to_cols_array_2d(),
            normal_matrix: compute_normal_matrix(model),
        }
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model_matrix)
    }
}

/// Inverse transpose of the upper 3x3 of `model`
pub fn compute_normal_matrix(model: Mat4) -> [[f32; 4]; 3] {
    let upper = Mat3::from_mat4(model);
    if upper.determinant().abs() < 1e-10 {
        return IDENTITY_NORMAL_MATRIX;
    }
    let normal = upper.inverse().transpose();
    let column = |i: usize| {
        let c = normal.col(i);
        [c.x, c.y, c.z, 0.0]
    };
    [column(0), column(1), column(2)]
}
