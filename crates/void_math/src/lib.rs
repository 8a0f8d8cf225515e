//! # void_math - Bounds and Transform Helpers
//!
//! Thin layer over `glam` with the pieces scene synchronization needs on top
//! of plain vectors and matrices:
//! - `Aabb`: axis-aligned bounds with expand-only update helpers
//! - half/single precision quaternion decoding
//! - translate/rotate/scale composition and tolerant matrix comparison

pub mod bounds;
pub mod quaternion;
pub mod transform;

pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

pub use bounds::*;
pub use quaternion::*;
pub use transform::*;

/// Common math constants
pub mod consts {
    pub const EPSILON: f32 = 1e-6;
    pub const MATRIX_EPSILON: f32 = 1e-5;
}

pub mod prelude {
    pub use crate::bounds::Aabb;
    pub use crate::quaternion::{quat_from_f32, quat_from_half, QuatH};
    pub use crate::transform::{compose_trs, matrices_approx_eq};
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
}
