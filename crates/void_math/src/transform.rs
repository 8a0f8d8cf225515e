//! Transform composition helpers

use glam::{Mat4, Quat, Vec3};

/// Compose `translate * rotate * scale` (column-vector convention)
///
/// Points are scaled first, then rotated, then translated.
#[inline]
pub fn compose_trs(translate: Vec3, rotate: Quat, scale: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, rotate, translate)
}

/// Component-wise matrix comparison with tolerance
#[inline]
pub fn matrices_approx_eq(a: &Mat4, b: &Mat4, epsilon: f32) -> bool {
    a.abs_diff_eq(*b, epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_trs_order() {
        let m = compose_trs(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_rotation_z(core::f32::consts::FRAC_PI_2),
            Vec3::splat(2.0),
        );
        // (1,0,0) -> scale (2,0,0) -> rotate (0,2,0) -> translate (10,2,0)
        let p = m.transform_point3(Vec3::X);
        assert!((p - Vec3::new(10.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_matrices_approx_eq() {
        let a = Mat4::from_translation(Vec3::ONE);
        let b = Mat4::from_translation(Vec3::ONE + Vec3::splat(1e-7));
        assert!(matrices_approx_eq(&a, &b, 1e-5));
        assert!(!matrices_approx_eq(&a, &Mat4::IDENTITY, 1e-5));
    }
}
