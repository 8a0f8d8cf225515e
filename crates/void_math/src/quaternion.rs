//! Quaternion storage decoding
//!
//! Authored rotations arrive either as half-precision (`QuatH`) or
//! single-precision quaternions, both stored `[x, y, z, w]`.

use glam::Quat;
use half::f16;

/// Half-precision quaternion storage `[x, y, z, w]`
pub type QuatH = [f16; 4];

/// Decode a half-precision quaternion and normalize it
///
/// A zero-length quaternion decodes to identity.
pub fn quat_from_half(q: QuatH) -> Quat {
    quat_from_f32([q[0].to_f32(), q[1].to_f32(), q[2].to_f32(), q[3].to_f32()])
}

/// Build a normalized quaternion from `[x, y, z, w]`
///
/// A zero-length quaternion decodes to identity.
pub fn quat_from_f32(q: [f32; 4]) -> Quat {
    let quat = Quat::from_xyzw(q[0], q[1], q[2], q[3]);
    if quat.length_squared() <= crate::consts::EPSILON {
        Quat::IDENTITY
    } else {
        quat.normalize()
    }
}

/// Encode a quaternion as half-precision storage
pub fn quat_to_half(q: Quat) -> QuatH {
    [
        f16::from_f32(q.x),
        f16::from_f32(q.y),
        f16::from_f32(q.z),
        f16::from_f32(q.w),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_roundtrip_is_close() {
        let q = Quat::from_rotation_y(0.7);
        let decoded = quat_from_half(quat_to_half(q));
        assert!(decoded.angle_between(q) < 1e-2);
    }

    #[test]
    fn test_zero_quaternion_is_identity() {
        assert_eq!(quat_from_f32([0.0; 4]), Quat::IDENTITY);
    }
}
