//! Instance transform composition
//!
//! An instancer authors up to four parallel arrays. Each instance of a
//! prototype picks one element from each by its instance index and
//! composes:
//!
//! `instancer_xform * translate * rotate * scale * instance_xform`
//!
//! Nested instancers multiply out parent-major: with `P` parent and `C`
//! child transforms the result holds `P * C` matrices, entry `p * C + c`
//! being `parent[p] * child[c]`.
//!
//! The final matrices are packed into `InstanceData` for upload.

use void_gpu::InstanceData;
use void_math::{compose_trs, quat_from_f32, quat_from_half, Mat4, Quat, Vec3};
use void_scene::PrimvarValue;

/// Transform arrays authored on an instancer, decoded
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstancerPrimvars {
    pub translations: Option<Vec<Vec3>>,
    pub rotations: Option<Vec<Quat>>,
    pub scales: Option<Vec<Vec3>>,
    pub transforms: Option<Vec<Mat4>>,
}

impl InstancerPrimvars {
    pub fn is_empty(&self) -> bool {
        self.translations.is_none()
            && self.rotations.is_none()
            && self.scales.is_none()
            && self.transforms.is_none()
    }
}

/// Decode a translation or scale array
pub fn read_vec3s(value: &PrimvarValue, label: &str) -> Option<Vec<Vec3>> {
    match value {
        PrimvarValue::Float3(v) => Some(v.iter().map(|&p| Vec3::from_array(p)).collect()),
        other => {
            log::warn!("{}: expected float3[], got {}", label, other.type_name());
            None
        }
    }
}

/// Decode a rotation array; half-precision quaternions are tried first
pub fn read_rotations(value: &PrimvarValue, label: &str) -> Option<Vec<Quat>> {
    match value {
        PrimvarValue::QuatH(v) => Some(v.iter().map(|&q| quat_from_half(q)).collect()),
        PrimvarValue::QuatF(v) | PrimvarValue::Float4(v) => {
            Some(v.iter().map(|&q| quat_from_f32(q)).collect())
        }
        other => {
            log::warn!("{}: expected quath[] or quatf[], got {}", label, other.type_name());
            None
        }
    }
}

/// Decode a matrix array
pub fn read_matrices(value: &PrimvarValue, label: &str) -> Option<Vec<Mat4>> {
    match value {
        PrimvarValue::Matrix4(v) => Some(v.iter().map(Mat4::from_cols_array_2d).collect()),
        other => {
            log::warn!("{}: expected matrix4f[], got {}", label, other.type_name());
            None
        }
    }
}

fn pick<T: Copy>(array: &Option<Vec<T>>, index: usize, identity: T, missing: &mut usize) -> T {
    match array {
        Some(values) => match values.get(index) {
            Some(&value) => value,
            None => {
                *missing += 1;
                identity
            }
        },
        None => identity,
    }
}

/// Compose one matrix per instance index
///
/// An index past the end of an authored array uses that array's identity
/// element; a negative index yields the instancer transform alone. Returns the matrices
/// and the number of out-of-range lookups.
pub fn compose_instance_transforms(
    instancer_xform: Mat4,
    primvars: &InstancerPrimvars,
    indices: &[i32],
    label: &str,
) -> (Vec<Mat4>, usize) {
    let mut missing = 0usize;
    let transforms = indices
        .iter()
        .map(|&index| {
            let Ok(index) = usize::try_from(index) else {
                missing += 1;
                return instancer_xform;
            };
            let translate = pick(&primvars.translations, index, Vec3::ZERO, &mut missing);
            let rotate = pick(&primvars.rotations, index, Quat::IDENTITY, &mut missing);
            let scale = pick(&primvars.scales, index, Vec3::ONE, &mut missing);
            let instance = pick(&primvars.transforms, index, Mat4::IDENTITY, &mut missing);
            instancer_xform * compose_trs(translate, rotate, scale) * instance
        })
        .collect();

    if missing > 0 {
        log::warn!("{}: {} instance lookups out of range, identity used", label, missing);
    }
    (transforms, missing)
}

/// Multiply nested instance transforms out, parent-major
pub fn flatten_nested(parent: &[Mat4], child: &[Mat4]) -> Vec<Mat4> {
    let mut out = Vec::with_capacity(parent.len() * child.len());
    for p in parent {
        for c in child {
            out.push(*p * *c);
        }
    }
    out
}

/// Pack instance matrices into their upload layout
pub fn pack_instances(transforms: &[Mat4]) -> Vec<InstanceData> {
    transforms.iter().map(|&m| InstanceData::from_matrix(m)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_math::matrices_approx_eq;

    #[test]
    fn test_composition_order() {
        let primvars = InstancerPrimvars {
            translations: Some(vec![Vec3::new(1.0, 0.0, 0.0)]),
            rotations: Some(vec![Quat::from_rotation_z(core::f32::consts::FRAC_PI_2)]),
            scales: Some(vec![Vec3::splat(2.0)]),
            transforms: Some(vec![Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0))]),
        };
        let instancer = Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0));
        let (m, missing) = compose_instance_transforms(instancer, &primvars, &[0], "test");
        assert_eq!(missing, 0);

        // x -> instance (1,0,5) -> scale (2,0,10) -> rotate (0,2,10)
        //   -> translate (1,2,10) -> instancer (1,12,10)
        let p = m[0].transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 12.0, 10.0)).length() < 1e-4);
    }

    #[test]
    fn test_out_of_range_is_identity() {
        let primvars = InstancerPrimvars {
            translations: Some(vec![Vec3::X]),
            ..Default::default()
        };
        let (m, missing) = compose_instance_transforms(Mat4::IDENTITY, &primvars, &[0, 3, -1], "test");
        assert_eq!(missing, 2);
        assert!(matrices_approx_eq(&m[0], &Mat4::from_translation(Vec3::X), 1e-6));
        assert_eq!(m[1], Mat4::IDENTITY);
        assert_eq!(m[2], Mat4::IDENTITY);
    }

    #[test]
    fn test_flatten_parent_major() {
        let parent: Vec<Mat4> = (0..2)
            .map(|p| Mat4::from_translation(Vec3::new(p as f32 * 100.0, 0.0, 0.0)))
            .collect();
        let child: Vec<Mat4> = (0..3)
            .map(|c| Mat4::from_translation(Vec3::new(0.0, c as f32, 0.0)))
            .collect();
        let out = flatten_nested(&parent, &child);
        assert_eq!(out.len(), 6);
        for p in 0..2 {
            for c in 0..3 {
                let expected = parent[p] * child[c];
                assert!(matrices_approx_eq(&out[p * 3 + c], &expected, 1e-6));
            }
        }
    }

    #[test]
    fn test_pack_instances() {
        let transforms = [
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            Mat4::from_scale(Vec3::new(1.0, 4.0, 1.0)),
        ];
        let packed = pack_instances(&transforms);
        assert_eq!(packed.len(), 2);
        assert_eq!(packed[0].model(), transforms[0]);
        assert_eq!(packed[0].normal_matrix, void_gpu::IDENTITY_NORMAL_MATRIX);
        assert_eq!(packed[1].normal_matrix[1], [0.0, 0.25, 0.0, 0.0]);

        let bytes: &[u8] = bytemuck::cast_slice(&packed);
        assert_eq!(bytes.len(), 2 * InstanceData::SIZE);
    }

    #[test]
    fn test_read_rotations_accepts_both_precisions() {
        let half = PrimvarValue::QuatH(vec![void_math::quat_to_half(Quat::IDENTITY)]);
        let single = PrimvarValue::QuatF(vec![[0.0, 0.0, 0.0, 1.0]]);
        assert_eq!(read_rotations(&half, "test").map(|r| r.len()), Some(1));
        assert_eq!(read_rotations(&single, "test").map(|r| r.len()), Some(1));
        assert!(read_rotations(&PrimvarValue::Float(vec![1.0]), "test").is_none());
    }
}
