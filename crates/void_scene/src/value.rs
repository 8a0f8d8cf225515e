//! Typed attribute values and primvar descriptors

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use void_math::QuatH;

/// How a primvar's values map onto a prim's topology
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Interpolation {
    /// One value for the whole prim
    Constant,
    /// One value per face (mesh) or per curve
    Uniform,
    /// One value per segment end point
    Varying,
    /// One value per control point
    Vertex,
    /// One value per face corner
    FaceVarying,
    /// One value per instance (instancer primvars)
    Instance,
}

impl Interpolation {
    /// Interpolation classes queried when collecting a prim's primvars
    pub const ALL: [Interpolation; 6] = [
        Interpolation::Constant,
        Interpolation::Uniform,
        Interpolation::Varying,
        Interpolation::Vertex,
        Interpolation::FaceVarying,
        Interpolation::Instance,
    ];
}

/// Semantic role of a primvar
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimvarRole {
    #[default]
    None,
    Point,
    Normal,
    Color,
    TextureCoordinate,
}

/// Name, interpolation and role of one authored primvar
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrimvarDescriptor {
    pub name: String,
    pub interpolation: Interpolation,
    #[serde(default)]
    pub role: PrimvarRole,
}

impl PrimvarDescriptor {
    pub fn new(name: impl Into<String>, interpolation: Interpolation) -> Self {
        Self {
            name: name.into(),
            interpolation,
            role: PrimvarRole::None,
        }
    }

    pub fn with_role(mut self, role: PrimvarRole) -> Self {
        self.role = role;
        self
    }
}

/// Array-valued attribute data
#[derive(Clone, Debug, PartialEq)]
pub enum PrimvarValue {
    Float(Vec<f32>),
    Float2(Vec<[f32; 2]>),
    Float3(Vec<[f32; 3]>),
    Float4(Vec<[f32; 4]>),
    Int(Vec<i32>),
    Matrix4(Vec<[[f32; 4]; 4]>),
    /// Half-precision quaternions `[x, y, z, w]`
    QuatH(Vec<QuatH>),
    /// Single-precision quaternions `[x, y, z, w]`
    QuatF(Vec<[f32; 4]>),
}

impl PrimvarValue {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            PrimvarValue::Float(v) => v.len(),
            PrimvarValue::Float2(v) => v.len(),
            PrimvarValue::Float3(v) => v.len(),
            PrimvarValue::Float4(v) => v.len(),
            PrimvarValue::Int(v) => v.len(),
            PrimvarValue::Matrix4(v) => v.len(),
            PrimvarValue::QuatH(v) => v.len(),
            PrimvarValue::QuatF(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scalar components per element
    pub fn components(&self) -> usize {
        match self {
            PrimvarValue::Float(_) | PrimvarValue::Int(_) => 1,
            PrimvarValue::Float2(_) => 2,
            PrimvarValue::Float3(_) => 3,
            PrimvarValue::Float4(_) | PrimvarValue::QuatH(_) | PrimvarValue::QuatF(_) => 4,
            PrimvarValue::Matrix4(_) => 16,
        }
    }

    /// Flat `f32` view of single-precision float data
    ///
    /// Integer and half-precision arrays have no such view.
    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        match self {
            PrimvarValue::Float(v) => Some(v.as_slice()),
            PrimvarValue::Float2(v) => Some(bytemuck::cast_slice(v)),
            PrimvarValue::Float3(v) => Some(bytemuck::cast_slice(v)),
            PrimvarValue::Float4(v) => Some(bytemuck::cast_slice(v)),
            PrimvarValue::Matrix4(v) => Some(bytemuck::cast_slice(v)),
            PrimvarValue::QuatF(v) => Some(bytemuck::cast_slice(v)),
            PrimvarValue::Int(_) | PrimvarValue::QuatH(_) => None,
        }
    }

    /// Flat `f32` copy of any numeric data, converting integers and halves
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            PrimvarValue::Int(v) => v.iter().map(|&i| i as f32).collect(),
            PrimvarValue::QuatH(v) => v.iter().flatten().map(|h| h.to_f32()).collect(),
            other => other.as_f32_slice().map(<[f32]>::to_vec).unwrap_or_default(),
        }
    }

    /// Rebuild an array of the same element type from flat `f32` data
    ///
    /// Trailing components that do not fill a whole element are dropped.
    pub fn from_f32_like(&self, data: &[f32]) -> PrimvarValue {
        fn chunked<const N: usize>(data: &[f32]) -> Vec<[f32; N]> {
            data.chunks_exact(N)
                .map(|c| {
                    let mut out = [0.0; N];
                    out.copy_from_slice(c);
                    out
                })
                .collect()
        }

        match self {
            PrimvarValue::Float(_) => PrimvarValue::Float(data.to_vec()),
            PrimvarValue::Float2(_) => PrimvarValue::Float2(chunked::<2>(data)),
            PrimvarValue::Float3(_) => PrimvarValue::Float3(chunked::<3>(data)),
            PrimvarValue::Float4(_) => PrimvarValue::Float4(chunked::<4>(data)),
            PrimvarValue::QuatF(_) => PrimvarValue::QuatF(chunked::<4>(data)),
            PrimvarValue::Int(_) => PrimvarValue::Int(data.iter().map(|&f| f as i32).collect()),
            PrimvarValue::QuatH(_) => PrimvarValue::QuatH(
                chunked::<4>(data)
                    .into_iter()
                    .map(|q| q.map(half::f16::from_f32))
                    .collect(),
            ),
            PrimvarValue::Matrix4(_) => PrimvarValue::Matrix4(
                chunked::<16>(data)
                    .into_iter()
                    .map(|m| bytemuck::cast::<[f32; 16], [[f32; 4]; 4]>(m))
                    .collect(),
            ),
        }
    }

    /// Short type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimvarValue::Float(_) => "float[]",
            PrimvarValue::Float2(_) => "float2[]",
            PrimvarValue::Float3(_) => "float3[]",
            PrimvarValue::Float4(_) => "float4[]",
            PrimvarValue::Int(_) => "int[]",
            PrimvarValue::Matrix4(_) => "matrix4f[]",
            PrimvarValue::QuatH(_) => "quath[]",
            PrimvarValue::QuatF(_) => "quatf[]",
        }
    }
}

/// Attribute value returned by [`crate::SceneDelegate::get`]
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Array(PrimvarValue),
    Bool(bool),
    Token(String),
}

impl Value {
    pub fn as_array(&self) -> Option<&PrimvarValue> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<PrimvarValue> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl From<PrimvarValue> for Value {
    fn from(value: PrimvarValue) -> Self {
        Value::Array(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_views() {
        let value = PrimvarValue::Float3(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(value.len(), 2);
        assert_eq!(value.components(), 3);
        assert_eq!(value.as_f32_slice().unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let ints = PrimvarValue::Int(vec![1, 2]);
        assert!(ints.as_f32_slice().is_none());
        assert_eq!(ints.to_f32_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_from_f32_like_keeps_type() {
        let template = PrimvarValue::Float2(Vec::new());
        let rebuilt = template.from_f32_like(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(rebuilt, PrimvarValue::Float2(vec![[1.0, 2.0], [3.0, 4.0]]));
    }

    #[test]
    fn test_half_quaternions_convert() {
        let q = [half::f16::from_f32(0.0), half::f16::ZERO, half::f16::ZERO, half::f16::ONE];
        let value = PrimvarValue::QuatH(vec![q]);
        assert_eq!(value.to_f32_vec(), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_descriptor_serde() {
        let desc = PrimvarDescriptor::new("displayColor", Interpolation::FaceVarying)
            .with_role(PrimvarRole::Color);
        let json = serde_json::to_string(&desc).unwrap();
        assert!(json.contains("faceVarying"));
        let back: PrimvarDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
    }
}
