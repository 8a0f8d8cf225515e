//! Authored topology for meshes and curves, plus the small classifiers
//! (render tag, display style) every prim carries.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use void_core::PrimPath;

/// Winding of authored faces
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    RightHanded,
    LeftHanded,
}

/// A named set of faces bound to its own material
#[derive(Clone, Debug, PartialEq)]
pub struct GeomSubset {
    pub id: String,
    pub material_id: Option<PrimPath>,
    pub face_indices: Vec<i32>,
}

/// Polygonal mesh topology as authored
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshTopology {
    /// Corner count of every face
    pub face_vertex_counts: Vec<i32>,
    /// Scene point index of every face corner, face after face
    pub face_vertex_indices: Vec<i32>,
    /// Faces that are not drawn
    pub hole_indices: Vec<i32>,
    pub orientation: Orientation,
    pub subsets: Vec<GeomSubset>,
}

impl MeshTopology {
    pub fn new(face_vertex_counts: Vec<i32>, face_vertex_indices: Vec<i32>) -> Self {
        Self {
            face_vertex_counts,
            face_vertex_indices,
            ..Default::default()
        }
    }

    pub fn with_holes(mut self, hole_indices: Vec<i32>) -> Self {
        self.hole_indices = hole_indices;
        self
    }

    pub fn with_subsets(mut self, subsets: Vec<GeomSubset>) -> Self {
        self.subsets = subsets;
        self
    }

    /// Number of faces
    pub fn num_faces(&self) -> usize {
        self.face_vertex_counts.len()
    }

    /// Number of face corners (the face-varying element count)
    pub fn num_face_varyings(&self) -> usize {
        self.face_vertex_indices.len()
    }

    /// Number of scene points the indices reference (highest index + 1)
    pub fn num_points(&self) -> usize {
        self.face_vertex_indices
            .iter()
            .filter(|&&i| i >= 0)
            .map(|&i| i as usize + 1)
            .max()
            .unwrap_or(0)
    }

    /// Whether a face is flagged as a hole
    pub fn is_hole(&self, face: usize) -> bool {
        self.hole_indices.iter().any(|&h| h >= 0 && h as usize == face)
    }
}

/// Cubic vs. linear curves
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveType {
    #[default]
    Linear,
    Cubic,
}

/// Basis of cubic curves
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CurveBasis {
    #[default]
    Bezier,
    #[serde(rename = "bspline")]
    BSpline,
    CatmullRom,
}

impl CurveBasis {
    /// Control points consumed per cubic segment
    pub const fn step(self) -> usize {
        match self {
            CurveBasis::Bezier => 3,
            CurveBasis::BSpline | CurveBasis::CatmullRom => 1,
        }
    }
}

/// How curve end points are connected
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveWrap {
    #[default]
    Nonperiodic,
    Periodic,
    /// Open curve whose end points are interpolated
    Pinned,
    /// Linear only: disjoint two-point segments
    Segmented,
}

impl CurveWrap {
    pub const fn is_periodic(self) -> bool {
        matches!(self, CurveWrap::Periodic)
    }
}

/// Basis curves topology as authored
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurvesTopology {
    pub curve_vertex_counts: Vec<i32>,
    pub curve_type: CurveType,
    pub basis: CurveBasis,
    pub wrap: CurveWrap,
    /// Optional remap from generated index to authored point index
    pub curve_indices: Vec<i32>,
}

impl CurvesTopology {
    pub fn new(
        curve_vertex_counts: Vec<i32>,
        curve_type: CurveType,
        basis: CurveBasis,
        wrap: CurveWrap,
    ) -> Self {
        Self {
            curve_vertex_counts,
            curve_type,
            basis,
            wrap,
            curve_indices: Vec::new(),
        }
    }

    pub fn with_indices(mut self, curve_indices: Vec<i32>) -> Self {
        self.curve_indices = curve_indices;
        self
    }

    pub fn num_curves(&self) -> usize {
        self.curve_vertex_counts.len()
    }

    /// Total control points (negative counts contribute nothing)
    pub fn num_points(&self) -> usize {
        self.curve_vertex_counts
            .iter()
            .map(|&c| c.max(0) as usize)
            .sum()
    }

    pub fn has_indices(&self) -> bool {
        !self.curve_indices.is_empty()
    }

    pub fn is_cubic(&self) -> bool {
        self.curve_type == CurveType::Cubic
    }
}

/// Coarse purpose classifier used to filter drawing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderTag {
    #[default]
    Geometry,
    Proxy,
    Guide,
    Render,
}

impl RenderTag {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderTag::Geometry => "geometry",
            RenderTag::Proxy => "proxy",
            RenderTag::Guide => "guide",
            RenderTag::Render => "render",
        }
    }
}

/// Per-prim display options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayStyle {
    /// Refinement level requested by the host
    pub refine_level: i32,
    /// Draw with per-face normals
    pub flat_shading: bool,
}
