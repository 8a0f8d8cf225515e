//! Scene Delegate
//!
//! The read surface a render delegate consumes from the host scene graph.
//! Every method takes `&self`: prims are synced in parallel and the scene
//! must tolerate concurrent readers. Only `mark_clean` writes, and only to
//! the change tracker.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use void_core::PrimPath;
use void_math::{Aabb, Mat4};

use crate::dirty::DirtyBits;
use crate::topology::{CurvesTopology, DisplayStyle, MeshTopology, RenderTag};
use crate::value::{Interpolation, PrimvarDescriptor, Value};

/// Well-known attribute names
pub mod tokens {
    pub const POINTS: &str = "points";
    pub const NORMALS: &str = "normals";
    pub const WIDTHS: &str = "widths";
    pub const DISPLAY_COLOR: &str = "displayColor";
    pub const DISPLAY_OPACITY: &str = "displayOpacity";
    pub const ST: &str = "st";

    pub const INSTANCE_TRANSLATIONS: &str = "instanceTranslations";
    pub const INSTANCE_ROTATIONS: &str = "instanceRotations";
    pub const INSTANCE_SCALES: &str = "instanceScales";
    pub const INSTANCE_TRANSFORMS: &str = "instanceTransforms";
}

/// Interface description of a bound material
///
/// Only what synchronization needs: which shader to build and which
/// primvars the shader reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialDesc {
    /// Shader identifier resolved by the graphics runtime
    pub shader: String,
    /// Primvars the shader consumes beyond points and normals
    #[serde(default)]
    pub required_primvars: Vec<String>,
    /// Texture asset paths the shader samples
    #[serde(default)]
    pub textures: Vec<String>,
}

impl MaterialDesc {
    pub fn new(shader: impl Into<String>) -> Self {
        Self {
            shader: shader.into(),
            ..Default::default()
        }
    }

    pub fn with_primvar(mut self, name: impl Into<String>) -> Self {
        self.required_primvars.push(name.into());
        self
    }

    pub fn with_texture(mut self, path: impl Into<String>) -> Self {
        self.textures.push(path.into());
        self
    }
}

/// Host scene-graph collaborator
pub trait SceneDelegate: Send + Sync {
    /// What changed on `path` since it was last cleaned
    fn dirty_bits(&self, path: &PrimPath) -> DirtyBits;

    /// Clear `bits` in the change tracker
    fn mark_clean(&self, path: &PrimPath, bits: DirtyBits);

    /// Prims (not instancers) with at least one scene bit set
    fn dirty_prims(&self) -> Vec<PrimPath>;

    /// Read an attribute value
    fn get(&self, path: &PrimPath, name: &str) -> Option<Value>;

    /// Primvars authored on `path` with the given interpolation
    fn primvar_descriptors(
        &self,
        path: &PrimPath,
        interpolation: Interpolation,
    ) -> Vec<PrimvarDescriptor>;

    fn mesh_topology(&self, path: &PrimPath) -> MeshTopology;

    fn curves_topology(&self, path: &PrimPath) -> CurvesTopology;

    fn transform(&self, path: &PrimPath) -> Mat4;

    fn extent(&self, path: &PrimPath) -> Aabb;

    fn visible(&self, path: &PrimPath) -> bool;

    fn render_tag(&self, path: &PrimPath) -> RenderTag;

    fn display_style(&self, path: &PrimPath) -> DisplayStyle;

    fn material_id(&self, path: &PrimPath) -> Option<PrimPath>;

    fn material(&self, material_id: &PrimPath) -> Option<MaterialDesc>;

    /// Instancer that instances `path`, if any (also used for instancer nesting)
    fn instancer_id(&self, path: &PrimPath) -> Option<PrimPath>;

    /// Indices into the instancer's primvars that instance `prototype`
    fn instance_indices(&self, instancer: &PrimPath, prototype: &PrimPath) -> Vec<i32>;

    /// World transform of the instancer itself
    fn instancer_transform(&self, instancer: &PrimPath) -> Mat4 {
        self.transform(instancer)
    }
}
