//! Render Objects
//!
//! Opaque draw handles owned by the runtime. The sync layer drives them
//! with a handful of setters; everything is called on the designated thread.

use alloc::string::String;
use serde::{Deserialize, Serialize};
use void_core::Handle;
use void_math::{Aabb, Mat4};

use crate::buffer::BufferId;
use crate::instance::InstanceData;
use crate::shader::ShaderHandle;

/// Tag type for render object handles
pub struct RenderObjectTag;

/// Identity of a render object
pub type RenderObjectId = Handle<RenderObjectTag>;

/// How the index buffer is interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Triangles,
    /// Index pairs
    Lines,
    /// Index 4-tuples of cubic curve patches
    Patches,
    Points,
}

/// Creation parameters of a render object
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderObjectDesc {
    /// Unique, human-readable name used in diagnostics
    pub name: String,
    pub primitive: PrimitiveType,
}

impl RenderObjectDesc {
    pub fn new(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            primitive,
        }
    }
}

/// A drawable handle inside the graphics runtime
pub trait RenderObject: Send {
    fn id(&self) -> RenderObjectId;

    fn set_shader(&mut self, shader: ShaderHandle);

    fn enable(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    fn set_matrix(&mut self, matrix: Mat4);

    /// Bind vertex streams and the index buffer
    ///
    /// `bounds` is in object space; `None` keeps the previous bounds.
    fn set_geometry(
        &mut self,
        vertex_buffers: &[BufferId],
        index_buffer: Option<BufferId>,
        bounds: Option<Aabb>,
    );

    /// Per-instance data, each model matrix applied after the object
    /// matrix; an empty slice turns instancing off
    fn set_instance_transforms(&mut self, instances: &[InstanceData]);
}
