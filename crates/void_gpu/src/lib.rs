//! # void_gpu - Graphics Resource Collaborator Surface
//!
//! Backend-agnostic view of the host graphics runtime as the sync layer
//! sees it:
//! - **Buffers**: acquire/commit byte ranges with typed element layouts
//! - **Render objects**: opaque draw handles with shader, matrix, geometry
//!   and instancing setters
//! - **Instances**: `InstanceData`, the per-instance upload layout
//! - **Shaders**: descriptions and non-owning handles
//! - **Designated thread**: debug guard for the single GPU-mutation thread
//! - **Recording runtime**: an in-memory runtime that logs every call
//!
//! Every mutating call on these traits belongs on the designated thread.

extern crate alloc;

pub mod buffer;
pub mod instance;
pub mod object;
pub mod recording;
pub mod runtime;
pub mod shader;
pub mod thread;

pub use buffer::*;
pub use instance::*;
pub use object::*;
pub use recording::*;
pub use runtime::*;
pub use shader::*;
pub use thread::*;

pub mod prelude {
    pub use crate::buffer::{upload, BufferId, BufferKind, ElementFormat, ElementLayout, GpuBuffer};
    pub use crate::instance::InstanceData;
    pub use crate::object::{PrimitiveType, RenderObject, RenderObjectDesc, RenderObjectId};
    pub use crate::recording::{GpuEvent, ObjectState, RecordingRuntime};
    pub use crate::runtime::ResourceRuntime;
    pub use crate::shader::{SamplerDesc, ShaderDesc, ShaderHandle, SOLID_COLOR_SHADER};
    pub use crate::thread::DesignatedThread;
}
