//! Resource Runtime
//!
//! The host graphics-resource collaborator. Every method mutates GPU-side
//! state and may only be called on the designated thread.

use alloc::boxed::Box;

use crate::buffer::{BufferKind, ElementLayout, GpuBuffer};
use crate::object::{RenderObject, RenderObjectDesc};
use crate::shader::{SamplerDesc, SamplerHandle, ShaderDesc, ShaderHandle, TextureHandle};

/// Host graphics runtime
pub trait ResourceRuntime {
    /// Distinguishes runtimes that share process-wide caches
    fn runtime_id(&self) -> u64;

    fn allocate_buffer(&mut self, kind: BufferKind, layout: ElementLayout) -> Box<dyn GpuBuffer>;

    fn create_render_object(&mut self, desc: &RenderObjectDesc) -> Box<dyn RenderObject>;

    fn destroy_render_object(&mut self, object: Box<dyn RenderObject>);

    /// Build a shader instance; `None` when the fragment fails to compile
    fn create_shader(&mut self, desc: &ShaderDesc) -> Option<ShaderHandle>;

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Option<SamplerHandle>;

    /// Load a texture; `None` when the asset cannot be read
    fn load_texture(&mut self, path: &str) -> Option<TextureHandle>;
}
