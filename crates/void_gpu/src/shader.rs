//! Shader, sampler and texture descriptions

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use void_core::Handle;

/// Tag type for shader handles
pub struct Shader;

/// Tag type for sampler handles
pub struct Sampler;

/// Tag type for texture handles
pub struct Texture;

/// Non-owning reference to a runtime shader instance
pub type ShaderHandle = Handle<Shader>;

pub type SamplerHandle = Handle<Sampler>;

pub type TextureHandle = Handle<Texture>;

/// Identifier of the always-available constant colour shader
pub const SOLID_COLOR_SHADER: &str = "solidColor";

/// Shader instance request
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderDesc {
    /// Shader fragment identifier
    pub name: String,
    /// Base colour parameter
    pub color: [f32; 4],
    /// Vertex streams the shader reads
    pub inputs: Vec<String>,
    pub textures: Vec<TextureHandle>,
    /// Sampler state for each texture, in the same order
    pub samplers: Vec<SamplerHandle>,
}

impl ShaderDesc {
    pub fn new(name: impl Into<String>, color: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            color,
            inputs: Vec::new(),
            textures: Vec::new(),
            samplers: Vec::new(),
        }
    }

    /// The constant colour shader used when nothing better is available
    pub fn solid(color: [f32; 4]) -> Self {
        Self::new(SOLID_COLOR_SHADER, color)
    }
}

/// Texture filtering
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Texture addressing outside [0, 1]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressMode {
    #[default]
    Repeat,
    ClampToEdge,
    MirrorRepeat,
}

/// Sampler-state request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SamplerDesc {
    pub filter: FilterMode,
    pub address: AddressMode,
}
