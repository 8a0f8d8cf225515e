//! Process-wide GPU resource caches
//!
//! One `GlobalResources` instance is shared by every live render delegate:
//! - shader instances keyed by `ShaderKey`
//! - sampler states keyed by `SamplerDesc`
//! - the unit-cube geometry drawn by every bounding-box item
//!
//! The instance is created by the first delegate and dropped with the last
//! one. Entries are keyed by runtime id as well, so delegates driving
//! different graphics runtimes never share handles.
//!
//! Lookups take the read lock; a miss takes the write lock and checks again
//! before creating, so racing callers never create an entry twice.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use void_gpu::{
    upload, BufferId, BufferKind, ElementFormat, ElementLayout, GpuBuffer, ResourceRuntime,
    SamplerDesc, SamplerHandle, ShaderDesc, ShaderHandle, SOLID_COLOR_SHADER,
};
use void_math::Aabb;

/// Identity of a shader instance
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShaderKey {
    pub name: String,
    /// Colour parameter as raw bits so the key can be hashed
    color_bits: [u32; 4],
    /// Vertex streams the shader reads
    pub inputs: Vec<String>,
    /// Texture asset paths
    pub textures: Vec<String>,
    /// Sampler state every texture is bound with
    pub sampler: SamplerDesc,
}

impl ShaderKey {
    pub fn new(name: impl Into<String>, color: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            color_bits: color.map(f32::to_bits),
            inputs: Vec::new(),
            textures: Vec::new(),
            sampler: SamplerDesc::default(),
        }
    }

    /// Constant colour shader
    pub fn solid(color: [f32; 4]) -> Self {
        Self::new(SOLID_COLOR_SHADER, color)
    }

    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_textures(mut self, textures: Vec<String>) -> Self {
        self.textures = textures;
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerDesc) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn color(&self) -> [f32; 4] {
        self.color_bits.map(f32::from_bits)
    }

    pub fn is_solid(&self) -> bool {
        self.name == SOLID_COLOR_SHADER && self.textures.is_empty()
    }
}

/// Unit-cube line geometry shared by bounding-box items
struct BoxGeometry {
    positions: Box<dyn GpuBuffer>,
    indices: Box<dyn GpuBuffer>,
}

/// 12 edges of `Aabb::UNIT`, as index pairs into its corners
const BOX_EDGES: [u32; 24] = [
    0, 1, 1, 3, 3, 2, 2, 0, // bottom
    4, 5, 5, 7, 7, 6, 6, 4, // top
    0, 4, 1, 5, 2, 6, 3, 7, // sides
];

/// Shared GPU resources
#[derive(Default)]
pub struct GlobalResources {
    shaders: RwLock<HashMap<(u64, ShaderKey), ShaderHandle>>,
    samplers: RwLock<HashMap<(u64, SamplerDesc), SamplerHandle>>,
    bbox_geometry: RwLock<HashMap<u64, BoxGeometry>>,
}

static INSTANCE: Mutex<Option<Weak<GlobalResources>>> = parking_lot::const_mutex(None);

impl GlobalResources {
    /// Shared instance, created on first use
    ///
    /// The instance lives as long as any returned `Arc` does.
    pub fn acquire() -> Arc<GlobalResources> {
        let mut slot = INSTANCE.lock();
        if let Some(existing) = slot.as_ref().and_then(Weak::upgrade) {
            return existing;
        }
        log::debug!("creating global GPU resource caches");
        let fresh = Arc::new(GlobalResources::default());
        *slot = Some(Arc::downgrade(&fresh));
        fresh
    }

    /// Shader instance for `key`, created on first request
    ///
    /// Each texture is bound with the key's sampler state, shared through
    /// the sampler cache.
    ///
    /// A key whose textures fail to load, or whose shader fails to build,
    /// resolves to the solid colour shader with the key's colour. When even
    /// that fails the null handle is cached and returned.
    pub fn shader(&self, runtime: &mut dyn ResourceRuntime, key: &ShaderKey) -> ShaderHandle {
        let cache_key = (runtime.runtime_id(), key.clone());
        if let Some(&handle) = self.shaders.read().get(&cache_key) {
            return handle;
        }

        let mut shaders = self.shaders.write();
        if let Some(&handle) = shaders.get(&cache_key) {
            return handle;
        }
        let handle = self.create_shader(runtime, key);
        shaders.insert(cache_key, handle);
        handle
    }

    /// Sampler state for `desc`, created on first request
    pub fn sampler(
        &self,
        runtime: &mut dyn ResourceRuntime,
        desc: &SamplerDesc,
    ) -> Option<SamplerHandle> {
        let cache_key = (runtime.runtime_id(), *desc);
        if let Some(&handle) = self.samplers.read().get(&cache_key) {
            return Some(handle);
        }

        let mut samplers = self.samplers.write();
        if let Some(&handle) = samplers.get(&cache_key) {
            return Some(handle);
        }
        let handle = runtime.create_sampler(desc)?;
        samplers.insert(cache_key, handle);
        Some(handle)
    }

    /// Vertex and index buffers of the shared unit cube
    ///
    /// Returns `None` if the buffers could not be filled.
    pub fn bbox_geometry(
        &self,
        runtime: &mut dyn ResourceRuntime,
    ) -> Option<(BufferId, BufferId)> {
        let runtime_id = runtime.runtime_id();
        if let Some(geometry) = self.bbox_geometry.read().get(&runtime_id) {
            return Some((geometry.positions.id(), geometry.indices.id()));
        }

        let mut cache = self.bbox_geometry.write();
        if let Some(geometry) = cache.get(&runtime_id) {
            return Some((geometry.positions.id(), geometry.indices.id()));
        }

        let corners: Vec<[f32; 3]> = Aabb::UNIT.corners().iter().map(|c| c.to_array()).collect();
        let mut positions = runtime.allocate_buffer(
            BufferKind::Vertex,
            ElementLayout::new(ElementFormat::Float3, "positions"),
        );
        let mut indices = runtime.allocate_buffer(BufferKind::Index, ElementLayout::index());
        if !upload(positions.as_mut(), &corners, corners.len())
            || !upload(indices.as_mut(), &BOX_EDGES, BOX_EDGES.len())
        {
            log::error!("failed to fill shared bounding-box geometry");
            return None;
        }

        let ids = (positions.id(), indices.id());
        cache.insert(runtime_id, BoxGeometry { positions, indices });
        Some(ids)
    }

    /// Number of cached shader instances, across runtimes
    pub fn shader_count(&self) -> usize {
        self.shaders.read().len()
    }

    fn create_shader(&self, runtime: &mut dyn ResourceRuntime, key: &ShaderKey) -> ShaderHandle {
        let mut desc = ShaderDesc::new(key.name.clone(), key.color());
        desc.inputs = key.inputs.clone();

        let mut textures_ok = true;
        for path in &key.textures {
            let Some(texture) = runtime.load_texture(path) else {
                log::warn!("texture '{}' failed to load for shader '{}'", path, key.name);
                textures_ok = false;
                continue;
            };
            let Some(sampler) = self.sampler(runtime, &key.sampler) else {
                log::warn!("no sampler state for texture '{}' of shader '{}'", path, key.name);
                textures_ok = false;
                continue;
            };
            desc.textures.push(texture);
            desc.samplers.push(sampler);
        }

        if textures_ok {
            if let Some(handle) = runtime.create_shader(&desc) {
                return handle;
            }
            log::warn!("shader '{}' failed to build, using solid colour", key.name);
        }

        if !key.is_solid() {
            if let Some(handle) = runtime.create_shader(&ShaderDesc::solid(key.color())) {
                return handle;
            }
        }
        log::error!("solid colour shader unavailable for '{}'", key.name);
        ShaderHandle::null()
    }
}
