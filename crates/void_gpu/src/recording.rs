//! Recording Runtime
//!
//! A `ResourceRuntime` that keeps everything in memory and records every
//! call. It backs headless hosts and the sync tests: object state, buffer
//! contents and the call log can all be inspected after a commit.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use void_core::HandleAllocator;
use void_math::{Aabb, Mat4};

use crate::buffer::{Buffer, BufferId, BufferKind, ElementLayout, GpuBuffer};
use crate::instance::InstanceData;
use crate::object::{PrimitiveType, RenderObject, RenderObjectDesc, RenderObjectId, RenderObjectTag};
use crate::runtime::ResourceRuntime;
use crate::shader::{
    Sampler, SamplerDesc, SamplerHandle, Shader, ShaderDesc, ShaderHandle, Texture, TextureHandle,
};

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// One recorded runtime call
#[derive(Clone, Debug, PartialEq)]
pub enum GpuEvent {
    BufferAllocated { buffer: BufferId, kind: BufferKind },
    BufferCommitted { buffer: BufferId, count: usize },
    BufferReleased { buffer: BufferId },
    ObjectCreated { object: RenderObjectId, name: String },
    ObjectDestroyed { object: RenderObjectId, name: String },
    ShaderCreated { shader: ShaderHandle, name: String },
    ShaderFailed { name: String },
    SetShader { object: RenderObjectId, shader: ShaderHandle },
    Enable { object: RenderObjectId, enabled: bool },
    SetMatrix { object: RenderObjectId },
    SetGeometry { object: RenderObjectId, index_buffer: Option<BufferId> },
    SetInstanceTransforms { object: RenderObjectId, count: usize },
}

/// Last state pushed to a render object
#[derive(Clone, Debug)]
pub struct ObjectState {
    pub id: RenderObjectId,
    pub name: String,
    pub primitive: PrimitiveType,
    pub shader: Option<ShaderHandle>,
    pub enabled: bool,
    pub matrix: Mat4,
    pub bounds: Option<Aabb>,
    pub vertex_buffers: Vec<BufferId>,
    pub index_buffer: Option<BufferId>,
    pub instance_transforms: Vec<Mat4>,
    /// Instances as uploaded
    pub instance_data: Vec<InstanceData>,
    pub destroyed: bool,
}

struct BufferState {
    kind: BufferKind,
    layout: ElementLayout,
    data: Vec<u8>,
    count: usize,
    released: bool,
}

#[derive(Default)]
struct Shared {
    events: Mutex<Vec<GpuEvent>>,
    objects: Mutex<HashMap<RenderObjectId, ObjectState>>,
    buffers: Mutex<HashMap<BufferId, BufferState>>,
    buffer_ids: Mutex<HandleAllocator<Buffer>>,
    fail_acquire: AtomicBool,
}

impl Shared {
    fn record(&self, event: GpuEvent) {
        log::trace!("gpu: {:?}", event);
        self.events.lock().push(event);
    }

    fn update_object(&self, id: RenderObjectId, update: impl FnOnce(&mut ObjectState)) {
        match self.objects.lock().get_mut(&id) {
            Some(state) => update(state),
            None => log::error!("recording runtime: unknown render object {:?}", id),
        }
    }
}

/// In-memory buffer
struct RecordingBuffer {
    id: BufferId,
    kind: BufferKind,
    layout: ElementLayout,
    staging: Vec<u8>,
    staging_count: usize,
    len: usize,
    shared: Arc<Shared>,
}

impl GpuBuffer for RecordingBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn kind(&self) -> BufferKind {
        self.kind
    }

    fn layout(&self) -> &ElementLayout {
        &self.layout
    }

    fn len(&self) -> usize {
        self.len
    }

    fn acquire(&mut self, count: usize, discard_previous: bool) -> Option<&mut [u8]> {
        if self.shared.fail_acquire.load(Ordering::Relaxed) {
            return None;
        }
        if discard_previous {
            self.staging.clear();
        }
        self.staging.resize(count * self.layout.stride(), 0);
        self.staging_count = count;
        Some(self.staging.as_mut_slice())
    }

    fn commit(&mut self) {
        self.len = self.staging_count;
        if let Some(state) = self.shared.buffers.lock().get_mut(&self.id) {
            state.data = self.staging.clone();
            state.count = self.staging_count;
        }
        self.shared.record(GpuEvent::BufferCommitted {
            buffer: self.id,
            count: self.staging_count,
        });
    }
}

impl Drop for RecordingBuffer {
    fn drop(&mut self) {
        if let Some(state) = self.shared.buffers.lock().get_mut(&self.id) {
            state.released = true;
        }
        let _ = self.shared.buffer_ids.lock().free(self.id);
        self.shared.record(GpuEvent::BufferReleased { buffer: self.id });
    }
}

/// In-memory render object
struct RecordingObject {
    id: RenderObjectId,
    shared: Arc<Shared>,
}

impl RenderObject for RecordingObject {
    fn id(&self) -> RenderObjectId {
        self.id
    }

    fn set_shader(&mut self, shader: ShaderHandle) {
        self.shared.update_object(self.id, |state| state.shader = Some(shader));
        self.shared.record(GpuEvent::SetShader {
            object: self.id,
            shader,
        });
    }

    fn enable(&mut self, enabled: bool) {
        self.shared.update_object(self.id, |state| state.enabled = enabled);
        self.shared.record(GpuEvent::Enable {
            object: self.id,
            enabled,
        });
    }

    fn is_enabled(&self) -> bool {
        self.shared
            .objects
            .lock()
            .get(&self.id)
            .map_or(false, |state| state.enabled)
    }

    fn set_matrix(&mut self, matrix: Mat4) {
        self.shared.update_object(self.id, |state| state.matrix = matrix);
        self.shared.record(GpuEvent::SetMatrix { object: self.id });
    }

    fn set_geometry(
        &mut self,
        vertex_buffers: &[BufferId],
        index_buffer: Option<BufferId>,
        bounds: Option<Aabb>,
    ) {
        self.shared.update_object(self.id, |state| {
            state.vertex_buffers = vertex_buffers.to_vec();
            state.index_buffer = index_buffer;
            if bounds.is_some() {
                state.bounds = bounds;
            }
        });
        self.shared.record(GpuEvent::SetGeometry {
            object: self.id,
            index_buffer,
        });
    }

    fn set_instance_transforms(&mut self, instances: &[InstanceData]) {
        self.shared.update_object(self.id, |state| {
            state.instance_transforms = instances.iter().map(InstanceData::model).collect();
            state.instance_data = instances.to_vec();
        });
        self.shared.record(GpuEvent::SetInstanceTransforms {
            object: self.id,
            count: instances.len(),
        });
    }
}

/// Recording graphics runtime
pub struct RecordingRuntime {
    id: u64,
    shared: Arc<Shared>,
    object_ids: HandleAllocator<RenderObjectTag>,
    shader_ids: HandleAllocator<Shader>,
    sampler_ids: HandleAllocator<Sampler>,
    texture_ids: HandleAllocator<Texture>,
    shaders: HashMap<ShaderHandle, ShaderDesc>,
    textures: HashMap<String, TextureHandle>,
    failing_shaders: HashSet<String>,
    missing_textures: HashSet<String>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self {
            id: NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed),
            shared: Arc::new(Shared::default()),
            object_ids: HandleAllocator::new(),
            shader_ids: HandleAllocator::new(),
            sampler_ids: HandleAllocator::new(),
            texture_ids: HandleAllocator::new(),
            shaders: HashMap::new(),
            textures: HashMap::new(),
            failing_shaders: HashSet::new(),
            missing_textures: HashSet::new(),
        }
    }

    // ========== Failure Injection ==========

    /// Make `create_shader` fail for the named fragment
    pub fn fail_shader(&mut self, name: impl Into<String>) {
        self.failing_shaders.insert(name.into());
    }

    /// Make `load_texture` fail for the given path
    pub fn fail_texture(&mut self, path: impl Into<String>) {
        self.missing_textures.insert(path.into());
    }

    /// Make every buffer `acquire` return no memory
    pub fn set_fail_acquire(&self, fail: bool) {
        self.shared.fail_acquire.store(fail, Ordering::Relaxed);
    }

    // ========== Inspection ==========

    pub fn events(&self) -> Vec<GpuEvent> {
        self.shared.events.lock().clone()
    }

    pub fn clear_events(&self) {
        self.shared.events.lock().clear();
    }

    /// Every render object ever created, sorted by name
    pub fn objects(&self) -> Vec<ObjectState> {
        let mut objects: Vec<ObjectState> = self.shared.objects.lock().values().cloned().collect();
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        objects
    }

    /// Live render objects whose name starts with `prefix`
    pub fn live_objects_with_prefix(&self, prefix: &str) -> Vec<ObjectState> {
        self.objects()
            .into_iter()
            .filter(|state| !state.destroyed && state.name.starts_with(prefix))
            .collect()
    }

    pub fn object_named(&self, name: &str) -> Option<ObjectState> {
        self.shared
            .objects
            .lock()
            .values()
            .find(|state| state.name == name && !state.destroyed)
            .cloned()
    }

    pub fn live_object_count(&self) -> usize {
        self.shared
            .objects
            .lock()
            .values()
            .filter(|state| !state.destroyed)
            .count()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.shared
            .buffers
            .lock()
            .values()
            .filter(|state| !state.released)
            .count()
    }

    /// Committed contents of a buffer, read back as `T`
    pub fn buffer_data<T: bytemuck::Pod>(&self, buffer: BufferId) -> Option<Vec<T>> {
        let buffers = self.shared.buffers.lock();
        let state = buffers.get(&buffer)?;
        let size = core::mem::size_of::<T>();
        if size == 0 {
            return None;
        }
        Some(
            state
                .data
                .chunks_exact(size)
                .map(bytemuck::pod_read_unaligned::<T>)
                .collect(),
        )
    }

    /// Committed element count and layout of a buffer
    pub fn buffer_info(&self, buffer: BufferId) -> Option<(BufferKind, ElementLayout, usize)> {
        self.shared
            .buffers
            .lock()
            .get(&buffer)
            .map(|state| (state.kind, state.layout.clone(), state.count))
    }

    /// Description a shader handle was created from
    pub fn shader_desc(&self, shader: ShaderHandle) -> Option<ShaderDesc> {
        self.shaders.get(&shader).cloned()
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn sampler_count(&self) -> usize {
        self.sampler_ids.len()
    }
}

impl Default for RecordingRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRuntime for RecordingRuntime {
    fn runtime_id(&self) -> u64 {
        self.id
    }

    fn allocate_buffer(&mut self, kind: BufferKind, layout: ElementLayout) -> Box<dyn GpuBuffer> {
        let id = match self.shared.buffer_ids.lock().allocate() {
            Ok(id) => id,
            Err(err) => {
                log::error!("recording runtime: buffer ids exhausted: {}", err);
                BufferId::null()
            }
        };
        self.shared.buffers.lock().insert(
            id,
            BufferState {
                kind,
                layout: layout.clone(),
                data: Vec::new(),
                count: 0,
                released: false,
            },
        );
        self.shared.record(GpuEvent::BufferAllocated { buffer: id, kind });
        Box::new(RecordingBuffer {
            id,
            kind,
            layout,
            staging: Vec::new(),
            staging_count: 0,
            len: 0,
            shared: self.shared.clone(),
        })
    }

    fn create_render_object(&mut self, desc: &RenderObjectDesc) -> Box<dyn RenderObject> {
        let id = self.object_ids.allocate().unwrap_or_else(|err| {
            log::error!("recording runtime: object ids exhausted: {}", err);
            RenderObjectId::null()
        });
        self.shared.objects.lock().insert(
            id,
            ObjectState {
                id,
                name: desc.name.clone(),
                primitive: desc.primitive,
                shader: None,
                enabled: false,
                matrix: Mat4::IDENTITY,
                bounds: None,
                vertex_buffers: Vec::new(),
                index_buffer: None,
                instance_transforms: Vec::new(),
                instance_data: Vec::new(),
                destroyed: false,
            },
        );
        self.shared.record(GpuEvent::ObjectCreated {
            object: id,
            name: desc.name.clone(),
        });
        Box::new(RecordingObject {
            id,
            shared: self.shared.clone(),
        })
    }

    fn destroy_render_object(&mut self, object: Box<dyn RenderObject>) {
        let id = object.id();
        let mut name = String::new();
        self.shared.update_object(id, |state| {
            state.destroyed = true;
            state.enabled = false;
            name = state.name.clone();
        });
        let _ = self.object_ids.free(id);
        self.shared.record(GpuEvent::ObjectDestroyed { object: id, name });
    }

    fn create_shader(&mut self, desc: &ShaderDesc) -> Option<ShaderHandle> {
        if self.failing_shaders.contains(&desc.name) {
            self.shared.record(GpuEvent::ShaderFailed {
                name: desc.name.clone(),
            });
            return None;
        }
        let handle = self.shader_ids.allocate().ok()?;
        self.shaders.insert(handle, desc.clone());
        self.shared.record(GpuEvent::ShaderCreated {
            shader: handle,
            name: desc.name.clone(),
        });
        Some(handle)
    }

    fn create_sampler(&mut self, _desc: &SamplerDesc) -> Option<SamplerHandle> {
        self.sampler_ids.allocate().ok()
    }

    fn load_texture(&mut self, path: &str) -> Option<TextureHandle> {
        if self.missing_textures.contains(path) {
            return None;
        }
        if let Some(&handle) = self.textures.get(path) {
            return Some(handle);
        }
        let handle = self.texture_ids.allocate().ok()?;
        self.textures.insert(path.into(), handle);
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{upload, ElementFormat};

    #[test]
    fn test_buffer_upload_and_readback() {
        let mut runtime = RecordingRuntime::new();
        let mut buffer = runtime.allocate_buffer(
            BufferKind::Vertex,
            ElementLayout::new(ElementFormat::Float3, "points"),
        );
        let points = [[0.0f32, 1.0, 2.0], [3.0, 4.0, 5.0]];
        assert!(upload(buffer.as_mut(), &points, 2));

        let data = runtime.buffer_data::<[f32; 3]>(buffer.id()).unwrap();
        assert_eq!(data, points.to_vec());
        assert_eq!(buffer.len(), 2);
        assert_eq!(runtime.live_buffer_count(), 1);

        drop(buffer);
        assert_eq!(runtime.live_buffer_count(), 0);
    }

    #[test]
    fn test_failed_acquire_writes_nothing() {
        let mut runtime = RecordingRuntime::new();
        let mut buffer = runtime.allocate_buffer(BufferKind::Index, ElementLayout::index());
        runtime.set_fail_acquire(true);
        assert!(!upload(buffer.as_mut(), &[0u32, 1, 2], 3));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_object_state_is_recorded() {
        let mut runtime = RecordingRuntime::new();
        let mut object =
            runtime.create_render_object(&RenderObjectDesc::new("/a:hull", PrimitiveType::Triangles));
        object.enable(true);
        object.set_matrix(Mat4::from_scale(glam::Vec3::splat(2.0)));

        let state = runtime.object_named("/a:hull").unwrap();
        assert!(state.enabled);
        assert_eq!(state.matrix, Mat4::from_scale(glam::Vec3::splat(2.0)));

        runtime.destroy_render_object(object);
        assert!(runtime.object_named("/a:hull").is_none());
        assert_eq!(runtime.live_object_count(), 0);
    }

    #[test]
    fn test_shader_failure_injection() {
        let mut runtime = RecordingRuntime::new();
        runtime.fail_shader("broken");
        assert!(runtime.create_shader(&ShaderDesc::new("broken", [1.0; 4])).is_none());
        let solid = runtime.create_shader(&ShaderDesc::solid([1.0; 4])).unwrap();
        assert_eq!(runtime.shader_desc(solid).unwrap().name, crate::SOLID_COLOR_SHADER);
    }

    #[test]
    fn test_runtime_ids_are_distinct() {
        assert_ne!(RecordingRuntime::new().runtime_id(), RecordingRuntime::new().runtime_id());
    }
}
