//! Deferred GPU commit
//!
//! Sync runs on worker threads and may not touch GPU objects. It instead
//! describes what changed in a `CommitState`, moves it into a
//! `CommitRecord` together with an `Arc` to the item's GPU-side state, and
//! enqueues the record. The designated thread drains the queue once per
//! frame, after every Sync of that frame has finished.
//!
//! Records run in FIFO order. A record may enqueue follow-up work; it runs
//! on the next drain.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use void_gpu::{
    upload, BufferId, BufferKind, DesignatedThread, ElementFormat, ElementLayout, GpuBuffer,
    PrimitiveType, RenderObject, RenderObjectDesc, ResourceRuntime, ShaderHandle,
};
use void_math::{Aabb, Mat4};

use crate::geometry::pack_instances;
use crate::global_cache::{GlobalResources, ShaderKey};

/// One named vertex stream, flat `f32` data
#[derive(Clone, Debug, PartialEq)]
pub struct VertexStream {
    pub semantic: String,
    pub format: ElementFormat,
    pub data: Vec<f32>,
}

impl VertexStream {
    pub fn new(semantic: impl Into<String>, format: ElementFormat, data: Vec<f32>) -> Self {
        Self {
            semantic: semantic.into(),
            format,
            data,
        }
    }

    pub fn element_count(&self) -> usize {
        self.data.len() / self.format.components()
    }
}

/// What changed for one render item during one Sync
///
/// Every field is optional; `None` leaves the GPU side untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommitState {
    pub index_data: Option<Vec<u32>>,
    pub vertex_streams: Vec<VertexStream>,
    pub shader: Option<ShaderKey>,
    pub enabled: Option<bool>,
    pub matrix: Option<Mat4>,
    /// Empty turns instancing off
    pub instance_transforms: Option<Vec<Mat4>>,
    /// Object-space bounds; only pushed when they grow the cached box
    pub bounds: Option<Aabb>,
    /// Bind the shared unit-cube geometry instead of owned buffers
    pub use_shared_box: bool,
}

impl CommitState {
    /// A commit that only hides the item
    pub fn disable() -> Self {
        Self {
            enabled: Some(false),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn is_disable_only(&self) -> bool {
        self.enabled == Some(false)
            && Self {
                enabled: None,
                ..self.clone()
            }
            .is_empty()
    }
}

/// GPU-side state of one render item
///
/// Touched only while draining, on the designated thread.
pub struct GpuItemState {
    name: String,
    primitive: PrimitiveType,
    object: Option<Box<dyn RenderObject>>,
    vertex_buffers: Vec<Box<dyn GpuBuffer>>,
    index_buffer: Option<Box<dyn GpuBuffer>>,
    shared_box: Option<(BufferId, BufferId)>,
    shader_key: Option<ShaderKey>,
    shader: Option<ShaderHandle>,
    matrix: Option<Mat4>,
    bounds: Aabb,
    instance_transforms: Vec<Mat4>,
}

impl GpuItemState {
    pub fn new(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            primitive,
            object: None,
            vertex_buffers: Vec::new(),
            index_buffer: None,
            shared_box: None,
            shader_key: None,
            shader: None,
            matrix: None,
            bounds: Aabb::EMPTY,
            instance_transforms: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_object(&self) -> bool {
        self.object.is_some()
    }

    /// Cached bounds (only ever grows)
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn shader(&self) -> Option<ShaderHandle> {
        self.shader
    }

    /// Push a commit to the GPU object, creating it on first use
    pub fn apply(&mut self, commit: CommitState, ctx: &mut CommitContext<'_>) {
        if self.object.is_none() {
            if commit.is_disable_only() || commit.is_empty() {
                return;
            }
            let desc = RenderObjectDesc::new(self.name.clone(), self.primitive);
            self.object = Some(ctx.runtime.create_render_object(&desc));
        }

        let mut geometry_changed = false;

        if commit.use_shared_box && self.shared_box.is_none() {
            match ctx.resources.bbox_geometry(ctx.runtime) {
                Some(ids) => {
                    self.shared_box = Some(ids);
                    self.vertex_buffers.clear();
                    self.index_buffer = None;
                    geometry_changed = true;
                }
                None => log::error!("{}: shared box geometry unavailable", self.name),
            }
        }

        if let Some(indices) = commit.index_data {
            let buffer = self
                .index_buffer
                .get_or_insert_with(|| ctx.runtime.allocate_buffer(BufferKind::Index, ElementLayout::index()));
            if upload(buffer.as_mut(), &indices, indices.len()) {
                geometry_changed = true;
            } else {
                log::error!("{}: index buffer acquire failed, upload skipped", self.name);
            }
        }

        for stream in commit.vertex_streams {
            let position = self
                .vertex_buffers
                .iter()
                .position(|b| b.layout().semantic == stream.semantic);
            let position = match position {
                Some(i) if self.vertex_buffers[i].layout().format == stream.format => i,
                found => {
                    let layout = ElementLayout::new(stream.format, stream.semantic.clone());
                    let buffer = ctx.runtime.allocate_buffer(BufferKind::Vertex, layout);
                    match found {
                        Some(i) => {
                            self.vertex_buffers[i] = buffer;
                            i
                        }
                        None => {
                            self.vertex_buffers.push(buffer);
                            self.vertex_buffers.len() - 1
                        }
                    }
                }
            };
            let count = stream.element_count();
            if upload(self.vertex_buffers[position].as_mut(), &stream.data, count) {
                geometry_changed = true;
            } else {
                log::error!(
                    "{}: '{}' buffer acquire failed, upload skipped",
                    self.name,
                    stream.semantic
                );
            }
        }

        let mut pushed_bounds = None;
        if let Some(bounds) = commit.bounds {
            if !self.bounds.contains_aabb(&bounds) {
                self.bounds = self.bounds.union(&bounds);
                pushed_bounds = Some(self.bounds);
            }
        }

        let shader = commit.shader.and_then(|key| {
            if self.shader_key.as_ref() == Some(&key) {
                return None;
            }
            let handle = ctx.resources.shader(ctx.runtime, &key);
            self.shader_key = Some(key);
            Some(handle)
        });

        let Some(object) = self.object.as_mut() else {
            return;
        };

        if geometry_changed || pushed_bounds.is_some() {
            let (vertex_ids, index_id) = match self.shared_box {
                Some((positions, indices)) => (vec![positions], Some(indices)),
                None => (
                    self.vertex_buffers.iter().map(|b| b.id()).collect::<Vec<_>>(),
                    self.index_buffer.as_ref().map(|b| b.id()),
                ),
            };
            object.set_geometry(&vertex_ids, index_id, pushed_bounds);
        }

        if let Some(handle) = shader {
            if self.shader != Some(handle) {
                object.set_shader(handle);
                self.shader = Some(handle);
            }
        }

        if let Some(matrix) = commit.matrix {
            if self.matrix != Some(matrix) {
                object.set_matrix(matrix);
                self.matrix = Some(matrix);
            }
        }

        if let Some(transforms) = commit.instance_transforms {
            if self.instance_transforms != transforms {
                object.set_instance_transforms(&pack_instances(&transforms));
                self.instance_transforms = transforms;
            }
        }

        if let Some(enabled) = commit.enabled {
            if object.is_enabled() != enabled {
                object.enable(enabled);
            }
        }
    }

    /// Destroy the GPU object and drop owned buffers
    pub fn release(&mut self, runtime: &mut dyn ResourceRuntime) {
        if let Some(object) = self.object.take() {
            runtime.destroy_render_object(object);
        }
        self.vertex_buffers.clear();
        self.index_buffer = None;
        self.shared_box = None;
    }
}

/// Everything a record may use while it runs
pub struct CommitContext<'a> {
    pub runtime: &'a mut dyn ResourceRuntime,
    pub resources: &'a GlobalResources,
    /// For follow-up work; it runs on the next drain
    pub queue: &'a CommitQueue,
}

/// Deferred GPU mutation
pub type CommitRecord = Box<dyn FnOnce(&mut CommitContext<'_>) + Send>;

/// FIFO of commit records
pub struct CommitQueue {
    sender: Sender<CommitRecord>,
    receiver: Receiver<CommitRecord>,
    thread: DesignatedThread,
    enqueued: AtomicU64,
}

impl CommitQueue {
    /// Queue drained on the calling thread
    pub fn new() -> Self {
        Self::with_thread(DesignatedThread::current())
    }

    pub fn with_thread(thread: DesignatedThread) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            thread,
            enqueued: AtomicU64::new(0),
        }
    }

    pub fn designated_thread(&self) -> DesignatedThread {
        self.thread
    }

    /// Queue a record; callable from any thread
    pub fn enqueue(&self, record: CommitRecord) {
        if self.sender.send(record).is_err() {
            log::error!("commit queue disconnected, record dropped");
            return;
        }
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Records queued since creation
    pub fn enqueued_total(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Records waiting for the next drain
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Run every record queued before this call, in order
    ///
    /// Designated thread only. Returns the number of records executed.
    pub fn drain(&self, runtime: &mut dyn ResourceRuntime, resources: &GlobalResources) -> usize {
        self.thread.assert_current("CommitQueue::drain");

        let batch = self.receiver.len();
        let mut executed = 0;
        for _ in 0..batch {
            let Ok(record) = self.receiver.try_recv() else {
                break;
            };
            let mut ctx = CommitContext {
                runtime: &mut *runtime,
                resources,
                queue: self,
            };
            record(&mut ctx);
            executed += 1;
        }
        if executed > 0 {
            log::debug!("drained {} commit records, {} pending", executed, self.pending());
        }
        executed
    }
}

impl Default for CommitQueue {
    fn default() -> Self {
        Self::new()
    }
}
