//! Draw items and render items
//!
//! A `DrawItem` is one (prim, repr) drawable. It owns one or more
//! `RenderItemData`, each mirroring one GPU render object: meshes with
//! material subsets get one render item per subset plus one for the faces
//! no subset claims.
//!
//! The CPU-side fields of a render item (enabled flag, instance count,
//! shader key) are updated during Sync. The GPU-side state sits behind an
//! `Arc<Mutex<_>>` that commit records carry to the designated thread.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use void_core::PrimPath;
use void_gpu::PrimitiveType;
use void_scene::DirtyBits;

use crate::commit::{CommitContext, CommitQueue, CommitState, GpuItemState};
use crate::global_cache::ShaderKey;

/// How a prim is drawn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReprStyle {
    /// Shaded mesh with smooth normals
    SmoothHull,
    /// Shaded mesh with per-face normals
    FlatHull,
    /// Mesh edges
    Wireframe,
    /// Unit cube scaled to the prim's extent
    BoundingBox,
    /// Control points, for snapping
    Points,
    /// Curves drawn as line segments
    Wire,
    /// Curves drawn as cubic patches
    Refined,
}

impl ReprStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            ReprStyle::SmoothHull => "smoothHull",
            ReprStyle::FlatHull => "flatHull",
            ReprStyle::Wireframe => "wireframe",
            ReprStyle::BoundingBox => "boundingBox",
            ReprStyle::Points => "points",
            ReprStyle::Wire => "wire",
            ReprStyle::Refined => "refined",
        }
    }
}

/// CPU mirror of one GPU render object
pub struct RenderItemData {
    name: String,
    primitive: PrimitiveType,
    material_id: Option<PrimPath>,
    gpu: Arc<Mutex<GpuItemState>>,
    enabled: bool,
    instance_count: usize,
    shader: Option<ShaderKey>,
}

impl RenderItemData {
    pub fn new(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        let name = name.into();
        Self {
            gpu: Arc::new(Mutex::new(GpuItemState::new(name.clone(), primitive))),
            name,
            primitive,
            material_id: None,
            enabled: false,
            instance_count: 0,
            shader: None,
        }
    }

    pub fn with_material(mut self, material_id: Option<PrimPath>) -> Self {
        self.material_id = material_id;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primitive(&self) -> PrimitiveType {
        self.primitive
    }

    /// Material of the geom subset this item draws
    pub fn material_id(&self) -> Option<&PrimPath> {
        self.material_id.as_ref()
    }

    /// Enabled state as of the last enqueued commit
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Instances drawn; 1 when not instanced, 0 when nothing is drawn
    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    pub fn shader(&self) -> Option<&ShaderKey> {
        self.shader.as_ref()
    }

    pub fn gpu_state(&self) -> &Arc<Mutex<GpuItemState>> {
        &self.gpu
    }

    /// Record `commit` in the CPU mirror and queue it for the GPU
    ///
    /// Returns `false` when the commit was empty and nothing was queued.
    pub fn enqueue(&mut self, commit: CommitState, queue: &CommitQueue) -> bool {
        if commit.is_empty() {
            return false;
        }
        if let Some(enabled) = commit.enabled {
            self.enabled = enabled;
        }
        if let Some(shader) = &commit.shader {
            self.shader = Some(shader.clone());
        }
        if let Some(transforms) = &commit.instance_transforms {
            self.instance_count = if transforms.is_empty() { 1 } else { transforms.len() };
        }
        if commit.enabled == Some(false) {
            self.instance_count = 0;
        } else if commit.enabled == Some(true) && self.instance_count == 0 {
            self.instance_count = 1;
        }

        let gpu = self.gpu.clone();
        queue.enqueue(Box::new(move |ctx: &mut CommitContext<'_>| {
            gpu.lock().apply(commit, ctx)
        }));
        true
    }

    /// Hide the item if it is shown
    pub fn disable(&mut self, queue: &CommitQueue) -> bool {
        if !self.enabled {
            return false;
        }
        self.enqueue(CommitState::disable(), queue)
    }

    /// Queue destruction of the GPU object and its buffers
    pub fn release(self, queue: &CommitQueue) {
        let gpu = self.gpu;
        queue.enqueue(Box::new(move |ctx: &mut CommitContext<'_>| {
            gpu.lock().release(ctx.runtime)
        }));
    }
}

impl core::fmt::Debug for RenderItemData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderItemData")
            .field("name", &self.name)
            .field("primitive", &self.primitive)
            .field("enabled", &self.enabled)
            .field("instance_count", &self.instance_count)
            .finish()
    }
}

/// One (prim, repr) drawable
#[derive(Debug)]
pub struct DrawItem {
    repr: ReprStyle,
    items: Vec<RenderItemData>,
    /// Changes not yet committed for this repr
    dirty: DirtyBits,
}

impl DrawItem {
    pub fn new(repr: ReprStyle) -> Self {
        Self {
            repr,
            items: Vec::new(),
            dirty: DirtyBits::ALL_SCENE | DirtyBits::NEW_REPR,
        }
    }

    pub fn repr(&self) -> ReprStyle {
        self.repr
    }

    pub fn items(&self) -> &[RenderItemData] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [RenderItemData] {
        &mut self.items
    }

    pub fn dirty_bits(&self) -> DirtyBits {
        self.dirty
    }

    pub fn mark_dirty(&mut self, bits: DirtyBits) {
        self.dirty |= bits;
    }

    /// Take the accumulated bits; called once the commit is enqueued
    pub fn take_dirty(&mut self) -> DirtyBits {
        core::mem::replace(&mut self.dirty, DirtyBits::CLEAN)
    }

    pub fn is_enabled(&self) -> bool {
        self.items.iter().any(RenderItemData::is_enabled)
    }

    /// Make the render items match `wanted` (name, primitive, material)
    ///
    /// Items whose name is still wanted are kept; the rest are released.
    /// Returns whether the set changed.
    pub fn reconcile(
        &mut self,
        wanted: Vec<(String, PrimitiveType, Option<PrimPath>)>,
        queue: &CommitQueue,
    ) -> bool {
        let unchanged = wanted.len() == self.items.len()
            && wanted
                .iter()
                .zip(&self.items)
                .all(|((name, primitive, _), item)| *name == item.name && *primitive == item.primitive);
        if unchanged {
            for ((_, _, material), item) in wanted.into_iter().zip(self.items.iter_mut()) {
                item.material_id = material;
            }
            return false;
        }

        let mut old: Vec<RenderItemData> = core::mem::take(&mut self.items);
        for (name, primitive, material) in wanted {
            let reused = old
                .iter()
                .position(|item| item.name == name && item.primitive == primitive)
                .map(|i| old.swap_remove(i));
            let item = reused.unwrap_or_else(|| RenderItemData::new(name, primitive));
            self.items.push(item.with_material(material));
        }
        for item in old {
            item.release(queue);
        }
        true
    }

    /// Hide every render item
    pub fn disable(&mut self, queue: &CommitQueue) {
        for item in &mut self.items {
            item.disable(queue);
        }
    }

    pub fn release(self, queue: &CommitQueue) {
        for item in self.items {
            item.release(queue);
        }
    }
}
