//! Render Delegate
//!
//! Host-facing entry points. A frame runs in two phases:
//!
//! 1. [`RenderDelegate::sync_all`] on the host thread fans Sync out to
//!    worker threads; Syncs only read the scene and enqueue commits.
//! 2. [`RenderDelegate::commit_resources`] on the designated thread drains
//!    the commit queue into the graphics runtime.
//!
//! ## Example
//!
//! ```ignore
//! use void_sync::prelude::*;
//!
//! let delegate = RenderDelegate::new(SyncConfig::default())?;
//! let mesh = PrimPath::parse("/World/mesh")?;
//! scene.add_prim(mesh.clone());
//! delegate.insert_prim(mesh, PrimKind::Mesh)?;
//!
//! delegate.sync_all(&scene, ReprStyle::SmoothHull);
//! delegate.commit_resources(&mut runtime);
//! ```

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use void_core::PrimPath;
use void_gpu::ResourceRuntime;
use void_scene::{DirtyBits, SceneDelegate};

use crate::commit::CommitQueue;
use crate::config::SyncConfig;
use crate::dirty::{DIRTY_SELECTION, DIRTY_SELECTION_HIGHLIGHT, VISIBILITY_BITS};
use crate::draw_item::ReprStyle;
use crate::error::{SyncError, SyncResult};
use crate::global_cache::GlobalResources;
use crate::instancer::{Instancer, InstancerMap};
use crate::prim::{create_rprim, PrimKind, Rprim, SyncContext};
use crate::selection::SelectionStatus;
use crate::shared_state::SyncPhase;
use crate::stats::{SyncCounters, SyncStats};

type PrimHandle = Arc<Mutex<Box<dyn Rprim>>>;

/// Keeps draw items in step with a scene
pub struct RenderDelegate {
    config: RwLock<SyncConfig>,
    prims: RwLock<HashMap<PrimPath, PrimHandle>>,
    instancers: RwLock<InstancerMap>,
    queue: CommitQueue,
    resources: Arc<GlobalResources>,
    counters: SyncCounters,
}

impl RenderDelegate {
    /// Create a delegate whose commit queue drains on the calling thread
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        log::info!(
            "render delegate created (tags {:?}, parallel sync {})",
            config.render_tags,
            config.parallel_sync
        );
        Ok(Self {
            config: RwLock::new(config),
            prims: RwLock::new(HashMap::new()),
            instancers: RwLock::new(InstancerMap::new()),
            queue: CommitQueue::new(),
            resources: GlobalResources::acquire(),
            counters: SyncCounters::new(),
        })
    }

    pub fn config(&self) -> SyncConfig {
        self.config.read().clone()
    }

    /// Shared GPU caches; the same instance for every live delegate
    pub fn resources(&self) -> &Arc<GlobalResources> {
        &self.resources
    }

    pub fn queue(&self) -> &CommitQueue {
        &self.queue
    }

    // ========== Prims ==========

    /// Track a scene prim; it syncs fully on its first Sync
    pub fn insert_prim(&self, path: PrimPath, kind: PrimKind) -> SyncResult<()> {
        let mut prims = self.prims.write();
        if prims.contains_key(&path) {
            return Err(SyncError::DuplicatePrim(path));
        }
        log::debug!("{}: inserted {}", path, kind.as_str());
        let prim = create_rprim(kind, path.clone());
        prims.insert(path, Arc::new(Mutex::new(prim)));
        Ok(())
    }

    /// Stop tracking a prim; its GPU objects go on the next commit
    pub fn remove_prim(&self, path: &PrimPath) -> SyncResult<()> {
        let prim = self
            .prims
            .write()
            .remove(path)
            .ok_or_else(|| SyncError::UnknownPrim(path.clone()))?;
        prim.lock().release(&self.queue);
        log::debug!("{}: removed", path);
        Ok(())
    }

    pub fn contains_prim(&self, path: &PrimPath) -> bool {
        self.prims.read().contains_key(path)
    }

    pub fn prim_count(&self) -> usize {
        self.prims.read().len()
    }

    /// Run `f` on a tracked prim
    pub fn with_prim<R>(&self, path: &PrimPath, f: impl FnOnce(&dyn Rprim) -> R) -> SyncResult<R> {
        let prim = self.prim_handle(path)?;
        let prim = prim.lock();
        Ok(f(&**prim))
    }

    fn prim_handle(&self, path: &PrimPath) -> SyncResult<PrimHandle> {
        self.prims
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| SyncError::UnknownPrim(path.clone()))
    }

    // ========== Instancers ==========

    pub fn insert_instancer(&self, path: PrimPath) -> SyncResult<()> {
        let mut instancers = self.instancers.write();
        if instancers.contains_key(&path) {
            return Err(SyncError::DuplicateInstancer(path));
        }
        log::debug!("{}: inserted instancer", path);
        instancers.insert(path.clone(), Arc::new(Instancer::new(path)));
        Ok(())
    }

    pub fn remove_instancer(&self, path: &PrimPath) -> SyncResult<()> {
        self.instancers
            .write()
            .remove(path)
            .map(|_| log::debug!("{}: removed instancer", path))
            .ok_or_else(|| SyncError::UnknownInstancer(path.clone()))
    }

    pub fn instancer(&self, path: &PrimPath) -> Option<Arc<Instancer>> {
        self.instancers.read().get(path).cloned()
    }

    /// Flag instancers the scene reports dirty for a re-pull
    fn sync_instancers(&self, scene: &dyn SceneDelegate) {
        for (path, instancer) in self.instancers.read().iter() {
            let dirty = scene.dirty_bits(path);
            if dirty.is_clean() {
                continue;
            }
            instancer.mark_dirty();
            scene.mark_clean(path, dirty);
        }
    }

    // ========== Sync ==========

    /// Sync one prim with `dirty` merged into its persisted bits
    pub fn sync(
        &self,
        scene: &dyn SceneDelegate,
        path: &PrimPath,
        dirty: DirtyBits,
        repr: ReprStyle,
    ) -> SyncResult<()> {
        let prim = self.prim_handle(path)?;
        let mut prim = prim.lock();
        if !prim.supports_repr(repr) {
            return Err(SyncError::UnsupportedRepr {
                path: path.clone(),
                repr,
            });
        }

        self.sync_instancers(scene);
        let config = self.config.read();
        let instancers = self.instancers.read();
        let ctx = self.context(scene, &config, &instancers);
        prim.sync(&ctx, dirty, repr);
        Ok(())
    }

    /// Sync every prim that needs it, each drawn as its closest stand-in
    /// for `repr`
    ///
    /// Returns once every Sync has finished; the number of prims synced.
    pub fn sync_all(&self, scene: &dyn SceneDelegate, repr: ReprStyle) -> usize {
        self.sync_instancers(scene);
        let targets = self.collect_targets(scene, repr);
        if targets.is_empty() {
            return 0;
        }

        let config = self.config.read();
        let instancers = self.instancers.read();
        let ctx = self.context(scene, &config, &instancers);
        let run = |(path, prim): &(PrimPath, PrimHandle)| {
            let dirty = scene.dirty_bits(path);
            let mut prim = prim.lock();
            let repr = prim.resolve_repr(repr);
            prim.sync(&ctx, dirty, repr);
        };
        if config.parallel_sync {
            targets.par_iter().for_each(run);
        } else {
            targets.iter().for_each(run);
        }

        log::debug!(
            "synced {} prims, {} commit records pending",
            targets.len(),
            self.queue.pending()
        );
        targets.len()
    }

    /// Prims dirty in the scene, carrying bits of their own, or last
    /// synced with another repr
    ///
    /// A hidden prim waits until its render tag or visibility changes.
    fn collect_targets(&self, scene: &dyn SceneDelegate, repr: ReprStyle) -> Vec<(PrimPath, PrimHandle)> {
        let prims = self.prims.read();
        let dirty: HashSet<PrimPath> = scene.dirty_prims().into_iter().collect();
        for path in dirty.iter().filter(|path| !prims.contains_key(*path)) {
            log::trace!("{}: dirty but not inserted", path);
        }

        let mut targets: Vec<(PrimPath, PrimHandle)> = Vec::new();
        for (path, handle) in prims.iter() {
            let stale = {
                let prim = handle.lock();
                if prim.shared().phase == SyncPhase::Hidden {
                    scene.dirty_bits(path).intersects(VISIBILITY_BITS)
                } else {
                    dirty.contains(path)
                        || !prim.shared().pending().is_clean()
                        || prim.core().active_repr() != Some(prim.resolve_repr(repr))
                }
            };
            if stale {
                targets.push((path.clone(), handle.clone()));
            }
        }
        targets
    }

    fn context<'a>(
        &'a self,
        scene: &'a dyn SceneDelegate,
        config: &'a SyncConfig,
        instancers: &'a InstancerMap,
    ) -> SyncContext<'a> {
        SyncContext {
            scene,
            config,
            queue: &self.queue,
            instancers,
            counters: &self.counters,
        }
    }

    // ========== Commit ==========

    /// Apply every queued commit to `runtime`
    ///
    /// Designated thread only, after every Sync of the frame has joined.
    /// Returns the number of commit records executed.
    pub fn commit_resources(&self, runtime: &mut dyn ResourceRuntime) -> usize {
        let executed = self.queue.drain(runtime, &self.resources);
        self.counters.commits_executed(executed as u64);
        executed
    }

    // ========== Selection ==========

    /// Change a prim's selection status; the highlight follows on its next Sync
    pub fn set_selection(&self, path: &PrimPath, status: SelectionStatus) -> SyncResult<()> {
        let prim = self.prim_handle(path)?;
        let mut prim = prim.lock();
        let shared = prim.shared_mut();
        if shared.selection != status {
            shared.selection = status;
            shared.persist(DIRTY_SELECTION);
        }
        Ok(())
    }

    pub fn selection(&self, path: &PrimPath) -> SyncResult<SelectionStatus> {
        self.with_prim(path, |prim| prim.shared().selection)
    }

    /// Recolour the highlight of every selected prim
    pub fn set_selection_highlight_color(&self, selected: [f32; 4], lead: [f32; 4]) {
        {
            let mut config = self.config.write();
            config.selection_color = selected;
            config.lead_selection_color = lead;
        }
        for prim in self.prims.read().values() {
            let mut prim = prim.lock();
            if prim.shared().selection.is_selected() {
                prim.shared_mut().persist(DIRTY_SELECTION_HIGHLIGHT);
            }
        }
    }

    // ========== Stats ==========

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            commits_enqueued: self.queue.enqueued_total(),
            ..self.counters.snapshot()
        }
    }
}

impl Drop for RenderDelegate {
    fn drop(&mut self) {
        let pending = self.queue.pending();
        if pending > 0 {
            log::warn!("render delegate dropped with {} commit records pending", pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_scene::MemoryScene;

    fn path(text: &str) -> PrimPath {
        PrimPath::parse(text).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SyncConfig {
            render_tags: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            RenderDelegate::new(config),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn test_insert_and_remove_prim() {
        let delegate = RenderDelegate::new(SyncConfig::default()).unwrap();
        let mesh = path("/mesh");
        delegate.insert_prim(mesh.clone(), PrimKind::Mesh).unwrap();
        assert!(matches!(
            delegate.insert_prim(mesh.clone(), PrimKind::Points),
            Err(SyncError::DuplicatePrim(_))
        ));
        assert_eq!(delegate.with_prim(&mesh, |prim| prim.kind()).unwrap(), PrimKind::Mesh);

        delegate.remove_prim(&mesh).unwrap();
        assert!(!delegate.contains_prim(&mesh));
        assert!(matches!(delegate.remove_prim(&mesh), Err(SyncError::UnknownPrim(_))));
    }

    #[test]
    fn test_instancer_registry() {
        let delegate = RenderDelegate::new(SyncConfig::default()).unwrap();
        let inst = path("/inst");
        delegate.insert_instancer(inst.clone()).unwrap();
        assert!(delegate.insert_instancer(inst.clone()).is_err());
        assert!(delegate.instancer(&inst).is_some());
        delegate.remove_instancer(&inst).unwrap();
        assert!(matches!(
            delegate.remove_instancer(&inst),
            Err(SyncError::UnknownInstancer(_))
        ));
    }

    #[test]
    fn test_sync_rejects_unsupported_repr() {
        let delegate = RenderDelegate::new(SyncConfig::default()).unwrap();
        let scene = MemoryScene::new();
        let cloud = path("/cloud");
        scene.add_prim(cloud.clone());
        delegate.insert_prim(cloud.clone(), PrimKind::Points).unwrap();

        let result = delegate.sync(&scene, &cloud, DirtyBits::CLEAN, ReprStyle::Wireframe);
        assert!(matches!(result, Err(SyncError::UnsupportedRepr { .. })));
        assert!(delegate
            .sync(&scene, &cloud, scene.dirty_bits(&cloud), ReprStyle::Points)
            .is_ok());
    }

    #[test]
    fn test_selection_marks_prim_for_sync() {
        let delegate = RenderDelegate::new(SyncConfig {
            parallel_sync: false,
            ..Default::default()
        })
        .unwrap();
        let scene = MemoryScene::new();
        let cloud = path("/cloud");
        scene.add_prim(cloud.clone());
        delegate.insert_prim(cloud.clone(), PrimKind::Points).unwrap();
        assert_eq!(delegate.sync_all(&scene, ReprStyle::Points), 1);
        assert_eq!(delegate.sync_all(&scene, ReprStyle::Points), 0);

        delegate.set_selection(&cloud, SelectionStatus::Selected).unwrap();
        assert_eq!(delegate.selection(&cloud).unwrap(), SelectionStatus::Selected);
        assert_eq!(delegate.sync_all(&scene, ReprStyle::Points), 1);
        assert_eq!(delegate.sync_all(&scene, ReprStyle::Points), 0);

        delegate.set_selection_highlight_color([0.0, 1.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(delegate.config().selection_color, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(delegate.sync_all(&scene, ReprStyle::Points), 1);
    }
}
