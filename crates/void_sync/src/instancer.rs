//! Instancers
//!
//! Several prototypes of one instancer may Sync at once on different
//! workers. The instancer's primvars are pulled at most once per change:
//! the state is read without locking, then re-checked under the write lock
//! before pulling.
//!
//! ```text
//! Clean --mark_dirty--> Dirty --lock, re-check--> Pulling --> Clean
//!                         ^                          |
//!                         +------ mark_dirty --------+
//! ```
//!
//! A `mark_dirty` that lands while pulling keeps the instancer dirty.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use void_core::PrimPath;
use void_math::Mat4;
use void_scene::{tokens, SceneDelegate};

use crate::geometry::{
    compose_instance_transforms, flatten_nested, read_matrices, read_rotations, read_vec3s,
    InstancerPrimvars,
};

const STATE_CLEAN: u8 = 0;
const STATE_DIRTY: u8 = 1;
const STATE_PULLING: u8 = 2;

/// Nesting depth at which parent lookups stop
pub const MAX_NESTING_DEPTH: usize = 32;

/// Live instancers by path
pub type InstancerMap = HashMap<PrimPath, Arc<Instancer>>;

/// Cached state of one instancer prim
#[derive(Debug)]
pub struct Instancer {
    path: PrimPath,
    state: AtomicU8,
    primvars: RwLock<InstancerPrimvars>,
    pulls: AtomicUsize,
}

impl Instancer {
    /// New instancers start dirty
    pub fn new(path: PrimPath) -> Self {
        Self {
            path,
            state: AtomicU8::new(STATE_DIRTY),
            primvars: RwLock::new(InstancerPrimvars::default()),
            pulls: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &PrimPath {
        &self.path
    }

    pub fn mark_dirty(&self) {
        self.state.store(STATE_DIRTY, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.state.load(Ordering::Acquire) != STATE_CLEAN
    }

    /// Number of times primvars were pulled from the scene
    pub fn pull_count(&self) -> usize {
        self.pulls.load(Ordering::Relaxed)
    }

    /// Re-pull primvars if dirty; no-op when clean
    pub fn sync_primvars(&self, scene: &dyn SceneDelegate) {
        if self.state.load(Ordering::Acquire) == STATE_CLEAN {
            return;
        }

        let mut primvars = self.primvars.write();
        if self.state.load(Ordering::Acquire) == STATE_CLEAN {
            // another prototype pulled while we waited
            return;
        }
        self.state.store(STATE_PULLING, Ordering::Release);

        *primvars = pull_primvars(scene, &self.path);
        self.pulls.fetch_add(1, Ordering::Relaxed);
        log::trace!("{}: instancer primvars pulled", self.path);

        let _ = self.state.compare_exchange(
            STATE_PULLING,
            STATE_CLEAN,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn primvars(&self) -> InstancerPrimvars {
        self.primvars.read().clone()
    }

    /// World matrices of every instance of `prototype`
    ///
    /// Nested instancers are resolved through `instancers`; the result is
    /// parent-major. Returns the matrices and the number of warnings.
    pub fn compute_instance_transforms(
        &self,
        scene: &dyn SceneDelegate,
        prototype: &PrimPath,
        instancers: &InstancerMap,
    ) -> (Vec<Mat4>, u64) {
        self.compute_nested(scene, prototype, instancers, 0)
    }

    fn compute_nested(
        &self,
        scene: &dyn SceneDelegate,
        prototype: &PrimPath,
        instancers: &InstancerMap,
        depth: usize,
    ) -> (Vec<Mat4>, u64) {
        self.sync_primvars(scene);

        let indices = scene.instance_indices(&self.path, prototype);
        let instancer_xform = scene.instancer_transform(&self.path);
        let label = format!("{} -> {}", self.path, prototype);
        let (child, missing) = {
            let primvars = self.primvars.read();
            compose_instance_transforms(instancer_xform, &primvars, &indices, &label)
        };
        let mut warnings = (missing > 0) as u64;

        let Some(parent_path) = scene.instancer_id(&self.path) else {
            return (child, warnings);
        };
        if depth + 1 >= MAX_NESTING_DEPTH {
            log::error!("{}: instancer nesting deeper than {}", self.path, MAX_NESTING_DEPTH);
            return (child, warnings + 1);
        }
        let Some(parent) = instancers.get(&parent_path) else {
            log::warn!("{}: parent instancer {} is not inserted", self.path, parent_path);
            return (child, warnings + 1);
        };

        let (parent_transforms, parent_warnings) =
            parent.compute_nested(scene, &self.path, instancers, depth + 1);
        warnings += parent_warnings;
        (flatten_nested(&parent_transforms, &child), warnings)
    }
}

fn pull_primvars(scene: &dyn SceneDelegate, path: &PrimPath) -> InstancerPrimvars {
    let read = |name: &str| scene.get(path, name).and_then(|value| value.into_array());
    let label = |name: &str| format!("{}.{}", path, name);

    InstancerPrimvars {
        translations: read(tokens::INSTANCE_TRANSLATIONS)
            .and_then(|v| read_vec3s(&v, &label(tokens::INSTANCE_TRANSLATIONS))),
        rotations: read(tokens::INSTANCE_ROTATIONS)
            .and_then(|v| read_rotations(&v, &label(tokens::INSTANCE_ROTATIONS))),
        scales: read(tokens::INSTANCE_SCALES)
            .and_then(|v| read_vec3s(&v, &label(tokens::INSTANCE_SCALES))),
        transforms: read(tokens::INSTANCE_TRANSFORMS)
            .and_then(|v| read_matrices(&v, &label(tokens::INSTANCE_TRANSFORMS))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_math::Vec3;
    use void_scene::{Interpolation, MemoryScene, PrimvarDescriptor, PrimvarValue};

    fn path(text: &str) -> PrimPath {
        PrimPath::parse(text).unwrap()
    }

    fn set_translations(scene: &MemoryScene, instancer: &PrimPath, values: Vec<[f32; 3]>) {
        scene.set_primvar(
            instancer,
            PrimvarDescriptor::new(tokens::INSTANCE_TRANSLATIONS, Interpolation::Instance),
            PrimvarValue::Float3(values),
        );
    }

    #[test]
    fn test_pull_once_until_dirty() {
        let scene = MemoryScene::new();
        let inst = path("/inst");
        scene.add_instancer(inst.clone());
        set_translations(&scene, &inst, vec![[1.0, 0.0, 0.0]]);

        let instancer = Instancer::new(inst);
        assert!(instancer.is_dirty());
        instancer.sync_primvars(&scene);
        instancer.sync_primvars(&scene);
        assert_eq!(instancer.pull_count(), 1);
        assert!(!instancer.is_dirty());

        instancer.mark_dirty();
        instancer.sync_primvars(&scene);
        assert_eq!(instancer.pull_count(), 2);
    }

    #[test]
    fn test_concurrent_prototypes_pull_once() {
        let scene = Arc::new(MemoryScene::new());
        let inst = path("/inst");
        scene.add_instancer(inst.clone());
        set_translations(&scene, &inst, vec![[1.0, 0.0, 0.0]; 8]);
        let instancer = Arc::new(Instancer::new(inst));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let scene = scene.clone();
                let instancer = instancer.clone();
                std::thread::spawn(move || instancer.sync_primvars(scene.as_ref()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(instancer.pull_count(), 1);
        assert_eq!(instancer.primvars().translations.map(|t| t.len()), Some(8));
    }

    #[test]
    fn test_nested_instancers_flatten_parent_major() {
        let scene = MemoryScene::new();
        let (parent, child, proto) = (path("/parent"), path("/parent/child"), path("/proto"));
        scene.add_instancer(parent.clone());
        scene.add_instancer(child.clone());
        scene.add_prim(proto.clone());
        set_translations(&scene, &parent, vec![[100.0, 0.0, 0.0], [200.0, 0.0, 0.0]]);
        set_translations(&scene, &child, vec![[0.0, 1.0, 0.0], [0.0, 2.0, 0.0], [0.0, 3.0, 0.0]]);
        scene.set_instancer_id(&child, Some(parent.clone()));
        scene.set_instancer_id(&proto, Some(child.clone()));
        scene.set_instance_indices(&parent, &child, vec![0, 1]);
        scene.set_instance_indices(&child, &proto, vec![0, 1, 2]);

        let mut instancers = InstancerMap::new();
        instancers.insert(parent.clone(), Arc::new(Instancer::new(parent)));
        instancers.insert(child.clone(), Arc::new(Instancer::new(child.clone())));

        let (transforms, warnings) =
            instancers[&child].compute_instance_transforms(&scene, &proto, &instancers);
        assert_eq!(warnings, 0);
        assert_eq!(transforms.len(), 6);
        for p in 0..2 {
            for c in 0..3 {
                let origin = transforms[p * 3 + c].transform_point3(Vec3::ZERO);
                let expected = Vec3::new(100.0 * (p + 1) as f32, (c + 1) as f32, 0.0);
                assert!((origin - expected).length() < 1e-4);
            }
        }
    }

    #[test]
    fn test_missing_parent_keeps_child() {
        let scene = MemoryScene::new();
        let (child, proto) = (path("/child"), path("/proto"));
        scene.add_instancer(child.clone());
        scene.add_prim(proto.clone());
        scene.set_instancer_id(&child, Some(path("/gone")));
        scene.set_instance_indices(&child, &proto, vec![0, 0]);

        let mut instancers = InstancerMap::new();
        instancers.insert(child.clone(), Arc::new(Instancer::new(child.clone())));
        let (transforms, warnings) =
            instancers[&child].compute_instance_transforms(&scene, &proto, &instancers);
        assert_eq!(transforms, vec![Mat4::IDENTITY; 2]);
        assert_eq!(warnings, 1);
    }
}
