//! In-memory scene
//!
//! A retained scene with a built-in change tracker. Every setter bumps the
//! scene's change counter and ORs the matching dirty bit into the prim's
//! tracker entry; `mark_clean` clears them again. Used by hosts that do not
//! bring their own scene graph, and by the sync tests.

use alloc::string::String;
use alloc::vec::Vec;
use parking_lot::RwLock;
use std::collections::HashMap;
use void_core::{ChangeCounter, ChangeVersion, PrimPath};
use void_math::{Aabb, Mat4};

use crate::delegate::{tokens, MaterialDesc, SceneDelegate};
use crate::dirty::DirtyBits;
use crate::topology::{CurvesTopology, DisplayStyle, MeshTopology, RenderTag};
use crate::value::{Interpolation, PrimvarDescriptor, PrimvarValue, Value};

/// Prim vs. instancer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RecordKind {
    Prim,
    Instancer,
}

struct PrimRecord {
    kind: RecordKind,
    dirty: DirtyBits,
    version: ChangeVersion,
    values: HashMap<String, Value>,
    descriptors: Vec<PrimvarDescriptor>,
    mesh_topology: MeshTopology,
    curves_topology: CurvesTopology,
    transform: Mat4,
    extent: Aabb,
    visible: bool,
    render_tag: RenderTag,
    display_style: DisplayStyle,
    material_id: Option<PrimPath>,
    instancer_id: Option<PrimPath>,
    /// Instancer only: prototype -> instance indices
    instance_indices: HashMap<PrimPath, Vec<i32>>,
}

impl PrimRecord {
    fn new(kind: RecordKind, version: ChangeVersion) -> Self {
        Self {
            kind,
            dirty: DirtyBits::ALL_SCENE | DirtyBits::NEW_REPR,
            version,
            values: HashMap::new(),
            descriptors: Vec::new(),
            mesh_topology: MeshTopology::default(),
            curves_topology: CurvesTopology::default(),
            transform: Mat4::IDENTITY,
            extent: Aabb::EMPTY,
            visible: true,
            render_tag: RenderTag::Geometry,
            display_style: DisplayStyle::default(),
            material_id: None,
            instancer_id: None,
            instance_indices: HashMap::new(),
        }
    }
}

/// Dirty bit implied by writing the named primvar
fn primvar_dirty_bit(name: &str) -> DirtyBits {
    match name {
        tokens::POINTS => DirtyBits::POINTS,
        tokens::NORMALS => DirtyBits::NORMALS,
        tokens::WIDTHS => DirtyBits::WIDTHS,
        _ => DirtyBits::PRIMVAR,
    }
}

/// Retained scene with change tracking
pub struct MemoryScene {
    prims: RwLock<HashMap<PrimPath, PrimRecord>>,
    materials: RwLock<HashMap<PrimPath, MaterialDesc>>,
    changes: ChangeCounter,
}

impl MemoryScene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self {
            prims: RwLock::new(HashMap::new()),
            materials: RwLock::new(HashMap::new()),
            changes: ChangeCounter::new(),
        }
    }

    // ========== Structure ==========

    /// Add a prim; new prims start with every scene bit dirty
    pub fn add_prim(&self, path: PrimPath) {
        let version = self.changes.bump();
        self.prims
            .write()
            .insert(path, PrimRecord::new(RecordKind::Prim, version));
    }

    /// Add an instancer
    pub fn add_instancer(&self, path: PrimPath) {
        let version = self.changes.bump();
        self.prims
            .write()
            .insert(path, PrimRecord::new(RecordKind::Instancer, version));
    }

    /// Remove a prim or instancer
    pub fn remove(&self, path: &PrimPath) -> bool {
        self.changes.bump();
        self.prims.write().remove(path).is_some()
    }

    pub fn contains(&self, path: &PrimPath) -> bool {
        self.prims.read().contains_key(path)
    }

    /// Version of the last change made to `path`
    pub fn version(&self, path: &PrimPath) -> Option<ChangeVersion> {
        self.prims.read().get(path).map(|record| record.version)
    }

    /// Latest change version across the scene
    pub fn current_version(&self) -> ChangeVersion {
        self.changes.current()
    }

    // ========== Change Tracking ==========

    /// OR `bits` into the tracker entry of `path`
    pub fn mark_dirty(&self, path: &PrimPath, bits: DirtyBits) {
        let version = self.changes.bump();
        let mut prims = self.prims.write();
        Self::mark_locked(&mut prims, path, bits, version);
    }

    fn mark_locked(
        prims: &mut HashMap<PrimPath, PrimRecord>,
        path: &PrimPath,
        bits: DirtyBits,
        version: ChangeVersion,
    ) {
        match prims.get_mut(path) {
            Some(record) => {
                record.dirty |= bits;
                record.version = version;
            }
            None => log::warn!("mark_dirty on unknown prim {}", path),
        }
    }

    /// Prims instanced by `instancer`, directly or through nested instancers
    fn instanced_by(prims: &HashMap<PrimPath, PrimRecord>, instancer: &PrimPath) -> Vec<PrimPath> {
        let mut out = Vec::new();
        let mut pending = vec![instancer.clone()];
        while let Some(current) = pending.pop() {
            for (path, record) in prims.iter() {
                if record.instancer_id.as_ref() == Some(&current) {
                    match record.kind {
                        RecordKind::Prim => out.push(path.clone()),
                        RecordKind::Instancer => pending.push(path.clone()),
                    }
                }
            }
        }
        out
    }

    /// Apply `edit` to a record and mark `bits`; instancer edits also dirty
    /// every prim they instance
    fn edit(&self, path: &PrimPath, bits: DirtyBits, edit: impl FnOnce(&mut PrimRecord)) {
        let version = self.changes.bump();
        let mut prims = self.prims.write();
        let kind = match prims.get_mut(path) {
            Some(record) => {
                edit(record);
                record.dirty |= bits;
                record.version = version;
                record.kind
            }
            None => {
                log::warn!("edit of unknown prim {}", path);
                return;
            }
        };

        if kind == RecordKind::Instancer {
            for prototype in Self::instanced_by(&prims, path) {
                Self::mark_locked(&mut prims, &prototype, DirtyBits::INSTANCER, version);
            }
        }
    }

    // ========== Attributes ==========

    /// Author a primvar value and its descriptor
    pub fn set_primvar(&self, path: &PrimPath, descriptor: PrimvarDescriptor, value: PrimvarValue) {
        let bits = primvar_dirty_bit(&descriptor.name);
        self.edit(path, bits, |record| {
            record
                .values
                .insert(descriptor.name.clone(), Value::Array(value));
            record.descriptors.retain(|d| d.name != descriptor.name);
            record.descriptors.push(descriptor);
        });
    }

    /// Remove an authored primvar
    pub fn remove_primvar(&self, path: &PrimPath, name: &str) {
        let bits = primvar_dirty_bit(name);
        self.edit(path, bits, |record| {
            record.values.remove(name);
            record.descriptors.retain(|d| d.name != name);
        });
    }

    /// Author a non-primvar attribute
    pub fn set_value(&self, path: &PrimPath, name: &str, value: Value) {
        self.edit(path, DirtyBits::PRIMVAR, |record| {
            record.values.insert(name.into(), value);
        });
    }

    pub fn set_mesh_topology(&self, path: &PrimPath, topology: MeshTopology) {
        self.edit(path, DirtyBits::TOPOLOGY, |record| record.mesh_topology = topology);
    }

    pub fn set_curves_topology(&self, path: &PrimPath, topology: CurvesTopology) {
        self.edit(path, DirtyBits::TOPOLOGY, |record| {
            record.curves_topology = topology
        });
    }

    pub fn set_transform(&self, path: &PrimPath, transform: Mat4) {
        self.edit(path, DirtyBits::TRANSFORM, |record| record.transform = transform);
    }

    pub fn set_extent(&self, path: &PrimPath, extent: Aabb) {
        self.edit(path, DirtyBits::EXTENT, |record| record.extent = extent);
    }

    pub fn set_visible(&self, path: &PrimPath, visible: bool) {
        self.edit(path, DirtyBits::VISIBILITY, |record| record.visible = visible);
    }

    pub fn set_render_tag(&self, path: &PrimPath, tag: RenderTag) {
        self.edit(path, DirtyBits::RENDER_TAG, |record| record.render_tag = tag);
    }

    pub fn set_display_style(&self, path: &PrimPath, style: DisplayStyle) {
        self.edit(path, DirtyBits::DISPLAY_STYLE, |record| {
            record.display_style = style
        });
    }

    pub fn set_material_id(&self, path: &PrimPath, material: Option<PrimPath>) {
        self.edit(path, DirtyBits::MATERIAL_ID, |record| record.material_id = material);
    }

    /// Bind `path` to an instancer (or to a parent instancer when `path` is one)
    pub fn set_instancer_id(&self, path: &PrimPath, instancer: Option<PrimPath>) {
        self.edit(path, DirtyBits::INSTANCER, |record| record.instancer_id = instancer);
    }

    /// Set which of an instancer's instances draw `prototype`
    pub fn set_instance_indices(&self, instancer: &PrimPath, prototype: &PrimPath, indices: Vec<i32>) {
        self.edit(instancer, DirtyBits::INSTANCE_INDEX, |record| {
            record.instance_indices.insert(prototype.clone(), indices);
        });
        self.mark_dirty(prototype, DirtyBits::INSTANCE_INDEX);
    }

    // ========== Materials ==========

    /// Define or redefine a material; prims bound to it become material-dirty
    pub fn set_material(&self, path: PrimPath, material: MaterialDesc) {
        let version = self.changes.bump();
        self.materials.write().insert(path.clone(), material);

        let mut prims = self.prims.write();
        let bound: Vec<PrimPath> = prims
            .iter()
            .filter(|(_, record)| record.material_id.as_ref() == Some(&path))
            .map(|(prim, _)| prim.clone())
            .collect();
        for prim in bound {
            Self::mark_locked(&mut prims, &prim, DirtyBits::MATERIAL_ID, version);
        }
    }

    fn read<R>(&self, path: &PrimPath, default: R, read: impl FnOnce(&PrimRecord) -> R) -> R {
        match self.prims.read().get(path) {
            Some(record) => read(record),
            None => default,
        }
    }
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneDelegate for MemoryScene {
    fn dirty_bits(&self, path: &PrimPath) -> DirtyBits {
        self.read(path, DirtyBits::CLEAN, |record| record.dirty)
    }

    fn mark_clean(&self, path: &PrimPath, bits: DirtyBits) {
        if let Some(record) = self.prims.write().get_mut(path) {
            record.dirty.remove(bits);
        }
    }

    fn dirty_prims(&self) -> Vec<PrimPath> {
        let mut dirty: Vec<PrimPath> = self
            .prims
            .read()
            .iter()
            .filter(|(_, record)| record.kind == RecordKind::Prim && !record.dirty.is_clean())
            .map(|(path, _)| path.clone())
            .collect();
        dirty.sort();
        dirty
    }

    fn get(&self, path: &PrimPath, name: &str) -> Option<Value> {
        self.read(path, None, |record| record.values.get(name).cloned())
    }

    fn primvar_descriptors(
        &self,
        path: &PrimPath,
        interpolation: Interpolation,
    ) -> Vec<PrimvarDescriptor> {
        self.read(path, Vec::new(), |record| {
            record
                .descriptors
                .iter()
                .filter(|d| d.interpolation == interpolation)
                .cloned()
                .collect()
        })
    }

    fn mesh_topology(&self, path: &PrimPath) -> MeshTopology {
        self.read(path, MeshTopology::default(), |record| {
            record.mesh_topology.clone()
        })
    }

    fn curves_topology(&self, path: &PrimPath) -> CurvesTopology {
        self.read(path, CurvesTopology::default(), |record| {
            record.curves_topology.clone()
        })
    }

    fn transform(&self, path: &PrimPath) -> Mat4 {
        self.read(path, Mat4::IDENTITY, |record| record.transform)
    }

    fn extent(&self, path: &PrimPath) -> Aabb {
        self.read(path, Aabb::EMPTY, |record| record.extent)
    }

    fn visible(&self, path: &PrimPath) -> bool {
        self.read(path, false, |record| record.visible)
    }

    fn render_tag(&self, path: &PrimPath) -> RenderTag {
        self.read(path, RenderTag::Geometry, |record| record.render_tag)
    }

    fn display_style(&self, path: &PrimPath) -> DisplayStyle {
        self.read(path, DisplayStyle::default(), |record| record.display_style)
    }

    fn material_id(&self, path: &PrimPath) -> Option<PrimPath> {
        self.read(path, None, |record| record.material_id.clone())
    }

    fn material(&self, material_id: &PrimPath) -> Option<MaterialDesc> {
        self.materials.read().get(material_id).cloned()
    }

    fn instancer_id(&self, path: &PrimPath) -> Option<PrimPath> {
        self.read(path, None, |record| record.instancer_id.clone())
    }

    fn instance_indices(&self, instancer: &PrimPath, prototype: &PrimPath) -> Vec<i32> {
        self.read(instancer, Vec::new(), |record| {
            record
                .instance_indices
                .get(prototype)
                .cloned()
                .unwrap_or_default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> PrimPath {
        PrimPath::parse(text).unwrap()
    }

    #[test]
    fn test_new_prim_is_all_dirty() {
        let scene = MemoryScene::new();
        let prim = path("/World/mesh");
        scene.add_prim(prim.clone());

        assert!(scene.dirty_bits(&prim).contains(DirtyBits::ALL_SCENE));
        assert_eq!(scene.dirty_prims(), vec![prim.clone()]);

        scene.mark_clean(&prim, DirtyBits::ALL);
        assert!(scene.dirty_bits(&prim).is_clean());
        assert!(scene.dirty_prims().is_empty());
    }

    #[test]
    fn test_setters_mark_matching_bits() {
        let scene = MemoryScene::new();
        let prim = path("/World/mesh");
        scene.add_prim(prim.clone());
        scene.mark_clean(&prim, DirtyBits::ALL);

        scene.set_primvar(
            &prim,
            PrimvarDescriptor::new(tokens::POINTS, Interpolation::Vertex),
            PrimvarValue::Float3(vec![[0.0; 3]]),
        );
        scene.set_visible(&prim, false);
        assert_eq!(
            scene.dirty_bits(&prim),
            DirtyBits::POINTS | DirtyBits::VISIBILITY
        );
        assert!(!scene.visible(&prim));
        assert_eq!(
            scene.primvar_descriptors(&prim, Interpolation::Vertex).len(),
            1
        );
    }

    #[test]
    fn test_versions_advance() {
        let scene = MemoryScene::new();
        let prim = path("/a");
        scene.add_prim(prim.clone());
        let before = scene.version(&prim).unwrap();
        scene.set_transform(&prim, Mat4::from_translation(glam::Vec3::X));
        assert!(scene.version(&prim).unwrap().is_newer_than(before));
    }

    #[test]
    fn test_instancer_edit_dirties_prototypes() {
        let scene = MemoryScene::new();
        let outer = path("/World/outer");
        let inner = path("/World/inner");
        let proto = path("/World/inner/proto");
        scene.add_instancer(outer.clone());
        scene.add_instancer(inner.clone());
        scene.add_prim(proto.clone());
        scene.set_instancer_id(&inner, Some(outer.clone()));
        scene.set_instancer_id(&proto, Some(inner.clone()));
        scene.mark_clean(&proto, DirtyBits::ALL);

        scene.set_primvar(
            &outer,
            PrimvarDescriptor::new(tokens::INSTANCE_TRANSLATIONS, Interpolation::Instance),
            PrimvarValue::Float3(vec![[1.0, 0.0, 0.0]]),
        );
        assert!(scene.dirty_bits(&proto).contains(DirtyBits::INSTANCER));
        // instancers are not reported as dirty prims
        assert_eq!(scene.dirty_prims(), vec![proto]);
    }

    #[test]
    fn test_material_redefinition_dirties_bound_prims() {
        let scene = MemoryScene::new();
        let prim = path("/World/mesh");
        let material = path("/Looks/red");
        scene.add_prim(prim.clone());
        scene.set_material_id(&prim, Some(material.clone()));
        scene.mark_clean(&prim, DirtyBits::ALL);

        scene.set_material(material.clone(), MaterialDesc::new("preview").with_primvar("st"));
        assert_eq!(scene.dirty_bits(&prim), DirtyBits::MATERIAL_ID);
        assert_eq!(
            scene.material(&material).unwrap().required_primvars,
            vec!["st".to_string()]
        );
    }
}
