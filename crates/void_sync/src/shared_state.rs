//! Per-prim state shared by all of a prim's draw items
//!
//! Owned by exactly one Rprim and mutated only inside that Rprim's Sync.

use std::collections::{BTreeSet, HashMap};
use void_core::PrimPath;
use void_math::{Aabb, Mat4};
use void_scene::{DirtyBits, DisplayStyle, Interpolation, MaterialDesc, PrimvarValue, RenderTag};

use crate::selection::SelectionStatus;

/// Where the last Sync of a prim stopped
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SyncPhase {
    /// Filtered out by render tag or visibility
    Hidden,
    /// Rendering topology being rebuilt
    #[default]
    TopologyStale,
    /// Primvar sources being pulled
    PrimvarStale,
    /// GPU-ready arrays being derived
    BufferStale,
    Clean,
}

/// A cached primvar as authored
#[derive(Clone, Debug, PartialEq)]
pub struct PrimvarSource {
    pub value: PrimvarValue,
    pub interpolation: Interpolation,
}

/// Scene-derived state cached between Syncs
#[derive(Debug)]
pub struct SharedPrimState {
    pub path: PrimPath,
    pub render_tag: RenderTag,
    pub visible: bool,
    pub world_transform: Mat4,
    /// Authored extent, or bounds of the points when none is authored
    pub extent: Aabb,
    pub display_style: DisplayStyle,
    pub material_id: Option<PrimPath>,
    pub material: Option<MaterialDesc>,
    /// Primvar sources pulled from the scene, by name
    pub primvars: HashMap<String, PrimvarSource>,
    /// Cached positions
    pub points: Vec<[f32; 3]>,
    pub selection: SelectionStatus,
    /// Instance matrices; `None` when the prim is not instanced
    pub instance_transforms: Option<Vec<Mat4>>,
    pub phase: SyncPhase,
    /// Bits carried over to the next Sync
    pending: DirtyBits,
}

impl SharedPrimState {
    pub fn new(path: PrimPath) -> Self {
        Self {
            path,
            render_tag: RenderTag::Geometry,
            visible: true,
            world_transform: Mat4::IDENTITY,
            extent: Aabb::EMPTY,
            display_style: DisplayStyle::default(),
            material_id: None,
            material: None,
            primvars: HashMap::new(),
            points: Vec::new(),
            selection: SelectionStatus::Unselected,
            instance_transforms: None,
            phase: SyncPhase::TopologyStale,
            // a new prim derives everything on its first Sync
            pending: DirtyBits::ALL_SCENE,
        }
    }

    /// Carry `bits` over to the next Sync
    pub fn persist(&mut self, bits: DirtyBits) {
        self.pending |= bits;
    }

    /// Bits carried over from earlier Syncs
    pub fn pending(&self) -> DirtyBits {
        self.pending
    }

    pub fn take_pending(&mut self) -> DirtyBits {
        core::mem::replace(&mut self.pending, DirtyBits::CLEAN)
    }

    pub fn primvar(&self, name: &str) -> Option<&PrimvarSource> {
        self.primvars.get(name)
    }

    /// Interpolations of every cached primvar in `names`
    pub fn interpolations<'a>(
        &'a self,
        names: &'a [String],
    ) -> impl Iterator<Item = Interpolation> + 'a {
        names
            .iter()
            .filter_map(|name| self.primvars.get(name).map(|source| source.interpolation))
    }

    /// Primvars this prim needs: `base` plus whatever the material reads
    pub fn required_primvars(&self, base: &[&str]) -> Vec<String> {
        let mut names: BTreeSet<String> = base.iter().map(|name| name.to_string()).collect();
        if let Some(material) = &self.material {
            names.extend(material.required_primvars.iter().cloned());
        }
        names.into_iter().collect()
    }

    /// Drop cached sources not in `keep`; returns the evicted names
    pub fn evict_except(&mut self, keep: &BTreeSet<&str>) -> Vec<String> {
        let mut evicted: Vec<String> = self
            .primvars
            .keys()
            .filter(|name| !keep.contains(name.as_str()))
            .cloned()
            .collect();
        evicted.sort();
        for name in &evicted {
            self.primvars.remove(name);
        }
        evicted
    }

    /// Extent, falling back to the bounds of the cached points
    pub fn bounds(&self) -> Aabb {
        if !self.extent.is_empty() {
            return self.extent;
        }
        let points: Vec<void_math::Vec3> = self
            .points
            .iter()
            .map(|&p| void_math::Vec3::from_array(p))
            .collect();
        Aabb::from_points(&points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(interpolation: Interpolation) -> PrimvarSource {
        PrimvarSource {
            value: PrimvarValue::Float(vec![1.0]),
            interpolation,
        }
    }

    #[test]
    fn test_required_primvars_follow_material() {
        let mut state = SharedPrimState::new(PrimPath::parse("/mesh").unwrap());
        assert_eq!(state.required_primvars(&["points"]), vec!["points".to_string()]);

        state.material = Some(MaterialDesc::new("lambert").with_primvar("st"));
        assert_eq!(
            state.required_primvars(&["points"]),
            vec!["points".to_string(), "st".to_string()]
        );
    }

    #[test]
    fn test_evict_except() {
        let mut state = SharedPrimState::new(PrimPath::parse("/mesh").unwrap());
        state.primvars.insert("points".into(), source(Interpolation::Vertex));
        state.primvars.insert("st".into(), source(Interpolation::FaceVarying));
        state.primvars.insert("normals".into(), source(Interpolation::Vertex));

        let keep: BTreeSet<&str> = ["points"].into_iter().collect();
        assert_eq!(state.evict_except(&keep), vec!["normals".to_string(), "st".to_string()]);
        assert_eq!(state.primvars.len(), 1);
    }

    #[test]
    fn test_interpolations_of_cached_primvars() {
        let mut state = SharedPrimState::new(PrimPath::parse("/mesh").unwrap());
        state.primvars.insert("points".into(), source(Interpolation::Vertex));
        state.primvars.insert("st".into(), source(Interpolation::FaceVarying));
        let names = vec!["points".to_string(), "st".to_string(), "normals".to_string()];
        let found: Vec<Interpolation> = state.interpolations(&names).collect();
        assert_eq!(found, vec![Interpolation::Vertex, Interpolation::FaceVarying]);
    }

    #[test]
    fn test_pending_bits() {
        let mut state = SharedPrimState::new(PrimPath::parse("/mesh").unwrap());
        assert_eq!(state.take_pending(), DirtyBits::ALL_SCENE);
        state.persist(DirtyBits::POINTS);
        state.persist(DirtyBits::TOPOLOGY);
        assert_eq!(state.take_pending(), DirtyBits::POINTS | DirtyBits::TOPOLOGY);
        assert!(state.pending().is_clean());
    }

    #[test]
    fn test_bounds_fall_back_to_points() {
        let mut state = SharedPrimState::new(PrimPath::parse("/mesh").unwrap());
        state.points = vec![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]];
        let bounds = state.bounds();
        assert_eq!(bounds.max.to_array(), [1.0, 2.0, 3.0]);
    }
}
