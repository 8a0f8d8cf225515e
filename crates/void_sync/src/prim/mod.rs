//! Renderable prims
//!
//! An Rprim turns one scene prim into draw items. Every kind runs the same
//! Sync skeleton (see [`PrimCore`]) and only differs in how it derives GPU
//! arrays:
//!
//! - [`MeshPrim`]: polygon meshes with subsets, normals and primvars
//! - [`CurvesPrim`]: basis curves drawn as lines or cubic patches
//! - [`PointsPrim`]: point clouds
//!
//! Sync runs on worker threads; each prim is synced by one thread at a
//! time and reaches the GPU only through the commit queue.

mod common;
mod curves;
mod mesh;
mod points;

pub use common::{Placement, PrimCore};
pub use curves::CurvesPrim;
pub use mesh::MeshPrim;
pub use points::PointsPrim;

use serde::{Deserialize, Serialize};
use void_core::PrimPath;
use void_scene::{DirtyBits, SceneDelegate};

use crate::commit::CommitQueue;
use crate::config::SyncConfig;
use crate::draw_item::{DrawItem, ReprStyle};
use crate::instancer::InstancerMap;
use crate::shared_state::SharedPrimState;
use crate::stats::SyncCounters;

/// Kinds of renderable prim
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimKind {
    Mesh,
    BasisCurves,
    Points,
}

impl PrimKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimKind::Mesh => "mesh",
            PrimKind::BasisCurves => "basisCurves",
            PrimKind::Points => "points",
        }
    }
}

/// Everything a Sync call reads besides the prim itself
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    pub scene: &'a dyn SceneDelegate,
    pub config: &'a SyncConfig,
    pub queue: &'a CommitQueue,
    pub instancers: &'a InstancerMap,
    pub counters: &'a SyncCounters,
}

/// A renderable prim
pub trait Rprim: Send {
    fn path(&self) -> &PrimPath;

    fn kind(&self) -> PrimKind;

    /// Representations this kind can draw
    fn supported_reprs(&self) -> &'static [ReprStyle];

    fn supports_repr(&self, repr: ReprStyle) -> bool {
        self.supported_reprs().contains(&repr)
    }

    /// Closest supported stand-in for `repr`
    fn resolve_repr(&self, repr: ReprStyle) -> ReprStyle;

    /// Bring the draw item of `repr` up to date with the scene
    ///
    /// `dirty` is what the scene reports for this prim; bits persisted
    /// from earlier Syncs are merged in.
    fn sync(&mut self, ctx: &SyncContext<'_>, dirty: DirtyBits, repr: ReprStyle);

    fn core(&self) -> &PrimCore;

    fn core_mut(&mut self) -> &mut PrimCore;

    fn shared(&self) -> &SharedPrimState {
        &self.core().shared
    }

    fn shared_mut(&mut self) -> &mut SharedPrimState {
        &mut self.core_mut().shared
    }

    fn draw_item(&self, repr: ReprStyle) -> Option<&DrawItem> {
        self.core().draw_item(repr)
    }

    /// Queue destruction of every GPU object this prim owns
    fn release(&mut self, queue: &CommitQueue) {
        self.core_mut().release(queue);
    }
}

/// Create an empty prim of `kind`
pub fn create_rprim(kind: PrimKind, path: PrimPath) -> Box<dyn Rprim> {
    match kind {
        PrimKind::Mesh => Box::new(MeshPrim::new(path)),
        PrimKind::BasisCurves => Box::new(CurvesPrim::new(path)),
        PrimKind::Points => Box::new(PointsPrim::new(path)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rprim_kinds() {
        let path = PrimPath::parse("/a").unwrap();
        for kind in [PrimKind::Mesh, PrimKind::BasisCurves, PrimKind::Points] {
            let prim = create_rprim(kind, path.clone());
            assert_eq!(prim.kind(), kind);
            assert_eq!(prim.path(), &path);
            assert!(prim.supports_repr(ReprStyle::BoundingBox));
            assert!(prim.supports_repr(prim.resolve_repr(ReprStyle::SmoothHull)));
        }
    }

    #[test]
    fn test_resolve_repr_maps_across_kinds() {
        let path = PrimPath::parse("/a").unwrap();
        let curves = create_rprim(PrimKind::BasisCurves, path.clone());
        assert_eq!(curves.resolve_repr(ReprStyle::SmoothHull), ReprStyle::Refined);
        assert_eq!(curves.resolve_repr(ReprStyle::Wireframe), ReprStyle::Wire);

        let mesh = create_rprim(PrimKind::Mesh, path.clone());
        assert_eq!(mesh.resolve_repr(ReprStyle::Wire), ReprStyle::Wireframe);
        assert_eq!(mesh.resolve_repr(ReprStyle::FlatHull), ReprStyle::FlatHull);

        let points = create_rprim(PrimKind::Points, path);
        assert_eq!(points.resolve_repr(ReprStyle::SmoothHull), ReprStyle::Points);
        assert_eq!(points.resolve_repr(ReprStyle::BoundingBox), ReprStyle::BoundingBox);
    }
}
