//! # void_scene - Scene Graph Collaborator Surface
//!
//! What a render delegate reads from the host scene graph:
//! - **Dirty bits**: per-prim change mask with room for consumer extension bits
//! - **Values**: typed primvar arrays with interpolation descriptors
//! - **Topology**: mesh and basis-curve topology, render tags, display style
//! - **Delegate**: the `SceneDelegate` trait, safe for concurrent readers
//! - **Memory scene**: a retained in-memory implementation with change tracking
//!
//! ## Example
//!
//! ```ignore
//! use void_scene::prelude::*;
//!
//! let scene = MemoryScene::new();
//! let mesh = PrimPath::parse("/World/mesh")?;
//! scene.add_prim(mesh.clone());
//! scene.set_mesh_topology(&mesh, MeshTopology::new(vec![3], vec![0, 1, 2]));
//!
//! assert!(scene.dirty_bits(&mesh).contains(DirtyBits::TOPOLOGY));
//! ```

extern crate alloc;

pub mod delegate;
pub mod dirty;
pub mod memory;
pub mod topology;
pub mod value;

pub use delegate::*;
pub use dirty::*;
pub use memory::*;
pub use topology::*;
pub use value::*;

pub mod prelude {
    pub use crate::delegate::{tokens, MaterialDesc, SceneDelegate};
    pub use crate::dirty::DirtyBits;
    pub use crate::memory::MemoryScene;
    pub use crate::topology::{
        CurveBasis, CurveType, CurveWrap, CurvesTopology, DisplayStyle, GeomSubset, MeshTopology,
        Orientation, RenderTag,
    };
    pub use crate::value::{Interpolation, PrimvarDescriptor, PrimvarRole, PrimvarValue, Value};
    pub use void_core::PrimPath;
}
