//! # void_sync - Scene-to-GPU Synchronization
//!
//! Keeps GPU draw items in step with a versioned scene graph:
//! - **Dirty bits**: extension bits and the propagation rules run once per Sync
//! - **Geometry**: curve indices, primvar expansion, mesh vertex sharing,
//!   normals and instance-transform flattening
//! - **Prims**: mesh, basis-curve and point prims behind the `Rprim` trait
//! - **Draw items**: one per (prim, repr), each owning its render items
//! - **Commit queue**: GPU mutations recorded on worker threads and
//!   executed in order on the designated thread
//! - **Instancers**: primvars pulled once per change, nested instancing
//! - **Global caches**: shaders, samplers and the shared bounding box,
//!   shared by every live delegate
//! - **Render delegate**: the host-facing entry points
//!
//! ## Example
//!
//! ```ignore
//! use void_sync::prelude::*;
//!
//! let scene = MemoryScene::new();
//! let mut runtime = RecordingRuntime::new();
//! let delegate = RenderDelegate::new(SyncConfig::load("sync.toml")?)?;
//!
//! let curves = PrimPath::parse("/World/hair")?;
//! scene.add_prim(curves.clone());
//! delegate.insert_prim(curves, PrimKind::BasisCurves)?;
//!
//! // once per frame
//! delegate.sync_all(&scene, ReprStyle::Refined);
//! delegate.commit_resources(&mut runtime);
//! ```

pub mod commit;
pub mod config;
pub mod delegate;
pub mod dirty;
pub mod draw_item;
pub mod error;
pub mod geometry;
pub mod global_cache;
pub mod instancer;
pub mod prim;
pub mod selection;
pub mod shared_state;
pub mod stats;

pub use commit::{CommitContext, CommitQueue, CommitRecord, CommitState, GpuItemState, VertexStream};
pub use config::SyncConfig;
pub use delegate::RenderDelegate;
pub use dirty::*;
pub use draw_item::{DrawItem, RenderItemData, ReprStyle};
pub use error::{ConfigError, SyncError, SyncResult};
pub use global_cache::{GlobalResources, ShaderKey};
pub use instancer::{Instancer, InstancerMap};
pub use prim::{create_rprim, CurvesPrim, MeshPrim, PointsPrim, PrimCore, PrimKind, Rprim, SyncContext};
pub use selection::{HighlightColors, SelectionStatus};
pub use shared_state::{PrimvarSource, SharedPrimState, SyncPhase};
pub use stats::{SyncCounters, SyncStats};

pub mod prelude {
    pub use crate::config::SyncConfig;
    pub use crate::delegate::RenderDelegate;
    pub use crate::draw_item::ReprStyle;
    pub use crate::error::{SyncError, SyncResult};
    pub use crate::prim::{PrimKind, Rprim};
    pub use crate::selection::SelectionStatus;
    pub use crate::stats::SyncStats;
    pub use void_core::PrimPath;
    pub use void_gpu::{RecordingRuntime, ResourceRuntime};
    pub use void_scene::{DirtyBits, MemoryScene, SceneDelegate};
}
