//! Geometry derivation
//!
//! Pure functions turning authored topology and primvars into
//! renderer-ready arrays. Nothing here touches the scene delegate or the
//! GPU; every problem with authored data is logged and resolved with
//! fallback data.

pub mod curves;
pub mod instancing;
pub mod mesh;
pub mod normals;
pub mod primvar;

pub use curves::*;
pub use instancing::*;
pub use mesh::*;
pub use normals::*;
pub use primvar::*;
