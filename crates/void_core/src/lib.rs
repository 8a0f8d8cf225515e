//! # void_core - Scene Sync Core Primitives
//!
//! Zero-dependency primitives shared by the scene, GPU and sync crates:
//! - **Paths**: hierarchical, hashed prim identities (`PrimPath`)
//! - **Handles**: typed generational handles for runtime-owned objects
//! - **Versions**: monotonic change counters for versioned attribute stores
//! - **Errors**: the small error vocabulary these primitives can produce

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub mod error;
pub mod handle;
pub mod id;
pub mod version;

pub use error::*;
pub use handle::*;
pub use id::*;
pub use version::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::handle::{Handle, HandleAllocator};
    pub use crate::id::PrimPath;
    pub use crate::version::{ChangeCounter, ChangeVersion};
}
