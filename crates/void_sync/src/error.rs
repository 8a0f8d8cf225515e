//! Error types for the host-facing delegate API
//!
//! Derivation itself never fails: authoring problems are logged and
//! replaced with fallback data. These errors only describe misuse of the
//! delegate (unknown prims, bad configuration).

use thiserror::Error;
use void_core::PrimPath;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Render delegate errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Prim not found: {0}")]
    UnknownPrim(PrimPath),

    #[error("Prim already inserted: {0}")]
    DuplicatePrim(PrimPath),

    #[error("Instancer not found: {0}")]
    UnknownInstancer(PrimPath),

    #[error("Instancer already inserted: {0}")]
    DuplicateInstancer(PrimPath),

    #[error("Representation {repr:?} is not supported by {path}")]
    UnsupportedRepr {
        path: PrimPath,
        repr: crate::draw_item::ReprStyle,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] void_core::Error),
}

/// Result type for render delegate operations
pub type SyncResult<T> = Result<T, SyncError>;
