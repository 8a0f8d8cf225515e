//! GPU Buffers
//!
//! Backend-agnostic buffer surface. A buffer is written by acquiring a
//! mapped byte range for `count` elements and committing it.

use alloc::string::String;
use serde::{Deserialize, Serialize};
use void_core::Handle;

/// Tag type for buffer handles
pub struct Buffer;

/// Identity of a runtime buffer
pub type BufferId = Handle<Buffer>;

/// What a buffer is bound as
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferKind {
    /// Index data (`u32` elements)
    Index,
    /// Per-vertex attribute data
    Vertex,
    /// Per-instance data
    Instance,
}

/// Scalar layout of one buffer element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ElementFormat {
    Float,
    Float2,
    Float3,
    Float4,
    UInt,
    Matrix4,
}

impl ElementFormat {
    /// Scalar components per element
    pub const fn components(self) -> usize {
        match self {
            Self::Float | Self::UInt => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 => 4,
            Self::Matrix4 => 16,
        }
    }

    /// Bytes per element
    pub const fn size_bytes(self) -> usize {
        self.components() * 4
    }

    /// Float format with the given component count
    pub fn float_with_components(components: usize) -> Option<Self> {
        match components {
            1 => Some(Self::Float),
            2 => Some(Self::Float2),
            3 => Some(Self::Float3),
            4 => Some(Self::Float4),
            16 => Some(Self::Matrix4),
            _ => None,
        }
    }
}

/// Element format plus the semantic name the shader binds it by
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementLayout {
    pub format: ElementFormat,
    pub semantic: String,
}

impl ElementLayout {
    pub fn new(format: ElementFormat, semantic: impl Into<String>) -> Self {
        Self {
            format,
            semantic: semantic.into(),
        }
    }

    pub fn index() -> Self {
        Self::new(ElementFormat::UInt, "indices")
    }

    /// Bytes per element
    pub fn stride(&self) -> usize {
        self.format.size_bytes()
    }
}

/// A runtime-owned buffer
///
/// Dropping the box releases the buffer. Only called on the designated
/// thread.
pub trait GpuBuffer: Send + Sync {
    fn id(&self) -> BufferId;

    fn kind(&self) -> BufferKind;

    fn layout(&self) -> &ElementLayout;

    /// Committed element count
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map writable memory for `count` elements
    ///
    /// With `discard_previous` the old contents need not be preserved.
    /// Returns `None` when the runtime cannot provide memory.
    fn acquire(&mut self, count: usize, discard_previous: bool) -> Option<&mut [u8]>;

    /// Publish the memory returned by the last `acquire`
    fn commit(&mut self);
}

/// Acquire, copy and commit a slice of plain data
///
/// Returns `false` (and writes nothing) when acquire fails or the mapped
/// range has the wrong size.
pub fn upload<T: bytemuck::Pod>(buffer: &mut dyn GpuBuffer, elements: &[T], element_count: usize) -> bool {
    let id = buffer.id();
    let bytes: &[u8] = bytemuck::cast_slice(elements);
    match buffer.acquire(element_count, true) {
        Some(memory) if memory.len() == bytes.len() => memory.copy_from_slice(bytes),
        Some(memory) => {
            log::error!(
                "buffer {:?} mapped {} bytes, expected {}",
                id,
                memory.len(),
                bytes.len()
            );
            return false;
        }
        None => return false,
    }
    buffer.commit();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes() {
        assert_eq!(ElementFormat::Float3.size_bytes(), 12);
        assert_eq!(ElementFormat::Matrix4.components(), 16);
        assert_eq!(ElementLayout::index().stride(), 4);
        assert_eq!(ElementFormat::float_with_components(2), Some(ElementFormat::Float2));
        assert_eq!(ElementFormat::float_with_components(5), None);
    }
}
