//! Type-safe handles for runtime-owned objects
//!
//! Shaders, textures and samplers live in caches owned by the graphics
//! runtime. Everything else refers to them through a `Handle<T>`: a plain
//! copyable value that never owns or releases the object. Generations let the
//! owner detect handles that outlived a freed slot.

use core::marker::PhantomData;
use core::hash::{Hash, Hasher};
use core::fmt;
use alloc::vec::Vec;

use crate::error::HandleError;

/// A type-safe, non-owning handle to an object of type T
#[repr(transparent)]
pub struct Handle<T> {
    /// Lower 32 bits: index, Upper 32 bits: generation
    bits: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Create a new handle from index and generation
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            bits: (generation as u64) << 32 | index as u64,
            _marker: PhantomData,
        }
    }

    /// Create an invalid/null handle
    #[inline]
    pub const fn null() -> Self {
        Self {
            bits: u64::MAX,
            _marker: PhantomData,
        }
    }

    /// Check if this handle is null
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.bits == u64::MAX
    }

    /// Get the index portion
    #[inline]
    pub const fn index(&self) -> u32 {
        self.bits as u32
    }

    /// Get the generation portion
    #[inline]
    pub const fn generation(&self) -> u32 {
        (self.bits >> 32) as u32
    }

    /// Raw bits
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.bits
    }
}

// Manual trait implementations to avoid T bounds
impl<T> Clone for Handle<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = core::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        if self.is_null() {
            write!(f, "Handle<{}>(null)", short)
        } else {
            write!(f, "Handle<{}>({}v{})", short, self.index(), self.generation())
        }
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::null()
    }
}

/// Allocates handles with generation tracking
pub struct HandleAllocator<T> {
    generations: Vec<u32>,
    free_list: Vec<u32>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> HandleAllocator<T> {
    /// Create an empty allocator
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            free_list: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Allocate a new handle
    pub fn allocate(&mut self) -> Result<Handle<T>, HandleError> {
        if let Some(index) = self.free_list.pop() {
            return Ok(Handle::new(index, self.generations[index as usize]));
        }
        let index = u32::try_from(self.generations.len()).map_err(|_| HandleError::Exhausted)?;
        if index == u32::MAX {
            return Err(HandleError::Exhausted);
        }
        self.generations.push(0);
        Ok(Handle::new(index, 0))
    }

    /// Free a handle, making its index available for reuse
    pub fn free(&mut self, handle: Handle<T>) -> Result<(), HandleError> {
        if handle.is_null() {
            return Err(HandleError::Null);
        }
        let generation = self
            .generations
            .get_mut(handle.index() as usize)
            .ok_or(HandleError::Stale)?;
        if *generation != handle.generation() {
            return Err(HandleError::Stale);
        }
        *generation = generation.wrapping_add(1);
        self.free_list.push(handle.index());
        Ok(())
    }

    /// Check if a handle is still valid
    pub fn is_valid(&self, handle: Handle<T>) -> bool {
        !handle.is_null()
            && self
                .generations
                .get(handle.index() as usize)
                .map_or(false, |g| *g == handle.generation())
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.generations.len() - self.free_list.len()
    }

    /// Check if no handles are allocated
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for HandleAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}
