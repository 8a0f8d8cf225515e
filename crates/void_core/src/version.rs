//! Change versions for versioned attribute stores
//!
//! Every mutation of a versioned store bumps a global counter and stamps the
//! touched attribute with the new value. Consumers remember the version they
//! last synced against and compare stamps to find out what changed.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// A point in a store's change history
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ChangeVersion(u64);

impl ChangeVersion {
    /// Version before any change was recorded
    pub const INITIAL: Self = Self(0);

    /// Create from a raw counter value
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw counter value
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this stamp is newer than `since`
    #[inline]
    pub fn is_newer_than(self, since: ChangeVersion) -> bool {
        self.0 > since.0
    }
}

impl fmt::Debug for ChangeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangeVersion({})", self.0)
    }
}

impl fmt::Display for ChangeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Thread-safe monotonic version source
pub struct ChangeCounter {
    next: AtomicU64,
}

impl ChangeCounter {
    /// Create a counter starting at `ChangeVersion::INITIAL`
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Advance and return the new version
    pub fn bump(&self) -> ChangeVersion {
        ChangeVersion(self.next.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Most recently issued version
    pub fn current(&self) -> ChangeVersion {
        ChangeVersion(self.next.load(Ordering::Acquire))
    }
}

impl Default for ChangeCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_monotonic() {
        let counter = ChangeCounter::new();
        assert_eq!(counter.current(), ChangeVersion::INITIAL);
        let a = counter.bump();
        let b = counter.bump();
        assert!(b.is_newer_than(a));
        assert_eq!(counter.current(), b);
    }
}
