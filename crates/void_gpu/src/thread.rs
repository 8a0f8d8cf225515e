//! Designated-thread guard
//!
//! GPU mutation is only legal on one thread. The guard records that thread
//! and asserts on it in debug builds.

use std::thread::{self, ThreadId};

/// The one thread allowed to mutate GPU objects
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DesignatedThread {
    id: ThreadId,
}

impl DesignatedThread {
    /// Designate the calling thread
    pub fn current() -> Self {
        Self {
            id: thread::current().id(),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn is_current(&self) -> bool {
        thread::current().id() == self.id
    }

    /// Debug-assert that the caller runs on the designated thread
    #[inline]
    #[track_caller]
    pub fn assert_current(&self, operation: &str) {
        debug_assert!(
            self.is_current(),
            "{} called off the designated GPU thread",
            operation
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_thread_is_designated() {
        let designated = DesignatedThread::current();
        assert!(designated.is_current());
        designated.assert_current("test");

        let other = thread::spawn(move || designated.is_current()).join().unwrap();
        assert!(!other);
    }
}
