//! Lifetime of the process-wide GPU caches
//!
//! Kept in its own test binary: the caches are shared by every delegate in
//! the process, so no other test may hold one while this runs.

use std::sync::Arc;
use void_sync::prelude::*;
use void_sync::ShaderKey;

#[test]
fn test_caches_live_as_long_as_a_delegate() {
    let _ = env_logger::builder().is_test(true).try_init();

    let first = RenderDelegate::new(SyncConfig::default()).unwrap();
    let second = RenderDelegate::new(SyncConfig::default()).unwrap();
    assert!(Arc::ptr_eq(first.resources(), second.resources()));

    let mut runtime = RecordingRuntime::new();
    let key = ShaderKey::solid([1.0, 0.0, 0.0, 1.0]);
    let handle = first.resources().shader(&mut runtime, &key);
    assert_eq!(second.resources().shader(&mut runtime, &key), handle);
    assert_eq!(runtime.shader_count(), 1);

    let mut other_runtime = RecordingRuntime::new();
    second.resources().shader(&mut other_runtime, &key);
    assert_eq!(other_runtime.shader_count(), 1);
    assert_eq!(second.resources().shader_count(), 2);

    let weak = Arc::downgrade(first.resources());
    drop(first);
    assert!(weak.upgrade().is_some());
    drop(second);
    assert!(weak.upgrade().is_none());

    let third = RenderDelegate::new(SyncConfig::default()).unwrap();
    assert_eq!(third.resources().shader_count(), 0);
}
