//! Extension dirty bits and propagation
//!
//! The scene tracks what was authored; these bits track what this crate
//! derives from it. They live above `DirtyBits::CUSTOM_BITS_BEGIN` and are
//! persisted per prim until the derived data is actually recomputed.

use void_scene::DirtyBits;

const fn ext(shift: u32) -> DirtyBits {
    DirtyBits::from_bits(DirtyBits::CUSTOM_BITS_BEGIN.bits() << shift)
}

/// Selection status changed
pub const DIRTY_SELECTION: DirtyBits = ext(0);

/// Selection highlight colour changed
pub const DIRTY_SELECTION_HIGHLIGHT: DirtyBits = ext(1);

/// Computed smooth normals no longer match the points
pub const DIRTY_SMOOTH_NORMALS_STALE: DirtyBits = ext(2);

/// Computed flat normals no longer match the points
pub const DIRTY_FLAT_NORMALS_STALE: DirtyBits = ext(3);

/// Index buffers no longer match the topology
pub const DIRTY_INDEX_BUFFERS_STALE: DirtyBits = ext(4);

/// Both computed-normal bits
pub const DIRTY_NORMALS_STALE: DirtyBits =
    DIRTY_SMOOTH_NORMALS_STALE.union(DIRTY_FLAT_NORMALS_STALE);

/// Every extension bit
pub const DIRTY_EXTENSION_BITS: DirtyBits = DIRTY_SELECTION
    .union(DIRTY_SELECTION_HIGHLIGHT)
    .union(DIRTY_NORMALS_STALE)
    .union(DIRTY_INDEX_BUFFERS_STALE);

/// Bits that invalidate rendering topology
pub const TOPOLOGY_BITS: DirtyBits = DirtyBits::TOPOLOGY
    .union(DirtyBits::MATERIAL_ID)
    .union(DirtyBits::SUBDIV_TAGS)
    .union(DIRTY_INDEX_BUFFERS_STALE);

/// Bits that invalidate cached primvar sources
pub const PRIMVAR_BITS: DirtyBits = DirtyBits::POINTS
    .union(DirtyBits::NORMALS)
    .union(DirtyBits::PRIMVAR)
    .union(DirtyBits::WIDTHS)
    .union(DirtyBits::MATERIAL_ID)
    .union(DirtyBits::TOPOLOGY);

/// Bits that change where and how often a prim is drawn
pub const PLACEMENT_BITS: DirtyBits = DirtyBits::TRANSFORM
    .union(DirtyBits::INSTANCER)
    .union(DirtyBits::INSTANCE_INDEX);

/// Bits whose only effect is showing or hiding the prim
pub const VISIBILITY_BITS: DirtyBits = DirtyBits::RENDER_TAG.union(DirtyBits::VISIBILITY);

/// Apply the implication rules once, in order
///
/// 1. material ⇒ points, normals, primvar, topology
/// 2. topology ⇒ subdiv tags, display style, index buffers stale
/// 3. instancer ⇒ instance index, transform
/// 4. points | display style | topology ⇒ both stale-normal bits
/// 5. any stale-normal bit ⇒ points
/// 6. points ⇒ extent
pub fn propagate(mut bits: DirtyBits) -> DirtyBits {
    if bits.intersects(DirtyBits::MATERIAL_ID) {
        bits |= DirtyBits::POINTS | DirtyBits::NORMALS | DirtyBits::PRIMVAR | DirtyBits::TOPOLOGY;
    }
    if bits.intersects(DirtyBits::TOPOLOGY) {
        bits |= DirtyBits::SUBDIV_TAGS | DirtyBits::DISPLAY_STYLE | DIRTY_INDEX_BUFFERS_STALE;
    }
    if bits.intersects(DirtyBits::INSTANCER) {
        bits |= DirtyBits::INSTANCE_INDEX | DirtyBits::TRANSFORM;
    }
    if bits.intersects(DirtyBits::POINTS | DirtyBits::DISPLAY_STYLE | DirtyBits::TOPOLOGY) {
        bits |= DIRTY_NORMALS_STALE;
    }
    if bits.intersects(DIRTY_NORMALS_STALE) {
        bits |= DirtyBits::POINTS;
    }
    if bits.intersects(DirtyBits::POINTS) {
        bits |= DirtyBits::EXTENT;
    }
    bits
}
