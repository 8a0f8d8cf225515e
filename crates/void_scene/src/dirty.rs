//! Dirty Bits
//!
//! Per-prim change mask reported by the host change tracker. The low bits
//! are owned by the scene; bits from [`DirtyBits::CUSTOM_BITS_BEGIN`] up are
//! free for consumers to track derived state the scene knows nothing about.

use serde::{Deserialize, Serialize};

/// Bitmask of which aspects of a prim changed since it was last cleaned
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirtyBits(u32);

impl DirtyBits {
    /// Nothing changed
    pub const CLEAN: Self = Self(0);

    /// A representation was requested for the first time
    pub const INIT_REPR: Self = Self(1 << 0);

    /// Time-varying data changed
    pub const VARYING: Self = Self(1 << 1);

    /// Picking id changed
    pub const PRIM_ID: Self = Self(1 << 2);

    /// Authored extent changed
    pub const EXTENT: Self = Self(1 << 3);

    /// Display style (refine level, flat shading) changed
    pub const DISPLAY_STYLE: Self = Self(1 << 4);

    /// Point positions changed
    pub const POINTS: Self = Self(1 << 5);

    /// Any non-point primvar changed
    pub const PRIMVAR: Self = Self(1 << 6);

    /// Material binding changed
    pub const MATERIAL_ID: Self = Self(1 << 7);

    /// Topology changed
    pub const TOPOLOGY: Self = Self(1 << 8);

    /// World transform changed
    pub const TRANSFORM: Self = Self(1 << 9);

    /// Visibility changed
    pub const VISIBILITY: Self = Self(1 << 10);

    /// Authored normals changed
    pub const NORMALS: Self = Self(1 << 11);

    /// Double-sidedness changed
    pub const DOUBLE_SIDED: Self = Self(1 << 12);

    /// Cull style changed
    pub const CULL_STYLE: Self = Self(1 << 13);

    /// Subdivision tags changed
    pub const SUBDIV_TAGS: Self = Self(1 << 14);

    /// Curve/point widths changed
    pub const WIDTHS: Self = Self(1 << 15);

    /// Instancer binding changed
    pub const INSTANCER: Self = Self(1 << 16);

    /// Instance indices changed
    pub const INSTANCE_INDEX: Self = Self(1 << 17);

    /// Representation selector changed
    pub const REPR: Self = Self(1 << 18);

    /// Render tag changed
    pub const RENDER_TAG: Self = Self(1 << 19);

    /// Every bit the scene tracks
    pub const ALL_SCENE: Self = Self((1 << 23) - 1);

    /// A new representation must be built
    pub const NEW_REPR: Self = Self(1 << 23);

    /// First bit available to consumers
    pub const CUSTOM_BITS_BEGIN: Self = Self(1 << 24);

    /// Every bit
    pub const ALL: Self = Self(u32::MAX);

    /// Create from raw bits
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Get raw bits
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check if no bit is set
    #[inline]
    pub const fn is_clean(self) -> bool {
        self.0 == 0
    }

    /// Check if all specified bits are set
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any of the specified bits are set
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// OR-merge
    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// AND-NOT clear
    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Set or clear bits based on condition
    #[inline]
    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[inline]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Only the scene-owned bits
    #[inline]
    pub const fn scene_bits(self) -> Self {
        Self(self.0 & Self::ALL_SCENE.0)
    }

    /// Only the consumer-owned bits
    #[inline]
    pub const fn custom_bits(self) -> Self {
        Self(self.0 & !(Self::CUSTOM_BITS_BEGIN.0 - 1))
    }
}

impl core::ops::BitOr for DirtyBits {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for DirtyBits {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl core::ops::BitAnd for DirtyBits {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl core::ops::BitAndAssign for DirtyBits {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl core::ops::Not for DirtyBits {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

impl core::fmt::Debug for DirtyBits {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        const NAMES: &[(DirtyBits, &str)] = &[
            (DirtyBits::INIT_REPR, "INIT_REPR"),
            (DirtyBits::VARYING, "VARYING"),
            (DirtyBits::PRIM_ID, "PRIM_ID"),
            (DirtyBits::EXTENT, "EXTENT"),
            (DirtyBits::DISPLAY_STYLE, "DISPLAY_STYLE"),
            (DirtyBits::POINTS, "POINTS"),
            (DirtyBits::PRIMVAR, "PRIMVAR"),
            (DirtyBits::MATERIAL_ID, "MATERIAL_ID"),
            (DirtyBits::TOPOLOGY, "TOPOLOGY"),
            (DirtyBits::TRANSFORM, "TRANSFORM"),
            (DirtyBits::VISIBILITY, "VISIBILITY"),
            (DirtyBits::NORMALS, "NORMALS"),
            (DirtyBits::DOUBLE_SIDED, "DOUBLE_SIDED"),
            (DirtyBits::CULL_STYLE, "CULL_STYLE"),
            (DirtyBits::SUBDIV_TAGS, "SUBDIV_TAGS"),
            (DirtyBits::WIDTHS, "WIDTHS"),
            (DirtyBits::INSTANCER, "INSTANCER"),
            (DirtyBits::INSTANCE_INDEX, "INSTANCE_INDEX"),
            (DirtyBits::REPR, "REPR"),
            (DirtyBits::RENDER_TAG, "RENDER_TAG"),
            (DirtyBits::NEW_REPR, "NEW_REPR"),
        ];

        if self.is_clean() {
            return write!(f, "DirtyBits(CLEAN)");
        }

        write!(f, "DirtyBits(")?;
        let mut first = true;
        for (bit, name) in NAMES {
            if self.contains(*bit) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        let custom = self.custom_bits();
        if !custom.is_clean() {
            if !first {
                write!(f, " | ")?;
            }
            write!(f, "custom:{:#x}", custom.0)?;
        }
        write!(f, ")")
    }
}
