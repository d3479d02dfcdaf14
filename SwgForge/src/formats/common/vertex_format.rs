//! Vertex buffer format flags
//!
//! A packed `u32` describing which attributes a vertex stream carries:
//!
//! | bits   | meaning                                        |
//! |--------|------------------------------------------------|
//! | 0      | position                                       |
//! | 1      | transformed                                    |
//! | 2      | normal                                         |
//! | 3      | color0                                         |
//! | 4      | color1, or point size for transformed streams |
//! | 8-11   | texture coordinate set count                   |
//! | 12+2i  | dimension of set `i`, minus one                |
//! | 24-26  | blend count                                    |
//!
//! A last texture set of dimension 4 is the DOT3 tangent (xyz + sign).

use serde::{Deserialize, Serialize};

const F_POSITION: u32 = 1 << 0;
const F_TRANSFORMED: u32 = 1 << 1;
const F_NORMAL: u32 = 1 << 2;
const F_COLOR0: u32 = 1 << 3;
const F_COLOR1: u32 = 1 << 4;
const F_POINT_SIZE: u32 = 1 << 4;

const TEXCOORD_COUNT_SHIFT: u32 = 8;
const TEXCOORD_COUNT_MASK: u32 = 0b1111;
const TEXCOORD_DIM_BASE_SHIFT: u32 = 12;
const TEXCOORD_DIM_PER_SET_SHIFT: u32 = 2;
const TEXCOORD_DIM_MASK: u32 = 0b11;
const BLEND_COUNT_SHIFT: u32 = 24;
const BLEND_COUNT_MASK: u32 = 0b111;

/// Maximum number of texture coordinate sets.
pub const MAX_TEXCOORD_SETS: usize = 8;

/// Packed vertex format flags. All setters return a new value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexFormat(pub u32);

impl VertexFormat {
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn has_position(self) -> bool {
        self.0 & F_POSITION != 0
    }

    pub const fn is_transformed(self) -> bool {
        self.0 & F_TRANSFORMED != 0
    }

    pub const fn has_normal(self) -> bool {
        self.0 & F_NORMAL != 0
    }

    pub const fn has_color0(self) -> bool {
        self.0 & F_COLOR0 != 0
    }

    /// Bit 4 on an untransformed stream.
    pub const fn has_color1(self) -> bool {
        self.0 & F_COLOR1 != 0 && !self.is_transformed()
    }

    /// Bit 4 on a transformed stream.
    pub const fn has_point_size(self) -> bool {
        self.0 & F_POINT_SIZE != 0 && self.is_transformed()
    }

    pub const fn num_texcoord_sets(self) -> usize {
        ((self.0 >> TEXCOORD_COUNT_SHIFT) & TEXCOORD_COUNT_MASK) as usize
    }

    /// Dimension (1..=4) of set `set`. Only meaningful for `set < num_texcoord_sets()`.
    pub const fn texcoord_set_dimension(self, set: usize) -> usize {
        let shift = TEXCOORD_DIM_BASE_SHIFT + set as u32 * TEXCOORD_DIM_PER_SET_SHIFT;
        ((self.0 >> shift) & TEXCOORD_DIM_MASK) as usize + 1
    }

    pub const fn blend_count(self) -> usize {
        ((self.0 >> BLEND_COUNT_SHIFT) & BLEND_COUNT_MASK) as usize
    }

    /// Whether the last texture set is a packed tangent.
    pub const fn has_dot3(self) -> bool {
        let count = self.num_texcoord_sets();
        count > 0 && self.texcoord_set_dimension(count - 1) == 4
    }

    /// Texture sets excluding a trailing DOT3 set.
    pub const fn effective_uv_set_count(self) -> usize {
        self.num_texcoord_sets() - if self.has_dot3() { 1 } else { 0 }
    }

    /// Bytes per vertex described by these flags.
    pub fn vertex_size(self) -> usize {
        let mut size = 0;
        if self.has_position() {
            size += 12;
        }
        if self.has_normal() {
            size += 12;
        }
        if self.has_point_size() {
            size += 4;
        }
        if self.has_color0() {
            size += 4;
        }
        if self.has_color1() {
            size += 4;
        }
        for set in 0..self.num_texcoord_sets() {
            size += 4 * self.texcoord_set_dimension(set);
        }
        size
    }

    #[must_use]
    pub const fn with_position(self, enabled: bool) -> Self {
        self.with_bit(F_POSITION, enabled)
    }

    #[must_use]
    pub const fn with_transformed(self, enabled: bool) -> Self {
        self.with_bit(F_TRANSFORMED, enabled)
    }

    #[must_use]
    pub const fn with_normal(self, enabled: bool) -> Self {
        self.with_bit(F_NORMAL, enabled)
    }

    #[must_use]
    pub const fn with_color0(self, enabled: bool) -> Self {
        self.with_bit(F_COLOR0, enabled)
    }

    #[must_use]
    pub const fn with_color1(self, enabled: bool) -> Self {
        self.with_bit(F_COLOR1, enabled)
    }

    #[must_use]
    pub const fn with_point_size(self, enabled: bool) -> Self {
        self.with_bit(F_POINT_SIZE, enabled)
    }

    #[must_use]
    pub const fn with_num_texcoord_sets(self, count: usize) -> Self {
        let cleared = self.0 & !(TEXCOORD_COUNT_MASK << TEXCOORD_COUNT_SHIFT);
        Self(cleared | ((count as u32 & TEXCOORD_COUNT_MASK) << TEXCOORD_COUNT_SHIFT))
    }

    #[must_use]
    pub const fn with_texcoord_set_dimension(self, set: usize, dimension: usize) -> Self {
        let shift = TEXCOORD_DIM_BASE_SHIFT + set as u32 * TEXCOORD_DIM_PER_SET_SHIFT;
        let code = (dimension as u32).saturating_sub(1) & TEXCOORD_DIM_MASK;
        Self((self.0 & !(TEXCOORD_DIM_MASK << shift)) | (code << shift))
    }

    #[must_use]
    pub const fn with_blend_count(self, count: usize) -> Self {
        let cleared = self.0 & !(BLEND_COUNT_MASK << BLEND_COUNT_SHIFT);
        Self(cleared | ((count as u32 & BLEND_COUNT_MASK) << BLEND_COUNT_SHIFT))
    }

    const fn with_bit(self, bit: u32, enabled: bool) -> Self {
        if enabled { Self(self.0 | bit) } else { Self(self.0 & !bit) }
    }
}

impl From<u32> for VertexFormat {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
