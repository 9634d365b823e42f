//! Colored Pointer ABI
//!
//! A colored pointer packs one of four barrier-state bits into the high
//! bits of an otherwise ordinary address, following ZGC's technique. This
//! crate assumes a 64-bit address space that never exceeds 2^60, so bits
//! 60-63 are free for coloring.

use std::sync::atomic::{AtomicUsize, Ordering};

pub const MARKED0_MASK: usize = 1 << 60;
pub const MARKED1_MASK: usize = 1 << 61;
pub const REMAPPED_MASK: usize = 1 << 62;
pub const FINALIZABLE_MASK: usize = 1 << 63;

pub const COLOR_MASK: usize = MARKED0_MASK | MARKED1_MASK | REMAPPED_MASK | FINALIZABLE_MASK;
pub const ADDRESS_MASK: usize = !COLOR_MASK;

/// One of the four disjoint color bits a colored pointer may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Marked0,
    Marked1,
    Remapped,
    Finalizable,
}

impl From<Color> for usize {
    fn from(c: Color) -> usize {
        match c {
            Color::Marked0 => MARKED0_MASK,
            Color::Marked1 => MARKED1_MASK,
            Color::Remapped => REMAPPED_MASK,
            Color::Finalizable => FINALIZABLE_MASK,
        }
    }
}

impl Color {
    /// The other "good" color; flipping between these two drives healing.
    pub fn flipped(self) -> Color {
        match self {
            Color::Marked0 => Color::Marked1,
            Color::Marked1 => Color::Marked0,
            other => other,
        }
    }
}

/// A pointer-width integer carrying a color tag in its high bits.
///
/// `ColoredPointer::new` masks any pre-existing color bits off the address;
/// callers that need a specific color use [`ColoredPointer::with_color`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColoredPointer {
    raw: usize,
}

impl ColoredPointer {
    pub fn new(address: usize) -> Self {
        Self {
            raw: address & ADDRESS_MASK,
        }
    }

    pub fn with_color(address: usize, color: Color) -> Self {
        Self {
            raw: (address & ADDRESS_MASK) | usize::from(color),
        }
    }

    pub fn from_raw(raw: usize) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> usize {
        self.raw
    }

    pub fn address(&self) -> usize {
        self.raw & ADDRESS_MASK
    }

    pub fn has_color(&self, color: Color) -> bool {
        self.raw & usize::from(color) != 0
    }

    pub fn is_remapped(&self) -> bool {
        self.has_color(Color::Remapped)
    }
}

/// Read `good_color` with acquire ordering, as required by mutators that
/// allocate or pass the load barrier's fast path.
pub fn load_good_color(good_color: &AtomicUsize) -> usize {
    good_color.load(Ordering::Acquire)
}

/// Toggle `good_color` between `MARKED0` and `MARKED1` with release
/// ordering. Called exactly once per cycle, strictly outside mark/relocate.
pub fn flip_good_color(good_color: &AtomicUsize) {
    let current = good_color.load(Ordering::Acquire);
    let next = if current == MARKED0_MASK {
        MARKED1_MASK
    } else {
        MARKED0_MASK
    };
    good_color.store(next, Ordering::Release);
}
