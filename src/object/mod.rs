//! Managed Object: Body + Handle
//!
//! A *body* is a fixed-shape, headerless heap record of `SLOTS` colored
//! body pointers. A *handle* is the host-side object owning one field: a
//! colored pointer to its body. Handles never move; bodies do, and the
//! load barrier heals a handle's body pointer lazily on use.
//!
//! The host's own handle/object model is out of scope for this crate (see
//! SPEC_FULL.md); a `Handle` here is the minimal owner needed to drive and
//! test the barrier and collector.

use crate::barrier::colored_ptr::ColoredPointer;
use crate::barrier::load_barrier::fix_pointer;
use crate::error::{GcError, Result};
use crate::heap::Heap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of handle-valued slots in a body.
pub const SLOTS: usize = 10;

/// Size in bytes of a body: `SLOTS` colored pointers.
pub const BODY_SIZE: usize = SLOTS * 8;

/// Host-side owner of a colored pointer to a body. Never moves; its body
/// pointer is healed in place by the load barrier.
pub struct Handle {
    body: AtomicUsize,
}

impl Handle {
    /// Allocate a handle with a freshly zeroed body in the Young generation.
    pub fn new(heap: &Heap) -> Result<Self> {
        let body = heap.allocate_young(BODY_SIZE)?;
        Ok(Self {
            body: AtomicUsize::new(body.raw()),
        })
    }

    fn colored(&self) -> ColoredPointer {
        ColoredPointer::from_raw(self.body.load(Ordering::Acquire))
    }

    /// Run the load barrier on this handle's body pointer, healing it in
    /// place if it does not carry the current good color.
    fn barrier(&self, heap: &Heap) -> ColoredPointer {
        let current = self.colored();
        let healed = fix_pointer(heap, current);
        if healed != current {
            self.body.store(healed.raw(), Ordering::Release);
        }
        healed
    }

    /// Raw body address (colored pointer stripped of its color bits), for
    /// tests that assert relocation moved an object.
    pub fn body_address(&self, heap: &Heap) -> usize {
        self.barrier(heap).address()
    }

    /// The address portion of this handle's body pointer as currently
    /// stored, *without* running the load barrier. Used by `add_root` to
    /// seed the mark stack: per the barrier contract, a pointer is only
    /// healed "when used" (a read or write through the handle), and seeding
    /// a root is neither -- healing it here would let the mark phase
    /// prematurely stamp the root with the cycle's good color before
    /// relocation has had a chance to evacuate its page, masking the very
    /// staleness the load barrier exists to detect.
    pub fn raw_body_address(&self) -> usize {
        ColoredPointer::from_raw(self.body.load(Ordering::Acquire)).address()
    }

    /// Whether this handle's body is currently marked in its page's bitmap.
    pub fn is_marked(&self, heap: &Heap) -> bool {
        let ptr = self.barrier(heap);
        match heap.get_page(ptr.address()) {
            Some(page) => page.is_marked(ptr.address()),
            None => false,
        }
    }

    /// Write `value`'s body pointer (or 0, for "no handle") into slot `i`,
    /// running the load barrier on both handles first and the write
    /// barrier afterward.
    pub fn store(&self, heap: &Heap, i: usize, value: Option<&Handle>) -> Result<()> {
        if i >= SLOTS {
            return Err(GcError::IndexOutOfRange {
                index: i,
                slots: SLOTS,
            });
        }

        let body_ptr = self.barrier(heap);
        let Some(page) = heap.get_page(body_ptr.address()) else {
            return Err(GcError::NoBody);
        };

        let value_body = value.map(|v| v.barrier(heap).address());
        page.write_word(body_ptr.address() + i * 8, value_body.unwrap_or(0));

        heap.write_barrier(body_ptr.address(), value_body);
        Ok(())
    }

    /// Read slot `i`, healing this handle's body pointer first (so the
    /// caller's subsequent view of `h.body` is already corrected). Returns
    /// the raw colored pointer stored in the slot, or `None` if empty.
    pub fn load(&self, heap: &Heap, i: usize) -> Result<Option<usize>> {
        if i >= SLOTS {
            return Err(GcError::IndexOutOfRange {
                index: i,
                slots: SLOTS,
            });
        }

        let body_ptr = self.barrier(heap);
        let Some(page) = heap.get_page(body_ptr.address()) else {
            return Err(GcError::NoBody);
        };

        let raw = page.read_word(body_ptr.address() + i * 8);
        if raw == 0 {
            return Ok(None);
        }

        // The slot holds a child body pointer, which is itself barriered
        // before being handed back: this is what keeps the caller's view
        // healed even though nothing re-walks `self`'s body after a
        // relocation that postdates the write.
        let healed = fix_pointer(heap, ColoredPointer::from_raw(raw));
        if healed.raw() != raw {
            page.write_word(body_ptr.address() + i * 8, healed.raw());
        }
        Ok(Some(healed.raw()))
    }
}
