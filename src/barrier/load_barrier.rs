//! Load Barrier
//!
//! Verifies a colored pointer carries the current good color on use and
//! heals it (remap through forwarding + recolor) when it does not. The
//! fast path is a single bit-test; the slow path (`fix_pointer`) is the
//! out-of-line heal.

use crate::barrier::colored_ptr::{load_good_color, ColoredPointer};
use crate::heap::Heap;

/// Fast path: does `ptr` already carry the current good color?
#[inline]
pub fn is_good(heap: &Heap, ptr: ColoredPointer) -> bool {
    ptr.raw() & load_good_color(&heap.good_color) != 0
}

/// Slow path: heal `ptr`, following forwarding if the page it points into
/// is mid-evacuation. Self-stabilizing -- a second call on an already-good
/// pointer is a no-op.
///
/// Steps (see the barrier contract): strip color, locate the owning page,
/// resolve forwarding if evacuating, then recolor with `good_color`.
pub fn fix_pointer(heap: &Heap, ptr: ColoredPointer) -> ColoredPointer {
    let good_color = load_good_color(&heap.good_color);
    if ptr.raw() & good_color != 0 {
        return ptr;
    }

    let raw = ptr.address();
    let Some(page) = heap.get_page(raw) else {
        return ColoredPointer::from_raw(raw | good_color);
    };

    if page.is_evacuating() {
        if let Some(new_addr) = page.resolve_forwarding(raw) {
            return ColoredPointer::from_raw(new_addr | good_color);
        }
    }

    ColoredPointer::from_raw(raw | good_color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::page::Generation;

    #[test]
    fn fix_pointer_is_idempotent() {
        let heap = Heap::new(32 * 1024).unwrap();
        let ptr = heap.allocate_young(80).unwrap();
        let healed_once = fix_pointer(&heap, ptr);
        let healed_twice = fix_pointer(&heap, healed_once);
        assert_eq!(healed_once, healed_twice);
    }

    #[test]
    fn fix_pointer_follows_forwarding_during_evacuation() {
        let heap = Heap::new(32 * 1024).unwrap();
        let ptr = heap.allocate_young(80).unwrap();
        let page = heap.get_page(ptr.address()).unwrap();
        page.start_evacuation();
        let new_addr = heap.allocate_old(80).unwrap().address();
        page.add_forwarding(ptr.address(), new_addr);

        // Simulate a stale color by stripping it back off.
        let stale = ColoredPointer::new(ptr.address());
        let healed = fix_pointer(&heap, stale);
        assert_eq!(healed.address(), new_addr);
        assert_eq!(heap.get_page(healed.address()).unwrap().generation(), Generation::Old);
    }
}
