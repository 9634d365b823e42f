//! Boundary-behavior tests from the allocator and collector contracts.

use std::sync::Arc;
use zmanaged::heap::page::Generation;
use zmanaged::{GcConfig, Handle, Heap};

fn new_heap() -> Arc<Heap> {
    Arc::new(Heap::new(GcConfig::default().tlab_size).unwrap())
}

/// A TLAB request larger than the configured TLAB size still succeeds by
/// carving a TLAB sized to the request itself.
#[test]
fn tlab_request_larger_than_tlab_size_succeeds() {
    let heap = new_heap();
    let big = GcConfig::default().tlab_size * 4;
    let ptr = heap.allocate_young(big).unwrap();
    assert_eq!(heap.get_page(ptr.address()).unwrap().generation(), Generation::Young);
}

/// Store at the last valid slot index succeeds; one past it fails.
#[test]
fn store_at_last_slot_succeeds_one_past_fails() {
    let heap = new_heap();
    let a = Handle::new(&heap).unwrap();
    let b = Handle::new(&heap).unwrap();
    assert!(a.store(&heap, zmanaged::object::SLOTS - 1, Some(&b)).is_ok());
    assert!(a.store(&heap, zmanaged::object::SLOTS, Some(&b)).is_err());
}

/// A minor cycle does not evacuate Old pages, so they accumulate no
/// forwarding entries and their bodies keep their addresses.
#[test]
fn minor_cycle_leaves_old_pages_without_forwarding() {
    let heap = new_heap();
    let collector = zmanaged::Collector::new(heap.clone());

    let old_ptr = heap.allocate_old(zmanaged::object::BODY_SIZE).unwrap();
    let old_page = heap.get_page(old_ptr.address()).unwrap();
    assert_eq!(old_page.generation(), Generation::Old);
    old_page.mark(old_ptr.address());

    collector.minor_gc().unwrap();

    assert!(!old_page.is_evacuating());
    assert_eq!(old_page.resolve_forwarding(old_ptr.address()), None);
}

/// A fresh Young page lands after the page mutators were bumping into
/// (append), while a fresh Old page lands at the list head (prepend).
#[test]
fn young_pages_append_old_pages_prepend() {
    let heap = new_heap();

    let young_before = heap.current_young_page().unwrap().start();
    while heap.current_young_page().unwrap().start() == young_before {
        let _ = heap.allocate_young(zmanaged::object::BODY_SIZE);
    }
    let pages = heap.pages();
    let young_pos = pages.iter().position(|p| p.start() == young_before).unwrap();
    assert_eq!(young_pos, 0, "the first Young page should still be the list head after a second Young page is appended");

    let old_before = heap.allocate_old(zmanaged::object::BODY_SIZE).unwrap();
    let old_page_before = heap.get_page(old_before.address()).unwrap().start();
    let pages_after_old = heap.pages();
    assert_eq!(pages_after_old[0].start(), old_page_before, "a new Old page must be prepended to the list head");
}

/// Flipping the good color with no intervening mutator access (no store,
/// no load, no relocation) leaves every live handle's body address exactly
/// where it was -- healing only ever changes the color bits in place, or
/// remaps through forwarding, neither of which happens without a cycle.
#[test]
fn color_flip_alone_does_not_move_bodies() {
    let heap = new_heap();
    let a = Handle::new(&heap).unwrap();
    let before = a.body_address(&heap);

    zmanaged::barrier::colored_ptr::flip_good_color(&heap.good_color);

    assert_eq!(a.body_address(&heap), before);
}
