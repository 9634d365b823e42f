//! End-to-end scenario tests for allocation, the write barrier, and the
//! index-bounds contract.

use std::sync::Arc;
use zmanaged::heap::page::Generation;
use zmanaged::{GcConfig, Handle, Heap};

fn new_heap() -> Arc<Heap> {
    Arc::new(Heap::new(GcConfig::default().tlab_size).unwrap())
}

/// S2 — Minor cycle promotes young only.
#[test]
fn minor_cycle_promotes_young_and_leaves_old_in_place() {
    let heap = new_heap();
    let collector = zmanaged::Collector::new(heap.clone());

    let o = Arc::new(Handle::new(&heap).unwrap());
    let young_addr = o.body_address(&heap);
    assert_eq!(heap.get_page(young_addr).unwrap().generation(), Generation::Young);

    let p_ptr = heap.allocate_old(zmanaged::object::BODY_SIZE).unwrap();
    assert_eq!(heap.get_page(p_ptr.address()).unwrap().generation(), Generation::Old);

    // `p` itself has no `Handle`, only its Old-generation body; wire the
    // Old -> Young edge directly into its first slot, then run the write
    // barrier to record the remembered-set entry a minor cycle must drain.
    heap.get_page(p_ptr.address())
        .unwrap()
        .write_word(p_ptr.address(), young_addr);
    heap.write_barrier(p_ptr.address(), Some(young_addr));

    // The collector always skips the current Young allocation page, so
    // force a rollover before running the cycle.
    let original_page = heap.current_young_page().unwrap().start();
    while heap.current_young_page().unwrap().start() == original_page {
        let _ = heap.allocate_young(zmanaged::object::BODY_SIZE);
    }

    collector.minor_gc().unwrap();

    assert_ne!(o.body_address(&heap), young_addr);
    assert_eq!(heap.get_page(o.body_address(&heap)).unwrap().generation(), Generation::Old);
}

/// S4 — Index errors leave the handle untouched.
#[test]
fn store_and_load_out_of_range_report_index_errors() {
    let heap = new_heap();
    let a = Handle::new(&heap).unwrap();
    let before = a.body_address(&heap);

    assert!(a.load(&heap, zmanaged::object::SLOTS).is_err());
    assert!(a.store(&heap, zmanaged::object::SLOTS, None).is_err());

    assert_eq!(a.body_address(&heap), before);
}

/// S6 — TLAB isolation: concurrent mutator threads never share an address.
#[test]
fn concurrent_allocation_produces_disjoint_addresses() {
    let heap = new_heap();
    let per_thread = 1000;

    let threads: Vec<_> = (0..2)
        .map(|_| {
            let heap = heap.clone();
            std::thread::spawn(move || {
                (0..per_thread)
                    .map(|_| heap.allocate_young(zmanaged::object::BODY_SIZE).unwrap().address())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut all = Vec::new();
    for t in threads {
        all.extend(t.join().unwrap());
    }

    assert_eq!(all.len(), per_thread * 2);
    let unique: std::collections::HashSet<_> = all.iter().copied().collect();
    assert_eq!(unique.len(), all.len(), "mutator threads produced overlapping addresses");

    for addr in all {
        assert_eq!(heap.get_page(addr).unwrap().generation(), Generation::Young);
    }
}

/// Allocation exactly filling a page produces a new page on the next
/// request.
#[test]
fn page_exhaustion_grows_the_page_list() {
    let heap = new_heap();
    let before = heap.pages().len();
    let original = heap.current_young_page().unwrap().start();

    while heap.current_young_page().unwrap().start() == original {
        let _ = heap.allocate_young(zmanaged::object::BODY_SIZE);
    }

    assert_eq!(heap.pages().len(), before + 1);
}
