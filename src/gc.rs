//! Collector
//!
//! Orchestrates the full and minor GC cycles (color flip, bitmap reset,
//! mark, relocate) and owns the optional background collector thread.

use crate::barrier::colored_ptr::{flip_good_color, ColoredPointer};
use crate::config::GcConfig;
use crate::error::Result;
use crate::heap::page::Generation;
use crate::heap::Heap;
use crate::logging::{log_event, GcEvent};
use crate::marker::{MarkStack, RememberedSet};
use crate::object::{Handle, BODY_SIZE, SLOTS};
use crate::stats::GcStats;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Which cycle kind is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    Full,
    Minor,
}

/// Orchestrates mark/relocate cycles and the background collector thread.
pub struct Collector {
    heap: Arc<Heap>,
    mark_stack: MarkStack,
    roots: Mutex<Vec<Arc<Handle>>>,
    stats: GcStats,
    cycle_count: AtomicU64,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
    background_interval: Duration,
    stats_enabled: bool,
    verbose: bool,
}

impl Collector {
    /// Build a collector with default background-cycle timing and stats
    /// collection enabled. Convenience wrapper around
    /// [`Collector::with_config`] for call sites that don't need the rest
    /// of [`GcConfig`].
    pub fn new(heap: Arc<Heap>) -> Self {
        Self::with_config(heap, &GcConfig::default())
    }

    /// Build a collector, taking `background_interval_ms` and
    /// `stats_enabled` from `config`.
    pub fn with_config(heap: Arc<Heap>, config: &GcConfig) -> Self {
        Self {
            heap,
            mark_stack: MarkStack::new(),
            roots: Mutex::new(Vec::new()),
            stats: GcStats::new(),
            cycle_count: AtomicU64::new(0),
            running: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
            background_interval: Duration::from_millis(config.background_interval_ms),
            stats_enabled: config.stats_enabled,
            verbose: config.verbose,
        }
    }

    /// Log a phase-transition event, gated on `config.verbose` -- cycle
    /// start/end is always logged, but per-phase detail is opt-in.
    fn log_phase(&self, event: GcEvent) {
        if self.verbose {
            log_event(event);
        }
    }

    pub fn heap(&self) -> &Arc<Heap> {
        &self.heap
    }

    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// Register `handle` as a cycle root; its body is pushed onto the mark
    /// stack at the start of every subsequent mark phase.
    pub fn add_root(&self, handle: Arc<Handle>) {
        self.roots.lock().push(handle);
    }

    fn seed_roots(&self) {
        let roots = self.roots.lock();
        for handle in roots.iter() {
            self.mark_stack.push(handle.raw_body_address());
        }
    }

    fn drain_remembered_set(&self, remembered_set: &RememberedSet) {
        for addr in remembered_set.drain() {
            self.mark_stack.push(addr);
        }
    }

    /// Drain the mark stack, marking bodies and following live references.
    fn mark(&self) -> u64 {
        let mut marked = 0u64;
        while let Some(addr) = self.mark_stack.pop() {
            let Some(page) = self.heap.get_page(addr) else {
                continue;
            };
            if page.is_marked(addr) {
                continue;
            }
            page.mark(addr);
            marked += 1;

            for slot in 0..SLOTS {
                let child = page.read_word(addr + slot * 8);
                if child == 0 {
                    continue;
                }
                let child_ptr = ColoredPointer::from_raw(child);
                let child_addr = child_ptr.address();
                let Some(child_page) = self.heap.get_page(child_addr) else {
                    continue;
                };

                if child_page.is_evacuating() {
                    if let Some(new_addr) = child_page.resolve_forwarding(child_addr) {
                        let good_color = self.heap.good_color.load(Ordering::Acquire);
                        page.write_word(addr + slot * 8, new_addr | good_color);
                        self.mark_stack.push(new_addr);
                        continue;
                    }
                }
                self.mark_stack.push(child_addr);
            }
        }
        marked
    }

    /// Evacuate live bodies out of every page except the current Young
    /// allocation page (further restricted to Young pages for a minor
    /// cycle), promoting all survivors to Old.
    fn relocate(&self, kind: CycleKind) -> u64 {
        let current_young = self.heap.current_young_page().map(|p| p.start());
        let mut bytes_relocated = 0u64;

        // Snapshot the page list before evacuating: Old allocation prepends
        // new pages, so relocation must not chase pages created during this
        // same pass (see heap::allocate_old).
        for page in self.heap.pages() {
            if Some(page.start()) == current_young {
                continue;
            }
            if kind == CycleKind::Minor && page.generation() != Generation::Young {
                continue;
            }

            page.start_evacuation();
            for addr in page.marked_object_addresses() {
                let Ok(new_ptr) = self.heap.allocate_old(BODY_SIZE) else {
                    log_event(GcEvent::AllocationFailure { size: BODY_SIZE });
                    continue;
                };
                let new_addr = new_ptr.address();
                let Some(dest_page) = self.heap.get_page(new_addr) else {
                    continue;
                };
                page.copy_body_to(addr, &dest_page, new_addr, BODY_SIZE);
                page.add_forwarding(addr, new_addr);
                // Carry the live bit forward so `is_marked` stays accurate
                // for the rest of this cycle even though the object now
                // lives on a page whose bitmap was reset independently.
                dest_page.mark(new_addr);
                bytes_relocated += BODY_SIZE as u64;
            }
        }
        bytes_relocated
    }

    fn run(&self, kind: CycleKind) -> Result<()> {
        let start = Instant::now();
        let cycle = self.cycle_count.fetch_add(1, Ordering::Relaxed) + 1;
        log_event(GcEvent::CycleStart {
            kind: if kind == CycleKind::Full { "full" } else { "minor" },
            cycle,
        });

        flip_good_color(&self.heap.good_color);

        self.log_phase(GcEvent::PhaseStart { phase: "bitmap-reset", cycle });
        let phase_start = Instant::now();
        for page in self.heap.pages() {
            page.clear_bitmap();
        }
        self.log_phase(GcEvent::PhaseEnd {
            phase: "bitmap-reset",
            cycle,
            duration_ms: phase_start.elapsed().as_secs_f64() * 1000.0,
        });

        self.log_phase(GcEvent::PhaseStart { phase: "mark", cycle });
        let phase_start = Instant::now();
        if kind == CycleKind::Minor {
            self.drain_remembered_set(&self.heap.remembered_set);
        }
        self.seed_roots();
        let marked = self.mark();
        self.log_phase(GcEvent::PhaseEnd {
            phase: "mark",
            cycle,
            duration_ms: phase_start.elapsed().as_secs_f64() * 1000.0,
        });

        self.log_phase(GcEvent::PhaseStart { phase: "relocate", cycle });
        let phase_start = Instant::now();
        let bytes_relocated = self.relocate(kind);
        self.log_phase(GcEvent::PhaseEnd {
            phase: "relocate",
            cycle,
            duration_ms: phase_start.elapsed().as_secs_f64() * 1000.0,
        });

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        if self.stats_enabled {
            self.stats.record_cycle(duration_ms as u64, bytes_relocated, marked);
        }
        log_event(GcEvent::CycleEnd {
            cycle,
            duration_ms,
            bytes_relocated,
            objects_marked: marked,
        });

        Ok(())
    }

    /// Run one full cycle synchronously.
    pub fn gc(&self) -> Result<()> {
        self.run(CycleKind::Full)
    }

    /// Run one minor cycle synchronously.
    pub fn minor_gc(&self) -> Result<()> {
        self.run(CycleKind::Minor)
    }

    /// Start the background collector thread. Idempotent.
    pub fn start_gc(self: &Arc<Self>) {
        let mut thread = self.thread.lock();
        if thread.is_some() {
            return;
        }
        self.running.store(true, Ordering::Release);

        let collector = Arc::clone(self);
        let running = Arc::clone(&self.running);
        *thread = Some(std::thread::spawn(move || {
            log_event(GcEvent::BackgroundThreadStarted);
            while running.load(Ordering::Acquire) {
                let _ = collector.gc();
                std::thread::sleep(collector.background_interval);
            }
            log_event(GcEvent::BackgroundThreadStopped);
        }));
    }

    /// Stop the background collector thread, blocking until it exits.
    pub fn stop_gc(&self) {
        self.running.store(false, Ordering::Release);
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}
