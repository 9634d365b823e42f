//! Heap / Allocator
//!
//! Owns the singly-linked list of all pages plus two "current allocation
//! page" cursors (one Young, one Old), the thread-local allocation buffers
//! mutators bump into, and the remembered set used by the write barrier.

pub mod page;

pub use page::{Generation, Page, PAGE_SIZE};

use crate::barrier::colored_ptr::{load_good_color, ColoredPointer};
use crate::config::GcConfig;
use crate::error::{GcError, Result};
use crate::marker::remembered_set::RememberedSet;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::cell::Cell;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

/// Thread-local allocation buffer: a bump range carved from a Young page.
struct Tlab {
    top: Cell<usize>,
    end: Cell<usize>,
}

thread_local! {
    static TLAB: Tlab = const {
        Tlab {
            top: Cell::new(0),
            end: Cell::new(0),
        }
    };
}

/// The managed heap: page list, generational allocation cursors, TLABs,
/// and the remembered set feeding the write barrier.
pub struct Heap {
    head: Mutex<Option<Arc<Page>>>,
    current_young: Mutex<Option<Arc<Page>>>,
    current_old: Mutex<Option<Arc<Page>>>,
    pub good_color: AtomicUsize,
    pub remembered_set: RememberedSet,
    tlab_size: usize,
    page_size: usize,
    /// Page base address -> page, so `get_page` is O(1) instead of a list
    /// walk, matching the header-embedded-at-aligned-base contract.
    page_index: Mutex<IndexMap<usize, Arc<Page>>>,
}

impl Heap {
    /// Create a heap with the default page size and the given TLAB size.
    /// Convenience wrapper around [`Heap::with_config`] for call sites that
    /// don't need the rest of [`GcConfig`].
    pub fn new(tlab_size: usize) -> Result<Self> {
        Self::with_config(&GcConfig {
            tlab_size,
            ..GcConfig::default()
        })
    }

    /// Idempotently create the first Young page, sized per `config`.
    pub fn with_config(config: &GcConfig) -> Result<Self> {
        let first = Arc::new(Page::create(Generation::Young, config.page_size)?);
        let mut page_index = IndexMap::new();
        page_index.insert(first.start(), first.clone());

        Ok(Self {
            head: Mutex::new(Some(first.clone())),
            current_young: Mutex::new(Some(first)),
            current_old: Mutex::new(None),
            good_color: AtomicUsize::new(crate::barrier::colored_ptr::MARKED0_MASK),
            remembered_set: RememberedSet::new(),
            tlab_size: config.tlab_size,
            page_size: config.page_size,
            page_index: Mutex::new(page_index),
        })
    }

    fn good_color(&self) -> usize {
        load_good_color(&self.good_color)
    }

    /// Prepend `page` to the page list. Used for Old pages: relocation may
    /// allocate into an Old page created during the same pass, which is why
    /// the relocate phase snapshots `pages()` at phase entry rather than
    /// re-reading the list live.
    fn prepend_page(&self, page: Arc<Page>) {
        self.page_index.lock().insert(page.start(), page.clone());

        let mut head = self.head.lock();
        *page.next.lock() = head.take();
        *head = Some(page);
    }

    /// Append `page` to the tail of the page list. Used for Young pages:
    /// `refill_tlab` walks off the current page's own `next` link, so a
    /// fresh page always lands after whatever the mutator was last bumping.
    fn append_page(&self, after: &Page, page: Arc<Page>) {
        self.page_index.lock().insert(page.start(), page.clone());
        *after.next.lock() = Some(page);
    }

    /// Every page in the heap, head first, as a snapshot `Vec`.
    pub fn pages(&self) -> Vec<Arc<Page>> {
        let mut out = Vec::new();
        let mut cursor = self.head.lock().clone();
        while let Some(page) = cursor {
            let next = page.next.lock().clone();
            out.push(page);
            cursor = next;
        }
        out
    }

    /// The Young page mutators are currently bumping into; the collector
    /// skips this page during relocation.
    pub fn current_young_page(&self) -> Option<Arc<Page>> {
        self.current_young.lock().clone()
    }

    /// Mask to a raw address and look up the owning page by aligned base.
    /// Constant-time: page headers are embedded at their aligned start, so
    /// no side table is needed.
    pub fn get_page(&self, address: usize) -> Option<Arc<Page>> {
        let raw = address & crate::barrier::colored_ptr::ADDRESS_MASK;
        let page_base = raw & !(self.page_size - 1);
        self.page_index.lock().get(&page_base).cloned()
    }

    /// Allocate `size` bytes in the Young generation via the TLAB fast
    /// path, refilling the TLAB from the heap lock on miss.
    pub fn allocate_young(&self, size: usize) -> Result<ColoredPointer> {
        let size = round_up8(size);

        if let Some(addr) = TLAB.with(|t| bump_tlab(t, size)) {
            return Ok(ColoredPointer::new(addr).with_color_value(self.good_color()));
        }

        self.refill_tlab(size)?;

        let addr = TLAB
            .with(|t| bump_tlab(t, size))
            .ok_or_else(|| GcError::Internal("TLAB refill did not yield room".to_string()))?;
        Ok(ColoredPointer::new(addr).with_color_value(self.good_color()))
    }

    fn refill_tlab(&self, size: usize) -> Result<()> {
        let carve = size.max(self.tlab_size);
        let mut current = self.current_young.lock();

        loop {
            if let Some(page) = current.as_ref() {
                if let Some(start) = page.bump_alloc(carve) {
                    TLAB.with(|t| {
                        t.top.set(start);
                        t.end.set(start + carve);
                    });
                    return Ok(());
                }
            }

            let fresh = Arc::new(Page::create(Generation::Young, self.page_size)?);
            // Young pages are appended after the page mutators were last
            // bumping into, not prepended (see SPEC_FULL.md §9).
            match current.as_ref() {
                Some(page) => self.append_page(page, fresh.clone()),
                None => self.prepend_page(fresh.clone()),
            }
            *current = Some(fresh);
        }
    }

    /// Allocate `size` bytes directly in the Old generation, bypassing the
    /// TLAB. Used by the collector during relocation.
    pub fn allocate_old(&self, size: usize) -> Result<ColoredPointer> {
        let size = round_up8(size);
        let mut current = self.current_old.lock();

        loop {
            if let Some(page) = current.as_ref() {
                if let Some(start) = page.bump_alloc(size) {
                    return Ok(ColoredPointer::new(start).with_color_value(self.good_color()));
                }
            }

            let fresh = Arc::new(Page::create(Generation::Old, self.page_size)?);
            // Old pages are prepended to the page list (see SPEC_FULL.md §9).
            self.prepend_page(fresh.clone());
            *current = Some(fresh);
        }
    }

    /// Write barrier: if `source` lives in an Old page and `value`'s body
    /// lives in a Young page, log `source` into the remembered set.
    pub fn write_barrier(&self, source_body: usize, value_body: Option<usize>) {
        let Some(value_body) = value_body else {
            return;
        };

        let source_page = self.get_page(source_body);
        let value_page = self.get_page(value_body);

        if let (Some(sp), Some(vp)) = (source_page, value_page) {
            if sp.generation() == Generation::Old && vp.generation() == Generation::Young {
                self.remembered_set.add(source_body);
            }
        }
    }
}

fn bump_tlab(tlab: &Tlab, size: usize) -> Option<usize> {
    let top = tlab.top.get();
    let aligned = (top + 7) & !7;
    let next = aligned.checked_add(size)?;
    if next > tlab.end.get() {
        return None;
    }
    tlab.top.set(next);
    Some(aligned)
}

fn round_up8(size: usize) -> usize {
    (size.max(1) + 7) & !7
}

/// Extension used internally to attach the current good color without
/// re-threading it through every call site of `ColoredPointer::new`.
trait WithColorValue {
    fn with_color_value(self, color_bits: usize) -> ColoredPointer;
}

impl WithColorValue for ColoredPointer {
    fn with_color_value(self, color_bits: usize) -> ColoredPointer {
        ColoredPointer::from_raw(self.address() | color_bits)
    }
}
