//! Page (Region) Management
//!
//! A page is a 2 MiB aligned, anonymously-mapped region of heap memory with
//! its header embedded at the start. Allocation within a page is a simple
//! bump pointer; liveness is tracked with a one-bit-per-8-byte-granule
//! bitmap, and evacuation leaves behind a forwarding table mapping old
//! offsets to new absolute addresses.

use crate::error::{GcError, Result};
use memmap2::{MmapMut, MmapOptions};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Default page size: 2 MiB, matching the colored pointer's address mask.
/// [`GcConfig::page_size`](crate::GcConfig::page_size) may override this at
/// heap construction time; pages then carry their own `page_size`.
pub const PAGE_SIZE: usize = 2 * 1024 * 1024;

const ALIGN: usize = 8;

/// Generation a page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    Young,
    Old,
}

struct ForwardingEntry {
    from_offset: usize,
    to_addr: usize,
}

/// A 2 MiB heap region: bump allocator, mark bitmap, and forwarding table.
///
/// The backing anonymous mapping is held for the page's lifetime; per this
/// spec pages are never unmapped.
pub struct Page {
    // Kept only to own the mapping for the page's lifetime; all reads and
    // writes into the mapped bytes go through raw pointers derived from
    // `start`/`end`, synchronized by the bump pointer, mark bitmap lock,
    // and forwarding table lock below -- never through this field directly.
    _mapping: MmapMut,
    start: usize,
    top: AtomicUsize,
    end: usize,
    mark_bitmap: Mutex<Vec<u8>>,
    live_bytes: AtomicUsize,
    is_evacuating: AtomicBool,
    forwarding: Mutex<Vec<ForwardingEntry>>,
    generation: Generation,
    numa_node: usize,
    pub next: Mutex<Option<Arc<Page>>>,
}

impl Page {
    /// Reserve `2 * page_size` of anonymous memory, align the usable region
    /// up to `page_size`, and embed the header at its start. `top` begins
    /// just past the header, rounded up to 8 bytes.
    ///
    /// Huge pages are tried first when the platform supports them, falling
    /// back to a normal anonymous mapping on failure.
    pub fn create(generation: Generation, page_size: usize) -> Result<Self> {
        let os_page_size = page_size::get();
        if !page_size.is_multiple_of(os_page_size) {
            return Err(GcError::HeapInitialization(format!(
                "page size {} is not a multiple of the OS page size {}",
                page_size, os_page_size
            )));
        }

        let mapping_len = 2 * page_size;
        let mapping = Self::map_huge(mapping_len)
            .or_else(|| MmapOptions::new().len(mapping_len).map_anon().ok())
            .ok_or_else(|| {
                GcError::HeapInitialization("failed to map page".to_string())
            })?;

        let raw = mapping.as_ptr() as usize;
        let aligned_start = (raw + page_size - 1) & !(page_size - 1);
        let end = aligned_start + page_size;

        // Reserve a small header region at the start of the usable page so
        // object addresses never collide with page bookkeeping living
        // alongside the mapping (the header itself lives in this struct,
        // not in the mapped bytes, but we keep the first ALIGN bytes
        // unused for symmetry with the source layout).
        let top = (aligned_start + ALIGN - 1) & !(ALIGN - 1);

        Ok(Self {
            _mapping: mapping,
            start: aligned_start,
            top: AtomicUsize::new(top),
            end,
            mark_bitmap: Mutex::new(vec![0u8; page_size / 8 / 8]),
            live_bytes: AtomicUsize::new(0),
            is_evacuating: AtomicBool::new(false),
            forwarding: Mutex::new(Vec::with_capacity(128)),
            generation,
            numa_node: 0,
            next: Mutex::new(None),
        })
    }

    /// Try a huge-page-backed anonymous mapping. `None` means the platform
    /// doesn't support it or the attempt failed; the caller falls back to a
    /// normal mapping.
    fn map_huge(len: usize) -> Option<MmapMut> {
        // 2 MiB huge pages are `1 << 21`; matches the common Linux default
        // hugepage size used by transparent/explicit hugetlbfs mappings.
        MmapOptions::new().len(len).huge(Some(21)).map_anon().ok()
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn top(&self) -> usize {
        self.top.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn numa_node(&self) -> usize {
        self.numa_node
    }

    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.top())
    }

    /// Bump-allocate `size` bytes (already rounded to `ALIGN`) from this
    /// page. Returns the start address, or `None` if it does not fit.
    pub fn bump_alloc(&self, size: usize) -> Option<usize> {
        loop {
            let current = self.top.load(Ordering::Acquire);
            let aligned = (current + ALIGN - 1) & !(ALIGN - 1);
            let next = aligned.checked_add(size)?;
            if next > self.end {
                return None;
            }
            if self
                .top
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(aligned);
            }
        }
    }

    /// Read the 8-byte word at `addr`. `addr` must lie within `[start, end)`
    /// and be 8-byte aligned.
    pub fn read_word(&self, addr: usize) -> usize {
        debug_assert!(addr >= self.start && addr + 8 <= self.end);
        debug_assert_eq!(addr % 8, 0);
        unsafe { (addr as *const usize).read() }
    }

    /// Write the 8-byte word at `addr`. `addr` must lie within `[start, end)`
    /// and be 8-byte aligned.
    pub fn write_word(&self, addr: usize, value: usize) {
        debug_assert!(addr >= self.start && addr + 8 <= self.end);
        debug_assert_eq!(addr % 8, 0);
        unsafe { (addr as *mut usize).write(value) };
    }

    /// Copy `len` bytes (a whole number of words) from `from` in this page
    /// to `to` in another page. Used by relocation to evacuate a body.
    pub fn copy_body_to(&self, from: usize, dest: &Page, to: usize, len: usize) {
        debug_assert_eq!(len % 8, 0);
        let words = len / 8;
        for i in 0..words {
            let word = self.read_word(from + i * 8);
            dest.write_word(to + i * 8, word);
        }
    }

    fn bit_index(&self, addr: usize) -> usize {
        (addr - self.start) / 8
    }

    /// Set the mark bit for the granule at `addr`. Idempotent.
    pub fn mark(&self, addr: usize) {
        let bit = self.bit_index(addr);
        let mut bitmap = self.mark_bitmap.lock();
        bitmap[bit / 8] |= 1 << (bit % 8);
    }

    pub fn is_marked(&self, addr: usize) -> bool {
        let bit = self.bit_index(addr);
        let bitmap = self.mark_bitmap.lock();
        bitmap[bit / 8] & (1 << (bit % 8)) != 0
    }

    /// Zero the bitmap and reset advisory live-byte count.
    pub fn clear_bitmap(&self) {
        let mut bitmap = self.mark_bitmap.lock();
        bitmap.iter_mut().for_each(|b| *b = 0);
        self.live_bytes.store(0, Ordering::Relaxed);
    }

    pub fn is_evacuating(&self) -> bool {
        self.is_evacuating.load(Ordering::Acquire)
    }

    /// Begin evacuation: mark the page as evacuating and reset its
    /// forwarding table.
    pub fn start_evacuation(&self) {
        self.is_evacuating.store(true, Ordering::Release);
        let mut forwarding = self.forwarding.lock();
        forwarding.clear();
        forwarding.reserve(128);
    }

    /// Record that the object previously at `from` now lives at `to`.
    /// Precondition: `is_evacuating()`.
    pub fn add_forwarding(&self, from: usize, to: usize) {
        debug_assert!(self.is_evacuating());
        let mut forwarding = self.forwarding.lock();
        forwarding.push(ForwardingEntry {
            from_offset: from - self.start,
            to_addr: to,
        });
    }

    /// Resolve the forwarded address for `from`, if evacuated already.
    /// Precondition: `is_evacuating()`.
    pub fn resolve_forwarding(&self, from: usize) -> Option<usize> {
        let offset = from.checked_sub(self.start)?;
        let forwarding = self.forwarding.lock();
        forwarding
            .iter()
            .find(|e| e.from_offset == offset)
            .map(|e| e.to_addr)
    }

    /// Iterate the live (marked) object start addresses currently in
    /// `[obj_start, top)`, where `obj_start` is the first granule past the
    /// embedded header.
    pub fn marked_object_addresses(&self) -> Vec<usize> {
        let top = self.top();
        let mut addrs = Vec::new();
        let mut addr = self.start;
        while addr < top {
            if self.is_marked(addr) {
                addrs.push(addr);
            }
            addr += 8;
        }
        addrs
    }
}

// SAFETY: the mapped bytes are only ever touched through raw pointers
// derived from `start`/`end`, and every write location is exclusively
// owned by whichever bump-pointer allocation or relocation copy produced
// it; concurrent structural state (bitmap, forwarding table) is behind its
// own mutex.
unsafe impl Sync for Page {}
