//! A ZGC-style concurrent, generational, region-based, relocating garbage
//! collector for a managed heap of fixed-shape objects.
//!
//! Colored pointers carry barrier state in their high address bits; a load
//! barrier heals stale references lazily on use; 2 MiB pages hold a bump
//! allocator, mark bitmap, and forwarding table; thread-local allocation
//! buffers give mutators a lock-free fast path; a background collector
//! thread performs concurrent mark-and-relocate cycles.

pub mod barrier;
pub mod config;
pub mod error;
pub mod gc;
pub mod heap;
pub mod logging;
pub mod marker;
pub mod object;
pub mod stats;

pub use config::GcConfig;
pub use error::{GcError, Result};
pub use gc::Collector;
pub use heap::Heap;
pub use object::Handle;

use std::sync::Arc;

/// Construct a heap and collector using default configuration.
pub fn init() -> Result<(Arc<Heap>, Arc<Collector>)> {
    init_with_config(GcConfig::default())
}

/// Construct a heap and collector from an explicit configuration.
pub fn init_with_config(config: GcConfig) -> Result<(Arc<Heap>, Arc<Collector>)> {
    config
        .validate()
        .map_err(|e| GcError::Configuration(e.to_string()))?;
    let heap = Arc::new(Heap::with_config(&config)?);
    let collector = Arc::new(Collector::with_config(heap.clone(), &config));
    Ok((heap, collector))
}
