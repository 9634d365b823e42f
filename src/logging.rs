//! GC Logging
//!
//! Structured log events emitted at cycle/phase boundaries, routed through
//! the `log` facade so the host chooses the sink (tests install nothing and
//! get silence; a binary installs `env_logger`).

/// Install `env_logger` as the default `log` sink, honoring `RUST_LOG`.
/// Safe to call more than once; only the first call takes effect.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// A GC lifecycle event, logged at the level matching its operational
/// significance (cycle boundaries at info, phases at debug, per-phase
/// counts at trace).
#[derive(Debug, Clone)]
pub enum GcEvent {
    CycleStart { kind: &'static str, cycle: u64 },
    PhaseStart { phase: &'static str, cycle: u64 },
    PhaseEnd { phase: &'static str, cycle: u64, duration_ms: f64 },
    CycleEnd { cycle: u64, duration_ms: f64, bytes_relocated: u64, objects_marked: u64 },
    AllocationFailure { size: usize },
    BackgroundThreadStarted,
    BackgroundThreadStopped,
}

pub fn log_event(event: GcEvent) {
    match event {
        GcEvent::CycleStart { kind, cycle } => {
            log::info!("gc cycle {} started ({})", cycle, kind);
        }
        GcEvent::PhaseStart { phase, cycle } => {
            log::debug!("gc cycle {}: {} phase started", cycle, phase);
        }
        GcEvent::PhaseEnd { phase, cycle, duration_ms } => {
            log::debug!("gc cycle {}: {} phase completed ({:.2}ms)", cycle, phase, duration_ms);
        }
        GcEvent::CycleEnd { cycle, duration_ms, bytes_relocated, objects_marked } => {
            log::info!(
                "gc cycle {} completed ({:.2}ms, {} bytes relocated, {} objects marked)",
                cycle, duration_ms, bytes_relocated, objects_marked
            );
        }
        GcEvent::AllocationFailure { size } => {
            log::error!("allocation failure: {} bytes requested", size);
        }
        GcEvent::BackgroundThreadStarted => {
            log::info!("background gc thread started");
        }
        GcEvent::BackgroundThreadStopped => {
            log::info!("background gc thread stopped");
        }
    }
}
