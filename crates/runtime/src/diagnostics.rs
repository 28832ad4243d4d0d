//! Runtime diagnostics for production debugging
//!
//! Provides a SIGQUIT (kill -3) handler that dumps heap statistics to
//! stderr, similar to JVM thread dumps. Useful for inspecting a running
//! interpreter without stopping it.
//!
//! ## Usage
//!
//! Send SIGQUIT to a running Tern process:
//! ```bash
//! kill -3 <pid>
//! ```
//!
//! The process dumps its heap summary to stderr and continues running.

use crate::memory_stats;
use std::sync::Once;

static SIGNAL_HANDLER_INIT: Once = Once::new();

/// Install the SIGQUIT signal handler for diagnostics.
///
/// Hosts call this once at startup; safe to call again (idempotent). On
/// non-Unix platforms, or without the `diagnostics` feature, this is a
/// no-op and `dump_diagnostics` can still be called directly.
pub fn install_signal_handler() {
    SIGNAL_HANDLER_INIT.call_once(|| {
        #[cfg(all(unix, feature = "diagnostics"))]
        unsafe {
            let _ = signal_hook::low_level::register(signal_hook::consts::SIGQUIT, || {
                dump_diagnostics();
            });
        }
    });
}

/// Dump heap statistics to stderr.
///
/// Reads only the global atomic counters, so it is safe from the signal
/// handler thread while the interpreter is mid-instruction.
pub fn dump_diagnostics() {
    use std::io::Write;

    let stats = memory_stats::snapshot();
    let mut out = std::io::stderr().lock();

    let _ = writeln!(out, "\n=== Tern Runtime Diagnostics ===");
    let _ = writeln!(out, "\n[Heap]");
    let _ = writeln!(out, "  Live objects:     {}", stats.live_objects);
    let _ = writeln!(
        out,
        "  Live bytes:       {} (peak {})",
        stats.live_bytes, stats.peak_bytes
    );
    let _ = writeln!(out, "  Interned strings: {}", stats.interned_strings);
    let _ = writeln!(out, "  Allocations:      {}", stats.total_allocations);
    let _ = writeln!(out, "\n=== End Diagnostics ===\n");
}
