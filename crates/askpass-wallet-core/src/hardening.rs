//! Process hardening applied before any secret is handled.

use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticSink};

/// Set the core dump size limit to zero for this process.
///
/// A crash while a typed secret is in memory must not leave it on disk.
pub fn disable_core_dumps() -> std::io::Result<()> {
    let limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    // Safety: `limit` is a valid, initialised rlimit for the duration of the call.
    let result = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &limit) };

    if result == 0 {
        debug!("Core dumps disabled");
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// [`disable_core_dumps`], reporting a failure to `sink` instead of returning it.
pub fn harden_process(sink: &dyn DiagnosticSink) {
    if let Err(e) = disable_core_dumps() {
        sink.emit(Diagnostic::CoreDumpsEnabled {
            reason: e.to_string(),
        });
    }
}
