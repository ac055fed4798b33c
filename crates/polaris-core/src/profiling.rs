//! Profiling hooks backed by `puffin`.
//!
//! Chart elements wrap their draw passes in [`profile_function!`] and
//! [`profile_scope!`]. With the `profiling` feature disabled, both expand to
//! nothing and [`init_profiling`] only logs.

#[cfg(feature = "profiling")]
pub use puffin::{GlobalProfiler, profile_function, profile_scope};

#[cfg(feature = "profiling")]
use std::sync::OnceLock;

/// Address the puffin HTTP server binds to unless told otherwise.
pub const DEFAULT_PROFILER_ADDR: &str = "127.0.0.1:8585";

/// Where profiling data goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfilingBackend {
    /// Serve frames to `puffin_viewer` over HTTP.
    PuffinHttp { addr: String },
}

impl Default for ProfilingBackend {
    fn default() -> Self {
        Self::PuffinHttp {
            addr: DEFAULT_PROFILER_ADDR.to_string(),
        }
    }
}

#[cfg(feature = "profiling")]
static PROFILER_SERVER: OnceLock<puffin_http::Server> = OnceLock::new();

/// Start collecting scopes and serve them through `backend`.
///
/// Only the first successful call starts a server; later calls keep it.
#[cfg(feature = "profiling")]
pub fn init_profiling(backend: ProfilingBackend) {
    puffin::set_scopes_on(true);

    match backend {
        ProfilingBackend::PuffinHttp { addr } => {
            if PROFILER_SERVER.get().is_some() {
                tracing::debug!(%addr, "profiler server already running");
                return;
            }
            match puffin_http::Server::new(&addr) {
                Ok(server) => {
                    tracing::info!(%addr, "puffin profiler listening");
                    let _ = PROFILER_SERVER.set(server);
                }
                Err(err) => tracing::error!(%addr, %err, "failed to start puffin server"),
            }
        }
    }
}

#[cfg(not(feature = "profiling"))]
pub fn init_profiling(backend: ProfilingBackend) {
    tracing::debug!(?backend, "profiling feature disabled, ignoring backend");
}

/// Close the current profiler frame. Benchmarks and hosts call this once per
/// redraw.
#[inline]
pub fn new_frame() {
    #[cfg(feature = "profiling")]
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profiling"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __polaris_profile_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "profiling"))]
pub use crate::__polaris_profile_noop as profile_function;
#[cfg(not(feature = "profiling"))]
pub use crate::__polaris_profile_noop as profile_scope;
