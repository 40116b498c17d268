//! Cooperative cancellation for the pipeline
//!
//! A single [`CancelToken`] is created at startup and handed (by reference)
//! to every component that talks to the outside world. Components check it
//! before each external call -- an http request, a docker invocation, an
//! upload -- and bail with [`CpythonDistError::Interrupted`] if it tripped.
//! Nothing is ever rolled back; a canceled step just propagates its error
//! like any other failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::{CpythonDistError, Result};

/// Exit code used when a second interrupt forces immediate termination
pub const FORCED_EXIT_CODE: i32 = 130;

/// A cheaply-clonable flag that flips exactly once, from "keep going" to "stop"
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token in the "keep going" state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation (idempotent)
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Has cancellation been requested?
    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Bail with [`CpythonDistError::Interrupted`] if cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_canceled() {
            Err(CpythonDistError::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// Watch for interrupt/termination signals for the life of the process.
///
/// The first signal trips the token and lets the pipeline abort cooperatively;
/// the second doesn't wait around and exits with [`FORCED_EXIT_CODE`].
#[cfg(unix)]
pub async fn watch_signals(cancel: CancelToken) {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut interrupt), Ok(mut terminate)) =
        (signal(SignalKind::interrupt()), signal(SignalKind::terminate()))
    else {
        tracing::warn!("couldn't install signal handlers, ctrl-c will be abrupt");
        return;
    };

    tokio::select! {
        _ = interrupt.recv() => (),
        _ = terminate.recv() => (),
    }
    cancel.cancel();
    eprintln!("interrupt received, aborting at the next step boundary (interrupt again to force exit)");

    tokio::select! {
        _ = interrupt.recv() => (),
        _ = terminate.recv() => (),
    }
    std::process::exit(FORCED_EXIT_CODE);
}

/// Watch for ctrl-c for the life of the process (non-unix fallback).
#[cfg(not(unix))]
pub async fn watch_signals(cancel: CancelToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("couldn't install signal handlers, ctrl-c will be abrupt");
        return;
    }
    cancel.cancel();
    eprintln!("interrupt received, aborting at the next step boundary (interrupt again to force exit)");
    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(FORCED_EXIT_CODE);
    }
}
