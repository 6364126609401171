//! Error accounting and runtime-leveled logging
//!
//! Several pipeline stages log at a severity picked by the caller rather
//! than hardcoded at the call site. [`log_at`] bridges that to `tracing`'s
//! static event macros. [`ErrorTally`] is a subscriber layer that counts
//! emitted errors so a driver can exit nonzero after a run that soft-failed
//! part way through instead of aborting mid-document.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Emit `message` at a level chosen at runtime.
pub fn log_at(level: Level, message: &str) {
    match level {
        Level::ERROR => tracing::error!("{message}"),
        Level::WARN => tracing::warn!("{message}"),
        Level::INFO => tracing::info!("{message}"),
        Level::DEBUG => tracing::debug!("{message}"),
        Level::TRACE => tracing::trace!("{message}"),
    }
}

/// Counts ERROR-level events passing through the subscriber.
#[derive(Debug, Clone, Default)]
pub struct ErrorTally {
    errors: Arc<AtomicUsize>,
}

impl ErrorTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn errored(&self) -> bool {
        self.error_count() > 0
    }
}

impl<S: Subscriber> Layer<S> for ErrorTally {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}
