//! Shared instrumentation helpers.

use std::time::Instant;

/// Timer for measuring and logging the elapsed time of a labelled operation.
pub(crate) struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    pub(crate) fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        tracing::debug!("[{label}] starting");
        Self {
            start: Instant::now(),
            label,
        }
    }

    pub(crate) fn finish(self) {
        let elapsed = self.start.elapsed();
        tracing::debug!(
            "[{}] completed in {}ms ({:.2}s)",
            self.label,
            elapsed.as_millis(),
            elapsed.as_secs_f64()
        );
    }
}
