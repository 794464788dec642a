use std::sync::atomic::{AtomicU64, Ordering};

/// Dispatch-time marker for one request on a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Generation(u64);

/// Monotonic request counter for one stream.
///
/// Each dispatch takes a new generation; a result may only be committed while
/// its generation is still the stream's current one.
#[derive(Debug, Default)]
pub struct StreamGeneration(AtomicU64);

impl StreamGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, superseding every earlier one.
    pub fn next(&self) -> Generation {
        Generation(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Supersedes in-flight requests without starting a new one.
    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.0.load(Ordering::SeqCst) == generation.0
    }
}
