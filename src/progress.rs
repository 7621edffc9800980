// src/progress.rs
/// Progress reporting for long-running operations (snapshot, month runs).
/// Frontends implement this to surface status to users.
pub trait Progress {
    /// Called at the start with the total number of items (if known).
    fn begin(&mut self, _total: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// One station finished.
    fn item_done(&mut self, _code: &str, _rows: usize) {}

    /// One station failed; the run carries on.
    fn item_failed(&mut self, _code: &str, _error: &str) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}
