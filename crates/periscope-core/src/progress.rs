/// Hooks for reporting progress of the bulk phases.
///
/// The CLI implements this with indicatif; engines call it but never depend
/// on rendering. Progress is cosmetic and never gates work. All methods
/// have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_search_start(&self) {}
    fn on_search_progress(&self, _files_found: usize) {}
    fn on_search_complete(&self, _total_files: usize) {}
    fn on_analyze_start(&self, _total_files: usize) {}
    fn on_analyze_progress(&self, _files_done: usize) {}
    fn on_analyze_complete(&self) {}
    fn on_refresh_start(&self, _total_files: usize) {}
    fn on_refresh_progress(&self, _files_done: usize) {}
    fn on_refresh_complete(&self) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
