/// Trait for reporting identification progress.
///
/// The CLI implements it with indicatif progress bars. All methods have
/// default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_hash_start(&self, _total_files: usize) {}
    fn on_file_hashed(&self, _path: &str) {}
    fn on_hash_complete(&self, _identified: usize, _duration_secs: f64) {}
    fn on_plan_complete(&self, _planned_renames: usize, _conflicts: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
