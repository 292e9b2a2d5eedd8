//! Metrics collection for archival runs

/// Counters collected across archival runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineMetrics {
    /// Runs that ended in `Done`
    pub runs_completed: usize,

    /// Runs that ended in `Failed`
    pub runs_failed: usize,

    /// Triggers skipped because another run owned the channel
    pub runs_contended: usize,

    /// Messages archived and unpinned
    pub messages_archived: usize,

    /// Guild sweeps performed
    pub sweep_count: usize,
}

impl EngineMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a run that drained successfully
    pub fn record_completed(&mut self, archived: usize) {
        self.runs_completed += 1;
        self.messages_archived += archived;
    }

    /// Record a failed run; messages archived before the failure still count
    pub fn record_failed(&mut self, archived: usize) {
        self.runs_failed += 1;
        self.messages_archived += archived;
    }

    /// Record a trigger that found its channel locked
    pub fn record_contended(&mut self) {
        self.runs_contended += 1;
    }

    /// Record a guild sweep
    pub fn record_sweep(&mut self) {
        self.sweep_count += 1;
    }

    /// Total runs that did work
    pub fn total_runs(&self) -> usize {
        self.runs_completed + self.runs_failed
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let lines = [
            "Pinkeeper Metrics Summary".to_string(),
            "=========================".to_string(),
            format!("Runs completed: {}", self.runs_completed),
            format!("Runs failed: {}", self.runs_failed),
            format!("Runs skipped (channel busy): {}", self.runs_contended),
            format!("Messages archived: {}", self.messages_archived),
            format!("Guild sweeps: {}", self.sweep_count),
        ];
        lines.join("\n")
    }
}
