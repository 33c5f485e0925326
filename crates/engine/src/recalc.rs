//! Recalculation reporting.
//!
//! The engine does not log; it hands the caller a report and the caller
//! decides what to print.

/// Summary of one full recalculation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecalcReport {
    /// Number of cells whose value was computed during the pass.
    pub cells_recomputed: usize,

    /// Cells that evaluated to the invalid marker.
    pub invalid_cells: usize,

    /// True if any circular reference was cut during the pass.
    pub had_cycles: bool,

    /// Wall-clock time for the pass in milliseconds.
    pub duration_ms: u64,
}

impl RecalcReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concise one-line summary for status displays.
    pub fn summary(&self) -> String {
        format!(
            "{} cells in {}ms, invalid={}, cycles={}",
            self.cells_recomputed, self.duration_ms, self.invalid_cells, self.had_cycles
        )
    }

    /// One-line log entry.
    ///
    /// Format: `[recalc/full]   14ms  628 cells  invalid=3  cycles=0`
    pub fn log_line(&self) -> String {
        format!(
            "[recalc/full] {:>4}ms  {} cells  invalid={}  cycles={}",
            self.duration_ms,
            self.cells_recomputed,
            self.invalid_cells,
            if self.had_cycles { 1 } else { 0 }
        )
    }
}
