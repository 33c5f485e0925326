//! The grid: owns all cells, resolves cross-cell references during
//! evaluation, and carries the grid-level operations (recalculation,
//! sorting, clipboard shapes, search).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use rustc_hash::FxHashSet;

use crate::cell::Cell;
use crate::eval::{self, CellLookup};
use crate::recalc::RecalcReport;
use crate::value::Value;

pub const DEFAULT_ROWS: usize = 999;
pub const DEFAULT_COLS: usize = 26;

/// Evaluation depth ceiling. Reference chains deeper than this evaluate to
/// Invalid instead of exhausting the stack. The cap comfortably covers a
/// full-column running chain on the default grid.
const MAX_EVAL_DEPTH: usize = 1024;

/// Inclusive rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl CellRange {
    pub fn new(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        debug_assert!(top <= bottom && left <= right);
        CellRange { top, left, bottom, right }
    }

    /// Rectangle spanned by two corners, in any order.
    pub fn from_corners(a: (usize, usize), b: (usize, usize)) -> Self {
        CellRange {
            top: a.0.min(b.0),
            left: a.1.min(b.1),
            bottom: a.0.max(b.0),
            right: a.1.max(b.1),
        }
    }

    pub fn single(row: usize, col: usize) -> Self {
        CellRange { top: row, left: col, bottom: row, right: col }
    }

    pub fn rows(&self) -> usize {
        self.bottom - self.top + 1
    }

    pub fn cols(&self) -> usize {
        self.right - self.left + 1
    }
}

/// One sort criterion: a column offset within the sorted range plus
/// direction.
#[derive(Debug, Clone, Copy)]
pub struct SortKey {
    pub column: usize,
    pub ascending: bool,
}

/// Bookkeeping for one top-level evaluation: the cells currently on the
/// evaluation path (cuts circular references) and outcome flags.
#[derive(Default)]
struct EvalTrace {
    visiting: FxHashSet<(usize, usize)>,
    cycle_detected: bool,
}

/// Adapter the evaluator calls back into to resolve `A1`-style references.
struct SheetLookup<'a> {
    sheet: &'a Sheet,
    trace: &'a mut EvalTrace,
}

impl CellLookup for SheetLookup<'_> {
    fn lookup(&mut self, row: usize, col: usize) -> Option<Value> {
        self.sheet.resolve(row, col, self.trace)
    }
}

/// A fixed-size grid of formula cells.
///
/// The sheet is the sole owner of its cells. Populated slots live in a
/// sparse map; everything else is implicitly empty and reads as zero from
/// inside formulas.
#[derive(Debug)]
pub struct Sheet {
    cells: HashMap<(usize, usize), Cell>,
    rows: usize,
    cols: usize,
    auto_recalc: bool,
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}

impl Sheet {
    pub fn new() -> Self {
        Self::with_size(DEFAULT_ROWS, DEFAULT_COLS)
    }

    pub fn with_size(rows: usize, cols: usize) -> Self {
        debug_assert!(rows > 0 && cols > 0);
        Sheet {
            cells: HashMap::new(),
            rows,
            cols,
            auto_recalc: true,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn auto_recalc(&self) -> bool {
        self.auto_recalc
    }

    /// Toggle the edit-triggers-recalculation behavior. Turning it on
    /// invalidates everything so the next reads are fresh.
    pub fn set_auto_recalc(&mut self, on: bool) {
        self.auto_recalc = on;
        if on {
            self.mark_all_dirty();
        }
    }

    // =========================================================================
    // Cell access
    // =========================================================================

    /// Store formula text at a coordinate, creating the cell on first
    /// assignment. Empty text clears the slot. Writes outside the grid are
    /// dropped.
    pub fn set_formula(&mut self, row: usize, col: usize, text: &str) {
        self.put(row, col, text);
        self.touched();
    }

    /// The raw formula text at a coordinate; empty string for empty slots.
    pub fn formula(&self, row: usize, col: usize) -> String {
        self.cells
            .get(&(row, col))
            .map(|c| c.formula().to_string())
            .unwrap_or_default()
    }

    /// The evaluated value at a coordinate, or `None` for an empty slot.
    pub fn value(&self, row: usize, col: usize) -> Option<Value> {
        let mut trace = EvalTrace::default();
        self.resolve(row, col, &mut trace)
    }

    /// Display rendering: empty string for empty slots, the invalid
    /// placeholder for failed evaluations, natural form otherwise.
    pub fn display_text(&self, row: usize, col: usize) -> String {
        match self.value(row, col) {
            Some(v) => v.to_display(),
            None => String::new(),
        }
    }

    /// Direct access to a populated cell.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Evaluate formula text against the sheet without storing it.
    pub fn eval_formula(&self, text: &str) -> Value {
        let mut trace = EvalTrace::default();
        let mut lookup = SheetLookup { sheet: self, trace: &mut trace };
        eval::evaluate_formula(text, &mut lookup)
    }

    /// All populated cells as `(row, col, formula)` in row-major order.
    pub fn non_empty(&self) -> Vec<(usize, usize, String)> {
        let mut out: Vec<_> = self
            .cells
            .iter()
            .map(|(&(row, col), cell)| (row, col, cell.formula().to_string()))
            .collect();
        out.sort_unstable_by_key(|&(row, col, _)| (row, col));
        out
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    /// Invalidate every cached value; recomputation happens lazily on the
    /// next read of each cell.
    pub fn mark_all_dirty(&mut self) {
        for cell in self.cells.values() {
            cell.mark_dirty();
        }
    }

    /// Invalidate and eagerly recompute every cell.
    pub fn recalculate(&mut self) -> RecalcReport {
        let start = Instant::now();
        self.mark_all_dirty();

        let mut report = RecalcReport::new();
        for (row, col, _) in self.non_empty() {
            let mut trace = EvalTrace::default();
            if let Some(value) = self.resolve(row, col, &mut trace) {
                report.cells_recomputed += 1;
                if value.is_invalid() {
                    report.invalid_cells += 1;
                }
            }
            if trace.cycle_detected {
                report.had_cycles = true;
            }
        }
        report.duration_ms = start.elapsed().as_millis() as u64;
        report
    }

    // =========================================================================
    // Range operations
    // =========================================================================

    /// Stable-sort the rows of `range` by formula text on the given keys.
    ///
    /// Key columns are offsets into the range; out-of-range keys are
    /// skipped. Comparison is over the raw formula strings, not evaluated
    /// values.
    pub fn sort_range(&mut self, range: CellRange, keys: &[SortKey]) {
        let mut rows: Vec<Vec<String>> = (range.top..=range.bottom)
            .map(|row| {
                (range.left..=range.right)
                    .map(|col| self.formula(row, col))
                    .collect()
            })
            .collect();

        rows.sort_by(|a, b| compare_rows(a, b, keys));

        for (i, row_data) in rows.iter().enumerate() {
            for (j, text) in row_data.iter().enumerate() {
                self.put(range.top + i, range.left + j, text);
            }
        }
        self.touched();
    }

    /// Formula texts of a range as tab-separated rows (the clipboard
    /// shape).
    pub fn copy_range(&self, range: CellRange) -> String {
        let mut out = String::new();
        for row in range.top..=range.bottom {
            if row > range.top {
                out.push('\n');
            }
            for col in range.left..=range.right {
                if col > range.left {
                    out.push('\t');
                }
                out.push_str(&self.formula(row, col));
            }
        }
        out
    }

    /// Paste a tab/newline-delimited block of formulas into `target`.
    ///
    /// The target must either match the block's shape exactly or be a
    /// single cell, which anchors the block's top-left corner. Writes that
    /// fall outside the grid are dropped.
    pub fn paste(&mut self, target: CellRange, text: &str) -> Result<(), String> {
        let text = text.strip_suffix('\n').unwrap_or(text);
        let lines: Vec<&str> = text.split('\n').collect();
        let block_rows = lines.len();
        let block_cols = lines[0].matches('\t').count() + 1;

        if target.rows() * target.cols() != 1
            && (target.rows() != block_rows || target.cols() != block_cols)
        {
            return Err("the copy and paste areas aren't the same size".to_string());
        }

        for (i, line) in lines.iter().enumerate() {
            for (j, field) in line.split('\t').enumerate() {
                self.put(target.top + i, target.left + j, field);
            }
        }
        self.touched();
        Ok(())
    }

    /// Remove every cell in the range.
    pub fn clear_range(&mut self, range: CellRange) {
        for row in range.top..=range.bottom {
            for col in range.left..=range.right {
                self.cells.remove(&(row, col));
            }
        }
        self.touched();
    }

    /// Remove every cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Row-major scan for `needle` in display text, starting after `from`
    /// (or at the top-left when `None`). No wraparound.
    pub fn find_next(
        &self,
        from: Option<(usize, usize)>,
        needle: &str,
        case_sensitive: bool,
    ) -> Option<(usize, usize)> {
        let (mut row, mut col) = match from {
            Some((r, c)) => (r, c + 1),
            None => (0, 0),
        };
        while row < self.rows {
            while col < self.cols {
                if text_matches(&self.display_text(row, col), needle, case_sensitive) {
                    return Some((row, col));
                }
                col += 1;
            }
            col = 0;
            row += 1;
        }
        None
    }

    /// Backward row-major scan for `needle` in display text, starting
    /// before `from` (or at the bottom-right when `None`). No wraparound.
    pub fn find_previous(
        &self,
        from: Option<(usize, usize)>,
        needle: &str,
        case_sensitive: bool,
    ) -> Option<(usize, usize)> {
        let (start_row, start_col) = match from {
            Some((r, c)) => (r, c),
            None => (self.rows - 1, self.cols),
        };
        for row in (0..=start_row).rev() {
            let end = if row == start_row { start_col } else { self.cols };
            for col in (0..end).rev() {
                if text_matches(&self.display_text(row, col), needle, case_sensitive) {
                    return Some((row, col));
                }
            }
        }
        None
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Store without triggering the auto-recalculation sweep; bulk
    /// operations call this per cell and sweep once.
    fn put(&mut self, row: usize, col: usize, text: &str) {
        if row >= self.rows || col >= self.cols {
            return;
        }
        if text.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            match self.cells.get_mut(&(row, col)) {
                Some(cell) => cell.set_formula(text),
                None => {
                    self.cells.insert((row, col), Cell::new(text));
                }
            }
        }
    }

    fn touched(&mut self) {
        if self.auto_recalc {
            self.mark_all_dirty();
        }
    }

    /// Resolve a coordinate to its current value, recomputing through the
    /// evaluator when the cache is stale. Returns `None` for empty slots.
    ///
    /// Re-entering a cell already on the evaluation path means a circular
    /// reference; the path-length ceiling catches chains the stack could
    /// not. Both cut the recursion with Invalid.
    fn resolve(&self, row: usize, col: usize, trace: &mut EvalTrace) -> Option<Value> {
        let cell = self.cells.get(&(row, col))?;

        if trace.visiting.len() >= MAX_EVAL_DEPTH {
            return Some(Value::Invalid);
        }
        if !trace.visiting.insert((row, col)) {
            trace.cycle_detected = true;
            return Some(Value::Invalid);
        }

        let value = cell.value_via(|formula| {
            let mut lookup = SheetLookup { sheet: self, trace: &mut *trace };
            eval::evaluate_formula(formula, &mut lookup)
        });

        trace.visiting.remove(&(row, col));
        Some(value)
    }
}

fn compare_rows(a: &[String], b: &[String], keys: &[SortKey]) -> Ordering {
    for key in keys {
        if key.column >= a.len() {
            continue;
        }
        let (x, y) = (&a[key.column], &b[key.column]);
        if x != y {
            let ord = x.cmp(y);
            return if key.ascending { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

fn text_matches(haystack: &str, needle: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        haystack.contains(needle)
    } else {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }
}
