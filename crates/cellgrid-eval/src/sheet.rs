//! The sheet: single owner of every cell and of the dependency graph.
//!
//! All cross-cell links are positional and resolved through the grid map on
//! use, so the bidirectional reference/dependent structure never turns into
//! cyclic ownership. Every edit runs the cycle check before anything
//! observable changes; invalidation runs after the swap and is driven from
//! the writer side, which keeps every read path `&self`.

use std::io::{self, Write};

use cellgrid_common::{CellValue, FormulaError, FormulaErrorKind, Position, SheetError, Size};
use rustc_hash::FxHashSet;

use crate::cell::{Cell, CellBody};

/// Engine knobs. The defaults implement the documented semantics; the
/// reclamation flag exists for callers that want empty slots pinned once
/// allocated.
#[derive(Debug, Clone)]
pub struct SheetConfig {
    /// Release an empty-bodied slot as soon as its last dependent unhooks.
    pub reclaim_orphan_slots: bool,
}

impl Default for SheetConfig {
    fn default() -> Self {
        SheetConfig {
            reclaim_orphan_slots: true,
        }
    }
}

/// A sparse grid of cells with an always-acyclic dependency graph.
#[derive(Debug, Default)]
pub struct Sheet {
    cells: rustc_hash::FxHashMap<Position, Cell>,
    config: SheetConfig,
    /// Fresh formula evaluations (memo misses) since creation.
    evals: std::cell::Cell<u64>,
}

impl Sheet {
    pub fn new() -> Self {
        Sheet::default()
    }

    pub fn with_config(config: SheetConfig) -> Self {
        Sheet {
            config,
            ..Sheet::default()
        }
    }

    /// Write `text` into the cell at `pos`.
    ///
    /// Empty text clears the body, a leading `=` (with more after it) is a
    /// formula, anything else is literal text. Writing a cell's current
    /// text back is a no-op. A formula that fails to parse or would create
    /// a reference cycle leaves the sheet untouched.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        if let Some(cell) = self.cells.get(&pos) {
            if cell.text() == text {
                return Ok(());
            }
        }

        let body =
            CellBody::from_input(text).map_err(|err| SheetError::FormulaParse(err.to_string()))?;
        if body.is_empty() && !self.cells.contains_key(&pos) {
            return Ok(());
        }

        let new_refs = body_references(&body);
        if !new_refs.is_empty() {
            self.reject_cycles(&new_refs, pos)?;
        }

        let old_refs: Vec<Position> = self
            .cells
            .get(&pos)
            .map(|cell| cell.referenced_cells().to_vec())
            .unwrap_or_default();

        match self.cells.get_mut(&pos) {
            Some(cell) => cell.set_body(body),
            None => {
                self.cells.insert(pos, Cell::new(body));
            }
        }

        for r in &old_refs {
            if let Some(cell) = self.cells.get_mut(r) {
                cell.remove_dependent(pos);
            }
        }
        for r in &new_refs {
            self.cells
                .entry(*r)
                .or_insert_with(Cell::placeholder)
                .add_dependent(pos);
        }

        self.invalidate_dependents(pos);

        if self.config.reclaim_orphan_slots {
            for r in &old_refs {
                self.reclaim_if_orphan(*r);
            }
            self.reclaim_if_orphan(pos);
        }

        tracing::debug!("set cell {pos}");
        Ok(())
    }

    /// Read-only handle to the cell at `pos`.
    ///
    /// Placeholder and cleared slots read as absent; this call never
    /// materializes anything.
    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self.cells.get(&pos).filter(|cell| !cell.body().is_empty()))
    }

    /// Mutable handle to the cell at `pos`. Same visibility rules as
    /// [`Sheet::get_cell`].
    pub fn get_cell_mut(&mut self, pos: Position) -> Result<Option<&mut Cell>, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self
            .cells
            .get_mut(&pos)
            .filter(|cell| !cell.body().is_empty()))
    }

    /// Reset the cell at `pos` to empty.
    ///
    /// The slot itself survives while other formulas still reference it, so
    /// their dependency edges stay valid; it is released once the last
    /// dependent unhooks.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        self.set_cell(pos, "")
    }

    /// The value at `pos`. Absent and empty cells read as `0.0`.
    pub fn cell_value(&self, pos: Position) -> Result<CellValue, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(match self.cells.get(&pos) {
            Some(cell) => cell.value(self),
            None => CellValue::Number(0.0),
        })
    }

    /// The raw stored text at `pos`. Absent cells read as `""`.
    pub fn cell_text(&self, pos: Position) -> Result<String, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self
            .cells
            .get(&pos)
            .map(|cell| cell.text())
            .unwrap_or_default())
    }

    /// Smallest origin-anchored rectangle containing every cell with
    /// non-empty text. Slots retained only for their dependent edges do not
    /// count.
    pub fn printable_size(&self) -> Size {
        let mut size = Size::default();
        for (pos, cell) in &self.cells {
            if cell.body().is_empty() {
                continue;
            }
            size.rows = size.rows.max(pos.row + 1);
            size.cols = size.cols.max(pos.col + 1);
        }
        size
    }

    /// Print cell values over the printable rectangle: columns separated by
    /// tabs, each row terminated by a newline. Absent cells emit nothing.
    pub fn print_values<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |cell| cell.value(self).to_string())
    }

    /// Print raw cell texts over the printable rectangle, same shape as
    /// [`Sheet::print_values`].
    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |cell| cell.text())
    }

    fn print_with<W, F>(&self, out: &mut W, render: F) -> io::Result<()>
    where
        W: Write,
        F: Fn(&Cell) -> String,
    {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    out.write_all(b"\t")?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    if !cell.body().is_empty() {
                        out.write_all(render(cell).as_bytes())?;
                    }
                }
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Allocated slots, including placeholders and cleared-but-referenced
    /// cells. Useful for asserting slot retention and release.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Fresh formula evaluations performed so far. A read served from a
    /// memoized value does not count.
    pub fn eval_count(&self) -> u64 {
        self.evals.get()
    }

    /// Depth-first search over the current reference edges, rooted at the
    /// tentative references of an edit. Reaching `target` means the edit
    /// would close a cycle. Absent referenced slots are materialized empty;
    /// their empty reference lists end the descent. Bodies and dependents
    /// are never touched.
    fn reject_cycles(&mut self, new_refs: &[Position], target: Position) -> Result<(), SheetError> {
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut pending: Vec<Position> = new_refs.to_vec();

        while let Some(pos) = pending.pop() {
            if pos == target {
                tracing::warn!("rejected edit at {target}: circular dependency");
                return Err(SheetError::CircularDependency(target));
            }
            if !visited.insert(pos) {
                continue;
            }
            match self.cells.get(&pos) {
                Some(cell) => pending.extend_from_slice(cell.referenced_cells()),
                None => {
                    self.cells.insert(pos, Cell::placeholder());
                }
            }
        }
        Ok(())
    }

    /// Drop the memos of everything transitively reachable through
    /// dependents of `pos`. A cell with nothing memoized ends its branch:
    /// anything above it was already dropped by an earlier walk.
    fn invalidate_dependents(&self, pos: Position) {
        let Some(cell) = self.cells.get(&pos) else {
            return;
        };
        for dep in cell.dependent_cells() {
            if let Some(dep_cell) = self.cells.get(&dep) {
                if dep_cell.invalidate_cache() {
                    self.invalidate_dependents(dep);
                }
            }
        }
    }

    /// Release a slot that is empty-bodied and no longer referenced.
    fn reclaim_if_orphan(&mut self, pos: Position) {
        let orphan = self
            .cells
            .get(&pos)
            .is_some_and(|cell| cell.body().is_empty() && !cell.has_dependents());
        if orphan {
            self.cells.remove(&pos);
            tracing::debug!("released empty slot {pos}");
        }
    }

    /// Resolve a referenced cell to a number for formula evaluation.
    ///
    /// Absent and empty cells are `0.0`; numeric text (digits with at most
    /// one `.`) coerces; any other text is `#VALUE!`; an error value
    /// propagates as-is. Formula cells evaluate recursively, which is safe
    /// because the graph is acyclic.
    pub(crate) fn lookup_number(&self, pos: Position) -> Result<f64, FormulaError> {
        let Some(cell) = self.cells.get(&pos) else {
            return Ok(0.0);
        };
        match cell.value(self) {
            CellValue::Number(n) => Ok(n),
            CellValue::Text(s) => numeric_text(&s),
            CellValue::Error(err) => Err(err),
        }
    }

    pub(crate) fn note_eval(&self) {
        self.evals.set(self.evals.get() + 1);
    }
}

fn numeric_text(s: &str) -> Result<f64, FormulaError> {
    let plain_shape = s.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && s.bytes().filter(|&b| b == b'.').count() <= 1;
    if plain_shape {
        if let Ok(n) = s.parse::<f64>() {
            return Ok(n);
        }
    }
    Err(FormulaError::new(FormulaErrorKind::Value))
}

fn body_references(body: &CellBody) -> Vec<Position> {
    match body {
        CellBody::Formula(formula) => formula.formula().referenced_cells().to_vec(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(name: &str) -> Position {
        Position::parse(name).unwrap()
    }

    #[test]
    fn placeholders_read_as_absent() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        // B1 was materialized for edge recording but is not a visible cell
        assert!(sheet.get_cell(pos("B1")).unwrap().is_none());
        assert_eq!(sheet.cell_value(pos("B1")).unwrap(), CellValue::Number(0.0));
        assert_eq!(sheet.cell_count(), 2);
    }

    #[test]
    fn get_cell_never_materializes() {
        let sheet = Sheet::new();
        assert!(sheet.get_cell(pos("Q42")).unwrap().is_none());
        assert_eq!(sheet.cell_count(), 0);
    }

    #[test]
    fn invalid_positions_are_rejected_everywhere() {
        let mut sheet = Sheet::new();
        let bad = Position::new(0, 20_000);
        assert_eq!(
            sheet.set_cell(bad, "1"),
            Err(SheetError::InvalidPosition(bad))
        );
        assert_eq!(
            sheet.get_cell(bad).unwrap_err(),
            SheetError::InvalidPosition(bad)
        );
        assert_eq!(sheet.clear_cell(bad), Err(SheetError::InvalidPosition(bad)));
        assert_eq!(sheet.cell_value(bad), Err(SheetError::InvalidPosition(bad)));
    }

    #[test]
    fn memo_survives_repeated_reads() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=1+2").unwrap();
        assert_eq!(sheet.cell_value(pos("A1")).unwrap(), CellValue::Number(3.0));
        assert_eq!(sheet.eval_count(), 1);
        assert_eq!(sheet.cell_value(pos("A1")).unwrap(), CellValue::Number(3.0));
        assert_eq!(sheet.eval_count(), 1);

        let cell = sheet.get_cell(pos("A1")).unwrap().unwrap();
        assert!(cell.is_cached());
    }

    #[test]
    fn errors_are_not_memoized() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=1/0").unwrap();
        assert_eq!(
            sheet.cell_value(pos("A1")).unwrap(),
            CellValue::from(FormulaErrorKind::Arithmetic)
        );
        assert_eq!(sheet.eval_count(), 1);
        sheet.cell_value(pos("A1")).unwrap();
        assert_eq!(sheet.eval_count(), 2);
    }

    #[test]
    fn numeric_text_coercion() {
        assert_eq!(numeric_text("42"), Ok(42.0));
        assert_eq!(numeric_text("3.14"), Ok(3.14));
        assert!(numeric_text("").is_err());
        assert!(numeric_text(".").is_err());
        assert!(numeric_text("1.2.3").is_err());
        assert!(numeric_text("-1").is_err());
        assert!(numeric_text("1e5").is_err());
        assert!(numeric_text("hello").is_err());
    }

    #[test]
    fn printable_size_ignores_retained_slots() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=Z99").unwrap();
        // Z99's placeholder must not stretch the rectangle
        assert_eq!(sheet.printable_size(), Size::new(1, 1));
    }

    #[test]
    fn print_layout() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "1").unwrap();
        sheet.set_cell(pos("C2"), "=1+1").unwrap();

        let mut texts = Vec::new();
        sheet.print_texts(&mut texts).unwrap();
        assert_eq!(String::from_utf8(texts).unwrap(), "1\t\t\n\t\t=1+1\n");

        let mut values = Vec::new();
        sheet.print_values(&mut values).unwrap();
        assert_eq!(String::from_utf8(values).unwrap(), "1\t\t\n\t\t2\n");
    }

    #[test]
    fn same_text_write_is_a_no_op() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("B1"), "2").unwrap();
        sheet.set_cell(pos("A1"), "=B1+1").unwrap();
        assert_eq!(sheet.cell_value(pos("A1")).unwrap(), CellValue::Number(3.0));
        let evals = sheet.eval_count();

        // identical text: the memo must survive
        sheet.set_cell(pos("A1"), "=B1+1").unwrap();
        sheet.set_cell(pos("B1"), "2").unwrap();
        assert_eq!(sheet.cell_value(pos("A1")).unwrap(), CellValue::Number(3.0));
        assert_eq!(sheet.eval_count(), evals);
    }

    #[test]
    fn pinned_slots_survive_when_reclamation_is_off() {
        let mut sheet = Sheet::with_config(SheetConfig {
            reclaim_orphan_slots: false,
        });
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.set_cell(pos("A1"), "1").unwrap();
        // B1's placeholder is orphaned but pinned
        assert_eq!(sheet.cell_count(), 2);
        assert!(sheet.get_cell(pos("B1")).unwrap().is_none());
    }
}
