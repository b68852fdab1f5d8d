//! In-memory sheet model
//!
//! The assembler writes cells here; the xlsx writer renders the finished sheet.
//! Cells are kept in a sorted map (row-major) so iteration order, and therefore
//! the rendered workbook, is deterministic.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use crate::columns::Column;

/// Address of a single cell: schema column plus 1-based row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub column: Column,
}

impl CellRef {
    pub fn new(column: Column, row: u32) -> Self {
        CellRef { row, column }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column.letter(), self.row)
    }
}

/// Cell content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    /// Formula text including the leading `=`
    Formula(String),
}

/// Visual style applied to a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Solid background fill, `0xRRGGBB`
    Fill(u32),
    /// Right-aligned text
    AlignRight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub value: CellValue,
    pub style: Option<Style>,
}

/// A single named worksheet
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<CellRef, Cell>,
    column_widths: BTreeMap<Column, f64>,
    frozen_rows: u32,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            cells: BTreeMap::new(),
            column_widths: BTreeMap::new(),
            frozen_rows: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set a cell's value, keeping any style already applied
    pub fn set_value(&mut self, at: CellRef, value: CellValue) {
        match self.cells.entry(at) {
            Entry::Occupied(mut entry) => entry.get_mut().value = value,
            Entry::Vacant(entry) => {
                entry.insert(Cell { value, style: None });
            }
        }
    }

    /// Set a cell's formula text
    pub fn set_formula(&mut self, at: CellRef, formula: impl Into<String>) {
        self.set_value(at, CellValue::Formula(formula.into()));
    }

    /// Style an existing cell; styling an empty cell is a no-op
    pub fn set_style(&mut self, at: CellRef, style: Style) {
        if let Some(cell) = self.cells.get_mut(&at) {
            cell.style = Some(style);
        }
    }

    pub fn set_column_width(&mut self, column: Column, width: f64) {
        self.column_widths.insert(column, width);
    }

    /// Freeze the first `rows` rows so they stay visible while scrolling
    pub fn freeze_rows(&mut self, rows: u32) {
        self.frozen_rows = rows;
    }

    pub fn cell(&self, at: CellRef) -> Option<&Cell> {
        self.cells.get(&at)
    }

    pub fn value(&self, at: CellRef) -> Option<&CellValue> {
        self.cells.get(&at).map(|c| &c.value)
    }

    /// Cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (&CellRef, &Cell)> {
        self.cells.iter()
    }

    pub fn column_widths(&self) -> impl Iterator<Item = (Column, f64)> + '_ {
        self.column_widths.iter().map(|(c, w)| (*c, *w))
    }

    pub fn frozen_rows(&self) -> u32 {
        self.frozen_rows
    }

    /// Highest row holding any cell (0 when empty)
    pub fn last_row(&self) -> u32 {
        self.cells.keys().map(|at| at.row).max().unwrap_or(0)
    }
}
