//! Live spreadsheet formulas for the per-row and summary statistics
//!
//! Nothing here is evaluated. The text is written into the workbook and the
//! spreadsheet engine recomputes it whenever the rssi or flashed cells change.
//! With zero device rows the ranges degenerate (e.g. `D2:D1`); evaluation of
//! that case is left to the engine.

use crate::columns::Column;
use crate::grid::CellRef;

/// Units within this many dB of the best rssi form the baseline average
pub const TOP_BAND_DB: i64 = 5;

/// Lowest delta-vs-best (after rounding) that still passes
pub const PASS_MARGIN_DB: i64 = -10;

pub const PASS: &str = "PASS";
pub const NO_PASS: &str = "NO PASS";

/// First data row; row 1 holds the titles
pub const FIRST_DATA_ROW: u32 = 2;

/// Sheet row of the `index`-th (0-based) device
pub fn data_row(index: usize) -> u32 {
    FIRST_DATA_ROW + index as u32
}

/// Fixed placement of the summary block below `device_rows` data rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLayout {
    device_rows: u32,
}

impl SummaryLayout {
    pub fn new(device_rows: u32) -> Self {
        SummaryLayout { device_rows }
    }

    pub fn device_rows(&self) -> u32 {
        self.device_rows
    }

    /// Last data row (1 when there are no devices)
    pub fn last_data_row(&self) -> u32 {
        self.device_rows + 1
    }

    pub fn top_band_row(&self) -> u32 {
        self.device_rows + 3
    }

    pub fn pass_count_row(&self) -> u32 {
        self.device_rows + 5
    }

    pub fn pass_rate_row(&self) -> u32 {
        self.device_rows + 6
    }

    /// Cell holding the top-5dB average
    pub fn top_band_cell(&self) -> CellRef {
        CellRef::new(Column::DbVsBest, self.top_band_row())
    }

    pub fn pass_count_cell(&self) -> CellRef {
        CellRef::new(Column::DbVsBest, self.pass_count_row())
    }

    pub fn pass_rate_cell(&self) -> CellRef {
        CellRef::new(Column::DbVsBest, self.pass_rate_row())
    }

    /// Label/formula pairs of the summary block, top to bottom
    pub fn entries(&self) -> [SummaryEntry; 3] {
        [
            SummaryEntry {
                label_cell: CellRef::new(Column::Notes, self.top_band_row()),
                label: "Top 5dB average:",
                formula_cell: self.top_band_cell(),
                formula: self.top_band_average(),
            },
            SummaryEntry {
                label_cell: CellRef::new(Column::Notes, self.pass_count_row()),
                label: "Succeeded units:",
                formula_cell: self.pass_count_cell(),
                formula: self.pass_count(),
            },
            SummaryEntry {
                label_cell: CellRef::new(Column::Notes, self.pass_rate_row()),
                label: "Succeeded rate:",
                formula_cell: self.pass_rate_cell(),
                formula: self.pass_rate(),
            },
        ]
    }

    /// Average of every rssi strictly above `MAX(rssi) - 5`
    pub fn top_band_average(&self) -> String {
        let rssi = Column::Rssi;
        let last = self.last_data_row();
        format!(
            "=AVERAGEIF({rssi}{FIRST_DATA_ROW}:{rssi}{last},CONCATENATE(\">\", MAX({rssi}{FIRST_DATA_ROW}:{rssi}{last})-{TOP_BAND_DB}))"
        )
    }

    /// Number of rows whose pass column reads `PASS`
    pub fn pass_count(&self) -> String {
        let pass = Column::Pass;
        let last = self.last_data_row();
        format!("=COUNTIF({pass}${FIRST_DATA_ROW}:{pass}{last}, \"{PASS}\")")
    }

    /// Pass count over the row count, derived from `ROW()` so it tracks inserted rows
    pub fn pass_rate(&self) -> String {
        format!(
            "={}/(ROW({})-1)",
            self.pass_count_cell(),
            CellRef::new(Column::Pass, self.last_data_row())
        )
    }

    /// Rssi relative to the top-5dB average, rounded to a multiple of ten
    pub fn delta_vs_best(&self, row: u32) -> String {
        let baseline = self.top_band_cell();
        format!(
            "=ROUNDDOWN({}-${}{}, -1)",
            CellRef::new(Column::Rssi, row),
            baseline.column,
            baseline.row
        )
    }

    /// `PASS` iff the unit flashed and sits within the pass margin of the best
    pub fn pass_fail(&self, row: u32) -> String {
        format!(
            "=IF(AND({}=\"true\", {}>={PASS_MARGIN_DB}), \"{PASS}\", \"{NO_PASS}\")",
            CellRef::new(Column::Flashed, row),
            CellRef::new(Column::DbVsBest, row),
        )
    }
}

/// One label/formula pair of the summary block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub label_cell: CellRef,
    pub label: &'static str,
    pub formula_cell: CellRef,
    pub formula: String,
}
