//! Grid assembly
//!
//! Writes the title row, one data row per device, the summary block and the
//! layout directives into a [`Sheet`]. The device count is fixed up front
//! because every per-row delta formula references the summary block, whose
//! position depends on it.

use crate::columns::Column;
use crate::enrich::ReportRow;
use crate::formulas::{data_row, SummaryLayout};
use crate::grid::{CellRef, CellValue, Sheet, Style};

/// Worksheet name of the report
pub const SHEET_NAME: &str = "REPORT";

/// Default highlight color (orange)
pub const HIGHLIGHT_RGB: u32 = 0xFD5421;

pub const HIGHLIGHT_FILL: Style = Style::Fill(HIGHLIGHT_RGB);

/// Summary labels are right-aligned against the formula column
pub const LABEL_ALIGN: Style = Style::AlignRight;

/// Named styles used by the assembler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportStyles {
    pub highlight: Style,
    pub label: Style,
}

impl Default for ReportStyles {
    fn default() -> Self {
        ReportStyles {
            highlight: HIGHLIGHT_FILL,
            label: LABEL_ALIGN,
        }
    }
}

pub struct GridAssembler {
    sheet: Sheet,
    layout: SummaryLayout,
    styles: ReportStyles,
    rows_written: usize,
}

impl GridAssembler {
    /// Start a sheet for `device_rows` devices and write the title row
    pub fn new(device_rows: usize, styles: ReportStyles) -> Self {
        let mut sheet = Sheet::new(SHEET_NAME);
        for column in Column::ALL {
            if let Some(title) = column.title() {
                sheet.set_value(CellRef::new(column, 1), CellValue::Text(title.to_string()));
            }
        }
        GridAssembler {
            sheet,
            layout: SummaryLayout::new(device_rows as u32),
            styles,
            rows_written: 0,
        }
    }

    /// Write the next data row with its per-row formulas and highlights
    pub fn push_row(&mut self, row: &ReportRow) {
        let r = data_row(self.rows_written);
        let at = |column| CellRef::new(column, r);

        self.sheet.set_value(at(Column::Rssi), row.rssi.cell_value());
        self.sheet.set_value(
            at(Column::Flashed),
            CellValue::Text(row.flashed.text().to_string()),
        );
        for column in row.highlights() {
            self.sheet.set_style(at(column), self.styles.highlight);
        }

        self.sheet.set_value(
            at(Column::ChipType),
            CellValue::Text(row.chip_type.clone()),
        );
        self.sheet.set_value(
            at(Column::CodeType),
            CellValue::Text(row.code_type.clone()),
        );
        if let Some(chip_id) = &row.chip_id {
            self.sheet
                .set_value(at(Column::ChipId), CellValue::Text(chip_id.clone()));
        }
        if let Some(flashed_id) = &row.flashed_id {
            self.sheet
                .set_value(at(Column::FlashedId), CellValue::Text(flashed_id.clone()));
        }

        self.sheet
            .set_formula(at(Column::DbVsBest), self.layout.delta_vs_best(r));
        self.sheet
            .set_formula(at(Column::Pass), self.layout.pass_fail(r));

        self.rows_written += 1;
    }

    /// Write the summary block and layout directives, returning the sheet
    pub fn finish(mut self) -> Sheet {
        debug_assert_eq!(
            self.rows_written as u32,
            self.layout.device_rows(),
            "summary block placed for a different row count"
        );

        for entry in self.layout.entries() {
            self.sheet.set_value(
                entry.label_cell,
                CellValue::Text(entry.label.to_string()),
            );
            self.sheet.set_style(entry.label_cell, self.styles.label);
            self.sheet.set_formula(entry.formula_cell, entry.formula);
        }

        self.sheet.freeze_rows(1);
        for column in Column::ALL {
            if let Some(width) = column.width() {
                self.sheet.set_column_width(column, width);
            }
        }
        self.sheet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{FlashedStatus, RssiReading};

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn sample_row() -> ReportRow {
        ReportRow {
            chip_type: "green".into(),
            code_type: "relay_mk1".into(),
            chip_id: Some("12".into()),
            flashed_id: None,
            flashed: FlashedStatus::Reported("false".into()),
            rssi: RssiReading::Measured(-61),
        }
    }

    #[test]
    fn test_title_row_skips_spacer() {
        let sheet = GridAssembler::new(0, ReportStyles::default()).finish();
        assert_eq!(
            sheet.value(CellRef::new(Column::ChipType, 1)),
            Some(&text("Chip type"))
        );
        assert_eq!(
            sheet.value(CellRef::new(Column::DbVsBest, 1)),
            Some(&text("dB vs best"))
        );
        assert!(sheet.value(CellRef::new(Column::Spacer, 1)).is_none());
    }

    #[test]
    fn test_data_row_cells_and_highlight() {
        let mut assembler = GridAssembler::new(1, ReportStyles::default());
        assembler.push_row(&sample_row());
        let sheet = assembler.finish();

        assert_eq!(
            sheet.value(CellRef::new(Column::Rssi, 2)),
            Some(&CellValue::Integer(-61))
        );
        assert_eq!(
            sheet.value(CellRef::new(Column::CodeType, 2)),
            Some(&text("relay_mk1"))
        );
        assert!(sheet.cell(CellRef::new(Column::FlashedId, 2)).is_none());

        let flashed = sheet.cell(CellRef::new(Column::Flashed, 2)).unwrap();
        assert_eq!(flashed.style, Some(HIGHLIGHT_FILL));
        let rssi = sheet.cell(CellRef::new(Column::Rssi, 2)).unwrap();
        assert_eq!(rssi.style, None);

        assert_eq!(
            sheet.value(CellRef::new(Column::DbVsBest, 2)),
            Some(&CellValue::Formula("=ROUNDDOWN(D2-$I4, -1)".into()))
        );
    }

    #[test]
    fn test_summary_labels_are_right_aligned() {
        let mut assembler = GridAssembler::new(1, ReportStyles::default());
        assembler.push_row(&sample_row());
        let sheet = assembler.finish();

        for (row, label) in [
            (4, "Top 5dB average:"),
            (6, "Succeeded units:"),
            (7, "Succeeded rate:"),
        ] {
            let cell = sheet.cell(CellRef::new(Column::Notes, row)).unwrap();
            assert_eq!(cell.value, text(label));
            assert_eq!(cell.style, Some(Style::AlignRight));
        }
        assert_eq!(sheet.last_row(), 7);
    }

    #[test]
    fn test_layout_directives() {
        let sheet = GridAssembler::new(0, ReportStyles::default()).finish();
        assert_eq!(sheet.name(), "REPORT");
        assert_eq!(sheet.frozen_rows(), 1);
        let widths: Vec<(Column, f64)> = sheet.column_widths().collect();
        assert_eq!(
            widths,
            vec![
                (Column::Notes, 40.0),
                (Column::Spacer, 1.0),
                (Column::DbVsBest, 10.0)
            ]
        );
    }

    #[test]
    fn test_custom_highlight_style() {
        let styles = ReportStyles {
            highlight: Style::Fill(0x00FF00),
            ..ReportStyles::default()
        };
        let mut assembler = GridAssembler::new(1, styles);
        assembler.push_row(&sample_row());
        let sheet = assembler.finish();
        let flashed = sheet.cell(CellRef::new(Column::Flashed, 2)).unwrap();
        assert_eq!(flashed.style, Some(Style::Fill(0x00FF00)));
    }
}
