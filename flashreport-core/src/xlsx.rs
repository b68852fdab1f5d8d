//! XLSX rendering of a finished [`Sheet`]
//!
//! The workbook is serialized to memory first and then written with a
//! temp-file + rename, so a failed run never leaves a partial report behind.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use rust_xlsxwriter::{Format, FormatAlign, FormatPattern, Formula, Workbook, Worksheet};

use crate::error::{ReportError, Result};
use crate::grid::{CellValue, Sheet, Style};

/// Serialize `sheet` as a single-sheet workbook
pub fn render_workbook(sheet: &Sheet) -> anyhow::Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(sheet.name())
        .with_context(|| format!("failed to create sheet {:?}", sheet.name()))?;

    write_cells(worksheet, sheet)?;

    for (column, width) in sheet.column_widths() {
        worksheet
            .set_column_width(column.index(), width)
            .with_context(|| format!("failed to set width of column {}", column))?;
    }
    if sheet.frozen_rows() > 0 {
        worksheet
            .set_freeze_panes(sheet.frozen_rows(), 0)
            .context("failed to freeze header row")?;
    }

    workbook
        .save_to_buffer()
        .context("failed to serialize workbook")
}

fn write_cells(worksheet: &mut Worksheet, sheet: &Sheet) -> anyhow::Result<()> {
    for (at, cell) in sheet.cells() {
        // rust_xlsxwriter addresses are 0-based
        let row = at.row - 1;
        let col = at.column.index();
        let format = cell.style.map(to_format);

        let result = match (&cell.value, &format) {
            (CellValue::Text(text), None) => worksheet.write_string(row, col, text),
            (CellValue::Text(text), Some(f)) => {
                worksheet.write_string_with_format(row, col, text, f)
            }
            (CellValue::Integer(v), None) => worksheet.write_number(row, col, *v as f64),
            (CellValue::Integer(v), Some(f)) => {
                worksheet.write_number_with_format(row, col, *v as f64, f)
            }
            (CellValue::Formula(text), None) => {
                worksheet.write_formula(row, col, Formula::new(text))
            }
            (CellValue::Formula(text), Some(f)) => {
                worksheet.write_formula_with_format(row, col, Formula::new(text), f)
            }
        };
        result.with_context(|| format!("failed to write cell {}", at))?;
    }
    Ok(())
}

fn to_format(style: Style) -> Format {
    match style {
        Style::Fill(rgb) => Format::new()
            .set_pattern(FormatPattern::Solid)
            .set_background_color(rgb),
        Style::AlignRight => Format::new().set_align(FormatAlign::Right),
    }
}

/// Render `sheet` and write it to `path` atomically
pub fn write_workbook(sheet: &Sheet, path: &Path) -> Result<()> {
    let output_error = |source: anyhow::Error| ReportError::Output {
        path: path.to_path_buf(),
        source,
    };
    let bytes = render_workbook(sheet).map_err(output_error)?;
    atomic_write(path, &bytes).map_err(output_error)
}

fn atomic_write(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
    }

    let temp_path = path.with_extension("xlsx.tmp");
    let result = write_then_rename(&temp_path, path, contents);
    if result.is_err() {
        // Best effort: the original error is the one worth reporting
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_then_rename(temp_path: &Path, path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    let mut file = fs::File::create(temp_path)
        .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
    file.write_all(contents)
        .with_context(|| format!("failed to write temp file: {}", temp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("failed to sync temp file: {}", temp_path.display()))?;
    drop(file);

    fs::rename(temp_path, path)
        .with_context(|| format!("failed to rename temp file to: {}", path.display()))
}
