//! Fixed report column schema
//!
//! Column order and letters are static for the lifetime of a report. Every
//! cell address in the workbook is derived from a `Column` plus a 1-based row.

use std::fmt;

/// Report columns in sheet order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    ChipType,
    CodeType,
    ChipId,
    Rssi,
    Flashed,
    FlashedId,
    Notes,
    /// Unlabeled narrow separator before the computed columns
    Spacer,
    DbVsBest,
    Pass,
}

impl Column {
    /// All columns in sheet order
    pub const ALL: [Column; 10] = [
        Column::ChipType,
        Column::CodeType,
        Column::ChipId,
        Column::Rssi,
        Column::Flashed,
        Column::FlashedId,
        Column::Notes,
        Column::Spacer,
        Column::DbVsBest,
        Column::Pass,
    ];

    /// Zero-based position within the sheet
    pub fn index(self) -> u16 {
        self as u16
    }

    /// Spreadsheet column letter (A..J)
    pub fn letter(self) -> char {
        (b'A' + self as u8) as char
    }

    /// Header label; the spacer column has none
    pub fn title(self) -> Option<&'static str> {
        match self {
            Column::ChipType => Some("Chip type"),
            Column::CodeType => Some("Code type"),
            Column::ChipId => Some("Chip id"),
            Column::Rssi => Some("Rssi"),
            Column::Flashed => Some("Flashed"),
            Column::FlashedId => Some("Flashed ID"),
            Column::Notes => Some("Notes"),
            Column::Spacer => None,
            Column::DbVsBest => Some("dB vs best"),
            Column::Pass => Some("Pass"),
        }
    }

    /// Fixed character width, when the column is not left at the default
    pub fn width(self) -> Option<f64> {
        match self {
            Column::Notes => Some(40.0),
            Column::DbVsBest => Some(10.0),
            Column::Spacer => Some(1.0),
            _ => None,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}
