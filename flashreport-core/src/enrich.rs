//! Row enrichment: a device's latest flash joined with its measurements
//!
//! Measurement values stay opaque strings until they reach this module. Only
//! `"flashed"` and `"rssi"` are consumed; a single linear scan resolves
//! duplicates last-write-wins.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::columns::Column;
use crate::error::{ReportError, Result};
use crate::grid::CellValue;
use crate::store::{DeviceFlash, Measurement};

pub const FLASHED_KEY: &str = "flashed";
pub const RSSI_KEY: &str = "rssi";

/// Text written when no `flashed` measurement was recorded
pub const FLASHED_MISSING: &str = "False";
/// Text written when no usable `rssi` measurement was recorded
pub const RSSI_MISSING: &str = "n/a";

/// What to do with an `rssi` value that is not an integer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RssiPolicy {
    /// Abort the whole run with a data format error
    #[default]
    Abort,
    /// Render the row's rssi as `n/a` with a highlight and carry on
    Degrade,
}

impl RssiPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RssiPolicy::Abort => "abort",
            RssiPolicy::Degrade => "degrade",
        }
    }
}

/// Resolved `flashed` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlashedStatus {
    /// Literal value as recorded
    Reported(String),
    /// No measurement recorded
    Missing,
}

impl FlashedStatus {
    pub fn text(&self) -> &str {
        match self {
            FlashedStatus::Reported(value) => value,
            FlashedStatus::Missing => FLASHED_MISSING,
        }
    }

    /// Highlight an explicit `"false"` or a missing value
    pub fn is_highlighted(&self) -> bool {
        match self {
            FlashedStatus::Reported(value) => value == "false",
            FlashedStatus::Missing => true,
        }
    }

    /// Whether the spreadsheet's `="true"` comparison holds (case-insensitive)
    pub fn is_success(&self) -> bool {
        self.text().eq_ignore_ascii_case("true")
    }
}

/// Resolved `rssi` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RssiReading {
    Measured(i64),
    Missing,
    /// Non-integer value kept under [`RssiPolicy::Degrade`]
    Malformed(String),
}

impl RssiReading {
    pub fn value(&self) -> Option<i64> {
        match self {
            RssiReading::Measured(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_highlighted(&self) -> bool {
        !matches!(self, RssiReading::Measured(_))
    }

    pub fn cell_value(&self) -> CellValue {
        match self {
            RssiReading::Measured(v) => CellValue::Integer(*v),
            RssiReading::Missing | RssiReading::Malformed(_) => {
                CellValue::Text(RSSI_MISSING.to_string())
            }
        }
    }
}

/// One fully populated data row of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub chip_type: String,
    pub code_type: String,
    pub chip_id: Option<String>,
    pub flashed_id: Option<String>,
    pub flashed: FlashedStatus,
    pub rssi: RssiReading,
}

impl ReportRow {
    /// Columns of this row that must be filled with the highlight style
    pub fn highlights(&self) -> Vec<Column> {
        let mut columns = Vec::new();
        if self.rssi.is_highlighted() {
            columns.push(Column::Rssi);
        }
        if self.flashed.is_highlighted() {
            columns.push(Column::Flashed);
        }
        columns
    }
}

/// Join a device record with its measurements
pub fn enrich(
    device: &DeviceFlash,
    measurements: &[Measurement],
    policy: RssiPolicy,
) -> Result<ReportRow> {
    let mut flashed = FlashedStatus::Missing;
    let mut rssi = RssiReading::Missing;

    for measurement in measurements {
        match measurement.key.as_str() {
            FLASHED_KEY => flashed = FlashedStatus::Reported(measurement.value.clone()),
            RSSI_KEY => rssi = parse_rssi(device.latest_flash_id, &measurement.value, policy)?,
            _ => {}
        }
    }

    Ok(ReportRow {
        chip_type: device.chip_type.clone(),
        code_type: device.software.clone(),
        chip_id: device.chip_number.clone(),
        flashed_id: device.flashed_id.clone(),
        flashed,
        rssi,
    })
}

fn parse_rssi(flash_id: i64, value: &str, policy: RssiPolicy) -> Result<RssiReading> {
    match value.trim().parse::<i64>() {
        Ok(v) => Ok(RssiReading::Measured(v)),
        Err(source) => match policy {
            RssiPolicy::Abort => Err(ReportError::DataFormat {
                flash_id,
                key: RSSI_KEY.to_string(),
                value: value.to_string(),
                source,
            }),
            RssiPolicy::Degrade => {
                warn!(flash_id, value, "rssi is not an integer, reporting n/a");
                Ok(RssiReading::Malformed(value.to_string()))
            }
        },
    }
}
