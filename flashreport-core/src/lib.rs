//! flashreport core library - spreadsheet reports of device flashing results

#![deny(warnings)]

// Global invariants enforced in this crate:
// - One device query, then one sequential pass over its rows
// - No global mutable state, threads, or async
// - Row order is the store's flashed_id order; nothing re-sorts it
// - Derived statistics are emitted as live formulas, never as values
// - Identical database contents yield an identical sheet

pub mod assemble;
pub mod columns;
pub mod config;
pub mod enrich;
pub mod error;
pub mod formulas;
pub mod grid;
pub mod store;
pub mod summary;
pub mod window;
pub mod xlsx;

pub use assemble::{GridAssembler, ReportStyles};
pub use config::ResolvedConfig;
pub use enrich::{ReportRow, RssiPolicy};
pub use error::{ReportError, Result};
pub use grid::Sheet;
pub use store::FlashStore;
pub use summary::ReportSummary;
pub use window::{TimeWindow, Timezone};

use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Knobs of the assembly pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub rssi_policy: RssiPolicy,
    pub styles: ReportStyles,
}

impl From<&ResolvedConfig> for ReportOptions {
    fn from(config: &ResolvedConfig) -> Self {
        ReportOptions {
            rssi_policy: config.rssi_policy,
            styles: config.styles(),
        }
    }
}

/// Assembled report sheet plus its eagerly evaluated summary
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub sheet: Sheet,
    pub summary: ReportSummary,
}

/// Build the report sheet for every device flashed strictly inside `window`
pub fn build_report(
    store: &FlashStore,
    window: &TimeWindow,
    options: &ReportOptions,
) -> Result<GeneratedReport> {
    let devices = store.latest_flashes(window)?;
    info!(devices = devices.len(), "building report");

    let mut assembler = GridAssembler::new(devices.len(), options.styles);
    let mut rows = Vec::with_capacity(devices.len());
    for device in &devices {
        let measurements = store.measurements(device.latest_flash_id)?;
        let row = enrich::enrich(device, &measurements, options.rssi_policy)?;
        debug!(
            flash_id = device.latest_flash_id,
            chip = device.chip_number.as_deref().unwrap_or("-"),
            measurements = measurements.len(),
            "enriched device row"
        );
        assembler.push_row(&row);
        rows.push(row);
    }

    Ok(GeneratedReport {
        sheet: assembler.finish(),
        summary: summary::evaluate(&rows),
    })
}

/// Report written to disk
#[derive(Debug, Clone)]
pub struct WrittenReport {
    pub path: PathBuf,
    pub summary: ReportSummary,
}

/// Open the database, build the report and write `report {start}-{end}.xlsx` into `output_dir`
///
/// The database connection is dropped before the workbook is written; any
/// failure leaves no report file behind.
pub fn generate_report(
    database: &Path,
    output_dir: &Path,
    window: &TimeWindow,
    options: &ReportOptions,
) -> Result<WrittenReport> {
    let report = {
        let store = FlashStore::open_existing(database)?;
        build_report(&store, window, options)?
    };

    let path = output_dir.join(window.report_file_name());
    xlsx::write_workbook(&report.sheet, &path)?;
    info!(path = %path.display(), "report written");

    Ok(WrittenReport {
        path,
        summary: report.summary,
    })
}
