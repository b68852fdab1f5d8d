//! Eager evaluation of the report statistics
//!
//! Computes once, in Rust, the values the workbook formulas will produce when
//! opened. Used for console output only. The result is a snapshot and does not
//! follow later edits of the workbook.

use serde::Serialize;

use crate::enrich::ReportRow;
use crate::formulas::{NO_PASS, PASS, PASS_MARGIN_DB, TOP_BAND_DB};

/// Evaluated outcome of one data row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowOutcome {
    pub chip_id: Option<String>,
    pub flashed_id: Option<String>,
    pub rssi: Option<i64>,
    /// `None` when the spreadsheet would show an error (no numeric rssi or no baseline)
    pub db_vs_best: Option<f64>,
    pub pass: bool,
}

impl RowOutcome {
    pub fn verdict(&self) -> &'static str {
        if self.pass {
            PASS
        } else {
            NO_PASS
        }
    }
}

/// Evaluated summary block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub devices: usize,
    pub top_band_average: Option<f64>,
    pub passed: usize,
    /// `None` for an empty report
    pub pass_rate: Option<f64>,
    pub rows: Vec<RowOutcome>,
}

/// Average of the rssi values strictly above `max - 5`
pub fn top_band_average(rssi: &[i64]) -> Option<f64> {
    let max = *rssi.iter().max()?;
    let threshold = max - TOP_BAND_DB;
    let band: Vec<i64> = rssi.iter().copied().filter(|v| *v > threshold).collect();
    Some(band.iter().sum::<i64>() as f64 / band.len() as f64)
}

/// `ROUNDDOWN(value, -1)`: truncate toward zero to a multiple of ten
pub fn round_down_tens(value: f64) -> f64 {
    (value / 10.0).trunc() * 10.0
}

/// Evaluate the report rows the way the spreadsheet formulas would
pub fn evaluate(rows: &[ReportRow]) -> ReportSummary {
    let rssi: Vec<i64> = rows.iter().filter_map(|r| r.rssi.value()).collect();
    let baseline = top_band_average(&rssi);

    let outcomes: Vec<RowOutcome> = rows
        .iter()
        .map(|row| {
            let value = row.rssi.value();
            let db_vs_best = value
                .zip(baseline)
                .map(|(v, avg)| round_down_tens(v as f64 - avg));
            let pass = row.flashed.is_success()
                && db_vs_best.is_some_and(|d| d >= PASS_MARGIN_DB as f64);
            RowOutcome {
                chip_id: row.chip_id.clone(),
                flashed_id: row.flashed_id.clone(),
                rssi: value,
                db_vs_best,
                pass,
            }
        })
        .collect();

    let passed = outcomes.iter().filter(|o| o.pass).count();
    let pass_rate = if outcomes.is_empty() {
        None
    } else {
        Some(passed as f64 / outcomes.len() as f64)
    };

    ReportSummary {
        devices: outcomes.len(),
        top_band_average: baseline,
        passed,
        pass_rate,
        rows: outcomes,
    }
}

/// Render the summary as console text
pub fn render_text(summary: &ReportSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<12} {:<12} {:>6} {:>10} {}\n",
        "CHIP ID", "FLASHED ID", "RSSI", "DB VS BEST", "PASS"
    ));
    for row in &summary.rows {
        output.push_str(&format!(
            "{:<12} {:<12} {:>6} {:>10} {}\n",
            row.chip_id.as_deref().unwrap_or("-"),
            row.flashed_id.as_deref().unwrap_or("-"),
            row.rssi.map_or_else(|| "n/a".to_string(), |v| v.to_string()),
            row.db_vs_best
                .map_or_else(|| "-".to_string(), |d| format!("{:.0}", d)),
            row.verdict(),
        ));
    }
    output.push('\n');
    output.push_str(&format!(
        "Top 5dB average: {}\n",
        summary
            .top_band_average
            .map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
    ));
    output.push_str(&format!(
        "Succeeded units: {}/{}\n",
        summary.passed, summary.devices
    ));
    output.push_str(&format!(
        "Succeeded rate: {}\n",
        summary
            .pass_rate
            .map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0))
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{FlashedStatus, RssiReading};

    fn row(flashed: &str, rssi: Option<i64>) -> ReportRow {
        ReportRow {
            chip_type: "green".into(),
            code_type: "master".into(),
            chip_id: None,
            flashed_id: None,
            flashed: FlashedStatus::Reported(flashed.into()),
            rssi: rssi.map_or(RssiReading::Missing, RssiReading::Measured),
        }
    }

    #[test]
    fn test_top_band_excludes_values_at_threshold() {
        // max 90 -> threshold 85, strictly greater only
        assert_eq!(top_band_average(&[90, 85, 88]), Some(89.0));
        assert_eq!(top_band_average(&[]), None);
    }

    #[test]
    fn test_round_down_truncates_toward_zero() {
        assert_eq!(round_down_tens(0.0), 0.0);
        assert_eq!(round_down_tens(-20.0), -20.0);
        assert_eq!(round_down_tens(-15.0), -10.0);
        assert_eq!(round_down_tens(-19.9), -10.0);
        assert_eq!(round_down_tens(17.0), 10.0);
    }

    #[test]
    fn test_two_device_scenario() {
        let summary = evaluate(&[row("true", Some(90)), row("true", Some(70))]);
        assert_eq!(summary.top_band_average, Some(90.0));
        assert_eq!(summary.rows[0].db_vs_best, Some(0.0));
        assert_eq!(summary.rows[1].db_vs_best, Some(-20.0));
        assert_eq!(summary.rows[0].verdict(), "PASS");
        assert_eq!(summary.rows[1].verdict(), "NO PASS");
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.pass_rate, Some(0.5));
    }

    #[test]
    fn test_missing_rssi_never_passes() {
        let summary = evaluate(&[row("true", None), row("true", Some(-40))]);
        assert_eq!(summary.rows[0].db_vs_best, None);
        assert!(!summary.rows[0].pass);
        assert!(summary.rows[1].pass);
    }

    #[test]
    fn test_failed_flash_never_passes() {
        let summary = evaluate(&[row("false", Some(-40))]);
        assert_eq!(summary.rows[0].db_vs_best, Some(0.0));
        assert!(!summary.rows[0].pass);
    }

    #[test]
    fn test_empty_report_has_no_rate() {
        let summary = evaluate(&[]);
        assert_eq!(summary.devices, 0);
        assert_eq!(summary.pass_rate, None);
        assert_eq!(summary.top_band_average, None);
        let text = render_text(&summary);
        assert!(text.contains("Succeeded units: 0/0"));
        assert!(text.contains("Succeeded rate: n/a"));
    }
}
