//! Reporting time window
//!
//! Timestamps arrive as `YYYY-MM-DD_HH:MM` strings and are converted to epoch
//! seconds once. Both window edges are exclusive when querying.

use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Accepted input format for window edges
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M";

/// Display format used in the output file name
const FILE_NAME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How naive window timestamps are mapped onto epoch seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timezone {
    /// Interpret timestamps in the machine's local timezone
    #[default]
    Local,
    /// Interpret timestamps as UTC
    Utc,
}

impl Timezone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timezone::Local => "local",
            Timezone::Utc => "utc",
        }
    }

    /// Convert a naive timestamp to epoch seconds in this timezone
    pub fn epoch_seconds(&self, naive: &NaiveDateTime) -> Result<i64> {
        match self {
            Timezone::Utc => Ok(Utc.from_utc_datetime(naive).timestamp()),
            Timezone::Local => match Local.from_local_datetime(naive) {
                LocalResult::Single(dt) => Ok(dt.timestamp()),
                // Ambiguous wall-clock time (DST fold): take the earlier instant
                LocalResult::Ambiguous(earliest, _) => Ok(earliest.timestamp()),
                LocalResult::None => Err(ReportError::Input(format!(
                    "{} does not exist in the local timezone",
                    naive.format(TIMESTAMP_FORMAT)
                ))),
            },
        }
    }
}

/// Parse one window edge in `YYYY-MM-DD_HH:MM` form
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).map_err(|e| {
        ReportError::Input(format!(
            "{:?} does not match format YYYY-MM-DD_HH:MM ({})",
            value, e
        ))
    })
}

/// Time window `(start, end)` with both edges exclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
    start_epoch: i64,
    end_epoch: i64,
}

impl TimeWindow {
    /// Build a window from already-parsed edges
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, timezone: Timezone) -> Result<Self> {
        let start_epoch = timezone.epoch_seconds(&start)?;
        let end_epoch = timezone.epoch_seconds(&end)?;
        if start_epoch > end_epoch {
            return Err(ReportError::Input(format!(
                "start date {} is after end date {}",
                start.format(FILE_NAME_FORMAT),
                end.format(FILE_NAME_FORMAT)
            )));
        }
        Ok(TimeWindow {
            start,
            end,
            start_epoch,
            end_epoch,
        })
    }

    /// Parse both edges from their CLI string form
    pub fn parse(start: &str, end: &str, timezone: Timezone) -> Result<Self> {
        Self::new(parse_timestamp(start)?, parse_timestamp(end)?, timezone)
    }

    /// Exclusive lower bound in epoch seconds
    pub fn start_epoch(&self) -> i64 {
        self.start_epoch
    }

    /// Exclusive upper bound in epoch seconds
    pub fn end_epoch(&self) -> i64 {
        self.end_epoch
    }

    /// Output file name: `report {start}-{end}.xlsx`
    pub fn report_file_name(&self) -> String {
        format!(
            "report {}-{}.xlsx",
            self.start.format(FILE_NAME_FORMAT),
            self.end.format(FILE_NAME_FORMAT)
        )
    }
}

/// Current time as epoch seconds with sub-second precision
pub fn now_epoch() -> f64 {
    let now: DateTime<Utc> = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_millis()) / 1000.0
}
