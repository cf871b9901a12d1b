use std::{
    ops::Range,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use chrono::{DateTime, FixedOffset};
use csv::StringRecord;
use itertools::{Itertools, MinMaxResult};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use tokio::fs::read_to_string;
use tracing::debug;

use crate::error::PlotError;

/// Width of the fractional-seconds field accepted by [`parse_timestamp`].
pub const FRACTION_DIGITS: usize = 6;

const NORMALIZED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%:z";

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<date>[0-9]{4}-[0-9]{2}-[0-9]{2})[T ](?P<time>[0-9]{2}:[0-9]{2}:[0-9]{2})(?:\.(?P<frac>[0-9]*))?(?P<tz>[Zz]|[+-][0-9]{2}:?[0-9]{2})?$",
    )
    .expect("timestamp regex")
});

/// Pads or truncates a fractional-seconds field to exactly six digits.
pub fn normalize_fraction(frac: &str) -> String {
    let mut out: String = frac.chars().take(FRACTION_DIGITS).collect();
    while out.len() < FRACTION_DIGITS {
        out.push('0');
    }
    out
}

/// Rewrites a timestamp into `YYYY-MM-DDTHH:MM:SS.ffffff±HH:MM`.
///
/// The fractional field may be any width (including empty or absent), the
/// offset may be `Z`, `±HH:MM`, `±HHMM` or absent (read as UTC).
pub fn normalize_timestamp(raw: &str) -> Result<String, PlotError> {
    let raw = raw.trim();
    let caps = TIMESTAMP_RE
        .captures(raw)
        .ok_or_else(|| PlotError::timestamp(raw, "not a calendar date-time"))?;

    let frac = normalize_fraction(caps.name("frac").map_or("", |m| m.as_str()));
    let offset = match caps.name("tz").map(|m| m.as_str()) {
        None | Some("Z") | Some("z") => "+00:00".to_owned(),
        Some(tz) => {
            let digits = tz[1..].replace(':', "");
            format!("{}{}:{}", &tz[..1], &digits[..2], &digits[2..])
        }
    };

    Ok(format!(
        "{}T{}.{frac}{offset}",
        &caps["date"], &caps["time"]
    ))
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, PlotError> {
    let normalized = normalize_timestamp(raw)?;
    DateTime::parse_from_str(&normalized, NORMALIZED_FORMAT)
        .map_err(|e| PlotError::timestamp(raw, e))
}

/// Serde adapter so row structs can hold parsed timestamps directly.
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn seconds_since(start: &DateTime<FixedOffset>, ts: &DateTime<FixedOffset>) -> f64 {
    let delta = *ts - *start;
    delta.num_seconds() as f64 + delta.subsec_nanos() as f64 / 1e9
}

/// Reads a whole input file, mapping I/O failures to [`PlotError::FileAccess`].
pub async fn read_input(path: &Path) -> Result<String, PlotError> {
    let data = read_to_string(path)
        .await
        .map_err(|source| PlotError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Read {} bytes from {}", data.len(), path.display());
    Ok(data)
}

/// Header positions of the columns a reader needs, looked up by name.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    path: PathBuf,
    headers: StringRecord,
}

impl ColumnIndex {
    pub fn new(path: &Path, headers: &StringRecord) -> Self {
        Self {
            path: path.to_path_buf(),
            headers: headers.clone(),
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h.trim() == column)
    }

    pub fn position(&self, column: &str) -> Result<usize, PlotError> {
        self.headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| PlotError::MissingColumn {
                path: self.path.clone(),
                column: column.to_owned(),
            })
    }

    pub fn field<'r>(
        &self,
        record: &'r StringRecord,
        idx: usize,
        line: u64,
    ) -> Result<&'r str, PlotError> {
        record.get(idx).map(str::trim).ok_or_else(|| {
            PlotError::parse(
                &self.path,
                format!("line {line}: missing field {}", &self.headers[idx]),
            )
        })
    }

    pub fn float(&self, record: &StringRecord, idx: usize, line: u64) -> Result<f64, PlotError> {
        let raw = self.field(record, idx, line)?;
        raw.parse::<f64>().map_err(|e| {
            PlotError::parse(
                &self.path,
                format!("line {line}: {} = {raw:?}: {e}", &self.headers[idx]),
            )
        })
    }
}

/// Axis range covering `values` with a small margin, never zero-width.
pub fn padded_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (min, max) = match values
        .into_iter()
        .filter(|v| v.is_finite())
        .minmax_by(|a, b| a.total_cmp(b))
    {
        MinMaxResult::NoElements => return 0.0..1.0,
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(min, max) => (min, max),
    };
    let span = max - min;
    if span <= f64::EPSILON {
        let pad = if min.abs() > f64::EPSILON { min.abs() * 0.05 } else { 1.0 };
        return (min - pad)..(max + pad);
    }
    let pad = span * 0.05;
    (min - pad)..(max + pad)
}
