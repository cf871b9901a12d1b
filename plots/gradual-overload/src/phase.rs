use std::path::Path;

use chrono::{DateTime, FixedOffset};
use common::{error::PlotError, hexcolour, util::deserialize_timestamp};
use csv::{ReaderBuilder, Trim};
use plotters::style::RGBColor;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_PHASE_COLOUR: RGBColor = hexcolour!(0xFFFFFF);

const PHASE_COLOURS: [(&str, RGBColor); 8] = [
    ("INIT", hexcolour!(0x90EE90)),
    ("WARMUP", hexcolour!(0xFFD700)),
    ("LOAD_INCREASE", hexcolour!(0xFFA500)),
    ("FAILURE", hexcolour!(0xFF6347)),
    ("MITIGATION", hexcolour!(0x87CEEB)),
    ("RECOVERED", hexcolour!(0x98FB98)),
    ("STABLE", hexcolour!(0x32CD32)),
    ("PARTIAL_RECOVERY", hexcolour!(0xF0E68C)),
];

/// One row of `phase_transitions.csv`. The workload column is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhaseTransition {
    pub phase: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<FixedOffset>,
}

/// Interval during which a phase was active, in seconds since the test start.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSpan {
    pub phase: String,
    pub start: f64,
    pub end: f64,
}

impl PhaseSpan {
    pub fn colour(&self) -> RGBColor {
        phase_colour(&self.phase)
    }
}

pub fn parse_transitions(path: &Path, data: &str) -> Result<Vec<PhaseTransition>, PlotError> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(data.as_bytes())
        .deserialize()
        .map(|row| row.map_err(|e| PlotError::parse(path, e)))
        .collect()
}

pub fn phase_colour(phase: &str) -> RGBColor {
    match PHASE_COLOURS.iter().find(|(name, _)| *name == phase) {
        Some((_, colour)) => *colour,
        None => {
            warn!("Unknown phase {phase:?}, shading with the default colour");
            DEFAULT_PHASE_COLOUR
        }
    }
}

/// Turns transition times (already relative to the test start, in file order)
/// into spans. Each phase lasts until the next transition; the last one runs
/// until `end`.
pub fn phase_spans(transitions: &[(String, f64)], end: f64) -> Vec<PhaseSpan> {
    transitions
        .iter()
        .enumerate()
        .map(|(i, (phase, start))| PhaseSpan {
            phase: phase.clone(),
            start: *start,
            end: transitions.get(i + 1).map_or(end, |(_, next)| *next),
        })
        .collect()
}
