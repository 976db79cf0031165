//! Domain types shared by the ingestion pipeline, the store and the derivations.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Final position code for a horse that did not start.
pub const NOT_RUN: &str = "NC";

/// Final position code for an asterisk finisher that no distancing note resolved.
pub const UNRESOLVED: &str = "*";

/// Placeholder used when a winning time cannot be read.
pub const NOT_AVAILABLE: &str = "N/D";

fn numeric_position_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(\.0+)?$").unwrap())
}

/// Final finish position: a numeric placing or a literal code ("NC", "*", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FinishPosition {
    Placed(u32),
    Code(String),
}

impl FinishPosition {
    /// Parse a stored or raw position. Only `^\d+(\.0+)?$` is numeric; values past `u32`
    /// saturate.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if numeric_position_re().is_match(s) {
            let digits = s.split('.').next().unwrap_or(s);
            return FinishPosition::Placed(digits.parse::<u32>().unwrap_or(u32::MAX));
        }
        FinishPosition::Code(s.to_string())
    }

    pub fn not_run() -> Self {
        FinishPosition::Code(NOT_RUN.to_string())
    }

    pub fn unresolved() -> Self {
        FinishPosition::Code(UNRESOLVED.to_string())
    }

    pub fn as_number(&self) -> Option<u32> {
        match self {
            FinishPosition::Placed(n) => Some(*n),
            FinishPosition::Code(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }

    pub fn is_not_run(&self) -> bool {
        matches!(self, FinishPosition::Code(c) if c.eq_ignore_ascii_case(NOT_RUN))
    }
}

impl fmt::Display for FinishPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishPosition::Placed(n) => write!(f, "{}", n),
            FinishPosition::Code(c) => write!(f, "{}", c),
        }
    }
}

/// Track condition as reported in a results block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackCondition {
    Muddy,  // barrosa
    Heavy,  // pesada
    Damp,   // húmeda
    Sloppy, // fangosa
    #[default]
    Normal,
}

impl TrackCondition {
    /// Short code printed in result lines
    pub fn code(&self) -> &'static str {
        match self {
            TrackCondition::Muddy => "PB",
            TrackCondition::Heavy => "PP",
            TrackCondition::Damp => "PH",
            TrackCondition::Sloppy => "PF",
            TrackCondition::Normal => "PN",
        }
    }
}

/// Horse profile as last seen on a program sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Horse {
    /// Normalized storage key
    pub name: String,
    pub pedigree: String,
    pub coat: String,
    /// Jockey as listed on the roster (full name)
    pub jockey: String,
    pub stable: String,
    pub trainer: String,
    pub age: Option<u32>,
    pub weight: Option<u32>,
    /// Raw "4 Ult." text from the roster, blank for debutants
    pub last_form: String,
    pub snapshot_date: Option<NaiveDate>,
}

impl Horse {
    /// Whether the roster showed a real last-form marker
    pub fn recent_form_listed(&self) -> bool {
        !self.last_form.trim().is_empty()
    }
}

/// One finish (or non-start) of a horse in a race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub race_date: NaiveDate,
    pub horse_name: String,
    pub original_position: Option<u32>,
    pub final_position: FinishPosition,
    pub jockey: String,
    pub lengths_behind: String,
    pub winner: String,
    pub runner_up: String,
    pub margin: String,
    pub winning_time: String,
    pub track_condition: String,
    pub distanced: bool,
    pub observation: String,
}

impl PerformanceRecord {
    /// Record for a horse that was declared but did not start
    pub fn not_run(race_date: NaiveDate, horse_name: &str, reason: &str) -> Self {
        let observation = if reason.trim().is_empty() {
            "No corrió".to_string()
        } else {
            reason.trim().to_string()
        };
        Self {
            race_date,
            horse_name: horse_name.to_string(),
            original_position: None,
            final_position: FinishPosition::not_run(),
            jockey: String::new(),
            lengths_behind: String::new(),
            winner: String::new(),
            runner_up: String::new(),
            margin: String::new(),
            winning_time: String::new(),
            track_condition: String::new(),
            distanced: false,
            observation,
        }
    }
}

/// Horse listed under "no corrieron" in a results block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonStarter {
    pub dorsal: u32,
    pub name: String,
    pub reason: String,
}
