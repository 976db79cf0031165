//! Keyword tables driving block detection and annotation classification.
//!
//! The rules are data: each table maps a keyword (matched case-insensitively against the
//! block text) to an outcome, and the first matching entry wins.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::TrackCondition;

/// Track-condition keywords in priority order. No match means a normal track.
pub const TRACK_CONDITION_RULES: &[(&str, TrackCondition)] = &[
    ("barrosa", TrackCondition::Muddy),
    ("pesada", TrackCondition::Heavy),
    ("humeda", TrackCondition::Damp),
    ("húmeda", TrackCondition::Damp),
    ("fangosa", TrackCondition::Sloppy),
    ("normal", TrackCondition::Normal),
];

/// Phrase meaning every declared horse started.
pub const ALL_STARTED: &str = "corrieron todos";

/// Cell keyword marking a distancing note.
pub const DISTANCING_KEYWORDS: &[&str] = &["distanciad"];

/// Cell keywords marking a track incident note (fall, loose horse, unseated rider).
pub const INCIDENT_KEYWORDS: &[&str] = &["tierra", "rodó", "suelta"];

/// Cell keywords ending the results table (dead heat / split purse).
pub const DEAD_HEAT_KEYWORDS: &[&str] = &["divid"];

/// Distancing note keywords that send the horse to the last place.
pub const MOVED_TO_LAST_KEYWORDS: &[&str] = &["ultim", "últim"];

/// `"<n>º CARRERA"` / `"<n>ª CARRERA"` race marker
pub fn race_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\d+\s*[ºª°]\s*CARRERA").unwrap())
}

/// Segment after the "tiempo" keyword
pub fn time_segment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)tiempo\s*[:\-]?\s*(.*)").unwrap())
}

/// `1'13"`, `1' 13" 1/5`
pub fn minutes_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\d+)\s*'\s*(\d{1,2})\s*"\s*(\d\s*/\s*\d)?"#).unwrap())
}

/// `44"`, `44" 4/5`
pub fn seconds_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\d{1,2})\s*"\s*(\d\s*/\s*\d)?"#).unwrap())
}

/// Segment listing the horses that did not start, up to the next period
pub fn non_starters_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)NO\s+CORRI(?:ERON|ERÓN|ó|o|on|ón)\s*[:=]\s*(.+?)(?:\.|$)").unwrap()
    })
}

/// Separators between non-starter entries: commas or " y "
pub fn non_starter_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s*,\s*|\s+y\s+").unwrap())
}

/// `(7) NAME (reason)`
pub fn non_starter_entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\((\d+)\)\s*([A-Za-z0-9 .'\-ÑñÁÉÍÓÚÜáéíóú]+?)(?:\s*\(([^)]+)\))?$").unwrap()
    })
}

/// Explicit target position in a distancing note, e.g. "distanciado al 5º"
pub fn distancing_target_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)al\s*(\d+)").unwrap())
}

/// `(*)` marker on a finisher row
pub fn asterisk_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(\s*\*\s*\)").unwrap())
}

/// Case-insensitive containment of any keyword.
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
}

/// First outcome of `rules` whose keyword occurs in `text`.
pub fn classify<T: Copy>(text: &str, rules: &[(&str, T)]) -> Option<T> {
    let lower = text.to_lowercase();
    rules
        .iter()
        .find(|(keyword, _)| lower.contains(&keyword.to_lowercase()))
        .map(|(_, outcome)| *outcome)
}

/// Track condition of a block text, defaulting to a normal track.
pub fn track_condition(text: &str) -> TrackCondition {
    classify(text, TRACK_CONDITION_RULES).unwrap_or_default()
}
