//! Display summaries derived from a horse's performance history.
//!
//! All functions take records ordered by date descending (most recent first), the order
//! returned by the store.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::names::{horse_display, jockey_for_display};
use crate::types::{FinishPosition, Horse, PerformanceRecord};

/// Marker shown for horses without a qualifying finish.
pub const DEBUT_MARKER: &str = "Debuta";

/// Lengths codes that are not measured in "cp" (nose, head, neck, ...).
const NON_LENGTH_CODES: &[&str] = &["S.A", "CZA", "PZO", "HCO"];

/// How many past results are rendered as lines.
const RESULT_LINES: usize = 2;

/// Everything a presentation layer needs about one horse.
#[derive(Debug, Clone, Serialize)]
pub struct HorseSummary {
    pub name: String,
    pub display_name: String,
    pub coat: String,
    pub jockey: String,
    pub pedigree: String,
    pub stable: String,
    pub trainer: String,
    pub age: Option<u32>,
    pub weight: Option<u32>,
    pub recent_form_listed: bool,
    pub last_four: String,
    pub debutant: bool,
    pub result_lines: Vec<String>,
}

impl HorseSummary {
    /// `"<age> <weight>"` cell as printed on a program
    pub fn age_weight(&self) -> String {
        let age = self.age.map(|a| a.to_string()).unwrap_or_default();
        let weight = self.weight.map(|w| w.to_string()).unwrap_or_default();
        format!("{} {}", age, weight).trim().to_string()
    }
}

/// Single position of the "4 Ult." marker
fn marker_cell(position: &FinishPosition) -> String {
    match position {
        FinishPosition::Placed(n) if *n >= 10 => "0".to_string(),
        FinishPosition::Placed(n) => n.to_string(),
        FinishPosition::Code(code) if code.trim().is_empty() => "-".to_string(),
        FinishPosition::Code(code) => code.trim().to_string(),
    }
}

/// Last four final positions, oldest on the left, e.g. `"7-3-0-5"`.
pub fn last_four_marker(records: &[PerformanceRecord]) -> String {
    if records.is_empty() {
        return DEBUT_MARKER.to_string();
    }
    let mut cells: Vec<String> = records
        .iter()
        .take(4)
        .map(|r| marker_cell(&r.final_position))
        .collect();
    cells.reverse();
    cells.join("-")
}

/// A horse stays a debutant until one of its records has a numeric final position.
pub fn is_debutant(records: &[PerformanceRecord]) -> bool {
    records.iter().all(|r| !r.final_position.is_numeric())
}

/// Marker shown on the program: "Debuta" for debutants, the last-four marker otherwise.
pub fn form_marker(records: &[PerformanceRecord]) -> String {
    if is_debutant(records) {
        DEBUT_MARKER.to_string()
    } else {
        last_four_marker(records)
    }
}

/// Age advanced by one for every July 1st after the last run and on or before `today`.
pub fn corrected_age(age: u32, last_run: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(last_run) = last_run else {
        return age;
    };

    let boundaries = (last_run.year()..=today.year())
        .filter_map(|year| NaiveDate::from_ymd_opt(year, 7, 1))
        .filter(|boundary| last_run < *boundary && *boundary <= today)
        .count();

    age + boundaries as u32
}

/// Lengths as fractions: `"1.25"` -> `"1 1/4"`, `"0.5"` -> `"1/2"`, `"2.0"` -> `"2"`.
/// Any other value, codes included, is returned unchanged.
pub fn format_fraction(raw: &str) -> String {
    let value = raw.trim().replace("cp", "");
    let value = value.trim();

    let Some((whole, decimals)) = value.split_once('.') else {
        return raw.trim().to_string();
    };
    if whole.is_empty()
        || decimals.is_empty()
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !decimals.chars().all(|c| c.is_ascii_digit())
    {
        return raw.trim().to_string();
    }

    let whole_number = whole.trim_start_matches('0');
    let fraction = match decimals.trim_end_matches('0') {
        "" => return if whole_number.is_empty() { "0" } else { whole_number }.to_string(),
        "25" => "1/4",
        "5" => "1/2",
        "75" => "3/4",
        _ => return raw.trim().to_string(),
    };

    if whole_number.is_empty() {
        fraction.to_string()
    } else {
        format!("{} {}", whole_number, fraction)
    }
}

/// Whether a lengths value is a code (nose, head, ...) rather than a measure
pub fn is_length_code(raw: &str) -> bool {
    let upper = raw.to_uppercase();
    NON_LENGTH_CODES.iter().any(|code| upper.contains(code))
}

/// Fraction-formatted lengths with the "cp" unit when it applies.
pub fn lengths_text(raw: &str) -> String {
    let formatted = format_fraction(raw);
    if is_length_code(raw) || formatted.is_empty() {
        formatted
    } else {
        format!("{} cp", formatted)
    }
}

/// Narrative line for one past performance.
///
/// `roster_jockey` is the full jockey name from the program, used when the results sheet
/// only carries initials. `runner_up_distanced` tells whether the runner-up of a won race
/// was later distanced.
pub fn result_line(record: &PerformanceRecord, roster_jockey: &str, runner_up_distanced: bool) -> String {
    let date = record.race_date.format("%d/%m/%y").to_string();

    if record.final_position.is_not_run() {
        let observation = record.observation.trim();
        return if observation.is_empty() {
            format!("{} - No Corrió", date)
        } else {
            format!("{} - No Corrió ({})", date, observation)
        };
    }

    let jockey = jockey_for_display(&record.jockey, roster_jockey);

    let outcome = if record.original_position == Some(1) {
        if record.runner_up.trim().is_empty() {
            "1º gan".to_string()
        } else {
            let mut runner_up = horse_display(&record.runner_up);
            if runner_up_distanced {
                runner_up.push_str(" (Dist.)");
            }
            format!("1º gan x {} a {}", lengths_text(&record.margin), runner_up)
        }
    } else {
        let position = record
            .original_position
            .map(|p| format!("{}º", p))
            .unwrap_or_default();
        format!(
            "{} a {} de {}",
            position,
            lengths_text(&record.lengths_behind),
            horse_display(&record.winner)
        )
    };

    let mut line = format!(
        "{} - {} - {} - {} - {}",
        date, jockey, outcome, record.winning_time, record.track_condition
    );

    let original = record.original_position.map(FinishPosition::Placed);
    if original.as_ref() != Some(&record.final_position) {
        line.push_str(" - Distanciado");
    }

    line
}

/// Derives summaries, evaluating ages as of `today`.
#[derive(Debug, Clone, Copy)]
pub struct DerivationEngine {
    today: NaiveDate,
}

impl DerivationEngine {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Summary of one horse.
    ///
    /// `runner_up_distanced(name, date)` reports whether another horse's record for that date
    /// was distanced; it is only consulted for races the horse won.
    pub fn summarize<F>(&self, horse: &Horse, records: &[PerformanceRecord], runner_up_distanced: F) -> HorseSummary
    where
        F: Fn(&str, NaiveDate) -> bool,
    {
        let debutant = is_debutant(records);
        let last_run = records.iter().map(|r| r.race_date).max();

        let result_lines = if debutant {
            Vec::new()
        } else {
            records
                .iter()
                .take(RESULT_LINES)
                .rev()
                .map(|r| {
                    let distanced = r.original_position == Some(1)
                        && !r.runner_up.is_empty()
                        && runner_up_distanced(&r.runner_up, r.race_date);
                    result_line(r, &horse.jockey, distanced)
                })
                .collect()
        };

        HorseSummary {
            name: horse.name.clone(),
            display_name: horse_display(&horse.name),
            coat: horse.coat.clone(),
            jockey: horse.jockey.clone(),
            pedigree: horse.pedigree.clone(),
            stable: horse.stable.clone(),
            trainer: horse.trainer.clone(),
            age: horse.age.map(|age| corrected_age(age, last_run, self.today)),
            weight: horse.weight,
            recent_form_listed: horse.recent_form_listed(),
            last_four: form_marker(records),
            debutant,
            result_lines,
        }
    }
}
