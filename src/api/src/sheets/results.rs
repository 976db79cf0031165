//! Performance records from one race block.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::names::horse_key;
use crate::types::{FinishPosition, PerformanceRecord};

use super::grid::Grid;
use super::keywords::{self, DEAD_HEAT_KEYWORDS};
use super::race_block::{Distancing, RaceBlock};

/// Column layout of a results table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultColumns {
    pub position: usize,
    pub horse: usize,
    pub jockey: usize,
    pub lengths: usize,
}

impl Default for ResultColumns {
    fn default() -> Self {
        Self {
            position: 1,
            horse: 2,
            jockey: 4,
            lengths: 7,
        }
    }
}

/// A horse that crossed the line, in arrival order.
#[derive(Debug, Clone, PartialEq)]
struct Finisher {
    name: String,
    position: u32,
    jockey: String,
    lengths: String,
    asterisk: bool,
}

/// Builds performance records for one race block
pub struct ResultRecordBuilder {
    columns: ResultColumns,
}

impl Default for ResultRecordBuilder {
    fn default() -> Self {
        Self::new(ResultColumns::default())
    }
}

impl ResultRecordBuilder {
    pub fn new(columns: ResultColumns) -> Self {
        Self { columns }
    }

    /// Records for every finisher and every non-starter of the block.
    pub fn build(&self, grid: &Grid, block: &RaceBlock, race_date: NaiveDate) -> Vec<PerformanceRecord> {
        let finishers = match block.results_start {
            Some(start) => self.walk_finishers(grid, start, block.end),
            None => Vec::new(),
        };

        if finishers.is_empty() {
            return block
                .non_starters
                .iter()
                .map(|nc| Self::non_starter_record(block, race_date, &nc.name, &nc.reason))
                .collect();
        }

        let winner = finishers[0].name.clone();
        let (runner_up, margin) = finishers
            .get(1)
            .map(|f| (f.name.clone(), f.lengths.clone()))
            .unwrap_or_default();

        let target = block.distancing().and_then(|rule| match rule {
            Distancing::To(n) => Some(n),
            Distancing::ToLast => Some(finishers.len() as u32),
            Distancing::Unspecified => None,
        });

        let mut records: Vec<PerformanceRecord> = finishers
            .iter()
            .map(|f| {
                let mut final_position = FinishPosition::Placed(f.position);
                let mut distanced = false;
                let mut observation = String::new();

                if f.asterisk {
                    if let Some(target) = target {
                        final_position = FinishPosition::Placed(target);
                        distanced = true;
                    } else if let Some(note) = &block.incident_note {
                        final_position = FinishPosition::unresolved();
                        observation = clean_note(note);
                    }
                }

                PerformanceRecord {
                    race_date,
                    horse_name: f.name.clone(),
                    original_position: Some(f.position),
                    final_position,
                    jockey: f.jockey.clone(),
                    lengths_behind: f.lengths.clone(),
                    winner: winner.clone(),
                    runner_up: runner_up.clone(),
                    margin: margin.clone(),
                    winning_time: block.winning_time.clone(),
                    track_condition: block.track_condition.code().to_string(),
                    distanced,
                    observation,
                }
            })
            .collect();

        let present: HashSet<&str> = finishers.iter().map(|f| f.name.as_str()).collect();
        for nc in &block.non_starters {
            if present.contains(nc.name.as_str()) {
                continue;
            }
            let mut record = Self::non_starter_record(block, race_date, &nc.name, &nc.reason);
            record.winner = winner.clone();
            record.runner_up = runner_up.clone();
            record.margin = margin.clone();
            records.push(record);
        }

        records
    }

    /// Walk the results table until a dead-heat note or a blank row.
    fn walk_finishers(&self, grid: &Grid, start: usize, end: usize) -> Vec<Finisher> {
        let marker = keywords::asterisk_marker_re();
        let mut finishers = Vec::new();

        for row in start..end {
            let cells = grid.row(row);
            if cells.iter().any(|c| keywords::contains_any(c, DEAD_HEAT_KEYWORDS)) {
                break;
            }

            let raw_name = grid.cell(row, self.columns.horse).trim();
            if raw_name.is_empty() {
                if grid.is_blank_row(row) {
                    break;
                }
                continue;
            }

            let name = horse_key(&marker.replace_all(&raw_name.to_uppercase(), ""));
            if name.is_empty() {
                continue;
            }

            finishers.push(Finisher {
                name,
                position: finishers.len() as u32 + 1,
                jockey: grid.cell(row, self.columns.jockey).trim().to_string(),
                lengths: grid.cell(row, self.columns.lengths).trim().to_string(),
                asterisk: cells.iter().any(|c| marker.is_match(c)),
            });
        }

        finishers
    }

    fn non_starter_record(
        block: &RaceBlock,
        race_date: NaiveDate,
        name: &str,
        reason: &str,
    ) -> PerformanceRecord {
        let mut record = PerformanceRecord::not_run(race_date, name, reason);
        record.winning_time = block.winning_time.clone();
        record.track_condition = block.track_condition.code().to_string();
        record
    }
}

/// Incident note text without its leading `(*)` marker
fn clean_note(note: &str) -> String {
    let note = note.trim();
    let rest = match keywords::asterisk_marker_re().find(note) {
        Some(marker) if marker.start() == 0 => &note[marker.end()..],
        _ => note,
    };
    rest.trim_start_matches('*').trim().to_string()
}

/// All records of a results grid, block after block.
pub fn records_from_grid(grid: &Grid, race_date: NaiveDate) -> Vec<PerformanceRecord> {
    let builder = ResultRecordBuilder::default();
    super::RaceBlockParser::parse(grid)
        .iter()
        .flat_map(|block| builder.build(grid, block, race_date))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::RaceBlockParser;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 16).unwrap()
    }

    fn row(pos: &str, horse: &str, jockey: &str, lengths: &str) -> Vec<String> {
        vec![
            String::new(),
            pos.to_string(),
            horse.to_string(),
            String::new(),
            jockey.to_string(),
            String::new(),
            String::new(),
            lengths.to_string(),
        ]
    }

    fn line(text: &str) -> Vec<String> {
        vec![text.to_string()]
    }

    fn build(rows: Vec<Vec<String>>) -> Vec<PerformanceRecord> {
        records_from_grid(&Grid::new(rows), date())
    }

    #[test]
    fn test_plain_finish() {
        let records = build(vec![
            line("1º CARRERA"),
            row("1", "Alfa", "Vai Angel", ""),
            row("2", "BETA", "Vizcarra Jose A.", "1.5"),
            row("3", "GAMMA", "Perez Juan", "3"),
            line("Tiempo: 58\" 2/5"),
        ]);

        assert_eq!(records.len(), 3);
        let beta = &records[1];
        assert_eq!(beta.horse_name, "BETA");
        assert_eq!(beta.original_position, Some(2));
        assert_eq!(beta.final_position, FinishPosition::Placed(2));
        assert_eq!(beta.winner, "ALFA");
        assert_eq!(beta.runner_up, "BETA");
        assert_eq!(beta.margin, "1.5");
        assert_eq!(beta.lengths_behind, "1.5");
        assert_eq!(beta.jockey, "Vizcarra Jose A.");
        assert_eq!(beta.track_condition, "PN");
        assert!(!beta.distanced);
    }

    #[test]
    fn test_distanced_to_last() {
        let records = build(vec![
            line("1º CARRERA"),
            row("1", "A", "", ""),
            row("2", "B (*)", "", "1"),
            row("3", "C", "", "2"),
            vec![String::new()],
            line("(*) B distanciado al último puesto"),
        ]);

        let by_name = |n: &str| records.iter().find(|r| r.horse_name == n).unwrap();
        assert_eq!(by_name("A").final_position, FinishPosition::Placed(1));
        assert_eq!(by_name("B").final_position, FinishPosition::Placed(3));
        assert!(by_name("B").distanced);
        assert_eq!(by_name("B").original_position, Some(2));
        assert_eq!(by_name("C").final_position, FinishPosition::Placed(3));
        assert!(!by_name("C").distanced);
    }

    #[test]
    fn test_distanced_to_explicit_position() {
        let records = build(vec![
            line("1º CARRERA"),
            row("1", "A (*)", "", ""),
            row("2", "B", "", "1"),
            row("3", "C", "", "2"),
            row("4", "D", "", "3"),
            vec![String::new()],
            line("(*) Distanciado al 4º puesto"),
        ]);
        assert_eq!(records[0].final_position, FinishPosition::Placed(4));
        assert!(records[0].distanced);
        assert_eq!(records[0].winner, "A");
    }

    #[test]
    fn test_incident_marks_unresolved() {
        let records = build(vec![
            line("1º CARRERA"),
            row("1", "A", "", ""),
            row("2", "B", "", "1"),
            row("3", "C(*)", "", ""),
            vec![String::new()],
            line("(*) Rodó en la recta"),
        ]);
        let c = &records[2];
        assert_eq!(c.horse_name, "C");
        assert_eq!(c.final_position, FinishPosition::unresolved());
        assert_eq!(c.observation, "Rodó en la recta");
        assert!(!c.distanced);
    }

    #[test]
    fn test_distancing_takes_precedence_over_incident() {
        let records = build(vec![
            line("1º CARRERA"),
            row("1", "A", "", ""),
            row("2", "B (*)", "", "1"),
            vec![String::new()],
            line("(*) Rodó y fue distanciado al 2"),
        ]);
        assert_eq!(records[1].final_position, FinishPosition::Placed(2));
        assert!(records[1].distanced);
        assert!(records[1].observation.is_empty());
    }

    #[test]
    fn test_non_starters_without_results_table() {
        let records = build(vec![
            line("5º CARRERA"),
            line("Pista fangosa"),
            line("No corrieron: (2) XRAY (enferma) y (5) YANKEE."),
        ]);

        assert_eq!(records.len(), 2);
        for rec in &records {
            assert!(rec.final_position.is_not_run());
            assert!(!rec.final_position.is_numeric());
            assert_eq!(rec.original_position, None);
            assert!(rec.winner.is_empty());
            assert!(rec.runner_up.is_empty());
            assert_eq!(rec.track_condition, "PF");
        }
        assert_eq!(records[0].horse_name, "XRAY");
        assert_eq!(records[0].observation, "enferma");
        assert_eq!(records[1].observation, "No corrió");
    }

    #[test]
    fn test_non_starters_alongside_finishers() {
        let records = build(vec![
            line("1º CARRERA"),
            row("1", "A", "", ""),
            row("2", "B", "", "Cza"),
            vec![String::new()],
            line("No corrieron: (3) B, (4) ZULU (rengo)."),
        ]);

        assert_eq!(records.len(), 3);
        let zulu = &records[2];
        assert_eq!(zulu.horse_name, "ZULU");
        assert!(zulu.final_position.is_not_run());
        assert_eq!(zulu.winner, "A");
        assert_eq!(zulu.runner_up, "B");
        assert_eq!(zulu.margin, "Cza");
        assert_eq!(zulu.observation, "rengo");
    }

    #[test]
    fn test_walk_stops_at_dead_heat_and_skips_partial_rows() {
        let records = build(vec![
            line("1º CARRERA"),
            row("1", "A", "", ""),
            vec!["nota".to_string()],
            row("2", "B", "", "1"),
            line("Se dividió el premio"),
            row("3", "C", "", "2"),
        ]);
        let names: Vec<_> = records.iter().map(|r| r.horse_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(records[1].original_position, Some(2));
    }

    #[test]
    fn test_blocks_are_independent() {
        let grid = Grid::new(vec![
            line("1º CARRERA"),
            row("1", "A", "", ""),
            line("2º CARRERA"),
            row("1", "B", "", ""),
            row("2", "C", "", "hco"),
        ]);
        assert_eq!(RaceBlockParser::parse(&grid).len(), 2);
        let records = records_from_grid(&grid, date());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].runner_up, "");
        assert_eq!(records[2].winner, "B");
    }

    #[test]
    fn test_clean_note() {
        assert_eq!(clean_note(" (*) Se soltó la montura "), "Se soltó la montura");
        assert_eq!(clean_note("rodó"), "rodó");
        assert_eq!(
            clean_note("(*) Rodó en la curva (lado interno)"),
            "Rodó en la curva (lado interno)"
        );
        assert_eq!(clean_note("* Suelta en la largada"), "Suelta en la largada");
    }

    #[test]
    fn test_jockey_name_is_not_an_incident() {
        let records = build(vec![
            line("1º CARRERA"),
            row("1", "A", "Gomez Rodolfo", ""),
            row("2", "B (*)", "Vai Angel", "1"),
            vec![String::new()],
            line("(*) fue distanciado"),
        ]);
        let b = &records[1];
        assert_eq!(b.horse_name, "B");
        assert_eq!(b.final_position, FinishPosition::Placed(2));
        assert!(b.observation.is_empty());
        assert!(!b.distanced);
    }
}
