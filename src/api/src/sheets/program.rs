//! Program (roster) sheet parser.
//!
//! A program sheet lists each race's entries under a header row containing "Caballo".
//! Columns are located once per header by keyword and every row beneath it is read through
//! that mapping.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::names::horse_key;

use super::grid::Grid;

fn age_weight_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\D*(\d{1,2})\s+(\d{2,3})\D*$").unwrap())
}

fn date_like_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{2,4}").unwrap())
}

/// Column positions resolved from one header row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterColumns {
    pub horse: Option<usize>,
    pub coat: Option<usize>,
    pub jockey: Option<usize>,
    pub age_weight: Option<usize>,
    pub pedigree: Option<usize>,
    pub stable: Option<usize>,
    pub trainer: Option<usize>,
    pub last_form: Option<usize>,
}

impl RosterColumns {
    /// Resolve columns by keyword against a header row
    pub fn resolve(header: &[String]) -> Self {
        let find = |keyword: &str| {
            header
                .iter()
                .position(|cell| cell.to_lowercase().contains(keyword))
        };
        Self {
            horse: find("caballo"),
            coat: find("pelo"),
            jockey: find("jockey"),
            age_weight: find("kg"),
            pedigree: find("padre"),
            stable: find("caballeriza"),
            trainer: find("cuidador"),
            last_form: find("ult."),
        }
    }

    fn read<'a>(&self, grid: &'a Grid, row: usize, col: Option<usize>) -> &'a str {
        col.map(|c| grid.cell(row, c).trim()).unwrap_or("")
    }
}

/// Why a candidate row was not taken as a horse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingHorseColumn,
    Blank,
    LooksLikeDate,
    QuotedTitle,
    NoLetters,
    NoSupportingCells,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::MissingHorseColumn => "sin índice CABALLO",
            RejectReason::Blank => "vacío",
            RejectReason::LooksLikeDate => "parece fecha",
            RejectReason::QuotedTitle => "título con comillas",
            RejectReason::NoLetters => "sin letras",
            RejectReason::NoSupportingCells => "sin E Kg y sin columnas de apoyo",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A candidate row that was rejected, kept for offline review.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub row: usize,
    pub reason: RejectReason,
    pub cells: Vec<String>,
}

/// Horse row read from a program sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterEntry {
    pub name: String,
    pub coat: String,
    pub jockey: String,
    pub age: Option<u32>,
    pub weight: Option<u32>,
    pub pedigree: String,
    pub stable: String,
    pub trainer: String,
    /// "4 Ult." text, blank when the roster marks a debut
    pub last_form: String,
}

/// Result of parsing one program sheet.
#[derive(Debug, Clone, Default)]
pub struct ProgramSheet {
    pub entries: Vec<RosterEntry>,
    pub rejections: Vec<Rejection>,
}

/// Parser for program sheets
pub struct ProgramParser;

impl ProgramParser {
    /// Parse every header block of a program grid. No header means no data.
    pub fn parse(grid: &Grid) -> ProgramSheet {
        let headers: Vec<usize> = (0..grid.height())
            .filter(|&r| grid.row(r).iter().any(|c| c.to_lowercase().contains("caballo")))
            .collect();

        let mut sheet = ProgramSheet::default();

        for (i, &header) in headers.iter().enumerate() {
            let columns = RosterColumns::resolve(grid.row(header));
            if columns.horse.is_none() {
                continue;
            }
            let end = headers.get(i + 1).copied().unwrap_or(grid.height());

            for row in (header + 1)..end {
                if grid.row(row).iter().all(|c| c.is_empty()) {
                    continue;
                }
                match Self::check_candidate(grid, row, &columns) {
                    Ok(()) => sheet.entries.push(Self::read_entry(grid, row, &columns)),
                    Err(reason) => sheet.rejections.push(Rejection {
                        row,
                        reason,
                        cells: grid.row(row).to_vec(),
                    }),
                }
            }
        }

        sheet
    }

    /// Loose check that a row describes a horse rather than a title or a note.
    fn check_candidate(grid: &Grid, row: usize, columns: &RosterColumns) -> Result<(), RejectReason> {
        let Some(horse_col) = columns.horse else {
            return Err(RejectReason::MissingHorseColumn);
        };

        let name = grid.cell(row, horse_col).trim().to_uppercase();
        if name.is_empty() {
            return Err(RejectReason::Blank);
        }
        if date_like_re().is_match(&name) {
            return Err(RejectReason::LooksLikeDate);
        }
        if name.contains('"') {
            return Err(RejectReason::QuotedTitle);
        }
        if !name.chars().any(char::is_alphabetic) {
            return Err(RejectReason::NoLetters);
        }

        let has_letters = |col: Option<usize>| {
            col.map(|c| grid.cell(row, c).chars().any(char::is_alphabetic))
                .unwrap_or(false)
        };
        let age_weight_ok = age_weight_re().is_match(columns.read(grid, row, columns.age_weight));

        if age_weight_ok
            || has_letters(columns.jockey)
            || has_letters(columns.stable)
            || has_letters(columns.pedigree)
        {
            Ok(())
        } else {
            Err(RejectReason::NoSupportingCells)
        }
    }

    fn read_entry(grid: &Grid, row: usize, columns: &RosterColumns) -> RosterEntry {
        let (age, weight) = parse_age_weight(columns.read(grid, row, columns.age_weight));

        let mut last_form = columns.read(grid, row, columns.last_form).to_string();
        if last_form.to_lowercase().contains("debuta") {
            last_form.clear();
        }

        RosterEntry {
            name: horse_key(columns.read(grid, row, columns.horse)),
            coat: columns.read(grid, row, columns.coat).to_string(),
            jockey: columns.read(grid, row, columns.jockey).to_string(),
            age,
            weight,
            pedigree: columns.read(grid, row, columns.pedigree).to_string(),
            stable: columns.read(grid, row, columns.stable).to_string(),
            trainer: columns.read(grid, row, columns.trainer).to_string(),
            last_form,
        }
    }
}

/// `"4 56"` -> (4, 56). Anything else yields no values.
pub fn parse_age_weight(text: &str) -> (Option<u32>, Option<u32>) {
    match age_weight_re().captures(text.trim()) {
        Some(caps) => (caps[1].parse().ok(), caps[2].parse().ok()),
        None => (None, None),
    }
}
