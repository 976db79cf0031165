//! Race block segmentation for results sheets.
//!
//! A results sheet holds several races one below the other. Each race starts on a row
//! containing `"<n>º CARRERA"` and runs until the next marker or the end of the sheet.

use crate::types::{NonStarter, TrackCondition, NOT_AVAILABLE};

use super::grid::Grid;
use super::keywords::{
    self, ALL_STARTED, DISTANCING_KEYWORDS, INCIDENT_KEYWORDS, MOVED_TO_LAST_KEYWORDS,
};

/// How a distancing note relocates an asterisk-marked finisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distancing {
    /// Moved to an explicit position
    To(u32),
    /// Moved behind every other finisher
    ToLast,
    /// Note present but no target could be read
    Unspecified,
}

/// One race of a results sheet with its block-level annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceBlock {
    /// First row (the marker row)
    pub start: usize,
    /// One past the last row
    pub end: usize,
    pub track_condition: TrackCondition,
    /// Formatted winning time or "N/D"
    pub winning_time: String,
    pub non_starters: Vec<NonStarter>,
    pub distancing_note: Option<String>,
    pub incident_note: Option<String>,
    /// First row of the results table, if any
    pub results_start: Option<usize>,
}

impl RaceBlock {
    /// Relocation rule carried by the distancing note
    pub fn distancing(&self) -> Option<Distancing> {
        self.distancing_note.as_deref().map(parse_distancing)
    }
}

/// Parser for race blocks
pub struct RaceBlockParser;

impl RaceBlockParser {
    /// Split a results grid into race blocks. A grid without markers yields no blocks.
    pub fn parse(grid: &Grid) -> Vec<RaceBlock> {
        let starts = Self::find_block_starts(grid);

        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(grid.height());
                Self::parse_block(grid, start, end)
            })
            .collect()
    }

    /// Rows containing a race marker in any cell
    pub fn find_block_starts(grid: &Grid) -> Vec<usize> {
        let marker = keywords::race_marker_re();
        (0..grid.height())
            .filter(|&r| grid.row(r).iter().any(|c| marker.is_match(c)))
            .collect()
    }

    fn parse_block(grid: &Grid, start: usize, end: usize) -> RaceBlock {
        let text = grid.text(start, end);

        RaceBlock {
            start,
            end,
            track_condition: keywords::track_condition(&text),
            winning_time: extract_winning_time(&text),
            non_starters: parse_non_starters(&text),
            distancing_note: find_note(grid, start, end, DISTANCING_KEYWORDS),
            incident_note: find_note(grid, start, end, INCIDENT_KEYWORDS),
            results_start: find_results_start(grid, start, end),
        }
    }
}

/// First cell of the block mentioning one of the keywords. Finisher rows are not notes.
fn find_note(grid: &Grid, start: usize, end: usize, words: &[&str]) -> Option<String> {
    (start..end)
        .filter(|&r| !is_results_row(grid, r))
        .flat_map(|r| grid.row(r).iter())
        .find(|c| keywords::contains_any(c, words))
        .map(|c| c.trim().to_string())
}

/// Position column holds a number (or "U") and the horse column is filled.
fn is_results_row(grid: &Grid, row: usize) -> bool {
    let position = grid.cell(row, 1).trim().to_uppercase();
    let horse = grid.cell(row, 2).trim();
    let numeric = !position.is_empty() && position.chars().all(|c| c.is_ascii_digit());
    (numeric || position == "U") && !horse.is_empty()
}

/// First results row after the marker
fn find_results_start(grid: &Grid, start: usize, end: usize) -> Option<usize> {
    ((start + 1)..end).find(|&r| is_results_row(grid, r))
}

fn clean_fraction(frac: Option<regex::Match<'_>>) -> String {
    frac.map(|m| {
        let compact: String = m.as_str().chars().filter(|c| !c.is_whitespace()).collect();
        format!(" {}", compact)
    })
    .unwrap_or_default()
}

/// Winning time as `m'ss" f/5` or `ss" f/5`, or "N/D" when neither shape is present.
pub fn extract_winning_time(text: &str) -> String {
    let segment = keywords::time_segment_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    if let Some(caps) = keywords::minutes_time_re().captures(segment) {
        let minutes: u32 = caps[1].parse().unwrap_or(0);
        let seconds: u32 = caps[2].parse().unwrap_or(0);
        return format!("{}'{:02}\"{}", minutes, seconds, clean_fraction(caps.get(3)));
    }

    if let Some(caps) = keywords::seconds_time_re().captures(segment) {
        let seconds: u32 = caps[1].parse().unwrap_or(0);
        return format!("{}\"{}", seconds, clean_fraction(caps.get(2)));
    }

    NOT_AVAILABLE.to_string()
}

/// Horses declared as non-starters, e.g. `"No corrieron: (3) ALFA (enferma) y (7) BETA."`
pub fn parse_non_starters(text: &str) -> Vec<NonStarter> {
    if text.to_lowercase().contains(ALL_STARTED) {
        return Vec::new();
    }

    let Some(caps) = keywords::non_starters_re().captures(text) else {
        return Vec::new();
    };

    keywords::non_starter_split_re()
        .split(&caps[1])
        .filter_map(|part| {
            let entry = keywords::non_starter_entry_re().captures(part.trim())?;
            Some(NonStarter {
                dorsal: entry[1].parse().ok()?,
                name: crate::names::horse_key(&entry[2]),
                reason: entry
                    .get(3)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// Read the relocation rule of a distancing note
pub fn parse_distancing(note: &str) -> Distancing {
    if keywords::contains_any(note, MOVED_TO_LAST_KEYWORDS) {
        return Distancing::ToLast;
    }
    keywords::distancing_target_re()
        .captures(note)
        .and_then(|caps| caps[1].parse().ok())
        .map(Distancing::To)
        .unwrap_or(Distancing::Unspecified)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results_grid() -> Grid {
        Grid::from_rows([
            vec!["Resultados 16-02-25", "", "", "", "", "", "", ""],
            vec!["1º CARRERA - Premio Apertura", "", "", "", "", "", "", ""],
            vec!["", "Pº", "Caballo", "", "Jockey", "", "", "Cuerpos"],
            vec!["", "1", "ALFA", "", "Vai Angel", "", "", ""],
            vec!["", "2", "BETA", "", "Vizcarra Jose A.", "", "", "1.5"],
            vec!["", "", "", "", "", "", "", ""],
            vec!["Tiempo: 1'13\" 1/5 - Pista barrosa", "", "", "", "", "", "", ""],
            vec!["2ª CARRERA", "", "", "", "", "", "", ""],
            vec!["No corrieron: (4) GAMMA (enferma) y (6) DELTA.", "", "", "", "", "", "", ""],
        ])
    }

    #[test]
    fn test_block_boundaries() {
        let blocks = RaceBlockParser::parse(&results_grid());
        assert_eq!(blocks.len(), 2);
        assert_eq!((blocks[0].start, blocks[0].end), (1, 7));
        assert_eq!((blocks[1].start, blocks[1].end), (7, 9));
    }

    #[test]
    fn test_no_markers_means_no_blocks() {
        let grid = Grid::from_rows([vec!["Programa", "caballo"], vec!["x", "y"]]);
        assert!(RaceBlockParser::parse(&grid).is_empty());
    }

    #[test]
    fn test_block_annotations() {
        let blocks = RaceBlockParser::parse(&results_grid());

        let first = &blocks[0];
        assert_eq!(first.track_condition, TrackCondition::Muddy);
        assert_eq!(first.winning_time, "1'13\" 1/5");
        assert_eq!(first.results_start, Some(3));
        assert!(first.non_starters.is_empty());

        let second = &blocks[1];
        assert_eq!(second.track_condition, TrackCondition::Normal);
        assert_eq!(second.winning_time, NOT_AVAILABLE);
        assert_eq!(second.results_start, None);
        assert_eq!(second.non_starters.len(), 2);
    }

    #[test]
    fn test_finisher_rows_are_not_notes() {
        let grid = Grid::from_rows([
            vec!["1º CARRERA", "", "", "", ""],
            vec!["", "1", "ALFA", "", "Gomez Rodolfo"],
            vec!["", "2", "BETA (*)", "", "Tierrabella Juan"],
            vec!["", "", "", "", ""],
            vec!["(*) fue distanciado", "", "", "", ""],
        ]);
        let block = &RaceBlockParser::parse(&grid)[0];
        assert_eq!(block.incident_note, None);
        assert_eq!(block.distancing_note.as_deref(), Some("(*) fue distanciado"));
    }

    #[test]
    fn test_results_start_accepts_u() {
        let grid = Grid::from_rows([
            vec!["3º CARRERA", "", ""],
            vec!["", "U", "ZETA"],
        ]);
        let blocks = RaceBlockParser::parse(&grid);
        assert_eq!(blocks[0].results_start, Some(1));
    }

    #[test]
    fn test_winning_time_shapes() {
        assert_eq!(extract_winning_time("Tiempo: 1' 5\""), "1'05\"");
        assert_eq!(extract_winning_time("tiempo 44\" 4 / 5"), "44\" 4/5");
        assert_eq!(extract_winning_time("llegó en 58\""), "58\"");
        assert_eq!(extract_winning_time("Tiempo: sin registro"), NOT_AVAILABLE);
    }

    #[test]
    fn test_non_starters() {
        let list = parse_non_starters("NO CORRIERON: (4) GAMMA (enferma) y (6) Delta, (9) EPS");
        assert_eq!(
            list,
            vec![
                NonStarter { dorsal: 4, name: "GAMMA".into(), reason: "enferma".into() },
                NonStarter { dorsal: 6, name: "DELTA".into(), reason: String::new() },
                NonStarter { dorsal: 9, name: "EPS".into(), reason: String::new() },
            ]
        );
    }

    #[test]
    fn test_all_started_short_circuits() {
        assert!(parse_non_starters("Corrieron todos. No corrió: (1) X").is_empty());
        assert!(parse_non_starters("Llegada normal").is_empty());
    }

    #[test]
    fn test_notes_and_distancing() {
        let grid = Grid::from_rows([
            vec!["1º CARRERA", "", ""],
            vec!["", "1", "ALFA"],
            vec!["(*) Distanciado al último puesto", "", ""],
            vec!["(*) Rodó en la curva", "", ""],
        ]);
        let block = &RaceBlockParser::parse(&grid)[0];
        assert_eq!(block.distancing(), Some(Distancing::ToLast));
        assert_eq!(block.incident_note.as_deref(), Some("(*) Rodó en la curva"));
    }

    #[test]
    fn test_parse_distancing() {
        assert_eq!(parse_distancing("Distanciado al 5º puesto"), Distancing::To(5));
        assert_eq!(parse_distancing("distanciado al ultimo"), Distancing::ToLast);
        assert_eq!(parse_distancing("fue distanciado"), Distancing::Unspecified);
    }
}
