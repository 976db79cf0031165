//! Batch ingestion: rebuilds the roster and the performance history from source sheets.
//!
//! Each source sheet is resolved, read and committed on its own. A sheet that cannot be found,
//! read or dated is logged and skipped; it never aborts the run nor rolls back the sheets
//! committed before it.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{IngestConfig, SourceSheet};
use crate::sheets::results::records_from_grid;
use crate::sheets::{load_sheet, Grid, ProgramParser, Rejection};
use crate::storage::FormRepository;

/// Format of sheet labels, e.g. `16-02-25`
pub const LABEL_DATE_FORMAT: &str = "%d-%m-%y";

/// Meeting date encoded in a sheet label
pub fn parse_label_date(label: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(label.trim(), LABEL_DATE_FORMAT)
        .with_context(|| format!("Sheet label '{}' is not a dd-mm-yy date", label))
}

/// Locate a source file: the name itself when it exists, else the first search directory
/// that holds it.
pub fn resolve_source(file: &str, search_dirs: &[String]) -> Option<PathBuf> {
    let direct = Path::new(file);
    if direct.is_file() {
        return Some(direct.to_path_buf());
    }
    search_dirs
        .iter()
        .map(|dir| Path::new(dir).join(file))
        .find(|candidate| candidate.is_file())
}

/// CSV log of rejected roster rows
pub struct RejectionLog<W: Write> {
    writer: csv::Writer<W>,
}

impl RejectionLog<File> {
    /// Create (or truncate) the log file
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create rejection log {}", path.display()))?;
        Self::from_writer(file)
    }
}

impl<W: Write> RejectionLog<W> {
    pub fn from_writer(writer: W) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(["archivo", "hoja", "razon", "fila"])?;
        Ok(Self { writer })
    }

    pub fn record(&mut self, file: &str, sheet: &str, rejection: &Rejection) -> Result<()> {
        let row = rejection.cells.join(" | ");
        self.writer
            .write_record([file, sheet, rejection.reason.code(), row.as_str()])?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Which family a source sheet belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetKind {
    Program,
    Results,
}

/// A source sheet that contributed nothing, and why
#[derive(Debug, Clone, Serialize)]
pub struct SkippedSheet {
    pub kind: SheetKind,
    pub label: String,
    pub file: String,
    pub reason: String,
}

/// Totals of one ingestion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
    pub programs_loaded: usize,
    pub results_loaded: usize,
    pub roster_rows: usize,
    pub rejected_rows: usize,
    pub records_inserted: usize,
    pub skipped: Vec<SkippedSheet>,
    pub horse_count: i64,
    pub performance_count: i64,
}

/// Runs a full rebuild against one repository
pub struct Ingestor<'a, L: Write> {
    repo: &'a mut FormRepository,
    config: &'a IngestConfig,
    rejections: Option<RejectionLog<L>>,
}

impl<'a, L: Write> Ingestor<'a, L> {
    pub fn new(
        repo: &'a mut FormRepository,
        config: &'a IngestConfig,
        rejections: Option<RejectionLog<L>>,
    ) -> Self {
        Self {
            repo,
            config,
            rejections,
        }
    }

    /// Reset the store, rebuild horses from every program sheet, then rebuild performances
    /// from every results sheet. Progress lines are written to `out`.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<IngestSummary> {
        let config = self.config;
        let mut summary = IngestSummary::default();
        self.repo.reset().context("Failed to reset the database")?;

        writeln!(out, "--- Migrating horses ---")?;
        for source in &config.programs {
            match self.ingest_program(source, &mut summary) {
                Ok(rows) => {
                    info!(label = %source.label, file = %source.file, rows, "Program sheet loaded");
                    writeln!(out, "Program {} [{}]: {} horses", source.file, source.label, rows)?;
                    summary.programs_loaded += 1;
                }
                Err(e) => {
                    warn!(label = %source.label, file = %source.file, "Skipping program sheet: {:#}", e);
                    writeln!(out, "Program {} [{}]: skipped", source.file, source.label)?;
                    summary.skipped.push(skipped(SheetKind::Program, source, &e));
                }
            }
        }

        if let Some(log) = self.rejections.as_mut() {
            log.flush()?;
        }

        // The first results sheet committed replaces the whole table; later sheets append.
        writeln!(out, "--- Migrating performances ---")?;
        let mut replaced = false;
        for source in &config.results {
            match self.ingest_results(source, !replaced) {
                Ok(records) => {
                    replaced = true;
                    info!(label = %source.label, file = %source.file, records, "Results sheet loaded");
                    writeln!(out, "Results {} [{}]: {} records", source.file, source.label, records)?;
                    summary.results_loaded += 1;
                    summary.records_inserted += records;
                }
                Err(e) => {
                    warn!(label = %source.label, file = %source.file, "Skipping results sheet: {:#}", e);
                    writeln!(out, "Results {} [{}]: skipped", source.file, source.label)?;
                    summary.skipped.push(skipped(SheetKind::Results, source, &e));
                }
            }
        }

        summary.horse_count = self.repo.horse_count()?;
        summary.performance_count = self.repo.performance_count()?;
        Ok(summary)
    }

    fn ingest_program(&mut self, source: &SourceSheet, summary: &mut IngestSummary) -> Result<usize> {
        let path = self.locate(source)?;
        let date = parse_label_date(&source.label)?;
        let grid = load_sheet(&path, &source.label)?;
        self.store_program_grid(source, date, &grid, summary)
    }

    fn ingest_results(&mut self, source: &SourceSheet, replace: bool) -> Result<usize> {
        let path = self.locate(source)?;
        let date = parse_label_date(&source.label)?;
        let grid = load_sheet(&path, &source.label)?;
        self.store_results_grid(date, &grid, replace)
    }

    fn locate(&self, source: &SourceSheet) -> Result<PathBuf> {
        resolve_source(&source.file, &self.config.search_dirs).ok_or_else(|| {
            anyhow!(
                "'{}' not found in {}",
                source.file,
                self.config.search_dirs.join(", ")
            )
        })
    }

    fn store_program_grid(
        &mut self,
        source: &SourceSheet,
        date: NaiveDate,
        grid: &Grid,
        summary: &mut IngestSummary,
    ) -> Result<usize> {
        let sheet = ProgramParser::parse(grid);

        for rejection in &sheet.rejections {
            debug!(
                label = %source.label,
                row = rejection.row,
                reason = %rejection.reason,
                "Roster row rejected"
            );
            if let Some(log) = self.rejections.as_mut() {
                log.record(&source.file, &source.label, rejection)?;
            }
        }
        summary.rejected_rows += sheet.rejections.len();

        let rows = self.repo.rebuild_horses(&sheet.entries, date)?;
        summary.roster_rows += rows;
        Ok(rows)
    }

    fn store_results_grid(&mut self, date: NaiveDate, grid: &Grid, replace: bool) -> Result<usize> {
        let records = records_from_grid(grid, date);
        if replace {
            self.repo.rebuild_performances(&records)
        } else {
            self.repo.insert_performances(&records)
        }
    }
}

fn skipped(kind: SheetKind, source: &SourceSheet, error: &anyhow::Error) -> SkippedSheet {
    SkippedSheet {
        kind,
        label: source.label.clone(),
        file: source.file.clone(),
        reason: format!("{:#}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::last_four_marker;

    fn source(label: &str, file: &str) -> SourceSheet {
        SourceSheet {
            label: label.to_string(),
            file: file.to_string(),
        }
    }

    fn result_row(pos: &str, horse: &str, lengths: &str) -> Vec<String> {
        [
            "",
            pos,
            horse,
            "",
            "Vai Angel",
            "",
            "",
            lengths,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn line(text: &str) -> Vec<String> {
        vec![text.to_string()]
    }

    fn results_grids() -> Vec<(NaiveDate, Grid)> {
        vec![
            (
                parse_label_date("16-02-25").unwrap(),
                Grid::new(vec![
                    line("1º CARRERA"),
                    result_row("1", "ALFA", ""),
                    result_row("2", "BETA", "1.5"),
                    result_row("3", "GAMMA", "2"),
                    line("No corrieron: (4) Delta (enferma)"),
                    line("2ª CARRERA"),
                    result_row("1", "OMEGA", ""),
                    result_row("2", "SIGMA", "0.5"),
                ]),
            ),
            (
                parse_label_date("02-03-25").unwrap(),
                Grid::new(vec![
                    line("1º CARRERA"),
                    result_row("1", "GAMMA", ""),
                    result_row("2", "ALFA", "3"),
                ]),
            ),
        ]
    }

    fn markers(repo: &FormRepository) -> Vec<(String, String)> {
        ["ALFA", "BETA", "GAMMA", "DELTA", "OMEGA", "SIGMA"]
            .iter()
            .map(|name| {
                let records = repo.query_by_horse(name).unwrap();
                (name.to_string(), last_four_marker(&records))
            })
            .collect()
    }

    #[test]
    fn test_parse_label_date() {
        assert_eq!(
            parse_label_date("16-02-25").unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 16).unwrap()
        );
        assert!(parse_label_date("Hoja1").is_err());
    }

    #[test]
    fn test_resolve_missing_source() {
        let dirs = vec![".".to_string(), "no-such-dir".to_string()];
        assert!(resolve_source("no-such-workbook.xlsx", &dirs).is_none());
    }

    #[test]
    fn test_rebuilding_twice_is_stable() {
        let mut repo = FormRepository::in_memory().unwrap();
        let config = IngestConfig::default();

        let mut snapshots = Vec::new();
        for _ in 0..2 {
            {
                let mut ingestor: Ingestor<'_, Vec<u8>> = Ingestor::new(&mut repo, &config, None);
                for (i, (date, grid)) in results_grids().into_iter().enumerate() {
                    ingestor.store_results_grid(date, &grid, i == 0).unwrap();
                }
            }
            snapshots.push((repo.performance_count().unwrap(), markers(&repo)));
        }

        assert_eq!(snapshots[0].0, 8);
        assert_eq!(snapshots[0], snapshots[1]);
        let alfa = &snapshots[0].1[0];
        assert_eq!(alfa.1, "1-2");
        let delta = &snapshots[0].1[3];
        assert_eq!(delta.1, "NC");
    }

    #[test]
    fn test_program_grid_with_rejection_log() {
        let mut repo = FormRepository::in_memory().unwrap();
        let config = IngestConfig::default();
        let mut buffer = Vec::new();

        let grid = Grid::from_rows([
            vec!["4 Ult.", "Caballo", "Jockey", "E Kg"],
            vec!["1-2", "el tano", "Vai Angel", "4 56"],
            vec!["", "16/02/25", "", ""],
        ]);

        {
            let log = RejectionLog::from_writer(&mut buffer).unwrap();
            let mut ingestor = Ingestor::new(&mut repo, &config, Some(log));
            let mut summary = IngestSummary::default();
            let rows = ingestor
                .store_program_grid(
                    &source("16-02-25", "programa.xlsx"),
                    parse_label_date("16-02-25").unwrap(),
                    &grid,
                    &mut summary,
                )
                .unwrap();
            assert_eq!(rows, 1);
            assert_eq!(summary.rejected_rows, 1);
            ingestor.rejections.as_mut().unwrap().flush().unwrap();
        }

        let csv = String::from_utf8(buffer).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("archivo,hoja,razon,fila"));
        let rejected = lines.next().unwrap();
        assert!(rejected.starts_with("programa.xlsx,16-02-25,parece fecha,"));
        assert!(rejected.contains(" | 16/02/25 | "));
        assert_eq!(repo.get_horse("EL TANO").unwrap().unwrap().age, Some(4));
    }

    #[test]
    fn test_run_skips_missing_sheets() {
        let mut repo = FormRepository::in_memory().unwrap();
        let config = IngestConfig {
            search_dirs: vec!["no-such-dir".to_string()],
            programs: vec![source("16-02-25", "no-such-program.xlsx")],
            results: vec![source("16-02-25", "no-such-results.xlsx")],
            ..Default::default()
        };

        let mut out = Vec::new();
        let mut ingestor: Ingestor<'_, Vec<u8>> = Ingestor::new(&mut repo, &config, None);
        let summary = ingestor.run(&mut out).unwrap();

        assert_eq!(summary.programs_loaded, 0);
        assert_eq!(summary.results_loaded, 0);
        assert_eq!(summary.skipped.len(), 2);
        assert_eq!(summary.skipped[1].kind, SheetKind::Results);
        assert!(summary.skipped[0].reason.contains("not found"));
        assert_eq!(summary.horse_count, 0);

        let progress = String::from_utf8(out).unwrap();
        assert!(progress.contains("Program no-such-program.xlsx [16-02-25]: skipped"));
    }
}
