//! CLI commands for turf-form.
//!
//! Supports the batch migration, the interactive lookup and one-shot summaries.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::config::{AppConfig, SourceSheet};
use crate::derivation::{DerivationEngine, HorseSummary};
use crate::ingest::{IngestSummary, Ingestor, RejectionLog};
use crate::lookup::{lookup_stored, Lookup, LookupContext};
use crate::storage::FormRepository;

/// Names per line in `!lista`
const LIST_COLUMNS: usize = 4;

#[derive(Parser)]
#[command(name = "turf-form")]
#[command(version, about = "Turf-form: race sheet ingestion and horse form lookup", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rebuild the database from program and results sheets
    Migrate {
        /// Database path override
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Program sheet as LABEL=FILE (replaces configured programs)
        #[arg(short, long, value_parser = SourceSheet::parse_arg)]
        program: Vec<SourceSheet>,

        /// Results sheet as LABEL=FILE (replaces configured results)
        #[arg(short, long, value_parser = SourceSheet::parse_arg)]
        results: Vec<SourceSheet>,
    },

    /// Interactive horse lookup
    Lookup {
        /// Database path override
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Evaluation date for age correction (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Print the summary of one horse
    Show {
        /// Horse name
        #[arg(value_name = "NAME")]
        name: String,

        /// Database path override
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Evaluation date for age correction (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

fn database_path(config: &AppConfig, database: Option<PathBuf>) -> PathBuf {
    database.unwrap_or_else(|| PathBuf::from(&config.storage.database_path))
}

fn open_existing(config: &AppConfig, database: Option<PathBuf>) -> anyhow::Result<FormRepository> {
    let path = database_path(config, database);
    if !path.exists() {
        anyhow::bail!(
            "Database '{}' not found. Run `turf-form migrate` first.",
            path.display()
        );
    }
    FormRepository::new(&path)
}

/// Run the full migration.
pub fn run_migrate(
    database: Option<PathBuf>,
    programs: Vec<SourceSheet>,
    results: Vec<SourceSheet>,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;

    if !programs.is_empty() {
        config.ingest.programs = programs;
    }
    if !results.is_empty() {
        config.ingest.results = results;
    }

    let path = database_path(&config, database);
    eprintln!("Opening database: {}", path.display());
    let mut repo = FormRepository::new(&path)?;

    let rejections = if config.ingest.rejection_log.is_empty() {
        None
    } else {
        match RejectionLog::create(Path::new(&config.ingest.rejection_log)) {
            Ok(log) => Some(log),
            Err(e) => {
                tracing::warn!("Rejection log disabled: {:#}", e);
                None
            }
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = Ingestor::new(&mut repo, &config.ingest, rejections).run(&mut out)?;
    print_migration_summary(&mut out, &path, &summary)?;

    Ok(())
}

fn print_migration_summary<W: Write>(
    out: &mut W,
    path: &Path,
    summary: &IngestSummary,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "=== Migration complete ===")?;
    writeln!(out, "  Database:        {}", path.display())?;
    writeln!(out, "  Program sheets:  {}", summary.programs_loaded)?;
    writeln!(out, "  Results sheets:  {}", summary.results_loaded)?;
    writeln!(out, "  Roster rows:     {}", summary.roster_rows)?;
    writeln!(out, "  Rejected rows:   {}", summary.rejected_rows)?;
    writeln!(out, "  Records read:    {}", summary.records_inserted)?;
    writeln!(out, "  Unique horses:   {}", summary.horse_count)?;
    writeln!(out, "  Performances:    {}", summary.performance_count)?;
    if !summary.skipped.is_empty() {
        writeln!(out, "  Skipped sheets:  {}", summary.skipped.len())?;
        for sheet in &summary.skipped {
            writeln!(out, "    {} [{}]: {}", sheet.file, sheet.label, sheet.reason)?;
        }
    }
    Ok(())
}

/// Run the interactive lookup on stdin/stdout.
pub fn run_lookup(database: Option<PathBuf>, today: Option<NaiveDate>) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let repo = open_existing(&config, database)?;
    let ctx = LookupContext::load(&repo, config.lookup.suggestion_cutoff)?;
    let engine = DerivationEngine::new(today.unwrap_or_else(|| Local::now().date_naive()));

    eprintln!("Loaded {} horses", ctx.horse_count());

    let stdin = io::stdin();
    let stdout = io::stdout();
    interactive_loop(&ctx, &engine, stdin.lock(), &mut stdout.lock())
}

/// Read horse names and commands until `salir` or end of input.
pub fn interactive_loop<R: BufRead, W: Write>(
    ctx: &LookupContext,
    engine: &DerivationEngine,
    input: R,
    out: &mut W,
) -> anyhow::Result<()> {
    writeln!(out, "Turf-form lookup")?;
    writeln!(
        out,
        "Commands: '!lista' lists every horse, '!debutantes' lists debutants, 'salir' quits."
    )?;

    let mut lines = input.lines();
    loop {
        write!(out, "\n> Horse name: ")?;
        out.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read input")?;
        let query = line.trim();

        match query.to_lowercase().as_str() {
            "salir" => break,
            "!lista" => print_horse_list(out, &ctx.horse_names())?,
            "!debutantes" => print_debutants(out, &ctx.debutants())?,
            "" => continue,
            _ => print_lookup(out, &ctx.lookup(query, engine))?,
        }
    }

    Ok(())
}

/// Print one horse summary.
pub fn run_show(
    name: String,
    database: Option<PathBuf>,
    format: String,
    today: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let repo = open_existing(&config, database)?;
    let engine = DerivationEngine::new(today.unwrap_or_else(|| Local::now().date_naive()));

    let summary = match lookup_stored(&repo, &name, &engine, config.lookup.suggestion_cutoff)? {
        Lookup::Found(summary) => summary,
        not_found @ Lookup::NotFound { .. } => {
            let mut stderr = io::stderr();
            print_lookup(&mut stderr, &not_found)?;
            anyhow::bail!("Horse '{}' not found", name.trim());
        }
    };

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "table" => {
            print_summary(&mut io::stdout().lock(), &summary)?;
        }
        _ => {
            eprintln!("Unknown format: {}. Using table.", format);
            print_summary(&mut io::stdout().lock(), &summary)?;
        }
    }

    Ok(())
}

fn print_lookup<W: Write>(out: &mut W, lookup: &Lookup) -> io::Result<()> {
    match lookup {
        Lookup::Found(summary) => print_summary(out, summary),
        Lookup::NotFound {
            query,
            suggestion: Some(suggestion),
        } => writeln!(out, "\n'{}' not found. Did you mean '{}'?", query, suggestion),
        Lookup::NotFound { query, .. } => writeln!(out, "\n'{}' not found.", query),
    }
}

fn print_summary<W: Write>(out: &mut W, summary: &HorseSummary) -> io::Result<()> {
    writeln!(out, "\n=== Program ===")?;
    writeln!(out, "  4 Ult.:      {}", summary.last_four)?;
    writeln!(out, "  Horse:       {}", summary.display_name)?;
    writeln!(out, "  Coat:        {}", summary.coat)?;
    writeln!(out, "  Jockey:      {}", summary.jockey)?;
    writeln!(out, "  E Kg:        {}", summary.age_weight())?;
    writeln!(out, "  Pedigree:    {}", summary.pedigree)?;
    writeln!(out, "  Stable:      {}", summary.stable)?;
    writeln!(out, "  Trainer:     {}", summary.trainer)?;

    writeln!(out, "\n=== Last performances ===")?;
    if summary.result_lines.is_empty() {
        let note = if summary.debutant { " (debutant)" } else { "" };
        writeln!(out, "  No performances recorded.{}", note)?;
    }
    for line in &summary.result_lines {
        writeln!(out, "  {}", line)?;
    }
    Ok(())
}

fn print_horse_list<W: Write>(out: &mut W, names: &[&str]) -> io::Result<()> {
    writeln!(out, "\n=== Horses ({}) ===", names.len())?;
    for chunk in names.chunks(LIST_COLUMNS) {
        let row: Vec<String> = chunk.iter().map(|name| format!("{:<25}", name)).collect();
        writeln!(out, "{}", row.join(" | ").trim_end())?;
    }
    Ok(())
}

fn print_debutants<W: Write>(out: &mut W, names: &[&str]) -> io::Result<()> {
    writeln!(out, "\n=== Debutants ===")?;
    if names.is_empty() {
        return writeln!(out, "No debutants detected.");
    }
    for name in names {
        writeln!(out, "- {}", name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FinishPosition, Horse, PerformanceRecord};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn context() -> LookupContext {
        let horses = ["ALFA", "BETA", "D'ARTAGNAN", "EL TANO", "OMEGA"]
            .iter()
            .map(|name| Horse {
                name: name.to_string(),
                jockey: "Vai Angel".to_string(),
                age: Some(4),
                weight: Some(56),
                ..Default::default()
            })
            .collect();

        let records = vec![PerformanceRecord {
            race_date: date(2025, 2, 16),
            horse_name: "ALFA".to_string(),
            original_position: Some(2),
            final_position: FinishPosition::Placed(2),
            jockey: "Vai Angel".to_string(),
            lengths_behind: "0.75".to_string(),
            winner: "EL TANO".to_string(),
            runner_up: "ALFA".to_string(),
            margin: "0.75".to_string(),
            winning_time: "58\" 2/5".to_string(),
            track_condition: "PN".to_string(),
            distanced: false,
            observation: String::new(),
        }];

        LookupContext::from_parts(horses, records, 0.7)
    }

    fn session(input: &str) -> String {
        let ctx = context();
        let engine = DerivationEngine::new(date(2025, 3, 1));
        let mut out = Vec::new();
        interactive_loop(&ctx, &engine, input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_lookup_prints_summary() {
        let output = session("alfa\nsalir\n");
        assert!(output.contains("4 Ult.:      2"));
        assert!(output.contains("E Kg:        4 56"));
        assert!(output.contains("16/02/25 - A. Vai - 2º a 3/4 cp de El Tano - 58\" 2/5 - PN"));
    }

    #[test]
    fn test_lookup_not_found_suggests() {
        let output = session("OMEG\n");
        assert!(output.contains("'OMEG' not found. Did you mean 'OMEGA'?"));
    }

    #[test]
    fn test_debutant_without_performances() {
        let output = session("beta\n");
        assert!(output.contains("4 Ult.:      Debuta"));
        assert!(output.contains("No performances recorded. (debutant)"));
    }

    #[test]
    fn test_list_and_debutants_commands() {
        let output = session("!lista\n!debutantes\nsalir\nalfa\n");
        assert!(output.contains("=== Horses (5) ==="));
        assert!(output.lines().any(|l| l.starts_with("ALFA") && l.contains("| EL TANO")));
        assert!(output.lines().any(|l| l == "OMEGA"));
        assert!(output.contains("- BETA"));
        assert!(!output.contains("- ALFA"));
        // nothing after salir
        assert!(!output.contains("=== Program ==="));
    }

    #[test]
    fn test_no_debutants_message() {
        let mut out = Vec::new();
        print_debutants(&mut out, &[]).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("No debutants detected."));
    }

    #[test]
    fn test_migration_summary() {
        let summary = IngestSummary {
            programs_loaded: 2,
            horse_count: 40,
            performance_count: 120,
            ..Default::default()
        };
        let mut out = Vec::new();
        print_migration_summary(&mut out, Path::new("data/carreras.db"), &summary).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Unique horses:   40"));
        assert!(text.contains("Performances:    120"));
        assert!(!text.contains("Skipped"));
    }
}
