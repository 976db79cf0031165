//! SQLite repository for horses and their performance records

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::path::Path;

use super::schema::create_tables;
use crate::names::horse_key;
use crate::sheets::RosterEntry;
use crate::types::{FinishPosition, Horse, PerformanceRecord};

const PERFORMANCE_COLUMNS: &str = "race_date, horse_name, original_position, final_position, \
     jockey, lengths_behind, winner, runner_up, margin, winning_time, track_condition, \
     distanced, observation";

const HORSE_COLUMNS: &str =
    "name, pedigree, coat, age, weight, jockey, stable, trainer, last_form, snapshot_date";

fn performance_from_row(row: &Row<'_>) -> rusqlite::Result<PerformanceRecord> {
    let final_position: String = row.get(3)?;
    Ok(PerformanceRecord {
        race_date: row.get(0)?,
        horse_name: row.get(1)?,
        original_position: row.get(2)?,
        final_position: FinishPosition::parse(&final_position),
        jockey: row.get(4)?,
        lengths_behind: row.get(5)?,
        winner: row.get(6)?,
        runner_up: row.get(7)?,
        margin: row.get(8)?,
        winning_time: row.get(9)?,
        track_condition: row.get(10)?,
        distanced: row.get(11)?,
        observation: row.get(12)?,
    })
}

fn horse_from_row(row: &Row<'_>) -> rusqlite::Result<Horse> {
    Ok(Horse {
        name: row.get(0)?,
        pedigree: row.get(1)?,
        coat: row.get(2)?,
        age: row.get(3)?,
        weight: row.get(4)?,
        jockey: row.get(5)?,
        stable: row.get(6)?,
        trainer: row.get(7)?,
        last_form: row.get(8)?,
        snapshot_date: row.get(9)?,
    })
}

/// Repository for the roster and the performance history
pub struct FormRepository {
    conn: Connection,
}

impl FormRepository {
    /// Create a new repository, initializing the database if needed
    pub fn new(db_path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create database directory")?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        // Create tables if they don't exist
        create_tables(&conn)?;

        Ok(Self { conn })
    }

    /// Create an in-memory repository (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_tables(&conn)?;
        Ok(Self { conn })
    }

    // ==================== Rebuild Operations ====================

    /// Drop every horse and performance ahead of a full rebuild
    pub fn reset(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM performances", [])?;
        tx.execute("DELETE FROM horses", [])?;
        tx.commit()?;
        Ok(())
    }

    /// Upsert the horses of one program sheet in a single transaction.
    ///
    /// Missing horses are inserted; existing ones get their profile refreshed and the
    /// snapshot date moved. Blank incoming values never overwrite stored ones.
    pub fn rebuild_horses(&mut self, rows: &[RosterEntry], snapshot_date: NaiveDate) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare("INSERT OR IGNORE INTO horses (name) VALUES (?1)")?;
            let mut update = tx.prepare(
                r#"
                UPDATE horses SET
                    pedigree = COALESCE(NULLIF(?2, ''), pedigree),
                    coat = COALESCE(NULLIF(?3, ''), coat),
                    age = COALESCE(?4, age),
                    weight = COALESCE(?5, weight),
                    jockey = COALESCE(NULLIF(?6, ''), jockey),
                    stable = COALESCE(NULLIF(?7, ''), stable),
                    trainer = COALESCE(NULLIF(?8, ''), trainer),
                    last_form = COALESCE(NULLIF(?9, ''), last_form),
                    snapshot_date = ?10
                WHERE name = ?1
                "#,
            )?;

            for entry in rows {
                let name = horse_key(&entry.name);
                if name.is_empty() {
                    continue;
                }
                insert.execute([&name])?;
                update.execute(params![
                    name,
                    entry.pedigree,
                    entry.coat,
                    entry.age,
                    entry.weight,
                    entry.jockey,
                    entry.stable,
                    entry.trainer,
                    entry.last_form,
                    snapshot_date,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Bulk-insert records in a single transaction
    pub fn insert_performances(&mut self, records: &[PerformanceRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        Self::insert_all(&tx, records)?;
        tx.commit()?;
        Ok(records.len())
    }

    /// Replace the whole performance table with `records`
    pub fn rebuild_performances(&mut self, records: &[PerformanceRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM performances", [])?;
        Self::insert_all(&tx, records)?;
        tx.commit()?;
        Ok(records.len())
    }

    fn insert_all(conn: &Connection, records: &[PerformanceRecord]) -> Result<()> {
        let mut stmt = conn.prepare(&format!(
            "INSERT INTO performances ({}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            PERFORMANCE_COLUMNS
        ))?;

        for rec in records {
            stmt.execute(params![
                rec.race_date,
                horse_key(&rec.horse_name),
                rec.original_position,
                rec.final_position.to_string(),
                rec.jockey,
                rec.lengths_behind,
                rec.winner,
                rec.runner_up,
                rec.margin,
                rec.winning_time,
                rec.track_condition,
                rec.distanced,
                rec.observation,
            ])?;
        }
        Ok(())
    }

    // ==================== Query Operations ====================

    /// Records of one horse, most recent first. An empty name matches nothing.
    pub fn query_by_horse(&self, name: &str) -> Result<Vec<PerformanceRecord>> {
        let key = horse_key(name);
        if key.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM performances WHERE horse_name = ?1 ORDER BY race_date DESC, id",
            PERFORMANCE_COLUMNS
        ))?;

        let records = stmt
            .query_map([key], performance_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// All records grouped by horse name order, each horse's most recent first
    pub fn all_performances(&self) -> Result<Vec<PerformanceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM performances ORDER BY horse_name, race_date DESC, id",
            PERFORMANCE_COLUMNS
        ))?;

        let records = stmt
            .query_map([], performance_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Look up one horse profile
    pub fn get_horse(&self, name: &str) -> Result<Option<Horse>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM horses WHERE name = ?1", HORSE_COLUMNS))?;

        let mut rows = stmt.query_map([horse_key(name)], horse_from_row)?;
        Ok(rows.next().transpose()?)
    }

    /// Every horse, sorted by name
    pub fn all_horses(&self) -> Result<Vec<Horse>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM horses ORDER BY name", HORSE_COLUMNS))?;

        let horses = stmt
            .query_map([], horse_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(horses)
    }

    /// Get horse count
    pub fn horse_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM horses", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get performance record count
    pub fn performance_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM performances", [], |row| row.get(0))?;
        Ok(count)
    }
}
