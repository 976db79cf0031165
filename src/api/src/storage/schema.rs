//! SQLite schema definitions for the performance history
//!
//! Tables:
//! - horses: Roster profile per horse, keyed by normalized name
//! - performances: One row per finish or non-start, linked to horses by name value

use rusqlite::{Connection, Result};

/// Create all tables in the database
pub fn create_tables(conn: &Connection) -> Result<()> {
    // Roster profile, last seen values
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS horses (
            name TEXT PRIMARY KEY,
            pedigree TEXT NOT NULL DEFAULT '',
            coat TEXT NOT NULL DEFAULT '',
            age INTEGER,
            weight INTEGER,
            jockey TEXT NOT NULL DEFAULT '',
            stable TEXT NOT NULL DEFAULT '',
            trainer TEXT NOT NULL DEFAULT '',
            last_form TEXT NOT NULL DEFAULT '',
            snapshot_date TEXT
        )
        "#,
        [],
    )?;

    // Finishes and non-starts
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS performances (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            race_date TEXT NOT NULL,
            horse_name TEXT NOT NULL,
            original_position INTEGER,
            final_position TEXT NOT NULL,
            jockey TEXT NOT NULL DEFAULT '',
            lengths_behind TEXT NOT NULL DEFAULT '',
            winner TEXT NOT NULL DEFAULT '',
            runner_up TEXT NOT NULL DEFAULT '',
            margin TEXT NOT NULL DEFAULT '',
            winning_time TEXT NOT NULL DEFAULT '',
            track_condition TEXT NOT NULL DEFAULT '',
            distanced INTEGER NOT NULL DEFAULT 0,
            observation TEXT NOT NULL DEFAULT ''
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_performances_horse ON performances(horse_name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_performances_date ON performances(race_date)",
        [],
    )?;

    Ok(())
}
