//! Rectangular text grid read from a workbook sheet.

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;

/// A sheet as rows of text cells. Out-of-range cells read as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Build a grid from string slices (handy for fixtures)
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| c.as_ref().to_string()).collect())
            .collect();
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, row: usize) -> &[String] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_blank_row(&self, row: usize) -> bool {
        self.row(row).iter().all(|c| c.trim().is_empty())
    }

    /// Cells of one row joined by spaces
    pub fn row_text(&self, row: usize) -> String {
        self.row(row).join(" ")
    }

    /// Text of rows `start..end` joined by spaces
    pub fn text(&self, start: usize, end: usize) -> String {
        (start..end.min(self.height()))
            .map(|r| self.row_text(r))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn from_range(range: &Range<Data>) -> Self {
        let Some((start_row, start_col)) = range.start() else {
            return Self::default();
        };
        let (height, width) = range.get_size();
        let total_rows = start_row as usize + height;
        let total_cols = start_col as usize + width;

        let mut rows = vec![vec![String::new(); total_cols]; total_rows];
        for (r, c, value) in range.used_cells() {
            let row = start_row as usize + r;
            let col = start_col as usize + c;
            rows[row][col] = cell_text(value);
        }
        Self { rows }
    }
}

/// Render a cell the way it reads on screen.
fn cell_text(value: &Data) -> String {
    match value {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Load the named sheet of a workbook (`.xlsx`, `.xls`, `.ods`) as a text grid.
pub fn load_sheet(path: &Path, sheet_name: &str) -> Result<Grid> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;

    let range = workbook
        .worksheet_range(sheet_name)
        .with_context(|| format!("Failed to read sheet '{}' in {}", sheet_name, path.display()))?;

    Ok(Grid::from_range(&range))
}
