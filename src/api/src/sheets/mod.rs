//! Spreadsheet parsing for program (roster) and results sheets.
//!
//! Both families of sheets are loose grids typed by hand: race blocks and roster headers are
//! located by keyword, then read through a fixed column layout.

pub mod grid;
pub mod keywords;
pub mod program;
pub mod race_block;
pub mod results;

pub use grid::{load_sheet, Grid};
pub use program::{ProgramParser, Rejection, RosterEntry};
pub use race_block::RaceBlockParser;
