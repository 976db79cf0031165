//! SQLite storage module for the performance history
//!
//! Holds the horse roster and the performance records, both rebuilt wholesale by each
//! ingestion run.

pub mod repository;
pub mod schema;

pub use repository::FormRepository;
