//! Lookup session over the stored history.
//!
//! A `LookupContext` is loaded once from the store after ingestion and then answers every
//! query of an interactive or one-shot session from memory.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use crate::derivation::{is_debutant, DerivationEngine, HorseSummary};
use crate::names::horse_key;
use crate::storage::FormRepository;
use crate::types::{Horse, PerformanceRecord};

/// Outcome of a horse lookup
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(Box<HorseSummary>),
    NotFound {
        query: String,
        suggestion: Option<String>,
    },
}

/// Roster and history of every horse, keyed by normalized name.
#[derive(Debug, Clone, Default)]
pub struct LookupContext {
    horses: BTreeMap<String, Horse>,
    records: HashMap<String, Vec<PerformanceRecord>>,
    suggestion_cutoff: f64,
}

impl LookupContext {
    /// Load the whole store into a session
    pub fn load(repo: &FormRepository, suggestion_cutoff: f64) -> Result<Self> {
        let horses = repo.all_horses().context("Failed to load horses")?;
        let records = repo
            .all_performances()
            .context("Failed to load performances")?;
        Ok(Self::from_parts(horses, records, suggestion_cutoff))
    }

    /// Build a session from already loaded rows. Records keep their relative order, so
    /// date-descending input stays date-descending per horse.
    pub fn from_parts(
        horses: Vec<Horse>,
        records: Vec<PerformanceRecord>,
        suggestion_cutoff: f64,
    ) -> Self {
        let horses = horses
            .into_iter()
            .map(|h| (horse_key(&h.name), h))
            .collect();

        let mut grouped: HashMap<String, Vec<PerformanceRecord>> = HashMap::new();
        for record in records {
            grouped
                .entry(horse_key(&record.horse_name))
                .or_default()
                .push(record);
        }
        for list in grouped.values_mut() {
            // stable: same-date records keep insertion order
            list.sort_by(|a, b| b.race_date.cmp(&a.race_date));
        }

        Self {
            horses,
            records: grouped,
            suggestion_cutoff,
        }
    }

    pub fn horse_count(&self) -> usize {
        self.horses.len()
    }

    /// Records of one horse, most recent first
    pub fn records_for(&self, name: &str) -> &[PerformanceRecord] {
        self.records
            .get(&horse_key(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `name` was distanced in its race on `date`
    pub fn was_distanced(&self, name: &str, date: NaiveDate) -> bool {
        self.records_for(name)
            .iter()
            .find(|r| r.race_date == date)
            .map(|r| r.distanced)
            .unwrap_or(false)
    }

    /// All roster names, sorted
    pub fn horse_names(&self) -> Vec<&str> {
        self.horses.keys().map(String::as_str).collect()
    }

    /// Roster names of horses that have not yet registered a numeric finish
    pub fn debutants(&self) -> Vec<&str> {
        self.horses
            .keys()
            .filter(|name| is_debutant(self.records_for(name)))
            .map(String::as_str)
            .collect()
    }

    /// Closest roster name at or above the similarity cutoff
    pub fn suggest(&self, name: &str) -> Option<&str> {
        closest_name(name, self.horses.keys().map(String::as_str), self.suggestion_cutoff)
    }

    /// Derived summary for a roster horse, or a not-found answer with an optional suggestion.
    pub fn lookup(&self, name: &str, engine: &DerivationEngine) -> Lookup {
        match self.horses.get(&horse_key(name)) {
            Some(horse) => {
                let records = self.records_for(&horse.name);
                let summary = engine.summarize(horse, records, |runner_up, date| {
                    self.was_distanced(runner_up, date)
                });
                Lookup::Found(Box::new(summary))
            }
            None => Lookup::NotFound {
                query: name.trim().to_string(),
                suggestion: self.suggest(name).map(str::to_string),
            },
        }
    }
}

/// Candidate most similar to `name`, if any reaches `cutoff` (normalized Levenshtein).
pub fn closest_name<'c>(
    name: &str,
    candidates: impl IntoIterator<Item = &'c str>,
    cutoff: f64,
) -> Option<&'c str> {
    let key = horse_key(name);
    if key.is_empty() {
        return None;
    }

    candidates
        .into_iter()
        .map(|candidate| (candidate, strsim::normalized_levenshtein(&key, candidate)))
        .filter(|(_, score)| *score >= cutoff)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate)
}

/// Look up one horse straight from the store, without loading a whole session.
pub fn lookup_stored(
    repo: &FormRepository,
    name: &str,
    engine: &DerivationEngine,
    suggestion_cutoff: f64,
) -> Result<Lookup> {
    let Some(horse) = repo.get_horse(name)? else {
        let horses = repo.all_horses()?;
        let suggestion = closest_name(
            name,
            horses.iter().map(|h| h.name.as_str()),
            suggestion_cutoff,
        )
        .map(str::to_string);
        return Ok(Lookup::NotFound {
            query: name.trim().to_string(),
            suggestion,
        });
    };

    let records = repo.query_by_horse(&horse.name)?;
    let summary = engine.summarize(&horse, &records, |runner_up, date| {
        repo.query_by_horse(runner_up)
            .map(|others| others.iter().any(|r| r.race_date == date && r.distanced))
            .unwrap_or(false)
    });
    Ok(Lookup::Found(Box::new(summary)))
}
