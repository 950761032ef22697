// src/process/massage.rs

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, instrument, warn};

use super::date_parser::{format_display, parse_date};
use super::rolling::{diff_from_first, trailing_mean};
use super::{CaseRecord, PopulationRecord, StateCodeRecord};

/// Case row after joins and derivations.
///
/// `code`, `avg_new_cases` and `population` stay `None` when unknown so a
/// missing join is distinguishable from a real zero. `new_cases_per_capita`
/// is what gets coloured and is always a finite value ≥ 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub state: String,
    pub code: Option<String>,
    pub date: NaiveDate,
    /// `MM-DD-YYYY`; the animation frame key.
    pub date_key: String,
    pub cases: i64,
    pub new_cases: f64,
    pub avg_new_cases: Option<f64>,
    pub population: Option<f64>,
    pub new_cases_per_capita: f64,
}

/// Enriched rows ordered non-decreasing by `date`.
///
/// The only ways in are [`massage_data`] and [`EnrichedTable::from_records`],
/// both of which sort, so the renderer can trust row order as frame order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedTable {
    records: Vec<EnrichedRecord>,
}

impl EnrichedTable {
    /// Stable sort by date; rows sharing a date keep their relative order.
    pub fn from_records(mut records: Vec<EnrichedRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        Self { records }
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<EnrichedRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Largest per-capita value over the whole table (0 when empty).
    pub fn max_per_capita(&self) -> f64 {
        self.records
            .iter()
            .map(|r| r.new_cases_per_capita)
            .fold(0.0, f64::max)
    }

    pub fn summary(&self) -> Summary {
        let mut dates = BTreeSet::new();
        let mut states = BTreeSet::new();
        let mut missing_code = BTreeSet::new();
        let mut missing_population = BTreeSet::new();
        for r in &self.records {
            dates.insert(r.date);
            states.insert(r.state.as_str());
            if r.code.is_none() {
                missing_code.insert(r.state.clone());
            } else if r.population.is_none() {
                missing_population.insert(r.state.clone());
            }
        }
        Summary {
            records: self.records.len(),
            dates: dates.len(),
            states: states.len(),
            first_date: dates.iter().next().copied(),
            last_date: dates.iter().next_back().copied(),
            missing_code,
            missing_population,
            max_per_capita: self.max_per_capita(),
        }
    }
}

/// Shape of a transformed table, for the run log.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub records: usize,
    pub dates: usize,
    pub states: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// States with case data but no two-letter code.
    pub missing_code: BTreeSet<String>,
    /// States with a code but no usable population.
    pub missing_population: BTreeSet<String>,
    pub max_per_capita: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct StatePopulation {
    year: Option<i32>,
    population: Option<f64>,
}

/// Keep `ages == "total"` rows and collapse to one row per code by taking
/// the max of each numeric column independently. Assumes the largest
/// population is the latest year, which is only approximately true.
fn latest_totals(population: &[PopulationRecord]) -> BTreeMap<String, StatePopulation> {
    let mut out: BTreeMap<String, StatePopulation> = BTreeMap::new();
    for rec in population.iter().filter(|r| r.ages == "total") {
        let entry = out.entry(rec.code.clone()).or_default();
        entry.year = max_opt(entry.year, rec.year);
        entry.population = max_opt_f64(entry.population, rec.population.filter(|p| !p.is_nan()));
    }
    out
}

fn max_opt(a: Option<i32>, b: Option<i32>) -> Option<i32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn max_opt_f64(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn per_capita(avg: Option<f64>, population: Option<f64>) -> f64 {
    match (avg, population) {
        (Some(avg), Some(pop)) if pop > 0.0 => {
            let v = avg / pop;
            if v.is_finite() {
                v.max(0.0)
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Join the three raw tables into per-state, per-day smoothed per-capita
/// rates, sorted by date.
///
/// Steps run in a fixed order: population filter + collapse, per-state
/// diff, trailing mean over `window` days, left join to codes on state
/// name, left join to population on code, per-capita with zero fill, sort.
#[instrument(level = "info", skip_all, fields(cases = cases.len(), window = window))]
pub fn massage_data(
    cases: Vec<CaseRecord>,
    population: &[PopulationRecord],
    state_codes: &[StateCodeRecord],
    window: usize,
) -> Result<EnrichedTable> {
    // 1-2) population totals, one row per code
    let totals = latest_totals(population);
    debug!(codes = totals.len(), "collapsed population totals");
    for (code, p) in &totals {
        debug!(code = %code, year = ?p.year, population = ?p.population, "population total");
    }

    // parse every date up front; a bad date is bad upstream content
    let dates = cases
        .iter()
        .enumerate()
        .map(|(idx, rec)| {
            parse_date(&rec.date).ok_or_else(|| {
                anyhow!("unparseable date `{}` for {} at record {}", rec.date, rec.state, idx)
            })
        })
        .collect::<Result<Vec<NaiveDate>>>()?;

    // 3-4) group by state name, in date order within each group
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, rec) in cases.iter().enumerate() {
        groups.entry(rec.state.as_str()).or_default().push(idx);
    }
    debug!(states = groups.len(), "grouped case rows");

    let mut new_cases = vec![0.0; cases.len()];
    let mut averages: Vec<Option<f64>> = vec![None; cases.len()];
    for indices in groups.values_mut() {
        indices.sort_by_key(|&i| dates[i]);
        let cumulative: Vec<f64> = indices.iter().map(|&i| cases[i].cases as f64).collect();
        let diffs = diff_from_first(&cumulative);
        let means = trailing_mean(&diffs, window);
        for (pos, &i) in indices.iter().enumerate() {
            new_cases[i] = diffs[pos];
            averages[i] = means[pos];
        }
    }

    // 5) state name → code
    let mut codes: HashMap<&str, &str> = HashMap::with_capacity(state_codes.len());
    for rec in state_codes {
        if codes.insert(rec.state.as_str(), rec.code.as_str()).is_some() {
            warn!(state = %rec.state, "duplicate state in code table; last entry wins");
        }
    }

    let mut warned: BTreeSet<&str> = BTreeSet::new();
    let mut records = Vec::with_capacity(cases.len());
    for (idx, rec) in cases.iter().enumerate() {
        let code = codes.get(rec.state.as_str()).map(|c| c.to_string());

        // 6) code → population
        let pop = code
            .as_deref()
            .and_then(|c| totals.get(c))
            .and_then(|p| p.population);

        if (code.is_none() || pop.is_none()) && warned.insert(rec.state.as_str()) {
            match &code {
                None => warn!(state = %rec.state, "no state code; per-capita will be 0"),
                Some(c) => warn!(state = %rec.state, code = %c, "no population; per-capita will be 0"),
            }
        }

        // 7) deaths, abbreviation, year and age bracket are not carried over
        // 8) zero-filled per-capita
        let avg = averages[idx];
        records.push(EnrichedRecord {
            state: rec.state.clone(),
            code,
            date: dates[idx],
            date_key: format_display(dates[idx]),
            cases: rec.cases,
            new_cases: new_cases[idx],
            avg_new_cases: avg,
            population: pop,
            new_cases_per_capita: per_capita(avg, pop),
        });
    }

    // 9) chronological order is the frame order downstream
    let table = EnrichedTable::from_records(records);
    info!(records = table.len(), "transformed case data");
    Ok(table)
}
