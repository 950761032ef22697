// src/process/mod.rs
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::{de::DeserializeOwned, Deserialize};
use std::io::Read;
use tracing::debug;

pub mod date_parser;
pub mod massage;
pub mod rolling;

pub use massage::{massage_data, EnrichedRecord, EnrichedTable, Summary};

/// One row of the cumulative case time series: one state, one day.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaseRecord {
    /// Raw date string as published, parsed later in [`massage_data`].
    pub date: String,
    pub state: String,
    pub cases: i64,
    #[serde(default)]
    pub deaths: Option<i64>,
}

/// One row of the population table. Only `ages == "total"` rows matter.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PopulationRecord {
    /// Two-letter code (the source calls this `state/region`).
    #[serde(rename = "state/region")]
    pub code: String,
    pub ages: String,
    pub year: Option<i32>,
    pub population: Option<f64>,
}

/// Static reference row: full state name → two-letter code.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StateCodeRecord {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Abbrev", default)]
    pub abbrev: Option<String>,
    #[serde(rename = "Code")]
    pub code: String,
}

/// Decode a headed CSV into typed rows. Columns not named by `T` are ignored;
/// any row that fails to decode aborts with the row index in the error.
pub fn read_table<T, R>(reader: R, source: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (idx, result) in rdr.deserialize::<T>().enumerate() {
        let row = result.with_context(|| format!("CSV decode error in {} at record {}", source, idx))?;
        rows.push(row);
    }
    debug!(source, rows = rows.len(), "decoded table");
    Ok(rows)
}

#[cfg(test)]
pub(crate) fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,covidmap=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
