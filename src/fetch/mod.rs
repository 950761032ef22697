// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;
use std::{fs::File, io::Cursor, path::Path};
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::Config;
use crate::process::{read_table, CaseRecord, PopulationRecord, StateCodeRecord};

/// The three raw tables, as loaded.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub cases: Vec<CaseRecord>,
    pub population: Vec<PopulationRecord>,
    pub state_codes: Vec<StateCodeRecord>,
}

/// GET `url` and return the body. Non-success statuses are errors.
pub async fn get_text(client: &Client, url: &Url) -> Result<String> {
    debug!("Fetching text from {}", url);
    client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .text()
        .await
        .with_context(|| format!("Reading text from {}", url))
}

#[instrument(level = "info", skip(client, url), fields(url = %url))]
pub async fn fetch_cases(client: &Client, url: &Url) -> Result<Vec<CaseRecord>> {
    let body = get_text(client, url).await?;
    let rows = read_table(Cursor::new(body), url.as_str())?;
    info!(rows = rows.len(), "loaded case data");
    Ok(rows)
}

#[instrument(level = "info", skip(client, url), fields(url = %url))]
pub async fn fetch_population(client: &Client, url: &Url) -> Result<Vec<PopulationRecord>> {
    let body = get_text(client, url).await?;
    let rows = read_table(Cursor::new(body), url.as_str())?;
    info!(rows = rows.len(), "loaded population data");
    Ok(rows)
}

#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_state_codes(path: impl AsRef<Path>) -> Result<Vec<StateCodeRecord>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open state code file: {}", path.display()))?;
    let rows = read_table(file, &path.display().to_string())?;
    info!(rows = rows.len(), "loaded state codes");
    Ok(rows)
}

/// Load everything, one source after the other. Any failure aborts the run.
pub async fn load_sources(client: &Client, cfg: &Config) -> Result<Sources> {
    let cases = fetch_cases(client, &cfg.cases_url()?).await?;
    let population = fetch_population(client, &cfg.population_url()?).await?;
    let state_codes = load_state_codes(cfg.resolved_state_codes_path()?)?;
    Ok(Sources {
        cases,
        population,
        state_codes,
    })
}
