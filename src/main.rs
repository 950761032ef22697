use anyhow::Result;
use clap::Parser;
use covidmap::{config::Config, export, fetch, process, render};
use reqwest::Client;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Animated per-capita COVID-19 case map of the US states.
#[derive(Parser, Debug)]
struct Args {
    /// YAML config file; every key is optional
    #[arg(long)]
    config: Option<PathBuf>,

    /// State name → code lookup CSV (overrides config)
    #[arg(long)]
    state_codes: Option<PathBuf>,

    /// Where to write the chart page (overrides config)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write the page but don't open it
    #[arg(long)]
    no_open: bool,

    /// Also write the enriched table as Parquet
    #[arg(long)]
    parquet: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => Config::from_yaml_file(path)?,
        None => Config::default(),
    };
    if let Some(path) = args.state_codes {
        cfg.state_codes_path = path;
    }
    if let Some(path) = args.output {
        cfg.output_html = path;
    }
    if args.no_open {
        cfg.open_viewer = false;
    }
    cfg.validate()?;
    info!(cases = %cfg.cases_url, population = %cfg.population_url, state_codes = %cfg.state_codes_path.display(), "configuration");

    // ─── 3) load ─────────────────────────────────────────────────────
    let client = Client::new();
    let sources = fetch::load_sources(&client, &cfg).await?;

    // ─── 4) transform ────────────────────────────────────────────────
    let table = process::massage_data(
        sources.cases,
        &sources.population,
        &sources.state_codes,
        cfg.window_days,
    )?;
    let summary = table.summary();
    info!(
        records = summary.records,
        dates = summary.dates,
        states = summary.states,
        first = ?summary.first_date,
        last = ?summary.last_date,
        missing_code = ?summary.missing_code,
        missing_population = ?summary.missing_population,
        max_per_capita = summary.max_per_capita,
        "transform summary"
    );

    // ─── 5) optional export ──────────────────────────────────────────
    if let Some(path) = &args.parquet {
        export::write_parquet(&table, path)?;
    }

    // ─── 6) render ───────────────────────────────────────────────────
    let page = render::render(&table, &cfg.chart, &cfg.output_html, cfg.open_viewer)?;
    info!(page = %page.display(), "all done");
    Ok(())
}
