// src/render/mod.rs

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub mod figure;
pub mod html;

pub use figure::{build_figure, ChoroplethTrace, Figure, Frame};

use crate::config::ChartConfig;
use crate::process::EnrichedTable;

/// Draw the animated map for `table` into an HTML page at `output` and,
/// if asked, open it. Frame order is the table's row order.
#[instrument(level = "info", skip(table, chart, output), fields(rows = table.len(), output = %output.display()))]
pub fn render(table: &EnrichedTable, chart: &ChartConfig, output: &Path, open: bool) -> Result<PathBuf> {
    let fig = build_figure(table, chart);
    html::write_page(&fig, chart, output)?;
    info!(
        frames = fig.frames.len(),
        max_per_capita = table.max_per_capita(),
        "rendered choropleth"
    );

    if open {
        html::open_viewer(output);
    }
    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{massage_data, CaseRecord, PopulationRecord, StateCodeRecord};
    use tempfile::tempdir;

    #[test]
    fn end_to_end_page_from_raw_rows() -> Result<()> {
        let cases: Vec<CaseRecord> = (1..=8)
            .map(|d| CaseRecord {
                date: format!("2020-06-{:02}", d),
                state: "Alabama".into(),
                cases: 10 * d as i64,
                deaths: None,
            })
            .collect();
        let population = vec![PopulationRecord {
            code: "AL".into(),
            ages: "total".into(),
            year: Some(2013),
            population: Some(1000.0),
        }];
        let codes = vec![StateCodeRecord {
            state: "Alabama".into(),
            abbrev: Some("Ala.".into()),
            code: "AL".into(),
        }];
        let table = massage_data(cases, &population, &codes, 7)?;

        let tmp = tempdir()?;
        let out = tmp.path().join("map.html");
        let written = render(&table, &ChartConfig::default(), &out, false)?;
        assert_eq!(written, out);

        let html = std::fs::read_to_string(&out)?;
        assert!(html.contains("\"06-08-2020\""));
        // diffs 0,10,...,10 → day 7 avg 60/7, day 8 avg 10; max = 10 / 1000
        assert!(html.contains("\"cmax\":0.01"));
        Ok(())
    }
}
