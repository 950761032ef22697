// src/render/html.rs

use anyhow::{Context, Result};
use std::{fs, path::Path, process::Command};
use tracing::{debug, warn};

use super::figure::Figure;
use crate::config::ChartConfig;

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Standalone page: loads plotly.js, draws the first frame, then registers
/// the rest so the play button and slider can animate through them.
pub fn page(figure: &Figure, chart: &ChartConfig) -> Result<String> {
    // `</` inside a <script> block would end it early
    let json = serde_json::to_string(figure)
        .context("serializing figure")?
        .replace("</", "<\\/");
    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{plotly}"></script>
</head>
<body>
<div id="chart" style="width:100%;height:{height}px;"></div>
<script>
const figure = {json};
Plotly.newPlot("chart", figure.data, figure.layout, {{ responsive: true }})
  .then(function () {{ return Plotly.addFrames("chart", figure.frames); }});
</script>
</body>
</html>
"#,
        title = escape_html(&chart.title),
        plotly = escape_html(&chart.plotly_js_url),
        height = chart.height,
        json = json,
    ))
}

pub fn write_page(figure: &Figure, chart: &ChartConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let html = page(figure, chart)?;
    fs::write(path, html).with_context(|| format!("writing chart page {}", path.display()))?;
    debug!(path = %path.display(), "wrote chart page");
    Ok(())
}

/// Hand the page to the platform's default opener. A failed launch only
/// warns; the page is already on disk.
pub fn open_viewer(path: &Path) {
    let mut cmd = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };
    match cmd.arg(path).status() {
        Ok(status) if status.success() => debug!(path = %path.display(), "opened viewer"),
        Ok(status) => warn!(path = %path.display(), %status, "viewer exited unsuccessfully"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not launch viewer"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::EnrichedTable;
    use crate::render::figure::build_figure;
    use tempfile::tempdir;

    #[test]
    fn page_embeds_figure_and_frames() -> Result<()> {
        let chart = ChartConfig::default();
        let fig = build_figure(&EnrichedTable::default(), &chart);
        let html = page(&fig, &chart)?;
        assert!(html.contains(&chart.plotly_js_url));
        assert!(html.contains("Plotly.addFrames"));
        assert!(html.contains("<title>Cases per Capita by State</title>"));
        assert!(html.contains("height:600px"));
        Ok(())
    }

    #[test]
    fn script_terminators_are_escaped() -> Result<()> {
        let chart = ChartConfig {
            title: "</script><b>".to_string(),
            ..ChartConfig::default()
        };
        let fig = build_figure(&EnrichedTable::default(), &chart);
        let html = page(&fig, &chart)?;
        assert_eq!(html.matches("</script>").count(), 2);
        assert!(html.contains("&lt;/script&gt;&lt;b&gt;"));
        Ok(())
    }

    #[test]
    fn writes_into_missing_directory() -> Result<()> {
        let tmp = tempdir()?;
        let out = tmp.path().join("charts").join("map.html");
        let chart = ChartConfig::default();
        write_page(&build_figure(&EnrichedTable::default(), &chart), &chart, &out)?;
        assert!(fs::read_to_string(&out)?.starts_with("<!DOCTYPE html>"));
        Ok(())
    }
}
