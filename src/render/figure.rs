// src/render/figure.rs

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::config::ChartConfig;
use crate::process::{EnrichedRecord, EnrichedTable};

const HOVER: &str = "<b>%{customdata[0]}</b> (%{location})<br>\
date=%{customdata[1]}<br>\
7-day avg=%{customdata[2]:.1f}<br>\
population=%{customdata[3]:,.0f}<br>\
per capita=%{z:.6f}<extra></extra>";

/// One choropleth trace: every state for a single date.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChoroplethTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub locationmode: &'static str,
    /// Two-letter codes; `null` for states with no code, which plotly skips.
    pub locations: Vec<Option<String>>,
    pub z: Vec<f64>,
    /// `[state, date_key, avg_new_cases, population]` per location.
    pub customdata: Vec<(String, String, Option<f64>, Option<f64>)>,
    pub hovertemplate: &'static str,
    pub coloraxis: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Frame {
    pub name: String,
    pub data: Vec<ChoroplethTrace>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Figure {
    pub data: Vec<ChoroplethTrace>,
    pub layout: Value,
    pub frames: Vec<Frame>,
}

impl Figure {
    pub fn frame_names(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.name.as_str()).collect()
    }
}

fn trace_for(name: &str, rows: &[&EnrichedRecord]) -> ChoroplethTrace {
    ChoroplethTrace {
        kind: "choropleth",
        name: name.to_string(),
        locationmode: "USA-states",
        locations: rows.iter().map(|r| r.code.clone()).collect(),
        z: rows.iter().map(|r| r.new_cases_per_capita).collect(),
        customdata: rows
            .iter()
            .map(|r| {
                (
                    r.state.clone(),
                    r.date_key.clone(),
                    r.avg_new_cases,
                    r.population,
                )
            })
            .collect(),
        hovertemplate: HOVER,
        coloraxis: "coloraxis",
    }
}

/// Group rows into frames keyed by `date_key`, in order of first
/// appearance. The table is already date sorted, so that is chronological;
/// nothing here re-sorts.
fn frames_in_row_order(table: &EnrichedTable) -> Vec<Frame> {
    let mut order: Vec<&str> = Vec::new();
    let mut rows: HashMap<&str, Vec<&EnrichedRecord>> = HashMap::new();
    for r in table.records() {
        let key = r.date_key.as_str();
        rows.entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(r);
    }
    order
        .into_iter()
        .map(|key| Frame {
            name: key.to_string(),
            data: vec![trace_for(key, &rows[key])],
        })
        .collect()
}

fn animation_args(frame: Value, chart: &ChartConfig, from_current: bool) -> Value {
    json!([
        frame,
        {
            "frame": { "duration": chart.frame_duration_ms, "redraw": true },
            "mode": "immediate",
            "fromcurrent": from_current,
            "transition": { "duration": chart.transition_duration_ms, "easing": "linear" }
        }
    ])
}

fn layout(chart: &ChartConfig, frames: &[Frame], max_per_capita: f64) -> Value {
    let steps: Vec<Value> = frames
        .iter()
        .map(|f| {
            json!({
                "args": animation_args(json!([f.name]), chart, false),
                "label": f.name,
                "method": "animate"
            })
        })
        .collect();

    json!({
        "title": { "text": chart.title },
        "height": chart.height,
        "geo": { "scope": "usa", "domain": { "x": [0.0, 1.0], "y": [0.0, 1.0] } },
        "coloraxis": {
            "colorscale": [[0.0, chart.low_color], [1.0, chart.high_color]],
            "cmin": 0.0,
            "cmax": max_per_capita,
            "colorbar": { "title": { "text": chart.legend_title } }
        },
        "legend": { "title": { "text": chart.legend_title }, "tracegroupgap": 0 },
        "margin": { "t": 60 },
        "updatemenus": [{
            "type": "buttons",
            "direction": "left",
            "showactive": false,
            "x": 0.1,
            "xanchor": "right",
            "y": 0.0,
            "yanchor": "top",
            "pad": { "r": 10, "t": 70 },
            "buttons": [
                {
                    "label": "&#9654;",
                    "method": "animate",
                    "args": animation_args(Value::Null, chart, true)
                },
                {
                    "label": "&#9724;",
                    "method": "animate",
                    "args": [[null], {
                        "frame": { "duration": 0, "redraw": true },
                        "mode": "immediate",
                        "fromcurrent": true,
                        "transition": { "duration": 0, "easing": "linear" }
                    }]
                }
            ]
        }],
        "sliders": [{
            "active": 0,
            "currentvalue": { "prefix": "date=" },
            "len": 0.9,
            "x": 0.1,
            "xanchor": "left",
            "y": 0.0,
            "yanchor": "top",
            "pad": { "b": 10, "t": 60 },
            "steps": steps
        }]
    })
}

/// Build the animated choropleth for a date-sorted table. The colour scale
/// spans `[0, max per-capita]` over the whole table so frames are comparable.
pub fn build_figure(table: &EnrichedTable, chart: &ChartConfig) -> Figure {
    let frames = frames_in_row_order(table);
    let data = frames
        .first()
        .map(|f| f.data.clone())
        .unwrap_or_else(|| vec![trace_for("", &[])]);
    let layout = layout(chart, &frames, table.max_per_capita());
    Figure {
        data,
        layout,
        frames,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(state: &str, code: Option<&str>, day: u32, per_capita: f64) -> EnrichedRecord {
        let date = NaiveDate::from_ymd_opt(2020, 5, day).unwrap();
        EnrichedRecord {
            state: state.to_string(),
            code: code.map(str::to_string),
            date,
            date_key: date.format("%m-%d-%Y").to_string(),
            cases: 0,
            new_cases: 0.0,
            avg_new_cases: None,
            population: None,
            new_cases_per_capita: per_capita,
        }
    }

    fn table() -> EnrichedTable {
        EnrichedTable::from_records(vec![
            record("Alabama", Some("AL"), 2, 0.002),
            record("Alabama", Some("AL"), 1, 0.001),
            record("Alaska", Some("AK"), 1, 0.004),
            record("Atlantis", None, 2, 0.0),
        ])
    }

    #[test]
    fn one_frame_per_date_in_order() {
        let fig = build_figure(&table(), &ChartConfig::default());
        assert_eq!(fig.frame_names(), vec!["05-01-2020", "05-02-2020"]);
        assert_eq!(fig.frames[0].data[0].locations, vec![Some("AL".into()), Some("AK".into())]);
        assert_eq!(fig.frames[1].data[0].locations, vec![Some("AL".into()), None]);
        assert_eq!(fig.data, fig.frames[0].data);
    }

    #[test]
    fn frames_follow_row_order_not_string_order() {
        // 12-31-2020 sorts after 01-01-2021 as a string; frames must not
        let dec = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
        let jan = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let mut a = record("Alabama", Some("AL"), 1, 0.0);
        a.date = jan;
        a.date_key = "01-01-2021".into();
        let mut b = record("Alabama", Some("AL"), 1, 0.0);
        b.date = dec;
        b.date_key = "12-31-2020".into();
        let fig = build_figure(&EnrichedTable::from_records(vec![a, b]), &ChartConfig::default());
        assert_eq!(fig.frame_names(), vec!["12-31-2020", "01-01-2021"]);
    }

    #[test]
    fn colour_scale_tops_out_at_global_max() {
        let fig = build_figure(&table(), &ChartConfig::default());
        let v = serde_json::to_value(&fig).unwrap();
        assert_eq!(v.pointer("/layout/coloraxis/cmin"), Some(&json!(0.0)));
        assert_eq!(v.pointer("/layout/coloraxis/cmax"), Some(&json!(0.004)));
        assert_eq!(
            v.pointer("/layout/coloraxis/colorscale"),
            Some(&json!([[0.0, "yellow"], [1.0, "red"]]))
        );
        assert_eq!(
            v.pointer("/layout/legend/title/text"),
            Some(&json!("Cases per Capita"))
        );
        assert_eq!(v.pointer("/layout/geo/scope"), Some(&json!("usa")));
        assert_eq!(v.pointer("/data/0/locationmode"), Some(&json!("USA-states")));
        assert_eq!(v.pointer("/data/0/type"), Some(&json!("choropleth")));
    }

    #[test]
    fn play_button_uses_configured_pacing() {
        let chart = ChartConfig {
            frame_duration_ms: 3,
            transition_duration_ms: 2,
            ..ChartConfig::default()
        };
        let v = serde_json::to_value(build_figure(&table(), &chart)).unwrap();
        let play = v.pointer("/layout/updatemenus/0/buttons/0/args/1").unwrap();
        assert_eq!(play.pointer("/frame/duration"), Some(&json!(3)));
        assert_eq!(play.pointer("/transition/duration"), Some(&json!(2)));
        assert_eq!(v.pointer("/layout/updatemenus/0/buttons/0/args/0"), Some(&Value::Null));

        let steps = v.pointer("/layout/sliders/0/steps").unwrap().as_array().unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].pointer("/args/0/0"), Some(&json!("05-02-2020")));
    }

    #[test]
    fn missing_values_serialize_as_null() {
        let v = serde_json::to_value(build_figure(&table(), &ChartConfig::default())).unwrap();
        assert_eq!(v.pointer("/frames/1/data/0/locations/1"), Some(&Value::Null));
        assert_eq!(v.pointer("/frames/1/data/0/customdata/1/0"), Some(&json!("Atlantis")));
        assert_eq!(v.pointer("/frames/1/data/0/customdata/1/3"), Some(&Value::Null));
    }

    #[test]
    fn empty_table_still_builds() {
        let fig = build_figure(&EnrichedTable::default(), &ChartConfig::default());
        assert!(fig.frames.is_empty());
        assert_eq!(fig.data.len(), 1);
        assert!(fig.data[0].z.is_empty());
    }
}
