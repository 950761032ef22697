// src/export.rs

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Date32Builder, Float64Builder, Int64Builder, StringBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::NaiveDate;
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
    sync::Arc,
};
use tracing::{info, instrument};

use crate::process::EnrichedTable;

/// Arrow layout of an exported table. Unknown code / average / population
/// are written as nulls rather than zeros.
pub fn enriched_schema() -> Schema {
    Schema::new(vec![
        Field::new("state", DataType::Utf8, false),
        Field::new("code", DataType::Utf8, true),
        Field::new("date", DataType::Date32, false),
        Field::new("date_key", DataType::Utf8, false),
        Field::new("cases", DataType::Int64, false),
        Field::new("new_cases", DataType::Float64, false),
        Field::new("avg_new_cases", DataType::Float64, true),
        Field::new("population", DataType::Float64, true),
        Field::new("new_cases_per_capita", DataType::Float64, false),
    ])
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("unix epoch is a valid date");
    (date - epoch).num_days() as i32
}

/// Build a single record batch from the table, preserving row order.
pub fn to_record_batch(table: &EnrichedTable) -> Result<RecordBatch> {
    let n = table.len();
    let mut state = StringBuilder::new();
    let mut code = StringBuilder::new();
    let mut date = Date32Builder::with_capacity(n);
    let mut date_key = StringBuilder::new();
    let mut cases = Int64Builder::with_capacity(n);
    let mut new_cases = Float64Builder::with_capacity(n);
    let mut avg = Float64Builder::with_capacity(n);
    let mut population = Float64Builder::with_capacity(n);
    let mut per_capita = Float64Builder::with_capacity(n);

    for r in table.records() {
        state.append_value(&r.state);
        code.append_option(r.code.as_deref());
        date.append_value(days_since_epoch(r.date));
        date_key.append_value(&r.date_key);
        cases.append_value(r.cases);
        new_cases.append_value(r.new_cases);
        avg.append_option(r.avg_new_cases);
        population.append_option(r.population);
        per_capita.append_value(r.new_cases_per_capita);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(state.finish()),
        Arc::new(code.finish()),
        Arc::new(date.finish()),
        Arc::new(date_key.finish()),
        Arc::new(cases.finish()),
        Arc::new(new_cases.finish()),
        Arc::new(avg.finish()),
        Arc::new(population.finish()),
        Arc::new(per_capita.finish()),
    ];
    RecordBatch::try_new(Arc::new(enriched_schema()), columns)
        .context("building enriched record batch")
}

/// Write the table to `path` as Parquet. The file is written next to its
/// destination as `.tmp` and renamed once closed.
#[instrument(level = "info", skip(table, path), fields(path = %path.as_ref().display(), rows = table.len()))]
pub fn write_parquet(table: &EnrichedTable, path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating export directory {}", parent.display()))?;
    }

    let batch = to_record_batch(table)?;
    let tmp_path = path.with_extension("parquet.tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("could not create temporary file `{}`", tmp_path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))
        .context("creating ArrowWriter for export")?;
    writer.write(&batch).context("writing export batch")?;
    writer.close().context("closing export writer")?;

    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "failed to rename `{}` to `{}`",
            tmp_path.display(),
            path.display()
        )
    })?;

    info!(rows = batch.num_rows(), "wrote parquet export");
    Ok(batch.num_rows())
}
