// 入力ファイルの読み込み（CSV / JSON / Excel）

use super::cleaning::{clean_rows, RawRow};
use super::spreadsheet::read_workbook_rows;
use crate::core::{PipelineError, PipelineResult, Record};
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// 入力ファイルを読み込み、正規化済みのレコード列を返す
///
/// 拡張子で形式を判定する（`.csv`、`.json`、`.xlsx` / `.xlsm` / `.xls`）。
pub fn load_records(path: &Path) -> PipelineResult<Vec<Record>> {
    let path_label = path.display().to_string();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let rows = match extension.as_deref() {
        Some("csv") => read_csv_rows(path),
        Some("json") => read_json_rows(path),
        Some("xlsx" | "xlsm" | "xls") => read_workbook_rows(path),
        _ => Err(anyhow::anyhow!(
            "unsupported input format (expected .csv, .json, .xlsx or .xls)"
        )),
    }
    .map_err(|source| PipelineError::input(path_label.clone(), source))?;

    let raw_count = rows.len();
    let records = clean_rows(rows);
    info!(
        path = %path_label,
        rows = raw_count,
        records = records.len(),
        "loaded input records"
    );

    Ok(records)
}

fn read_csv_rows(path: &Path) -> anyhow::Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("failed to read CSV header")?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (position, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("malformed CSV row {}", position + 1))?;
        let fields = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();

        rows.push(RawRow {
            source_row: position + 1,
            fields,
        });
    }

    Ok(rows)
}

fn json_value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn read_json_rows(path: &Path) -> anyhow::Result<Vec<RawRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let objects: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(&content).context("expected a JSON array of objects")?;

    Ok(objects
        .iter()
        .enumerate()
        .map(|(position, object)| RawRow {
            source_row: position + 1,
            fields: object
                .iter()
                .map(|(key, value)| (key.clone(), json_value_to_string(value)))
                .collect::<BTreeMap<_, _>>(),
        })
        .collect())
}
