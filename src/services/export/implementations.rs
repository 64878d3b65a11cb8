// 検証結果出力の具象実装

use crate::core::{ResultExporter, RunStatistics, ValidationOutcome, ValidationResult};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};

/// メモリ内保存の出力実装（テスト用）
#[derive(Debug, Clone, Default)]
pub struct MemoryResultExporter {
    outcomes: Arc<Mutex<Vec<ValidationOutcome>>>,
}

impl MemoryResultExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// テスト用：最後に出力された結果を取得
    pub fn last_outcome(&self) -> Option<ValidationOutcome> {
        self.outcomes
            .lock()
            .ok()
            .and_then(|outcomes| outcomes.last().cloned())
    }

    /// テスト用：出力回数を取得
    pub fn export_count(&self) -> usize {
        self.outcomes.lock().map(|outcomes| outcomes.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ResultExporter for MemoryResultExporter {
    async fn export(&self, outcome: &ValidationOutcome) -> Result<()> {
        self.outcomes
            .lock()
            .map_err(|_| anyhow::anyhow!("結果ストアのロックが破損しています"))?
            .push(outcome.clone());
        Ok(())
    }
}

/// 実行情報
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub validation: String,
    pub timestamp: String,
    pub total_records: usize,
}

/// JSON出力フォーマット
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub run_info: RunInfo,
    pub statistics: RunStatistics,
    pub results: Vec<ValidationResult>,
}

/// 出力先ファイルを作成（親ディレクトリも作成）
async fn create_output(path: &Path) -> Result<BufWriter<tokio::fs::File>> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| anyhow::anyhow!("ディレクトリ作成エラー: {e}"))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| anyhow::anyhow!("ファイル作成エラー: {}: {e}", path.display()))?;

    Ok(BufWriter::new(file))
}

/// JSON形式での出力実装
#[derive(Debug, Clone)]
pub struct JsonResultExporter {
    file_path: PathBuf,
    validation: String,
}

impl JsonResultExporter {
    pub fn new<P: AsRef<Path>>(file_path: P, validation: impl Into<String>) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            validation: validation.into(),
        }
    }
}

#[async_trait]
impl ResultExporter for JsonResultExporter {
    async fn export(&self, outcome: &ValidationOutcome) -> Result<()> {
        let report = ValidationReport {
            run_info: RunInfo {
                validation: self.validation.clone(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                total_records: outcome.results.len(),
            },
            statistics: outcome.statistics.clone(),
            results: outcome.results.clone(),
        };

        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| anyhow::anyhow!("JSON変換エラー: {e}"))?;

        let mut writer = create_output(&self.file_path).await?;
        writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| anyhow::anyhow!("書き込みエラー: {e}"))?;
        writer
            .flush()
            .await
            .map_err(|e| anyhow::anyhow!("フラッシュエラー: {e}"))?;

        Ok(())
    }
}

/// CSV形式での出力実装
///
/// 1結果につき1行。派生フィールドは全結果の和集合を列として並べる。
#[derive(Debug, Clone)]
pub struct CsvResultExporter {
    file_path: PathBuf,
}

impl CsvResultExporter {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    fn render(outcome: &ValidationOutcome) -> Result<Vec<u8>> {
        let field_columns: BTreeSet<&str> = outcome
            .results
            .iter()
            .flat_map(|result| result.fields.keys().map(String::as_str))
            .collect();

        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

        let mut header = vec![
            "record_index",
            "source_row",
            "name",
            "is_valid",
            "error_kind",
            "error",
        ];
        header.extend(field_columns.iter().copied());
        writer.write_record(&header)?;

        for result in &outcome.results {
            let mut row = vec![
                result.record_index.to_string(),
                result
                    .source_row
                    .map(|row| row.to_string())
                    .unwrap_or_default(),
                result.name.clone().unwrap_or_default(),
                result.is_valid.to_string(),
                result
                    .failure_kind()
                    .map(|kind| kind.as_str().to_string())
                    .unwrap_or_default(),
                result
                    .error
                    .as_ref()
                    .map(|failure| failure.message.clone())
                    .unwrap_or_default(),
            ];
            row.extend(
                field_columns
                    .iter()
                    .map(|column| result.fields.get(*column).cloned().unwrap_or_default()),
            );
            writer.write_record(&row)?;
        }

        writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("CSV変換エラー: {e}"))
    }
}

#[async_trait]
impl ResultExporter for CsvResultExporter {
    async fn export(&self, outcome: &ValidationOutcome) -> Result<()> {
        let bytes = Self::render(outcome)?;

        let mut writer = create_output(&self.file_path).await?;
        writer
            .write_all(&bytes)
            .await
            .map_err(|e| anyhow::anyhow!("書き込みエラー: {e}"))?;
        writer
            .flush()
            .await
            .map_err(|e| anyhow::anyhow!("フラッシュエラー: {e}"))?;

        Ok(())
    }
}

/// 拡張子に応じた出力実装を選択（`.csv`以外はJSON）
pub fn exporter_for_path(path: &Path, validation: &str) -> Box<dyn ResultExporter> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        Box::new(CsvResultExporter::new(path))
    } else {
        Box::new(JsonResultExporter::new(path, validation))
    }
}
