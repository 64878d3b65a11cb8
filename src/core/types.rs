// パイプラインで扱うデータ型定義

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// 顧客名の列名（結果と入力行の対応付けに使う）
pub const NAME_FIELD: &str = "Name";

/// 入力ファイルの1行
///
/// `index`は読み込み後の元の行位置で、結果との対応付けに使用する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub index: usize,
    /// 入力ファイル上の行番号（ヘッダーを除く1始まり）
    pub source_row: usize,
    pub fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new(index: usize, fields: BTreeMap<String, String>) -> Self {
        Self {
            index,
            source_row: index + 1,
            fields,
        }
    }

    pub fn with_source_row(mut self, source_row: usize) -> Self {
        self.source_row = source_row;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// 空白のみの値は未設定として扱う
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// 連続したレコードの塊（ワーカーへの作業単位）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub records: Vec<Record>,
}

impl Chunk {
    pub fn new(index: usize, records: Vec<Record>) -> Self {
        Self { index, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record_indices(&self) -> Vec<usize> {
        self.records.iter().map(|record| record.index).collect()
    }
}

/// エラー結果の発生源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 個別レコードの検証失敗
    Record,
    /// チャンク全体の処理失敗
    Chunk,
    /// 実行が打ち切られ未処理のまま終わった
    Abandoned,
}

impl FailureKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Chunk => "chunk",
            Self::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// レコード単位の検証結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub record_index: usize,
    /// 入力ファイル上の行番号（レコードと対応付けた後に設定される）
    #[serde(default)]
    pub source_row: Option<usize>,
    #[serde(default)]
    pub name: Option<String>,
    pub is_valid: bool,
    /// キャリア、整形済み番号、ジオコード等の派生情報
    pub fields: BTreeMap<String, String>,
    pub error: Option<ValidationFailure>,
}

impl ValidationResult {
    pub fn valid(record_index: usize) -> Self {
        Self {
            record_index,
            source_row: None,
            name: None,
            is_valid: true,
            fields: BTreeMap::new(),
            error: None,
        }
    }

    pub fn invalid(record_index: usize, message: impl Into<String>) -> Self {
        Self::failed(record_index, FailureKind::Record, message)
    }

    pub fn chunk_failure(record_index: usize, message: impl Into<String>) -> Self {
        Self::failed(record_index, FailureKind::Chunk, message)
    }

    pub fn abandoned(record_index: usize) -> Self {
        Self::failed(
            record_index,
            FailureKind::Abandoned,
            "run was abandoned before this record was processed",
        )
    }

    pub fn failed(record_index: usize, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            record_index,
            source_row: None,
            name: None,
            is_valid: false,
            fields: BTreeMap::new(),
            error: Some(ValidationFailure {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// 入力レコードのレコード番号・行番号・顧客名を付ける
    pub fn for_record(mut self, record: &Record) -> Self {
        self.record_index = record.index;
        self.source_row = Some(record.source_row);
        self.name = record.get(NAME_FIELD).map(str::to_string);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error.as_ref().map(|failure| failure.kind)
    }
}

/// 結果の並び順
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderMode {
    /// 入力順（チャンクの投入順）
    #[default]
    Submission,
    /// チャンクの完了順
    Completion,
}

/// 実際に使用された実行方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Parallel,
    #[default]
    Sequential,
}

/// 1回の検証実行の状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Pending,
    Dispatched,
    Aggregating,
    Done,
}

/// 実行単位の統計情報（実行ごとに新規作成）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub total_records: usize,
    pub total_chunks: usize,
    pub chunks_completed: usize,
    pub failed_chunks: usize,
    pub abandoned_chunks: usize,
    /// エラー付き結果の件数
    pub errors: usize,
    pub valid_records: usize,
    pub worker_count: usize,
    pub execution_mode: ExecutionMode,
    pub fallback_reason: Option<String>,
    pub abandoned: bool,
    pub elapsed_ms: u64,
}

impl RunStatistics {
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

/// チャンク完了ごとの進捗通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub chunk_index: usize,
    pub chunk_failed: bool,
    pub chunks_completed: usize,
    pub total_chunks: usize,
    pub records_completed: usize,
    pub total_records: usize,
    pub errors: usize,
}

impl ProgressUpdate {
    pub fn fraction(&self) -> f64 {
        if self.total_records == 0 {
            return 1.0;
        }
        (self.records_completed as f64 / self.total_records as f64).min(1.0)
    }
}

/// 検証実行の最終結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub results: Vec<ValidationResult>,
    pub statistics: RunStatistics,
    pub state: RunState,
}

impl ValidationOutcome {
    pub fn error_results(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|result| result.is_error())
    }
}
