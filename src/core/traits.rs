// 検証パイプラインのトレイト定義
// 全ての抽象化インターフェースを定義

use super::error::ValidatorError;
use super::types::{Chunk, OrderMode, Record, RunStatistics, ValidationOutcome, ValidationResult};
use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use std::time::Duration;

/// パイプラインの設定を抽象化するトレイト
#[automock]
pub trait PipelineConfig: Send + Sync {
    /// 並列実行を有効にするかどうか
    fn enable_parallel(&self) -> bool;

    /// ワーカー数の上限
    fn max_workers(&self) -> usize;

    /// 1チャンクあたりのレコード数
    fn chunk_size(&self) -> usize;

    /// 作業・結果チャンネルのバッファサイズ
    fn channel_buffer_size(&self) -> usize;

    /// 結果の並び順
    fn order_mode(&self) -> OrderMode;

    /// チャンク1つあたりの処理時間上限
    fn chunk_timeout(&self) -> Option<Duration>;

    /// 進捗報告を有効にするかどうか
    fn enable_progress_reporting(&self) -> bool;
}

impl PipelineConfig for Box<dyn PipelineConfig> {
    fn enable_parallel(&self) -> bool {
        self.as_ref().enable_parallel()
    }

    fn max_workers(&self) -> usize {
        self.as_ref().max_workers()
    }

    fn chunk_size(&self) -> usize {
        self.as_ref().chunk_size()
    }

    fn channel_buffer_size(&self) -> usize {
        self.as_ref().channel_buffer_size()
    }

    fn order_mode(&self) -> OrderMode {
        self.as_ref().order_mode()
    }

    fn chunk_timeout(&self) -> Option<Duration> {
        self.as_ref().chunk_timeout()
    }

    fn enable_progress_reporting(&self) -> bool {
        self.as_ref().enable_progress_reporting()
    }
}

/// 進捗報告の抽象化トレイト
#[automock]
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    /// 処理開始時の報告
    async fn report_started(&self, total_records: usize, total_chunks: usize);

    /// 進捗更新の報告
    async fn report_progress(&self, completed: usize, total: usize);

    /// チャンク失敗時の報告
    async fn report_chunk_failed(&self, chunk_index: usize, error: &str);

    /// 処理完了時の報告
    async fn report_completed(&self, statistics: &RunStatistics);
}

#[async_trait]
impl ProgressReporter for Box<dyn ProgressReporter> {
    async fn report_started(&self, total_records: usize, total_chunks: usize) {
        self.as_ref().report_started(total_records, total_chunks).await
    }

    async fn report_progress(&self, completed: usize, total: usize) {
        self.as_ref().report_progress(completed, total).await
    }

    async fn report_chunk_failed(&self, chunk_index: usize, error: &str) {
        self.as_ref().report_chunk_failed(chunk_index, error).await
    }

    async fn report_completed(&self, statistics: &RunStatistics) {
        self.as_ref().report_completed(statistics).await
    }
}

/// チャンク単位の検証処理
///
/// 戻り値はチャンク内の各レコードに1つずつ、同じ順序で並んでいる必要がある。
/// `Err`を返すとチャンク全体が失敗として扱われる。
#[automock]
#[async_trait]
pub trait ChunkProcessor: Send + Sync {
    async fn process_chunk(&self, chunk: &Chunk) -> Result<Vec<ValidationResult>>;
}

#[async_trait]
impl ChunkProcessor for Box<dyn ChunkProcessor> {
    async fn process_chunk(&self, chunk: &Chunk) -> Result<Vec<ValidationResult>> {
        self.as_ref().process_chunk(chunk).await
    }
}

/// レコード単位の検証処理（電話番号、住所、重複チェック）
#[automock]
#[async_trait]
pub trait RecordValidator: Send + Sync {
    async fn validate(&self, record: &Record) -> std::result::Result<ValidationResult, ValidatorError>;
}

/// 検証結果の出力
#[automock]
#[async_trait]
pub trait ResultExporter: Send + Sync {
    async fn export(&self, outcome: &ValidationOutcome) -> Result<()>;
}

#[async_trait]
impl ResultExporter for Box<dyn ResultExporter> {
    async fn export(&self, outcome: &ValidationOutcome) -> Result<()> {
        self.as_ref().export(outcome).await
    }
}
