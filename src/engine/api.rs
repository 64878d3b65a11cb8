// 高レベル公開API
// ValidationPipelineを簡単に使用できるようにするための便利な関数

use super::ValidationPipeline;
use crate::{
    core::{ChunkProcessor, PipelineConfig, PipelineResult, ProgressReporter, Record, ValidationOutcome},
    services::{ConsoleProgressReporter, DefaultPipelineConfig, NoOpProgressReporter},
};

/// 設定済みパイプラインでレコードを検証
pub async fn validate_records<P, C, R>(
    records: Vec<Record>,
    pipeline: &ValidationPipeline<P, C, R>,
) -> PipelineResult<ValidationOutcome>
where
    P: ChunkProcessor + 'static,
    C: PipelineConfig,
    R: ProgressReporter,
{
    pipeline.run(records).await
}

/// ValidationPipeline作成のヘルパー関数
///
/// ホストのCPU数に合わせたワーカー数とコンソール出力を使う
pub fn create_default_pipeline<P>(
    processor: P,
) -> ValidationPipeline<P, DefaultPipelineConfig, ConsoleProgressReporter>
where
    P: ChunkProcessor + 'static,
{
    ValidationPipeline::new(
        processor,
        DefaultPipelineConfig::for_host(num_cpus::get()),
        ConsoleProgressReporter::new(),
    )
}

/// ValidationPipeline作成のヘルパー関数（静音版）
///
/// テストやバックグラウンド処理用
pub fn create_quiet_pipeline<P>(
    processor: P,
) -> ValidationPipeline<P, DefaultPipelineConfig, NoOpProgressReporter>
where
    P: ChunkProcessor + 'static,
{
    ValidationPipeline::new(
        processor,
        DefaultPipelineConfig::for_host(num_cpus::get()),
        NoOpProgressReporter::new(),
    )
}
