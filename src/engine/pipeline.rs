// ValidationPipeline - 依存性注入によるチャンク並列検証パイプライン
// 処理関数・設定・進捗報告の全てをコンストラクタで注入する

use super::aggregator::ResultAggregator;
use super::dispatcher::{partition_into_chunks, spawn_dispatcher};
use super::run::{RunSource, ValidationRun};
use super::strategy::ExecutionStrategy;
use super::worker_pool::{build_runtime, RuntimeBuilder, WorkerPool};
use crate::core::{
    ChunkProcessor, PipelineConfig, PipelineResult, ProgressReporter, Record, ValidationOutcome,
};
use crate::services::validate_config;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// チャンク並列検証パイプライン
///
/// 実行ごとに専用のワーカープールを作り、実行終了時に破棄する。
/// 実行間で共有される状態はない。
pub struct ValidationPipeline<P, C, R> {
    processor: Arc<P>,
    config: Arc<C>,
    reporter: Arc<R>,
    runtime_builder: RuntimeBuilder,
}

impl<P, C, R> ValidationPipeline<P, C, R>
where
    P: ChunkProcessor + 'static,
    C: PipelineConfig,
    R: ProgressReporter,
{
    pub fn new(processor: P, config: C, reporter: R) -> Self {
        Self {
            processor: Arc::new(processor),
            config: Arc::new(config),
            reporter: Arc::new(reporter),
            runtime_builder: build_runtime,
        }
    }

    /// ワーカープールのランタイム生成を差し替える
    pub fn with_runtime_builder(mut self, runtime_builder: RuntimeBuilder) -> Self {
        self.runtime_builder = runtime_builder;
        self
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// 検証を開始する
    ///
    /// 設定を検証し、チャンクに分割して実行方式を決め、全チャンクを投入した
    /// 実行ハンドルを返す。プールを作れない場合は逐次実行に切り替える。
    pub async fn start(&self, records: Vec<Record>) -> PipelineResult<ValidationRun<P, R>> {
        validate_config(self.config.as_ref())?;

        let total_records = records.len();
        let chunks: Vec<_> = partition_into_chunks(records, self.config.chunk_size())
            .into_iter()
            .map(Arc::new)
            .collect();
        let total_chunks = chunks.len();

        let strategy = ExecutionStrategy::select(
            self.config.enable_parallel(),
            self.config.max_workers(),
            total_chunks,
        );
        let mut aggregator = ResultAggregator::new(
            total_records,
            total_chunks,
            self.config.order_mode(),
            strategy,
        );

        self.reporter.report_started(total_records, total_chunks).await;

        let pool = match strategy {
            ExecutionStrategy::Parallel { workers } => {
                match WorkerPool::try_new_with(workers, self.runtime_builder) {
                    Ok(pool) => Some(pool),
                    Err(error) => {
                        warn!("{error}; falling back to sequential execution");
                        aggregator.record_fallback(error.to_string());
                        None
                    }
                }
            }
            ExecutionStrategy::Sequential => None,
        };

        let chunk_timeout = self.config.chunk_timeout();
        let source = match pool {
            Some(pool) => {
                let buffer_size = self.config.channel_buffer_size();
                let (work_tx, work_rx) = mpsc::channel(buffer_size);
                let (result_tx, result_rx) = mpsc::channel(buffer_size);
                let stop = Arc::new(AtomicBool::new(false));

                let workers = pool.spawn_workers(
                    Arc::clone(&self.processor),
                    work_rx,
                    result_tx,
                    Arc::clone(&stop),
                    chunk_timeout,
                );
                let dispatcher =
                    spawn_dispatcher(pool.handle(), chunks.clone(), work_tx, Arc::clone(&stop));

                info!(
                    total_records,
                    total_chunks,
                    workers = pool.worker_count(),
                    "dispatched chunks to worker pool"
                );

                RunSource::Parallel {
                    pool,
                    result_rx,
                    stop,
                    dispatcher,
                    workers,
                }
            }
            None => {
                info!(total_records, total_chunks, "running chunks sequentially");
                RunSource::Sequential {
                    processor: Arc::clone(&self.processor),
                    pending: chunks.iter().cloned().collect::<VecDeque<_>>(),
                    timeout: chunk_timeout,
                }
            }
        };

        Ok(ValidationRun::new(
            aggregator,
            chunks,
            source,
            Arc::clone(&self.reporter),
            self.config.enable_progress_reporting(),
        ))
    }

    /// 全レコードを検証して最終結果を返す
    pub async fn run(&self, records: Vec<Record>) -> PipelineResult<ValidationOutcome> {
        let run = self.start(records).await?;
        Ok(run.finish().await)
    }
}
