// ValidationRun - 実行中の検証ジョブ（呼び出し側が完了を1つずつ取り出す）

use super::aggregator::ResultAggregator;
use super::worker::{execute_chunk, ChunkCompletion};
use super::worker_pool::WorkerPool;
use crate::core::{
    Chunk, ChunkProcessor, FailureKind, PipelineError, ProgressReporter, ProgressUpdate, RunState,
    RunStatistics, ValidationOutcome,
};
use anyhow::Result;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// チャンク完了の供給元
pub(crate) enum RunSource<P> {
    Parallel {
        pool: WorkerPool,
        result_rx: mpsc::Receiver<ChunkCompletion>,
        stop: Arc<AtomicBool>,
        dispatcher: JoinHandle<Result<usize>>,
        workers: Vec<JoinHandle<Result<()>>>,
    },
    Sequential {
        processor: Arc<P>,
        pending: VecDeque<Arc<Chunk>>,
        timeout: Option<Duration>,
    },
}

/// 1回の検証実行
///
/// `next_completion` を呼ぶたびにチャンク完了を1つ集約し進捗を返す。
/// 取り出しを止めると結果バッファが埋まった時点でワーカーが待機し、
/// それ以上のチャンクは着手されない。
pub struct ValidationRun<P, R>
where
    P: ChunkProcessor + 'static,
    R: ProgressReporter,
{
    aggregator: ResultAggregator,
    chunks: Vec<Arc<Chunk>>,
    source: RunSource<P>,
    reporter: Arc<R>,
    report_progress: bool,
}

impl<P, R> ValidationRun<P, R>
where
    P: ChunkProcessor + 'static,
    R: ProgressReporter,
{
    pub(crate) fn new(
        mut aggregator: ResultAggregator,
        chunks: Vec<Arc<Chunk>>,
        source: RunSource<P>,
        reporter: Arc<R>,
        report_progress: bool,
    ) -> Self {
        aggregator.mark_dispatched();
        Self {
            aggregator,
            chunks,
            source,
            reporter,
            report_progress,
        }
    }

    pub fn state(&self) -> RunState {
        self.aggregator.state()
    }

    pub fn statistics(&self) -> &RunStatistics {
        self.aggregator.statistics()
    }

    /// 次のチャンク完了を待って集約する（全チャンク終了後は `None`）
    pub async fn next_completion(&mut self) -> Option<ProgressUpdate> {
        loop {
            let completion = match &mut self.source {
                RunSource::Parallel { result_rx, .. } => result_rx.recv().await?,
                RunSource::Sequential {
                    processor,
                    pending,
                    timeout,
                } => {
                    let chunk = pending.pop_front()?;
                    execute_chunk(Arc::clone(processor), chunk, *timeout).await
                }
            };

            let failure = completion.failure.clone();
            let Some(update) = self.aggregator.record(completion) else {
                continue;
            };

            if let Some(error) = failure {
                self.reporter
                    .report_chunk_failed(update.chunk_index, &error)
                    .await;
            }
            if self.report_progress {
                self.reporter
                    .report_progress(update.records_completed, update.total_records)
                    .await;
            }

            return Some(update);
        }
    }

    /// 残りの全チャンクを処理して最終結果を返す
    pub async fn finish(mut self) -> ValidationOutcome {
        while self.next_completion().await.is_some() {}
        self.complete(FailureKind::Chunk).await
    }

    /// 実行を打ち切る
    ///
    /// 処理中のチャンクは完了を待って集約し、未着手のチャンクのレコードには
    /// 打ち切りを示すエラー結果を付ける。
    pub async fn abandon(mut self) -> ValidationOutcome {
        info!("abandoning validation run");
        match &mut self.source {
            RunSource::Parallel { stop, .. } => stop.store(true, Ordering::SeqCst),
            RunSource::Sequential { pending, .. } => pending.clear(),
        }

        while self.next_completion().await.is_some() {}
        self.complete(FailureKind::Abandoned).await
    }

    async fn complete(self, missing_kind: FailureKind) -> ValidationOutcome {
        let Self {
            aggregator,
            chunks,
            source,
            reporter,
            ..
        } = self;

        if let RunSource::Parallel {
            pool,
            dispatcher,
            workers,
            ..
        } = source
        {
            match dispatcher.await {
                Ok(Ok(submitted)) => info!(submitted, "dispatcher finished"),
                Ok(Err(error)) => warn!("dispatcher failed: {error:#}"),
                Err(join_error) => warn!("{}", PipelineError::task(join_error)),
            }
            for worker in workers {
                match worker.await {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => warn!("worker failed: {error:#}"),
                    Err(join_error) => warn!("{}", PipelineError::task(join_error)),
                }
            }
            drop(pool);
        }

        let outcome = aggregator.finish(&chunks, missing_kind);
        reporter.report_completed(&outcome.statistics).await;
        outcome
    }
}
