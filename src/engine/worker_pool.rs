// WorkerPool - 実行ごとの専用ランタイムと並列ワーカー

use super::worker::{execute_chunk, ChunkCompletion};
use crate::core::{Chunk, ChunkProcessor, PipelineError, PipelineResult};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

/// ランタイム生成関数（テストで失敗を注入できるよう差し替え可能）
pub type RuntimeBuilder = fn(usize) -> std::io::Result<Runtime>;

/// ワーカー数分のスレッドを持つマルチスレッドランタイムを生成
pub fn build_runtime(worker_count: usize) -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_count.max(1))
        .thread_name("validation-worker")
        .enable_all()
        .build()
}

/// 1回の実行専用のワーカープール
///
/// 実行が終わりプールが破棄されると、ランタイムも停止する。
pub struct WorkerPool {
    runtime: Option<Runtime>,
    handle: Handle,
    worker_count: usize,
}

impl WorkerPool {
    pub fn try_new(worker_count: usize) -> PipelineResult<Self> {
        Self::try_new_with(worker_count, build_runtime)
    }

    pub fn try_new_with(worker_count: usize, builder: RuntimeBuilder) -> PipelineResult<Self> {
        let runtime = builder(worker_count)
            .map_err(|source| PipelineError::pool_initialization(worker_count, source))?;
        let handle = runtime.handle().clone();

        Ok(Self {
            runtime: Some(runtime),
            handle,
            worker_count,
        })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// ワーカーを起動する
    ///
    /// 各ワーカーは共有の作業チャンネルから1チャンクずつ取り出して実行し、
    /// 結果チャンネルへ送る。停止フラグが立つと新しいチャンクは取り出さない。
    pub fn spawn_workers<P>(
        &self,
        processor: Arc<P>,
        work_rx: mpsc::Receiver<Arc<Chunk>>,
        result_tx: mpsc::Sender<ChunkCompletion>,
        stop: Arc<AtomicBool>,
        chunk_timeout: Option<Duration>,
    ) -> Vec<JoinHandle<Result<()>>>
    where
        P: ChunkProcessor + 'static,
    {
        let work_rx = Arc::new(Mutex::new(work_rx));

        (0..self.worker_count)
            .map(|worker_id| {
                spawn_single_worker(
                    &self.handle,
                    worker_id,
                    Arc::clone(&processor),
                    Arc::clone(&work_rx),
                    result_tx.clone(),
                    Arc::clone(&stop),
                    chunk_timeout,
                )
            })
            .collect()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            // 非同期コンテキストからのドロップでもブロックしない
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_count", &self.worker_count)
            .finish_non_exhaustive()
    }
}

/// 単一ワーカー
fn spawn_single_worker<P>(
    handle: &Handle,
    worker_id: usize,
    processor: Arc<P>,
    work_rx: Arc<Mutex<mpsc::Receiver<Arc<Chunk>>>>,
    result_tx: mpsc::Sender<ChunkCompletion>,
    stop: Arc<AtomicBool>,
    chunk_timeout: Option<Duration>,
) -> JoinHandle<Result<()>>
where
    P: ChunkProcessor + 'static,
{
    handle.spawn(async move {
        loop {
            if stop.load(Ordering::SeqCst) {
                break;
            }

            // 次の作業を取得
            let chunk = {
                let mut rx = work_rx.lock().await;
                match rx.recv().await {
                    Some(chunk) => chunk,
                    None => break, // チャンネル終了
                }
            };

            // 受信待ちの間に打ち切られた場合は着手しない
            if stop.load(Ordering::SeqCst) {
                break;
            }

            let completion = execute_chunk(Arc::clone(&processor), chunk, chunk_timeout).await;

            // 結果送信
            if result_tx.send(completion).await.is_err() {
                // 結果チャンネルが閉じられた場合は終了
                break;
            }
        }

        debug!(worker_id, "worker finished");
        Ok(())
    })
}
