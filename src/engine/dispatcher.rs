// Dispatcher - チャンク分割と作業キューへの投入

use crate::core::{Chunk, Record};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// レコード列を連続・重複なしの固定長チャンクへ分割
///
/// チャンク数は ceil(N / chunk_size)。最後のチャンクのみ短くなりうる。
/// `chunk_size` が0の場合は1として扱う。
pub fn partition_into_chunks(records: Vec<Record>, chunk_size: usize) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::with_capacity(records.len().div_ceil(chunk_size));
    let mut records = records.into_iter().peekable();

    while records.peek().is_some() {
        let batch: Vec<Record> = records.by_ref().take(chunk_size).collect();
        chunks.push(Chunk::new(chunks.len(), batch));
    }

    chunks
}

/// Dispatcher: 全チャンクを完了を待たずに作業チャンネルへ投入
///
/// 停止フラグが立つか作業チャンネルが閉じられた時点で投入をやめる。
/// 戻り値は投入できたチャンク数。
pub fn spawn_dispatcher(
    handle: &Handle,
    chunks: Vec<Arc<Chunk>>,
    work_tx: mpsc::Sender<Arc<Chunk>>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<Result<usize>> {
    handle.spawn(async move {
        let mut submitted = 0;

        for chunk in chunks {
            if stop.load(Ordering::SeqCst) {
                debug!(submitted, "dispatch stopped by abandonment");
                break;
            }
            if work_tx.send(chunk).await.is_err() {
                // ワーカー側が全て終了した
                break;
            }
            submitted += 1;
        }

        // work_txをドロップしてチャンネル終了シグナル
        Ok(submitted)
    })
}
