// Worker - 単一チャンクの実行と失敗の隔離

use crate::core::{Chunk, ChunkProcessor, PipelineError, ValidationResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 1チャンク分の処理結果（ワーカーから集約側への唯一のメッセージ）
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkCompletion {
    pub chunk_index: usize,
    /// チャンク内の各レコードに1つずつ、入力順
    pub results: Vec<ValidationResult>,
    /// チャンク全体が失敗した場合の理由
    pub failure: Option<String>,
    pub elapsed: Duration,
}

impl ChunkCompletion {
    pub fn succeeded(chunk_index: usize, results: Vec<ValidationResult>, elapsed: Duration) -> Self {
        Self {
            chunk_index,
            results,
            failure: None,
            elapsed,
        }
    }

    /// チャンク失敗：全レコードにチャンク起因のエラー結果を付与
    pub fn failed(chunk: &Chunk, message: impl Into<String>, elapsed: Duration) -> Self {
        let message = message.into();
        let results = chunk
            .records
            .iter()
            .map(|record| {
                ValidationResult::chunk_failure(record.index, message.clone()).for_record(record)
            })
            .collect();

        Self {
            chunk_index: chunk.index,
            results,
            failure: Some(message),
            elapsed,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// 単一チャンクの実行
///
/// 処理関数は独立したタスクで動かし、エラー・パニック・タイムアウト・
/// 結果件数の不一致はいずれもチャンク失敗に変換する。他のチャンクには影響しない。
pub async fn execute_chunk<P>(
    processor: Arc<P>,
    chunk: Arc<Chunk>,
    timeout: Option<Duration>,
) -> ChunkCompletion
where
    P: ChunkProcessor + 'static,
{
    let start_time = Instant::now();

    let task = {
        let chunk = Arc::clone(&chunk);
        tokio::spawn(async move { processor.process_chunk(&chunk).await })
    };
    let abort_handle = task.abort_handle();

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                abort_handle.abort();
                let error = PipelineError::chunk_execution(
                    chunk.index,
                    format!("timed out after {}ms", limit.as_millis()),
                );
                warn!(chunk_index = chunk.index, "{error}");
                return ChunkCompletion::failed(&chunk, error.to_string(), start_time.elapsed());
            }
        },
        None => task.await,
    };

    let outcome = match joined {
        Ok(Ok(results)) if results.len() == chunk.len() => Ok(results),
        Ok(Ok(results)) => Err(PipelineError::chunk_execution(
            chunk.index,
            format!(
                "processor returned {} results for {} records",
                results.len(),
                chunk.len()
            ),
        )),
        Ok(Err(error)) => Err(PipelineError::chunk_execution(
            chunk.index,
            format!("{error:#}"),
        )),
        Err(join_error) if join_error.is_panic() => Err(PipelineError::chunk_execution(
            chunk.index,
            "processor panicked",
        )),
        Err(join_error) => Err(PipelineError::chunk_execution(
            chunk.index,
            join_error.to_string(),
        )),
    };

    match outcome {
        Ok(results) => {
            // チャンク内の順序は維持し、レコード番号と行番号は入力側から付け直す
            let results = chunk
                .records
                .iter()
                .zip(results)
                .map(|(record, result)| result.for_record(record))
                .collect();
            let elapsed = start_time.elapsed();
            debug!(chunk_index = chunk.index, elapsed_ms = elapsed.as_millis() as u64, "chunk completed");
            ChunkCompletion::succeeded(chunk.index, results, elapsed)
        }
        Err(error) => {
            warn!(chunk_index = chunk.index, "{error}");
            ChunkCompletion::failed(&chunk, error.to_string(), start_time.elapsed())
        }
    }
}
