// 進捗監視の具象実装

use crate::core::{ExecutionMode, ProgressReporter, RunStatistics};
use async_trait::async_trait;
use tracing::{info, warn};

/// コンソール出力による進捗報告実装
#[derive(Debug, Default, Clone)]
pub struct ConsoleProgressReporter {
    quiet: bool,
}

impl ConsoleProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

#[async_trait]
impl ProgressReporter for ConsoleProgressReporter {
    async fn report_started(&self, total_records: usize, total_chunks: usize) {
        info!(total_records, total_chunks, "validation run started");
        if !self.quiet {
            println!("🚀 Validating {total_records} records in {total_chunks} chunks...");
        }
    }

    async fn report_progress(&self, completed: usize, total: usize) {
        if !self.quiet && total > 0 {
            let completed = completed.min(total);
            let percentage = (completed as f64 / total as f64) * 100.0;
            println!("📊 Progress: {completed}/{total} ({percentage:.1}%)");
        }
    }

    async fn report_chunk_failed(&self, chunk_index: usize, error: &str) {
        warn!(chunk_index, error, "chunk failed");
        if !self.quiet {
            eprintln!("❌ Chunk {chunk_index} failed: {error}");
        }
    }

    async fn report_completed(&self, statistics: &RunStatistics) {
        info!(
            total_records = statistics.total_records,
            errors = statistics.errors,
            elapsed_ms = statistics.elapsed_ms,
            "validation run completed"
        );
        if self.quiet {
            return;
        }

        let mode = match statistics.execution_mode {
            ExecutionMode::Parallel => format!("parallel x{}", statistics.worker_count),
            ExecutionMode::Sequential => "sequential".to_string(),
        };
        println!(
            "✅ Completed! Records: {}, Valid: {}, Errors: {} ({mode}, {:.2}s)",
            statistics.total_records,
            statistics.valid_records,
            statistics.errors,
            statistics.elapsed().as_secs_f64()
        );
        if let Some(reason) = &statistics.fallback_reason {
            println!("⚠️  Fell back to sequential execution: {reason}");
        }
        if statistics.abandoned {
            println!(
                "⚠️  Run abandoned: {} chunks were never processed",
                statistics.abandoned_chunks
            );
        }
    }
}

/// 何もしない進捗報告実装（テスト・ベンチマーク用）
#[derive(Debug, Default, Clone)]
pub struct NoOpProgressReporter;

impl NoOpProgressReporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProgressReporter for NoOpProgressReporter {
    async fn report_started(&self, _total_records: usize, _total_chunks: usize) {
        // 何もしない
    }

    async fn report_progress(&self, _completed: usize, _total: usize) {
        // 何もしない
    }

    async fn report_chunk_failed(&self, _chunk_index: usize, _error: &str) {
        // 何もしない
    }

    async fn report_completed(&self, _statistics: &RunStatistics) {
        // 何もしない
    }
}

type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// `(current, total)` を受け取るコールバックへ進捗を転送する実装
///
/// `current` は常に `total` 以下に丸められる。
pub struct CallbackProgressReporter {
    callback: ProgressCallback,
}

impl CallbackProgressReporter {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl std::fmt::Debug for CallbackProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackProgressReporter").finish_non_exhaustive()
    }
}

#[async_trait]
impl ProgressReporter for CallbackProgressReporter {
    async fn report_started(&self, total_records: usize, _total_chunks: usize) {
        (self.callback)(0, total_records);
    }

    async fn report_progress(&self, completed: usize, total: usize) {
        (self.callback)(completed.min(total), total);
    }

    async fn report_chunk_failed(&self, _chunk_index: usize, _error: &str) {}

    async fn report_completed(&self, statistics: &RunStatistics) {
        (self.callback)(statistics.total_records, statistics.total_records);
    }
}
