// Aggregator - チャンク結果の集約と統計

use super::strategy::ExecutionStrategy;
use super::worker::ChunkCompletion;
use crate::core::{
    Chunk, FailureKind, OrderMode, ProgressUpdate, RunState, RunStatistics, ValidationOutcome,
    ValidationResult,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

const NEVER_COMPLETED: &str = "chunk never completed";

/// 実行1回分の結果集約
///
/// 結果と統計を変更するのはこの型だけで、ワーカーは完了メッセージを送るのみ。
#[derive(Debug)]
pub struct ResultAggregator {
    order_mode: OrderMode,
    slots: Vec<Option<Vec<ValidationResult>>>,
    completion_order: Vec<usize>,
    statistics: RunStatistics,
    state: RunState,
    records_completed: usize,
    started: Instant,
}

impl ResultAggregator {
    pub fn new(
        total_records: usize,
        total_chunks: usize,
        order_mode: OrderMode,
        strategy: ExecutionStrategy,
    ) -> Self {
        Self {
            order_mode,
            slots: vec![None; total_chunks],
            completion_order: Vec::with_capacity(total_chunks),
            statistics: RunStatistics {
                total_records,
                total_chunks,
                worker_count: strategy.worker_count(),
                execution_mode: strategy.mode(),
                ..RunStatistics::default()
            },
            state: RunState::Pending,
            records_completed: 0,
            started: Instant::now(),
        }
    }

    /// プール初期化失敗による逐次実行への切り替えを記録
    pub fn record_fallback(&mut self, reason: impl Into<String>) {
        let strategy = ExecutionStrategy::Sequential;
        self.statistics.worker_count = strategy.worker_count();
        self.statistics.execution_mode = strategy.mode();
        self.statistics.fallback_reason = Some(reason.into());
    }

    pub fn mark_dispatched(&mut self) {
        self.state = RunState::Dispatched;
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.statistics
    }

    pub fn is_complete(&self) -> bool {
        self.completion_order.len() == self.slots.len()
    }

    /// チャンク完了を取り込み、進捗を返す
    ///
    /// 同じチャンクの2回目以降の完了や範囲外のチャンクは無視する。
    pub fn record(&mut self, completion: ChunkCompletion) -> Option<ProgressUpdate> {
        let chunk_index = completion.chunk_index;
        let Some(slot) = self.slots.get_mut(chunk_index) else {
            warn!(chunk_index, "ignoring completion for unknown chunk");
            return None;
        };
        if slot.is_some() {
            warn!(chunk_index, "ignoring duplicate chunk completion");
            return None;
        }

        let chunk_failed = completion.is_failed();
        let chunk_errors = completion.results.iter().filter(|r| r.is_error()).count();

        self.statistics.chunks_completed += 1;
        self.statistics.errors += chunk_errors;
        if chunk_failed {
            self.statistics.failed_chunks += 1;
        }
        self.records_completed += completion.results.len();

        *slot = Some(completion.results);
        self.completion_order.push(chunk_index);

        debug!(
            chunk_index,
            chunks_completed = self.statistics.chunks_completed,
            total_chunks = self.statistics.total_chunks,
            "chunk aggregated"
        );

        Some(ProgressUpdate {
            chunk_index,
            chunk_failed,
            chunks_completed: self.statistics.chunks_completed,
            total_chunks: self.statistics.total_chunks,
            records_completed: self.records_completed,
            total_records: self.statistics.total_records,
            errors: self.statistics.errors,
        })
    }

    /// 集約を終えて最終結果を組み立てる
    ///
    /// 完了しなかったチャンクは `missing_kind` のエラー結果で埋める。
    pub fn finish(mut self, chunks: &[Arc<Chunk>], missing_kind: FailureKind) -> ValidationOutcome {
        self.state = RunState::Aggregating;

        for chunk in chunks {
            let Some(slot) = self.slots.get_mut(chunk.index) else {
                continue;
            };
            if slot.is_some() {
                continue;
            }

            let results = chunk
                .records
                .iter()
                .map(|record| {
                    let result = match missing_kind {
                        FailureKind::Abandoned => ValidationResult::abandoned(record.index),
                        kind => ValidationResult::failed(record.index, kind, NEVER_COMPLETED),
                    };
                    result.for_record(record)
                })
                .collect();
            *slot = Some(results);

            match missing_kind {
                FailureKind::Abandoned => self.statistics.abandoned_chunks += 1,
                _ => self.statistics.failed_chunks += 1,
            }
        }

        if self.statistics.abandoned_chunks > 0 {
            self.statistics.abandoned = true;
        }

        let order: Vec<usize> = match self.order_mode {
            OrderMode::Submission => (0..self.slots.len()).collect(),
            OrderMode::Completion => {
                let mut order = self.completion_order.clone();
                order.extend(
                    (0..self.slots.len()).filter(|index| !self.completion_order.contains(index)),
                );
                order
            }
        };

        let results: Vec<ValidationResult> = order
            .into_iter()
            .filter_map(|index| self.slots[index].take())
            .flatten()
            .collect();

        self.statistics.errors = results.iter().filter(|r| r.is_error()).count();
        self.statistics.valid_records = results.iter().filter(|r| r.is_valid).count();
        self.statistics.elapsed_ms = self.started.elapsed().as_millis() as u64;
        self.state = RunState::Done;

        ValidationOutcome {
            results,
            statistics: self.statistics,
            state: self.state,
        }
    }
}
