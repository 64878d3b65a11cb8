// 実行方式の選択

use crate::core::ExecutionMode;

/// 実行開始時に決まる実行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    Parallel { workers: usize },
    Sequential,
}

impl ExecutionStrategy {
    /// 並列無効、ワーカー1以下、チャンク1以下のいずれかなら逐次実行
    ///
    /// 並列時のワーカー数はチャンク数を超えない。
    pub fn select(enable_parallel: bool, max_workers: usize, chunk_count: usize) -> Self {
        if !enable_parallel || max_workers <= 1 || chunk_count <= 1 {
            return Self::Sequential;
        }

        Self::Parallel {
            workers: max_workers.min(chunk_count),
        }
    }

    pub fn worker_count(&self) -> usize {
        match self {
            Self::Parallel { workers } => *workers,
            Self::Sequential => 1,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        match self {
            Self::Parallel { .. } => ExecutionMode::Parallel,
            Self::Sequential => ExecutionMode::Sequential,
        }
    }
}
