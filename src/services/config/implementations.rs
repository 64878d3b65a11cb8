// 設定管理の具象実装

use crate::core::{OrderMode, PipelineConfig, PipelineError, PipelineResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 16;
pub const DEFAULT_WORKERS: usize = 8;
pub const MIN_CHUNK_SIZE: usize = 10;
pub const MAX_CHUNK_SIZE: usize = 200;
pub const DEFAULT_CHUNK_SIZE: usize = 50;
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// デフォルト設定実装
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DefaultPipelineConfig {
    enable_parallel: bool,
    max_workers: usize,
    chunk_size: usize,
    buffer_size: usize,
    order_mode: OrderMode,
    chunk_timeout_ms: Option<u64>,
    enable_progress: bool,
}

impl DefaultPipelineConfig {
    /// I/O待ちが中心の処理向けにCPU数の2倍（上限16）のワーカーを使う
    pub fn for_host(cpu_count: usize) -> Self {
        Self {
            max_workers: (cpu_count.max(1) * 2).min(MAX_WORKERS),
            ..Self::default()
        }
    }

    /// JSONファイルから設定を読み込む（未指定のキーはデフォルト値）
    pub fn from_json_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::configuration(format!("設定ファイルを読み込めません: {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            PipelineError::configuration(format!("設定ファイルの形式が不正です: {}: {e}", path.display()))
        })?;
        validate_config(&config)?;
        Ok(config)
    }

    pub fn with_parallel(mut self, enable: bool) -> Self {
        self.enable_parallel = enable;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_order_mode(mut self, order_mode: OrderMode) -> Self {
        self.order_mode = order_mode;
        self
    }

    pub fn with_chunk_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.chunk_timeout_ms = timeout.map(|limit| limit.as_millis() as u64);
        self
    }

    pub fn with_progress_reporting(mut self, enable: bool) -> Self {
        self.enable_progress = enable;
        self
    }
}

impl Default for DefaultPipelineConfig {
    fn default() -> Self {
        Self {
            enable_parallel: true,
            max_workers: DEFAULT_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            order_mode: OrderMode::Submission,
            chunk_timeout_ms: None,
            enable_progress: true,
        }
    }
}

impl PipelineConfig for DefaultPipelineConfig {
    fn enable_parallel(&self) -> bool {
        self.enable_parallel
    }

    fn max_workers(&self) -> usize {
        self.max_workers
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn channel_buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn order_mode(&self) -> OrderMode {
        self.order_mode
    }

    fn chunk_timeout(&self) -> Option<Duration> {
        self.chunk_timeout_ms.map(Duration::from_millis)
    }

    fn enable_progress_reporting(&self) -> bool {
        self.enable_progress
    }
}

/// 実行前の設定検証
pub fn validate_config<C>(config: &C) -> PipelineResult<()>
where
    C: PipelineConfig + ?Sized,
{
    let workers = config.max_workers();
    if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
        return Err(PipelineError::configuration(format!(
            "max_workers は {MIN_WORKERS}〜{MAX_WORKERS} の範囲である必要があります (指定値: {workers})"
        )));
    }

    let chunk_size = config.chunk_size();
    if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
        return Err(PipelineError::configuration(format!(
            "chunk_size は {MIN_CHUNK_SIZE}〜{MAX_CHUNK_SIZE} の範囲である必要があります (指定値: {chunk_size})"
        )));
    }

    if config.channel_buffer_size() == 0 {
        return Err(PipelineError::configuration(
            "バッファサイズは1以上である必要があります",
        ));
    }

    if config.chunk_timeout().is_some_and(|limit| limit.is_zero()) {
        return Err(PipelineError::configuration(
            "チャンクのタイムアウトは0より大きい必要があります",
        ));
    }

    Ok(())
}
