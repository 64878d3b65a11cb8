//! 顧客リクエストの一括検証ツール
//!
//! 表形式の入力をチャンクに分割し、ワーカープールで並列に検証して
//! 入力順の結果にまとめる。

pub mod cli;
pub mod core;
pub mod engine;
pub mod input;
pub mod services;

// よく使う型をクレートルートから参照できるようにする
pub use crate::core::{
    Chunk, ChunkProcessor, FailureKind, OrderMode, PipelineConfig, PipelineError, PipelineResult,
    ProgressReporter, Record, RecordValidator, ResultExporter, RunState, RunStatistics,
    ValidationOutcome, ValidationResult, ValidatorError,
};
pub use crate::engine::{
    create_default_pipeline, create_quiet_pipeline, validate_records, ValidationPipeline,
    ValidationRun,
};
pub use crate::input::load_records;
pub use crate::services::{DefaultPipelineConfig, PerRecordProcessor};
