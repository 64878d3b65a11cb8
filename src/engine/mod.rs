// エンジン層 - チャンク分割、並列実行、結果集約
// サービス層を組み合わせて高レベルな処理を提供

pub mod aggregator;
pub mod api;
pub mod dispatcher;
mod pipeline;
pub mod run;
pub mod strategy;
pub mod worker;
pub mod worker_pool;

// 公開API - 主要エンジンクラス
pub use api::{create_default_pipeline, create_quiet_pipeline, validate_records};
pub use dispatcher::partition_into_chunks;
pub use pipeline::ValidationPipeline;
pub use run::ValidationRun;
pub use strategy::ExecutionStrategy;
pub use worker::ChunkCompletion;
