// 設定管理機能
// デフォルト値、JSONファイル読み込み、範囲検証

pub mod implementations;

// 公開API
pub use implementations::{
    validate_config, DefaultPipelineConfig, DEFAULT_CHUNK_SIZE, DEFAULT_WORKERS, MAX_CHUNK_SIZE,
    MAX_WORKERS, MIN_CHUNK_SIZE, MIN_WORKERS,
};
