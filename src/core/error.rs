// 検証パイプライン専用のカスタムエラー型定義

use thiserror::Error;

/// パイプライン固有のエラー型
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("設定エラー: {message}")]
    ConfigurationError { message: String },

    #[error("ワーカープール初期化エラー: ワーカー数 {worker_count} - {source}")]
    PoolInitializationError {
        worker_count: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("チャンク処理エラー: チャンク {chunk_index} - {message}")]
    ChunkExecutionError { chunk_index: usize, message: String },

    #[error("入力読み込みエラー: {path} - {source}")]
    InputError {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("エクスポートエラー: {source}")]
    ExportError {
        #[source]
        source: anyhow::Error,
    },

    #[error("タスクエラー: {source}")]
    TaskError {
        #[source]
        source: tokio::task::JoinError,
    },
}

impl PipelineError {
    /// 設定エラーの作成
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// ワーカープール初期化エラーの作成
    pub fn pool_initialization(worker_count: usize, source: std::io::Error) -> Self {
        Self::PoolInitializationError {
            worker_count,
            source,
        }
    }

    /// チャンク処理エラーの作成
    pub fn chunk_execution(chunk_index: usize, message: impl Into<String>) -> Self {
        Self::ChunkExecutionError {
            chunk_index,
            message: message.into(),
        }
    }

    /// 入力読み込みエラーの作成
    pub fn input(path: impl Into<String>, source: anyhow::Error) -> Self {
        Self::InputError {
            path: path.into(),
            source,
        }
    }

    /// エクスポートエラーの作成
    pub fn export(source: anyhow::Error) -> Self {
        Self::ExportError { source }
    }

    /// タスクエラーの作成
    pub fn task(source: tokio::task::JoinError) -> Self {
        Self::TaskError { source }
    }

    /// エラーの重要度を取得
    ///
    /// 利用者が入力や設定を直す必要があるものを`High`とする。
    /// プール初期化とチャンクの失敗は実行中に逐次実行やエラー付き結果へ変換される。
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ConfigurationError { .. } | Self::InputError { .. } => ErrorSeverity::High,
            Self::ExportError { .. } => ErrorSeverity::High,
            Self::PoolInitializationError { .. } | Self::ChunkExecutionError { .. } => {
                ErrorSeverity::Medium
            }
            Self::TaskError { .. } => ErrorSeverity::Medium,
        }
    }
}

/// エラーの重要度レベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// 警告レベル
    Medium,
    /// 要対応
    High,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

/// パイプラインの結果型
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// レコード検証器のエラー
///
/// `Record`はそのレコードだけを無効とし、`Service`はチャンク全体を失敗させる。
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("レコード検証エラー: {0}")]
    Record(String),

    #[error("外部サービスエラー: {source}")]
    Service {
        #[source]
        source: anyhow::Error,
    },
}

impl ValidatorError {
    pub fn record(message: impl Into<String>) -> Self {
        Self::Record(message.into())
    }

    pub fn service(source: anyhow::Error) -> Self {
        Self::Service { source }
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(error: tokio::task::JoinError) -> Self {
        PipelineError::TaskError { source: error }
    }
}
