// 検証結果の出力機能
// JSON、CSV、メモリ（テスト用）

pub mod implementations;

// 公開API
pub use implementations::{
    exporter_for_path, CsvResultExporter, JsonResultExporter, MemoryResultExporter, RunInfo,
    ValidationReport,
};
