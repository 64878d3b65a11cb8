// サービス層 - 機能別のビジネスロジック
// 各サービスは特定の責任を持ち、疎結合で設計されている

pub mod config;
pub mod export;
pub mod monitoring;
pub mod notifications;
pub mod validators;

// 公開API - 各サービスの主要機能を明示的にエクスポート
pub use config::{validate_config, DefaultPipelineConfig};
pub use export::{exporter_for_path, CsvResultExporter, JsonResultExporter, MemoryResultExporter};
pub use monitoring::{CallbackProgressReporter, ConsoleProgressReporter, NoOpProgressReporter};
pub use notifications::{Delivery, NotificationSender, TwilioSender};
pub use validators::{
    AddressValidator, DuplicateDetector, Geocoder, GoogleGeocoder, PerRecordProcessor,
    PhoneValidator,
};
