// レコード単位の検証器をチャンク処理に変換するアダプター

use crate::core::{
    Chunk, ChunkProcessor, RecordValidator, ValidationResult, ValidatorError,
};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// チャンク内のレコードを順に検証する
///
/// レコードエラーは無効な結果に変換し、サービスエラーはチャンク全体を失敗させる。
pub struct PerRecordProcessor<V: RecordValidator> {
    validator: Arc<V>,
    api_delay: Duration,
}

impl<V: RecordValidator> PerRecordProcessor<V> {
    pub fn new(validator: Arc<V>) -> Self {
        Self {
            validator,
            api_delay: Duration::ZERO,
        }
    }

    /// 外部APIのレート制限対策として呼び出し間に待機を入れる
    pub fn with_api_delay(mut self, api_delay: Duration) -> Self {
        self.api_delay = api_delay;
        self
    }

    pub fn validator(&self) -> &Arc<V> {
        &self.validator
    }
}

#[async_trait]
impl<V: RecordValidator> ChunkProcessor for PerRecordProcessor<V> {
    async fn process_chunk(&self, chunk: &Chunk) -> Result<Vec<ValidationResult>> {
        let mut results = Vec::with_capacity(chunk.len());

        for (position, record) in chunk.records.iter().enumerate() {
            if position > 0 && !self.api_delay.is_zero() {
                tokio::time::sleep(self.api_delay).await;
            }

            let result = match self.validator.validate(record).await {
                Ok(result) => result,
                Err(ValidatorError::Record(message)) => {
                    debug!(record_index = record.index, %message, "record failed validation");
                    ValidationResult::invalid(record.index, message)
                }
                Err(ValidatorError::Service { source }) => {
                    return Err(source.context(format!(
                        "validation service failed at record {}",
                        record.index
                    )));
                }
            };

            results.push(result.for_record(record));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::MockRecordValidator;
    use crate::core::{FailureKind, Record};
    use std::collections::BTreeMap;
    use std::time::Instant;

    fn chunk_of(indices: &[usize]) -> Chunk {
        Chunk::new(
            0,
            indices
                .iter()
                .map(|&index| Record::new(index, BTreeMap::new()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_record_errors_become_invalid_results() {
        let mut validator = MockRecordValidator::new();
        validator.expect_validate().returning(|record| {
            if record.index % 2 == 0 {
                Ok(ValidationResult::valid(record.index))
            } else {
                Err(ValidatorError::record("Missing phone number"))
            }
        });

        let processor = PerRecordProcessor::new(Arc::new(validator));
        let results = processor.process_chunk(&chunk_of(&[10, 11, 12])).await.unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_valid);
        assert_eq!(results[1].failure_kind(), Some(FailureKind::Record));
        assert_eq!(
            results.iter().map(|r| r.record_index).collect::<Vec<_>>(),
            vec![10, 11, 12]
        );
    }

    #[tokio::test]
    async fn test_service_error_fails_whole_chunk() {
        let mut validator = MockRecordValidator::new();
        validator
            .expect_validate()
            .returning(|_| Err(ValidatorError::service(anyhow::anyhow!("OVER_QUERY_LIMIT"))));

        let processor = PerRecordProcessor::new(Arc::new(validator));
        let error = processor.process_chunk(&chunk_of(&[3, 4])).await.unwrap_err();

        assert!(format!("{error:#}").contains("OVER_QUERY_LIMIT"));
        assert!(error.to_string().contains("record 3"));
    }

    #[tokio::test]
    async fn test_record_index_is_stamped_from_record() {
        let mut validator = MockRecordValidator::new();
        validator
            .expect_validate()
            .returning(|_| Ok(ValidationResult::valid(999)));

        let processor = PerRecordProcessor::new(Arc::new(validator));
        let results = processor.process_chunk(&chunk_of(&[5])).await.unwrap();

        assert_eq!(results[0].record_index, 5);
    }

    #[tokio::test]
    async fn test_api_delay_between_calls() {
        let mut validator = MockRecordValidator::new();
        validator
            .expect_validate()
            .times(3)
            .returning(|record| Ok(ValidationResult::valid(record.index)));

        let processor = PerRecordProcessor::new(Arc::new(validator))
            .with_api_delay(Duration::from_millis(20));

        let start = Instant::now();
        processor.process_chunk(&chunk_of(&[0, 1, 2])).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
