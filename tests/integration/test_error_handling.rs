// エラーハンドリング統合テスト
// チャンク単位の障害分離、タイムアウト、設定エラー、プール生成失敗、中断を検証

use crate::fixtures::{blank_records, expected_result, DeterministicProcessor, FaultyProcessor};
use request_validator::{
    core::ExecutionMode, services::NoOpProgressReporter, ChunkProcessor, DefaultPipelineConfig,
    FailureKind, PipelineError, RunState, ValidationOutcome, ValidationPipeline,
};
use std::io;
use std::time::Duration;

async fn run_with<P>(processor: P, config: DefaultPipelineConfig, records: usize) -> ValidationOutcome
where
    P: ChunkProcessor + 'static,
{
    ValidationPipeline::new(processor, config, NoOpProgressReporter::new())
        .run(blank_records(records))
        .await
        .unwrap()
}

fn config(workers: usize) -> DefaultPipelineConfig {
    DefaultPipelineConfig::default()
        .with_max_workers(workers)
        .with_chunk_size(10)
}

/// 指定チャンクの全レコードがチャンク失敗になり、それ以外は正常であることを確認
fn assert_only_chunk_failed(outcome: &ValidationOutcome, failed_chunk: usize, message: &str) {
    assert_eq!(outcome.state, RunState::Done);
    assert_eq!(outcome.statistics.failed_chunks, 1);

    for result in &outcome.results {
        if result.record_index / 10 == failed_chunk {
            let failure = result.error.as_ref().unwrap();
            assert_eq!(failure.kind, FailureKind::Chunk);
            assert!(
                failure.message.contains(message),
                "unexpected message: {}",
                failure.message
            );
            assert!(!result.is_valid);
        } else {
            assert_eq!(result, &expected_result(result.record_index));
        }
    }
}

#[tokio::test]
async fn test_processor_error_fails_only_its_chunk() {
    let outcome = run_with(FaultyProcessor::new().failing(1), config(4), 50).await;

    assert_eq!(outcome.results.len(), 50);
    assert_only_chunk_failed(&outcome, 1, "upstream service unavailable");
}

#[tokio::test]
async fn test_processor_panic_fails_only_its_chunk() {
    let outcome = run_with(FaultyProcessor::new().panicking(3), config(4), 50).await;

    assert_eq!(outcome.results.len(), 50);
    assert_only_chunk_failed(&outcome, 3, "processor panicked");
}

#[tokio::test]
async fn test_result_count_mismatch_fails_chunk() {
    let outcome = run_with(FaultyProcessor::new().short(0), config(2), 30).await;

    assert_only_chunk_failed(&outcome, 0, "processor returned 9 results for 10 records");
}

#[tokio::test]
async fn test_stalled_chunk_times_out() {
    let config = config(4).with_chunk_timeout(Some(Duration::from_millis(200)));
    let outcome = run_with(FaultyProcessor::new().stalled(2), config, 40).await;

    assert_only_chunk_failed(&outcome, 2, "timed out after 200ms");
}

#[tokio::test]
async fn test_sequential_mode_isolates_failures() {
    let config = config(4).with_parallel(false);
    let outcome = run_with(FaultyProcessor::new().failing(0).panicking(2), config, 35).await;

    assert_eq!(outcome.statistics.execution_mode, ExecutionMode::Sequential);
    assert_eq!(outcome.statistics.failed_chunks, 2);
    assert_eq!(outcome.results.len(), 35);
    assert_eq!(outcome.results[34], expected_result(34));
    assert_eq!(
        outcome.results[25].failure_kind(),
        Some(FailureKind::Chunk)
    );
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    for bad in [
        DefaultPipelineConfig::default().with_max_workers(0),
        DefaultPipelineConfig::default().with_max_workers(17),
        DefaultPipelineConfig::default().with_chunk_size(5),
        DefaultPipelineConfig::default().with_chunk_size(201),
    ] {
        let pipeline = ValidationPipeline::new(
            DeterministicProcessor::new(),
            bad,
            NoOpProgressReporter::new(),
        );
        let result = pipeline.run(blank_records(20)).await;

        assert!(matches!(
            result,
            Err(PipelineError::ConfigurationError { .. })
        ));
    }
}

#[tokio::test]
async fn test_pool_failure_falls_back_to_sequential() {
    let pipeline = ValidationPipeline::new(
        DeterministicProcessor::new(),
        config(8),
        NoOpProgressReporter::new(),
    )
    .with_runtime_builder(|_| Err(io::Error::new(io::ErrorKind::Other, "thread limit reached")));

    let outcome = pipeline.run(blank_records(60)).await.unwrap();

    assert_eq!(outcome.statistics.execution_mode, ExecutionMode::Sequential);
    assert!(outcome
        .statistics
        .fallback_reason
        .as_deref()
        .unwrap()
        .contains("thread limit reached"));
    assert_eq!(outcome.results.len(), 60);
    assert!(outcome
        .results
        .iter()
        .all(|result| *result == expected_result(result.record_index)));
}

#[tokio::test]
async fn test_abandon_fills_unfinished_chunks() {
    let pipeline = ValidationPipeline::new(
        DeterministicProcessor::with_delay(Duration::from_millis(100)),
        config(2),
        NoOpProgressReporter::new(),
    );

    let mut run = pipeline.start(blank_records(200)).await.unwrap();
    let first = run.next_completion().await.unwrap();
    assert_eq!(first.chunks_completed, 1);

    let outcome = run.abandon().await;

    assert_eq!(outcome.state, RunState::Done);
    assert!(outcome.statistics.abandoned);
    assert_eq!(outcome.results.len(), 200);
    assert!(outcome.statistics.abandoned_chunks > 0);
    assert!(outcome.statistics.chunks_completed < 20);

    let indices: Vec<usize> = outcome.results.iter().map(|r| r.record_index).collect();
    assert_eq!(indices, (0..200).collect::<Vec<_>>());

    let abandoned = outcome
        .results
        .iter()
        .filter(|result| result.failure_kind() == Some(FailureKind::Abandoned))
        .count();
    assert_eq!(abandoned, outcome.statistics.abandoned_chunks * 10);
}
