// パイプラインの性質テスト
// ワーカー数に依存しない結果、チャンク分割、進捗の単調性、実行間の独立性を検証

use crate::fixtures::{blank_records, expected_result, DeterministicProcessor, FaultyProcessor};
use request_validator::{
    engine::partition_into_chunks, services::NoOpProgressReporter, DefaultPipelineConfig,
    OrderMode, RunState, ValidationPipeline, ValidationResult,
};
use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::time::Duration;

async fn results_with(config: DefaultPipelineConfig, records: usize) -> Vec<ValidationResult> {
    ValidationPipeline::new(
        DeterministicProcessor::new(),
        config,
        NoOpProgressReporter::new(),
    )
    .run(blank_records(records))
    .await
    .unwrap()
    .results
}

#[tokio::test]
async fn test_results_do_not_depend_on_worker_count() {
    let base = DefaultPipelineConfig::default().with_chunk_size(10);

    let single = results_with(base.clone().with_max_workers(1), 137).await;
    let eight = results_with(base.clone().with_max_workers(8), 137).await;
    let sequential = results_with(base.with_parallel(false), 137).await;

    assert_eq!(single, eight);
    assert_eq!(single, sequential);
    assert_eq!(
        single,
        (0..137).map(expected_result).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_all_valid_records_across_uneven_chunks() {
    // 130件を50件ずつ（最後のチャンクは30件）、4ワーカーで処理
    let config = DefaultPipelineConfig::default()
        .with_chunk_size(50)
        .with_max_workers(4);
    let outcome = ValidationPipeline::new(
        DeterministicProcessor::all_valid(),
        config,
        NoOpProgressReporter::new(),
    )
    .run(blank_records(130))
    .await
    .unwrap();

    assert_eq!(outcome.state, RunState::Done);
    assert_eq!(outcome.results.len(), 130);
    assert_eq!(outcome.statistics.total_chunks, 3);
    assert_eq!(outcome.statistics.valid_records, 130);
    assert_eq!(outcome.statistics.errors, 0);
    assert!(outcome.results.iter().all(|result| result.is_valid));
}

#[tokio::test]
async fn test_slow_first_chunk_keeps_submission_order() {
    let processor = FaultyProcessor::new().delayed(0, Duration::from_millis(300));
    let pipeline = ValidationPipeline::new(
        processor,
        DefaultPipelineConfig::default()
            .with_chunk_size(10)
            .with_max_workers(4),
        NoOpProgressReporter::new(),
    );

    let mut run = pipeline.start(blank_records(40)).await.unwrap();
    let mut completion_order = Vec::new();
    while let Some(update) = run.next_completion().await {
        completion_order.push(update.chunk_index);
    }
    let outcome = run.finish().await;

    // チャンク0は最後に完了する
    assert_eq!(completion_order.len(), 4);
    assert_eq!(completion_order.last(), Some(&0));
    assert_ne!(completion_order, vec![0, 1, 2, 3]);

    assert_eq!(
        outcome.results,
        (0..40).map(expected_result).collect::<Vec<_>>()
    );
}

#[test]
fn test_partition_covers_every_record_once() {
    for (records, chunk_size) in [(1, 10), (10, 10), (11, 10), (130, 50), (200, 200), (999, 37)] {
        let chunks = partition_into_chunks(blank_records(records), chunk_size);

        assert_eq!(chunks.len(), records.div_ceil(chunk_size));
        assert!(chunks.iter().all(|chunk| chunk.len() <= chunk_size));
        assert!(chunks.iter().enumerate().all(|(i, chunk)| chunk.index == i));

        let indices: Vec<usize> = chunks
            .iter()
            .flat_map(|chunk| chunk.record_indices())
            .collect();
        assert_eq!(indices, (0..records).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_completion_order_is_a_permutation_of_chunks() {
    let config = DefaultPipelineConfig::default()
        .with_chunk_size(10)
        .with_max_workers(4)
        .with_order_mode(OrderMode::Completion);
    let results = results_with(config, 95).await;

    assert_eq!(results.len(), 95);
    let unique: BTreeSet<usize> = results.iter().map(|r| r.record_index).collect();
    assert_eq!(unique, (0..95).collect::<BTreeSet<_>>());

    // チャンク内の順序は保たれ、チャンク同士は連続して並ぶ
    assert_eq!(results[0].record_index % 10, 0);
    for pair in results.windows(2) {
        let next = pair[1].record_index;
        assert!(next % 10 == 0 || next == pair[0].record_index + 1);
    }
}

#[tokio::test]
async fn test_progress_is_monotonic_and_complete() {
    let pipeline = ValidationPipeline::new(
        DeterministicProcessor::new(),
        DefaultPipelineConfig::default()
            .with_chunk_size(10)
            .with_max_workers(3),
        NoOpProgressReporter::new(),
    );

    let mut run = pipeline.start(blank_records(73)).await.unwrap();
    assert_eq!(run.state(), RunState::Dispatched);

    let mut updates = Vec::new();
    while let Some(update) = run.next_completion().await {
        updates.push(update);
    }

    assert_eq!(updates.len(), 8);
    for (position, update) in updates.iter().enumerate() {
        assert_eq!(update.chunks_completed, position + 1);
        assert_eq!(update.total_chunks, 8);
        assert!(update.records_completed <= update.total_records);
    }
    assert!(updates
        .windows(2)
        .all(|pair| pair[0].records_completed < pair[1].records_completed));

    let last = updates.last().unwrap();
    assert_eq!(last.records_completed, 73);
    assert_eq!(last.fraction(), 1.0);

    let outcome = run.finish().await;
    assert_eq!(outcome.state, RunState::Done);
    assert_eq!(outcome.statistics.chunks_completed, 8);
}

#[tokio::test]
async fn test_runs_are_independent() {
    let processor = DeterministicProcessor::new();
    let calls = processor.calls();
    let pipeline = ValidationPipeline::new(
        processor,
        DefaultPipelineConfig::default()
            .with_chunk_size(10)
            .with_max_workers(4),
        NoOpProgressReporter::new(),
    );

    let first = pipeline.run(blank_records(40)).await.unwrap();
    let second = pipeline.run(blank_records(25)).await.unwrap();

    assert_eq!(first.statistics.total_records, 40);
    assert_eq!(first.statistics.chunks_completed, 4);
    assert_eq!(second.statistics.total_records, 25);
    assert_eq!(second.statistics.chunks_completed, 3);
    assert_eq!(second.results.len(), 25);
    assert_eq!(calls.load(Ordering::SeqCst), 7);
}

#[tokio::test]
async fn test_empty_input_completes_immediately() {
    let config = DefaultPipelineConfig::default();
    let outcome = ValidationPipeline::new(
        DeterministicProcessor::new(),
        config,
        NoOpProgressReporter::new(),
    )
    .run(Vec::new())
    .await
    .unwrap();

    assert_eq!(outcome.state, RunState::Done);
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.statistics.total_chunks, 0);
}
