// エンドツーエンド統合テスト
// ファイル読み込みからパイプライン実行、結果出力までの流れを検証

use crate::fixtures::write_requests_csv;
use request_validator::{
    cli::{execute_validate, Commands, RunArgs},
    load_records,
    services::{
        exporter_for_path, MemoryResultExporter, NoOpProgressReporter, PhoneValidator,
    },
    DefaultPipelineConfig, FailureKind, PerRecordProcessor, ResultExporter, RunState,
    ValidationPipeline,
};
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn phone_pipeline(
    workers: usize,
) -> ValidationPipeline<PerRecordProcessor<PhoneValidator>, DefaultPipelineConfig, NoOpProgressReporter>
{
    ValidationPipeline::new(
        PerRecordProcessor::new(Arc::new(PhoneValidator::new())),
        DefaultPipelineConfig::default()
            .with_max_workers(workers)
            .with_chunk_size(10),
        NoOpProgressReporter::new(),
    )
}

#[tokio::test]
async fn test_csv_to_json_phone_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_requests_csv(temp_dir.path(), 45);
    let output = temp_dir.path().join("results.json");

    let records = load_records(&input).unwrap();
    assert_eq!(records.len(), 45);

    let outcome = phone_pipeline(4).run(records).await.unwrap();

    assert_eq!(outcome.state, RunState::Done);
    assert_eq!(outcome.results.len(), 45);
    assert_eq!(outcome.statistics.total_chunks, 5);
    // 3行ごとに1件の不正番号
    assert_eq!(outcome.statistics.valid_records, 30);
    assert_eq!(outcome.statistics.errors, 15);
    assert!(outcome
        .error_results()
        .all(|result| result.failure_kind() == Some(FailureKind::Record)));

    exporter_for_path(&output, "phones")
        .export(&outcome)
        .await
        .unwrap();

    let json: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json["run_info"]["total_records"], 45);
    assert_eq!(json["results"][0]["fields"]["formatted_phone"], "+13125550000");
    assert_eq!(json["results"][2]["is_valid"], false);
}

#[tokio::test]
async fn test_results_map_back_to_source_rows() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("requests.csv");
    fs::write(
        &input,
        "Name,Phone\nAsha,2065044242\n,3125550100\nMeera,12345\n",
    )
    .unwrap();
    let output = temp_dir.path().join("results.csv");

    let records = load_records(&input).unwrap();
    let outcome = phone_pipeline(2).run(records).await.unwrap();

    let rows: Vec<_> = outcome
        .results
        .iter()
        .map(|r| (r.record_index, r.source_row, r.name.as_deref(), r.is_valid))
        .collect();
    assert_eq!(
        rows,
        vec![(0, Some(1), Some("Asha"), true), (1, Some(3), Some("Meera"), false)]
    );

    exporter_for_path(&output, "phones")
        .export(&outcome)
        .await
        .unwrap();
    let mut reader = csv::Reader::from_path(&output).unwrap();
    let exported: Vec<(String, String)> = reader
        .records()
        .map(|row| {
            let row = row.unwrap();
            (row[1].to_string(), row[2].to_string())
        })
        .collect();
    assert_eq!(
        exported,
        vec![
            ("1".to_string(), "Asha".to_string()),
            ("3".to_string(), "Meera".to_string())
        ]
    );
}

#[tokio::test]
async fn test_results_keep_input_order_across_chunks() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_requests_csv(temp_dir.path(), 64);
    let records = load_records(&input).unwrap();

    let outcome = phone_pipeline(8).run(records).await.unwrap();

    let indices: Vec<usize> = outcome.results.iter().map(|r| r.record_index).collect();
    assert_eq!(indices, (0..64).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_memory_exporter_receives_outcome() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_requests_csv(temp_dir.path(), 12);
    let records = load_records(&input).unwrap();

    let outcome = phone_pipeline(2).run(records).await.unwrap();
    let exporter = MemoryResultExporter::new();
    exporter.export(&outcome).await.unwrap();

    assert_eq!(exporter.export_count(), 1);
    assert_eq!(exporter.last_outcome().unwrap(), outcome);
}

#[tokio::test]
async fn test_phones_command_writes_csv_report() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_requests_csv(temp_dir.path(), 20);
    let output = temp_dir.path().join("phones.csv");

    execute_validate(Commands::Phones {
        run: RunArgs {
            input,
            output: output.clone(),
            force: false,
            workers: Some(2),
            chunk_size: Some(10),
            sequential: false,
            order: None,
            api_delay_ms: None,
            chunk_timeout_secs: None,
            config: None,
            quiet: true,
        },
    })
    .await
    .unwrap();

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "record_index");
    assert!(headers.iter().any(|h| h == "carrier"));
    assert_eq!(reader.records().count(), 20);
}
