use crate::cli::{Commands, RunArgs};
use crate::core::{
    ErrorSeverity, FailureKind, PipelineConfig, PipelineError, RecordValidator, ResultExporter, ValidationOutcome,
};
use crate::engine::ValidationPipeline;
use crate::input::load_records;
use crate::services::{
    exporter_for_path, validate_config, AddressValidator, ConsoleProgressReporter,
    Delivery, DefaultPipelineConfig, DuplicateDetector, GoogleGeocoder, NotificationSender,
    PerRecordProcessor, PhoneValidator, TwilioSender,
};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// 住所検証は外部APIを呼ぶため、指定がなければ呼び出し間に待機を入れる
const DEFAULT_GEOCODE_DELAY_MS: u64 = 200;
/// 送信APIのレート制限に合わせた間隔（両経路送信は1件で2通）
const DEFAULT_SEND_DELAY_MS: u64 = 1000;
const DEFAULT_BOTH_SEND_DELAY_MS: u64 = 2000;

/// Execute one of the validation or notification commands
pub async fn execute_validate(command: Commands) -> Result<()> {
    match command {
        Commands::Phones { run } => run_validation("phones", run, PhoneValidator::new(), 0).await,
        Commands::Addresses { run, api_key } => {
            if api_key.trim().is_empty() {
                anyhow::bail!("Google Maps API key is empty");
            }
            let geocoder = GoogleGeocoder::new(api_key)?;
            run_validation(
                "addresses",
                run,
                AddressValidator::new(Arc::new(geocoder)),
                DEFAULT_GEOCODE_DELAY_MS,
            )
            .await
        }
        Commands::Duplicates {
            run,
            history,
            threshold,
        } => {
            if !(0.0..=1.0).contains(&threshold) {
                anyhow::bail!("Threshold must be between 0.0 and 1.0: {threshold}");
            }
            if !history.exists() {
                anyhow::bail!("History file does not exist: {}", history.display());
            }

            let history_records = load_records(&history)?;
            let detector = DuplicateDetector::new(&history_records, threshold);
            println!(
                "📚 過去記録: {} 件 ({})",
                detector.history_len(),
                history.display()
            );
            run_validation("duplicates", run, detector, 0).await
        }
        Commands::Notify {
            run,
            channel,
            message,
            account_sid,
            auth_token,
            from_number,
        } => {
            if account_sid.trim().is_empty() || auth_token.trim().is_empty() {
                anyhow::bail!("Twilio credentials are empty");
            }
            if message.trim().is_empty() {
                anyhow::bail!("Message body is empty");
            }

            let delivery = Delivery::from(channel);
            let delay_ms = match delivery {
                Delivery::Both => DEFAULT_BOTH_SEND_DELAY_MS,
                Delivery::Sms | Delivery::WhatsApp => DEFAULT_SEND_DELAY_MS,
            };
            let sender = TwilioSender::new(account_sid, auth_token, from_number)?;
            run_validation(
                "notify",
                run,
                NotificationSender::new(Arc::new(sender), delivery, message),
                delay_ms,
            )
            .await
        }
    }
}

/// 入力や設定を直す必要がある失敗の終了コード
pub const EXIT_USAGE_ERROR: i32 = 2;
/// それ以外の失敗の終了コード
pub const EXIT_FAILURE: i32 = 1;

/// エラーの重要度から終了コードを決める
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error
        .chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
        .map(PipelineError::severity)
    {
        Some(ErrorSeverity::High) => EXIT_USAGE_ERROR,
        Some(ErrorSeverity::Medium) | None => EXIT_FAILURE,
    }
}

/// 設定ファイル、コマンドライン引数の順に適用してパイプライン設定を作る
pub fn build_config(args: &RunArgs) -> Result<DefaultPipelineConfig> {
    let mut config = match &args.config {
        Some(path) => DefaultPipelineConfig::from_json_file(path)?,
        None => DefaultPipelineConfig::default(),
    };

    if let Some(workers) = args.workers {
        config = config.with_max_workers(workers as usize);
    }
    if let Some(chunk_size) = args.chunk_size {
        config = config.with_chunk_size(chunk_size as usize);
    }
    if args.sequential {
        config = config.with_parallel(false);
    }
    if let Some(order) = args.order {
        config = config.with_order_mode(order.into());
    }
    if let Some(secs) = args.chunk_timeout_secs {
        config = config.with_chunk_timeout(Some(Duration::from_secs(secs)));
    }

    validate_config(&config)?;
    Ok(config)
}

async fn run_validation<V>(
    validation: &str,
    args: RunArgs,
    validator: V,
    default_delay_ms: u64,
) -> Result<()>
where
    V: RecordValidator + 'static,
{
    // Validate input file
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    // Check if output file already exists
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "Output file already exists: {}. Use --force to overwrite.",
            args.output.display()
        );
    }

    let config = build_config(&args)?;
    let records = load_records(&args.input)?;

    let api_delay = Duration::from_millis(args.api_delay_ms.unwrap_or(default_delay_ms));
    let processor = PerRecordProcessor::new(Arc::new(validator)).with_api_delay(api_delay);

    if !args.quiet {
        println!("🔍 検証開始: {validation}");
        println!("   - 入力ファイル: {}", args.input.display());
        println!("   - 出力ファイル: {}", args.output.display());
        println!("   - レコード数: {}", records.len());
        println!("⚙️  処理設定:");
        println!("   - 並列実行: {}", config.enable_parallel());
        println!("   - 最大ワーカー数: {}", config.max_workers());
        println!("   - チャンクサイズ: {}", config.chunk_size());
        println!("   - API呼び出し間隔: {}ms", api_delay.as_millis());
    }

    let reporter = if args.quiet {
        ConsoleProgressReporter::quiet()
    } else {
        ConsoleProgressReporter::new()
    };
    let pipeline = ValidationPipeline::new(processor, config, reporter);
    let outcome = pipeline.run(records).await?;

    let exporter = exporter_for_path(&args.output, validation);
    exporter
        .export(&outcome)
        .await
        .map_err(PipelineError::export)?;

    print_summary(&outcome, &args.output);
    Ok(())
}

fn print_summary(outcome: &ValidationOutcome, output: &Path) {
    let statistics = &outcome.statistics;
    let record_errors = outcome
        .error_results()
        .filter(|result| result.failure_kind() == Some(FailureKind::Record))
        .count();

    println!("\n📊 検証結果:");
    println!("   - レコード数: {}", statistics.total_records);
    println!("   - 有効: {}", statistics.valid_records);
    println!("   - 無効: {record_errors}");
    println!(
        "   - チャンク: {}/{} 完了 (失敗 {})",
        statistics.chunks_completed, statistics.total_chunks, statistics.failed_chunks
    );
    println!("   - 総処理時間: {:.2}秒", statistics.elapsed().as_secs_f64());

    if statistics.failed_chunks > 0 {
        println!(
            "⚠️  {}個のチャンクが失敗しました（該当レコードはエラーとして出力）",
            statistics.failed_chunks
        );
    }

    println!("📄 結果は {} に保存されました", output.display());
}
