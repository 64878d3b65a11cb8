// テスト用のチャンク処理実装
// mockallでは表現しにくい遅延・パニック・部分失敗を手書きで再現する

use anyhow::Result;
use async_trait::async_trait;
use request_validator::{Chunk, ChunkProcessor, Record, ValidationResult};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// レコード番号から決まる期待結果（偶数は有効、奇数は無効）
///
/// パイプラインが付ける行番号も含めて比較できるよう、`Record::new` の行番号を付けておく
pub fn expected_result(record_index: usize) -> ValidationResult {
    let result = if record_index % 2 == 0 {
        ValidationResult::valid(record_index).with_field("parity", "even")
    } else {
        ValidationResult::invalid(record_index, "odd record").with_field("parity", "odd")
    };
    result.for_record(&Record::new(record_index, BTreeMap::new()))
}

fn expected_results(chunk: &Chunk) -> Vec<ValidationResult> {
    chunk
        .records
        .iter()
        .map(|record| expected_result(record.index))
        .collect()
}

/// レコード番号だけで結果が決まる処理
#[derive(Debug, Clone, Default)]
pub struct DeterministicProcessor {
    delay: Option<Duration>,
    all_valid: bool,
    calls: Arc<AtomicUsize>,
}

impl DeterministicProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// チャンクごとに待機を入れる
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// 全レコードを有効とする
    pub fn all_valid() -> Self {
        Self {
            all_valid: true,
            ..Self::default()
        }
    }

    /// 呼び出し回数の共有カウンタ
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ChunkProcessor for DeterministicProcessor {
    async fn process_chunk(&self, chunk: &Chunk) -> Result<Vec<ValidationResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.all_valid {
            return Ok(chunk
                .records
                .iter()
                .map(|record| ValidationResult::valid(record.index).for_record(record))
                .collect());
        }
        Ok(expected_results(chunk))
    }
}

/// 指定したチャンクだけエラー・パニック・件数不一致・停止・遅延を起こす処理
#[derive(Debug, Clone, Default)]
pub struct FaultyProcessor {
    failing: HashSet<usize>,
    panicking: HashSet<usize>,
    short: HashSet<usize>,
    stalled: HashSet<usize>,
    delayed: HashMap<usize, Duration>,
}

impl FaultyProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, chunk_index: usize) -> Self {
        self.failing.insert(chunk_index);
        self
    }

    pub fn panicking(mut self, chunk_index: usize) -> Self {
        self.panicking.insert(chunk_index);
        self
    }

    pub fn short(mut self, chunk_index: usize) -> Self {
        self.short.insert(chunk_index);
        self
    }

    /// 指定チャンクで長時間待機する
    pub fn stalled(mut self, chunk_index: usize) -> Self {
        self.stalled.insert(chunk_index);
        self
    }

    /// 指定チャンクだけ遅らせる（結果は正常）
    pub fn delayed(mut self, chunk_index: usize, delay: Duration) -> Self {
        self.delayed.insert(chunk_index, delay);
        self
    }
}

#[async_trait]
impl ChunkProcessor for FaultyProcessor {
    async fn process_chunk(&self, chunk: &Chunk) -> Result<Vec<ValidationResult>> {
        if self.failing.contains(&chunk.index) {
            anyhow::bail!("upstream service unavailable");
        }
        if self.panicking.contains(&chunk.index) {
            panic!("processor bug in chunk {}", chunk.index);
        }
        if self.stalled.contains(&chunk.index) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if let Some(delay) = self.delayed.get(&chunk.index) {
            tokio::time::sleep(*delay).await;
        }

        let mut results = expected_results(chunk);
        if self.short.contains(&chunk.index) {
            results.pop();
        }
        Ok(results)
    }
}
