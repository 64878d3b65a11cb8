// テストデータ生成ヘルパー

use request_validator::Record;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 空のフィールドのレコードを生成
pub fn blank_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|index| Record::new(index, BTreeMap::new()))
        .collect()
}

/// 入力用CSVを書き出す
///
/// 3行ごとに不正な電話番号を混ぜる
pub fn write_requests_csv(dir: &Path, rows: usize) -> PathBuf {
    let path = dir.join("requests.csv");
    let mut content = String::from("Name,Phone,Address,Book,Language\n");
    for row in 0..rows {
        let phone = if row % 3 == 2 {
            "12345".to_string()
        } else {
            format!("312555{:04}.0", row)
        };
        content.push_str(&format!(
            "Customer {row},{phone},{row} Main Street,gg,hindi\n"
        ));
    }
    std::fs::write(&path, content).unwrap();
    path
}
