// 過去の送付記録との重複検出

use super::address::ADDRESS_FIELD;
use super::phone::{standardize_phone, PHONE_FIELD};
use super::similarity::address_similarity;
use crate::core::{Record, RecordValidator, ValidationResult, ValidatorError};
use async_trait::async_trait;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

const ADDRESS_ABBREVIATIONS: [(&str, &str); 16] = [
    ("street", "st"),
    ("avenue", "ave"),
    ("road", "rd"),
    ("drive", "dr"),
    ("lane", "ln"),
    ("boulevard", "blvd"),
    ("apartment", "apt"),
    ("suite", "ste"),
    ("north", "n"),
    ("south", "s"),
    ("east", "e"),
    ("west", "w"),
    ("northeast", "ne"),
    ("northwest", "nw"),
    ("southeast", "se"),
    ("southwest", "sw"),
];

fn abbreviate(word: &str) -> &str {
    ADDRESS_ABBREVIATIONS
        .iter()
        .find(|(full, _)| *full == word)
        .map(|(_, short)| *short)
        .unwrap_or(word)
}

/// 比較用に住所を正規化（小文字化、空白の圧縮、単語単位の略語化）
pub fn clean_address(raw: &str) -> String {
    let collapsed = raw
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let mut cleaned = String::with_capacity(collapsed.len());
    let mut word = String::new();
    for ch in collapsed.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            word.push(ch);
        } else {
            cleaned.push_str(abbreviate(&word));
            word.clear();
            cleaned.push(ch);
        }
    }
    cleaned.push_str(abbreviate(&word));

    cleaned
}

/// 正規化済みの過去記録
#[derive(Debug, Clone, PartialEq)]
struct HistoricalEntry {
    source_row: usize,
    phone: String,
    address: String,
}

/// 重複検出器
///
/// 過去記録は生成時に一度だけ正規化する。
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    history: Vec<HistoricalEntry>,
    threshold: f64,
}

impl DuplicateDetector {
    pub fn new(history: &[Record], threshold: f64) -> Self {
        let history = history
            .iter()
            .map(|record| HistoricalEntry {
                source_row: record.source_row,
                phone: record.get(PHONE_FIELD).map(standardize_phone).unwrap_or_default(),
                address: record.get(ADDRESS_FIELD).map(clean_address).unwrap_or_default(),
            })
            .filter(|entry| !entry.phone.is_empty() || !entry.address.is_empty())
            .collect();

        Self { history, threshold }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[async_trait]
impl RecordValidator for DuplicateDetector {
    async fn validate(&self, record: &Record) -> Result<ValidationResult, ValidatorError> {
        let phone = record.get(PHONE_FIELD).map(standardize_phone).unwrap_or_default();
        let address = record.get(ADDRESS_FIELD).map(clean_address).unwrap_or_default();

        if phone.is_empty() && address.is_empty() {
            return Err(ValidatorError::record(
                "No usable phone number or address to compare",
            ));
        }

        let mut phone_matches = 0;
        let mut address_matches = 0;
        let mut matched_rows = Vec::new();
        let mut best_similarity: f64 = 0.0;

        for entry in &self.history {
            let mut matched = false;

            if !phone.is_empty() && phone == entry.phone {
                phone_matches += 1;
                matched = true;
            }

            if !address.is_empty() && !entry.address.is_empty() {
                let similarity = address_similarity(&address, &entry.address);
                best_similarity = best_similarity.max(similarity);
                if similarity >= self.threshold {
                    address_matches += 1;
                    matched = true;
                }
            }

            if matched {
                matched_rows.push(entry.source_row.to_string());
            }
        }

        let is_duplicate = !matched_rows.is_empty();

        Ok(ValidationResult::valid(record.index)
            .with_field("is_duplicate", is_duplicate.to_string())
            .with_field("phone_matches", phone_matches.to_string())
            .with_field("address_matches", address_matches.to_string())
            .with_field("matched_rows", matched_rows.join(", "))
            .with_field("best_similarity", format!("{best_similarity:.2}")))
    }
}
