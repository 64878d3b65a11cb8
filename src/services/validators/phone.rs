// 電話番号の検証（北米番号計画）

use crate::core::{Record, RecordValidator, ValidationResult, ValidatorError};
use async_trait::async_trait;
use std::collections::BTreeSet;

pub const PHONE_FIELD: &str = "Phone";

/// 数字以外を除去し、国番号付き11桁へ揃える
///
/// 10桁は先頭に`1`を付与、`1`で始まる11桁はそのまま、11桁超は末尾11桁を使う。
/// それ以外は空文字列。
pub fn standardize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    let standardized = match digits.len() {
        10 => format!("1{digits}"),
        11 if digits.starts_with('1') => digits,
        len if len > 11 => digits[len - 11..].to_string(),
        _ => return String::new(),
    };

    if standardized.len() == 11 {
        standardized
    } else {
        String::new()
    }
}

/// 市外局番と局番がどちらも2〜9で始まるか
fn is_plausible_nanp(national: &str) -> bool {
    let bytes = national.as_bytes();
    bytes.len() == 10
        && (b'2'..=b'9').contains(&bytes[0])
        && (b'2'..=b'9').contains(&bytes[3])
}

/// `(206) 504-4242` 形式
fn national_format(national: &str) -> String {
    format!("({}) {}-{}", &national[..3], &national[3..6], &national[6..])
}

/// 市外局番からのキャリア推定（番号ポータビリティがあるため目安のみ）
fn carrier_for_area_code(area_code: &str) -> &'static str {
    match area_code {
        "201" | "202" | "203" => "Verizon",
        "205" | "206" | "207" => "AT&T",
        "208" | "209" | "210" => "T-Mobile",
        "212" | "213" | "214" => "Sprint",
        _ => "Unknown",
    }
}

/// 不正利用が疑われる番号パターン
pub fn fraud_indicators(national: &str) -> Vec<&'static str> {
    let distinct: BTreeSet<char> = national.chars().collect();
    let mut indicators = Vec::new();

    if distinct.len() < 3 {
        indicators.push("Repeated digits pattern");
    }
    if matches!(national, "1234567890" | "0123456789") {
        indicators.push("Sequential digits");
    }
    if distinct.len() == 1 {
        indicators.push("All same digits");
    }
    if matches!(national, "5555555555" | "1234567890" | "0000000000") {
        indicators.push("Test number");
    }

    indicators
}

/// 電話番号の形式検証器
#[derive(Debug, Clone, Default)]
pub struct PhoneValidator;

impl PhoneValidator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecordValidator for PhoneValidator {
    async fn validate(&self, record: &Record) -> Result<ValidationResult, ValidatorError> {
        let original = record
            .get(PHONE_FIELD)
            .ok_or_else(|| ValidatorError::record("Missing phone number"))?;

        let standardized = standardize_phone(original);
        let national = standardized.get(1..).unwrap_or_default();

        if standardized.is_empty() || !is_plausible_nanp(national) {
            return Ok(ValidationResult::invalid(record.index, "Invalid phone number format")
                .with_field("original_phone", original));
        }

        let mut result = ValidationResult::valid(record.index)
            .with_field("original_phone", original)
            .with_field("formatted_phone", format!("+{standardized}"))
            .with_field("national_format", national_format(national))
            .with_field("carrier", carrier_for_area_code(&national[..3]))
            .with_field("country", "US");

        let indicators = fraud_indicators(national);
        if !indicators.is_empty() {
            result = result.with_field("fraud_indicators", indicators.join("; "));
        }

        Ok(result)
    }
}
