// 入力行の正規化

use crate::core::{Record, NAME_FIELD};
use std::collections::BTreeMap;

pub const NAME_COLUMN: &str = NAME_FIELD;
pub const PHONE_COLUMN: &str = "Phone";
pub const ADDRESS_COLUMN: &str = "Address";
pub const BOOK_COLUMN: &str = "Book";
pub const LANGUAGE_COLUMN: &str = "Language";

/// 読み込んだままの1行（元ファイル上の行番号付き）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub source_row: usize,
    pub fields: BTreeMap<String, String>,
}

/// 表計算ソフトの欠損値表記は空として扱う
fn blank_if_missing(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("nan") {
        ""
    } else {
        trimmed
    }
}

/// `2065044242.0` のような数値化の名残を取り除き、数字だけを残す
pub fn clean_phone(value: &str) -> String {
    let value = blank_if_missing(value);
    let value = match value.split_once('.') {
        Some((integer, fraction))
            if !integer.is_empty()
                && integer.chars().all(|c| c.is_ascii_digit())
                && fraction.chars().all(|c| c == '0') =>
        {
            integer
        }
        _ => value,
    };

    value.chars().filter(char::is_ascii_digit).collect()
}

/// 単語ごとに先頭を大文字、残りを小文字にする
pub fn title_case(value: &str) -> String {
    let mut titled = String::with_capacity(value.len());
    let mut at_word_start = true;

    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                titled.extend(ch.to_uppercase());
            } else {
                titled.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            titled.push(ch);
            at_word_start = true;
        }
    }

    titled
}

fn clean_value(column: &str, value: &str) -> String {
    match column {
        PHONE_COLUMN => clean_phone(value),
        BOOK_COLUMN => blank_if_missing(value).to_uppercase(),
        LANGUAGE_COLUMN => title_case(blank_if_missing(value)),
        _ => blank_if_missing(value).to_string(),
    }
}

/// 読み込んだ行を正規化してレコードにする
///
/// 列名は前後の空白を除去する。全ての値が空の行は捨てる。
/// `Name` と `Phone` の両方の列がある場合、どちらかが空の行も捨てる。
/// 残った行に0から順に番号を振る。
pub fn clean_rows(rows: Vec<RawRow>) -> Vec<Record> {
    let cleaned = rows.into_iter().filter_map(|row| {
        let fields: BTreeMap<String, String> = row
            .fields
            .iter()
            .map(|(column, value)| {
                let column = column.trim().to_string();
                let value = clean_value(&column, value);
                (column, value)
            })
            .collect();

        if fields.values().all(|value| value.is_empty()) {
            return None;
        }
        Some((row.source_row, fields))
    });

    let mut cleaned: Vec<(usize, BTreeMap<String, String>)> = cleaned.collect();

    let has_identity_columns = cleaned.iter().any(|(_, fields)| {
        fields.contains_key(NAME_COLUMN) && fields.contains_key(PHONE_COLUMN)
    });
    if has_identity_columns {
        cleaned.retain(|(_, fields)| {
            let present = |column: &str| fields.get(column).is_some_and(|value| !value.is_empty());
            present(NAME_COLUMN) && present(PHONE_COLUMN)
        });
    }

    cleaned
        .into_iter()
        .enumerate()
        .map(|(index, (source_row, fields))| Record::new(index, fields).with_source_row(source_row))
        .collect()
}
