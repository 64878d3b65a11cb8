// Excelブック（.xlsx / .xlsm / .xls）の読み込み
// 先頭シートの1行目を見出しとし、以降の行をCSVと同じ形の生データ行にする

use super::cleaning::RawRow;
use anyhow::anyhow;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

pub(crate) fn read_workbook_rows(path: &Path) -> anyhow::Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| anyhow!("failed to open Excel file {}: {e}", path.display()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Excel file contains no sheets"))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| anyhow!("failed to read sheet '{sheet_name}': {e}"))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| cell_to_string(cell).trim().to_string())
            .collect(),
        None => return Ok(Vec::new()),
    };

    Ok(rows
        .enumerate()
        .map(|(position, cells)| RawRow {
            source_row: position + 1,
            fields: headers
                .iter()
                .zip(cells.iter())
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, cell)| (header.clone(), cell_to_string(cell)))
                .collect(),
        })
        .collect())
}

/// セル値を文字列にする
///
/// 整数値の浮動小数点は小数部を落とす（電話番号列が数値として保存されている場合）。
pub(crate) fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Float(number) => {
            if number.fract() == 0.0 && number.abs() < 1e15 {
                format!("{}", *number as i64)
            } else {
                number.to_string()
            }
        }
        Data::Int(number) => number.to_string(),
        Data::Bool(flag) => (if *flag { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(error) => format!("#{error:?}"),
        Data::DateTime(datetime) => datetime.as_f64().to_string(),
        Data::DateTimeIso(text) | Data::DurationIso(text) => text.clone(),
    }
}
