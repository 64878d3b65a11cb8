// 入力層 - 表形式ファイルの読み込みと正規化

pub mod cleaning;
pub mod loader;
mod spreadsheet;

// 公開API
pub use cleaning::{clean_phone, clean_rows, title_case, RawRow};
pub use loader::load_records;
