//! Parser Module
//!
//! calamineを使用したアップロードファイル解析の実装。

mod workbook;

pub(crate) use workbook::UploadParser;
