//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// reportcaseクレート全体で使用するエラー型
///
/// アップロードされたExcelファイルの読み込み、候補レコードの取得、
/// XMLの生成、ZIPアーカイブの書き込み中に発生するすべてのエラーを
/// 統一的に扱うために使用されます。
///
/// 日付の解析失敗やマッチしない行はエラーではありません。
/// それらはパイプライン内で回復され、ログにのみ出力されます。
///
/// # 使用例
///
/// ```rust,no_run
/// use reportcase::ReportCaseError;
/// use std::fs::File;
///
/// fn open_upload(path: &str) -> Result<File, ReportCaseError> {
///     let file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(file)
/// }
/// ```
#[derive(Error, Debug)]
pub enum ReportCaseError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// アップロードされたスプレッドシートの解析中に発生したエラー
    ///
    /// calamineクレートがファイルを解析する際に発生したエラーです。
    #[error("Failed to parse upload: {0}")]
    Parse(#[from] calamine::Error),

    /// CSVスナップショットの読み込みエラー
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// ZIPアーカイブの書き込みエラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `GeneratorBuilder::build()`時、またはシート選択時に発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use reportcase::{GeneratorBuilder, ReportCaseError};
    ///
    /// let result = GeneratorBuilder::new().with_max_upload_size(0).build();
    ///
    /// match result {
    ///     Err(ReportCaseError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// 必須列がヘッダー行に存在しない
    #[error("Missing column '{column}' in sheet '{sheet}'")]
    MissingColumn {
        /// 対象のシート名
        sheet: String,
        /// 見つからなかった列名
        column: String,
    },

    /// 候補レコードの取得元（データストア）で発生したエラー
    ///
    /// 接続失敗やクエリ失敗は回復されず、実行全体を中断します。
    #[error("Candidate source error: {0}")]
    Source(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// アップロードサイズ、リクエスト行数の上限などに違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl From<zip::result::ZipError> for ReportCaseError {
    fn from(err: zip::result::ZipError) -> Self {
        ReportCaseError::Zip(err.to_string())
    }
}

/// クレート共通の`Result`型
pub type Result<T> = std::result::Result<T, ReportCaseError>;
