//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::normalize;

/// リクエスト行の日付列の値
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestDate {
    /// 日付列が存在しない、またはセルが空
    Absent,

    /// 有効な日付
    Date(NaiveDate),

    /// 値はあるが日付として解釈できない（元の文字列を保持）
    Malformed(String),
}

impl RequestDate {
    /// 有効な日付であれば返す
    ///
    /// `Absent`と`Malformed`はどちらも`None`となり、
    /// 選択処理では「最新日付」ポリシーが適用されます。
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            RequestDate::Date(date) => Some(*date),
            RequestDate::Absent | RequestDate::Malformed(_) => None,
        }
    }
}

impl From<Option<NaiveDate>> for RequestDate {
    fn from(date: Option<NaiveDate>) -> Self {
        match date {
            Some(date) => RequestDate::Date(date),
            None => RequestDate::Absent,
        }
    }
}

/// アップロード表の1行（正規化済み）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRow {
    /// スプレッドシート上の行番号（1始まり、ヘッダー行を含む）
    pub row: usize,

    /// レポート名（小文字化・トリム済み）
    pub report: String,

    /// ファンド（トリム済み、大文字小文字は保持）
    pub fund: String,

    /// 対象日付
    pub date: RequestDate,
}

impl RequestRow {
    /// 生の値からリクエスト行を生成する
    ///
    /// `report`は小文字化・トリムされ、`fund`はトリムのみ行われます。
    pub fn new(report: &str, fund: &str, date: RequestDate) -> Self {
        Self {
            row: 0,
            report: normalize::normalize_report(report),
            fund: normalize::normalize_fund(fund),
            date,
        }
    }

    /// 行番号を設定する
    pub fn at_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }
}

/// データストアから取得した候補レコード
///
/// 列名は`REPORT_STATISTICS`テーブルの列名に対応します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// レポートのフルパス（`/`区切り）
    #[serde(rename = "RS_REPORT")]
    pub report: String,

    /// `key: value`をセミコロンで区切ったパラメータ文字列
    #[serde(rename = "RS_PARAMETERS", default)]
    pub parameters: String,

    /// 出力フォーマット（そのまま出力）
    #[serde(rename = "RS_FORMAT", default)]
    pub format: String,

    /// 実行開始時刻（生の文字列）
    #[serde(rename = "RS_START", default)]
    pub start: String,

    /// 実行ステータス
    #[serde(rename = "RS_STATUS", default)]
    pub status: String,

    /// 実行エンジン
    #[serde(rename = "RS_ENGINE", default)]
    pub engine: String,
}

impl CandidateRecord {
    /// 成功済み・actuateエンジンの候補レコードを生成する
    pub fn new(report: &str, parameters: &str, format: &str, start: &str) -> Self {
        Self {
            report: report.to_string(),
            parameters: parameters.to_string(),
            format: format.to_string(),
            start: start.to_string(),
            status: "succeeded".to_string(),
            engine: "actuate".to_string(),
        }
    }

    /// ステータスを上書きする
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    /// エンジンを上書きする
    pub fn with_engine(mut self, engine: &str) -> Self {
        self.engine = engine.to_string();
        self
    }
}
