//! Input Normalizer Module
//!
//! リクエスト行と候補レコードの照合用キーを正規化するモジュール。
//! 大文字小文字の統一、トリム、開始時刻の解析、ファンドパラメータの抽出を行います。
//!
//! 解析に失敗してもエラーにはなりません。失敗した値は
//! どの日付とも一致しない番兵値（`None`）として扱われます。

use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::types::CandidateRecord;

/// 日時として試行するフォーマット（先頭から順に試す）
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    // Oracle TIMESTAMP の既定表記（例: 03-JAN-24 10.15.00.000000 AM）
    "%d-%b-%y %I.%M.%S%.f %p",
];

/// 日付のみのフォーマット（時刻は0時とみなす）
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y", "%Y/%m/%d", "%Y%m%d"];

/// Excel 1900年日付システムの起点（シリアル値0）
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// シリアル値の上限（9999-12-31）
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

/// リクエストのレポート名を正規化（トリム + 小文字化）
pub fn normalize_report(report: &str) -> String {
    report.trim().to_lowercase()
}

/// リクエストのファンドを正規化（トリムのみ、大文字小文字は保持）
pub fn normalize_fund(fund: &str) -> String {
    fund.trim().to_string()
}

/// 日時文字列をベストエフォートで解析する
///
/// # 引数
///
/// * `raw` - 解析する文字列（前後の空白は無視される）
///
/// # 戻り値
///
/// * `Some(NaiveDateTime)` - いずれかのフォーマットで解析できた場合
/// * `None` - 空文字列、またはどのフォーマットにも一致しない場合
///
/// RFC 3339形式のオフセットは破棄され、記録された壁時計時刻が使われます。
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// 日付文字列を解析する（時刻部分は捨てる）
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|datetime| datetime.date())
}

/// Excelのシリアル値を日時に変換する（1900年日付システム）
///
/// 1899-12-30を起点とするため、1900-03-01以降のシリアル値で正確な日付になります。
/// 負の値、非有限値、9999-12-31を超える値は`None`を返します。
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }

    let (year, month, day) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

/// パラメータ文字列から`fund`パラメータの値を抽出する
///
/// `fund`の後に任意の空白、コロン、任意の空白が続き、
/// 値は次の空白またはセミコロンまでです。
/// 抽出結果は照合には使用されません（照合はパラメータ文字列全体への部分一致）。
pub fn extract_fund_token(parameters: &str) -> Option<String> {
    static FUND_TOKEN: OnceLock<Option<Regex>> = OnceLock::new();

    let re = FUND_TOKEN
        .get_or_init(|| Regex::new(r"fund\s*:\s*([^\s;]+)").ok())
        .as_ref()?;
    re.captures(parameters)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// 正規化済みの候補レコード
///
/// 元のレコードに照合用の派生列を付加したビューです。
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCandidate {
    /// 元のレコード
    pub record: CandidateRecord,

    /// 小文字化・トリム済みのレポートパス
    pub report_normalized: String,

    /// 小文字化したパラメータ文字列（ファンドの照合用）
    pub parameters_normalized: String,

    /// 解析済みの開始時刻（`None`は解析不能を表す番兵値）
    pub started_at: Option<NaiveDateTime>,

    /// パラメータから抽出した`fund`の値
    pub fund_token: Option<String>,
}

impl NormalizedCandidate {
    /// 候補レコードから派生列を計算する
    pub fn new(record: CandidateRecord) -> Self {
        Self {
            report_normalized: record.report.trim().to_lowercase(),
            parameters_normalized: record.parameters.to_lowercase(),
            started_at: parse_timestamp(&record.start),
            fund_token: extract_fund_token(&record.parameters),
            record,
        }
    }

    /// 開始日（時刻を除く）
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.started_at.map(|datetime| datetime.date())
    }
}

/// 候補レコードの集合をまとめて正規化する（取得順を保持）
pub fn normalize_candidates(records: Vec<CandidateRecord>) -> Vec<NormalizedCandidate> {
    records.into_iter().map(NormalizedCandidate::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_normalize_report_and_fund() {
        assert_eq!(normalize_report("  Sales/MONTHLY  "), "sales/monthly");
        assert_eq!(normalize_fund("  Fund-A  "), "Fund-A");
    }

    #[test]
    fn test_parse_timestamp_common_formats() {
        let expected = datetime(2024, 1, 3, 10, 15, 0);

        assert_eq!(parse_timestamp("2024-01-03 10:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-03T10:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-03 10:15"), Some(expected));
        assert_eq!(parse_timestamp("03.01.2024 10:15:00"), Some(expected));
        assert_eq!(parse_timestamp("01/03/2024 10:15"), Some(expected));
        assert_eq!(parse_timestamp(" 2024-01-03 10:15:00.250 ").map(|d| d.date()), Some(expected.date()));
    }

    #[test]
    fn test_parse_timestamp_rfc3339_keeps_wall_clock() {
        assert_eq!(
            parse_timestamp("2024-01-03T23:30:00+02:00"),
            Some(datetime(2024, 1, 3, 23, 30, 0))
        );
    }

    #[test]
    fn test_parse_timestamp_date_only_is_midnight() {
        assert_eq!(parse_timestamp("2024-01-03"), Some(datetime(2024, 1, 3, 0, 0, 0)));
        assert_eq!(parse_timestamp("20240103"), Some(datetime(2024, 1, 3, 0, 0, 0)));
    }

    #[test]
    fn test_parse_timestamp_unparseable() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }

    #[test]
    fn test_excel_serial_to_datetime() {
        // 45292 = 2024-01-01
        assert_eq!(excel_serial_to_datetime(45292.0), Some(datetime(2024, 1, 1, 0, 0, 0)));
        assert_eq!(excel_serial_to_datetime(45292.5), Some(datetime(2024, 1, 1, 12, 0, 0)));
        assert_eq!(excel_serial_to_datetime(-1.0), None);
        assert_eq!(excel_serial_to_datetime(f64::NAN), None);
        assert_eq!(excel_serial_to_datetime(3_000_000.0), None);
    }

    #[test]
    fn test_extract_fund_token() {
        assert_eq!(extract_fund_token("fund: ABC; region: EU"), Some("ABC".to_string()));
        assert_eq!(extract_fund_token("region: EU;fund :X1 ;"), Some("X1".to_string()));
        assert_eq!(extract_fund_token("region: EU"), None);
        // 大文字の`Fund`は対象外
        assert_eq!(extract_fund_token("Fund: ABC"), None);
    }

    #[test]
    fn test_normalized_candidate_derived_columns() {
        let record = CandidateRecord::new(
            "  /Reports/Monthly/NAV.rox ",
            "fund: ABC; region: EU",
            "PDF",
            "2024-01-03 10:15:00",
        );
        let candidate = NormalizedCandidate::new(record);

        assert_eq!(candidate.report_normalized, "/reports/monthly/nav.rox");
        assert_eq!(candidate.parameters_normalized, "fund: abc; region: eu");
        assert_eq!(candidate.started_at, Some(datetime(2024, 1, 3, 10, 15, 0)));
        assert_eq!(candidate.start_date(), NaiveDate::from_ymd_opt(2024, 1, 3));
        assert_eq!(candidate.fund_token.as_deref(), Some("ABC"));
    }

    #[test]
    fn test_unparseable_start_is_sentinel() {
        let record = CandidateRecord::new("/r.rox", "fund: A", "PDF", "garbage");
        let candidate = NormalizedCandidate::new(record);

        assert_eq!(candidate.started_at, None);
        assert_eq!(candidate.start_date(), None);
    }
}
