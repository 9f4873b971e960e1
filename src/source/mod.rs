//! Candidate Source Module
//!
//! 候補レコードの取得元（データストア）を抽象化するモジュール。
//! パイプラインは`CandidateSource`トレイトを通じてのみデータストアにアクセスするため、
//! 実データベースなしでテストできます。

mod snapshot;

pub use self::snapshot::CsvSource;

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use crate::error::{ReportCaseError, Result};
use crate::types::{CandidateRecord, RequestRow};

/// `REPORT_STATISTICS`テーブルに対するクエリ
///
/// バインド変数`:report_pattern`と`:fund_pattern`には
/// `CandidateQuery::bind_parameters()`の値を渡します。
pub const REPORT_STATISTICS_QUERY: &str = "\
SELECT RS_REPORT, RS_PARAMETERS, RS_FORMAT, RS_START, RS_STATUS, RS_ENGINE
FROM KIRA_STAR.REPORT_STATISTICS
WHERE LOWER(RS_ENGINE) = 'actuate'
  AND LOWER(RS_STATUS) = 'succeeded'
  AND REGEXP_LIKE(LOWER(RS_REPORT), :report_pattern, 'i')
  AND REGEXP_LIKE(RS_PARAMETERS, :fund_pattern, 'i')";

/// 取得対象エンジン
pub const ENGINE: &str = "actuate";

/// 取得対象ステータス
pub const STATUS: &str = "succeeded";

/// コンパイル済みパターンの上限（リクエスト行の上限いっぱいの選択肢を許容する）
const PATTERN_SIZE_LIMIT: usize = 256 * (1 << 20);

/// 候補レコードの取得条件
///
/// アップロードに含まれるレポート名とファンドの重複を除いた集合から作られます。
/// 各値は正規表現のメタ文字がリテラルとして扱われるようにエスケープされます。
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    reports: Vec<String>,
    funds: Vec<String>,
    report_pattern: String,
    fund_pattern: String,
    report_regex: Regex,
    fund_regex: Regex,
}

impl CandidateQuery {
    /// レポート名とファンドの集合からクエリを作る（出現順、重複除去）
    ///
    /// # 戻り値
    ///
    /// * `Ok(CandidateQuery)` - パターンのコンパイルに成功した場合
    /// * `Err(ReportCaseError::Config)` - パターンが大きすぎる場合など
    pub fn new<I, J, S, T>(reports: I, funds: J) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let reports = distinct(reports);
        let funds = distinct(funds);
        let report_pattern = escaped_alternation(&reports);
        let fund_pattern = escaped_alternation(&funds);

        Ok(Self {
            report_regex: compile(&report_pattern)?,
            fund_regex: compile(&fund_pattern)?,
            reports,
            funds,
            report_pattern,
            fund_pattern,
        })
    }

    /// リクエスト行からクエリを作る
    pub fn from_requests(requests: &[RequestRow]) -> Result<Self> {
        Self::new(
            requests.iter().map(|r| r.report.as_str()),
            requests.iter().map(|r| r.fund.as_str()),
        )
    }

    /// 重複除去済みのレポート名
    pub fn reports(&self) -> &[String] {
        &self.reports
    }

    /// 重複除去済みのファンド
    pub fn funds(&self) -> &[String] {
        &self.funds
    }

    /// エスケープ済みレポートパターン（`|`区切り）
    pub fn report_pattern(&self) -> &str {
        &self.report_pattern
    }

    /// エスケープ済みファンドパターン（`|`区切り）
    pub fn fund_pattern(&self) -> &str {
        &self.fund_pattern
    }

    /// `REPORT_STATISTICS_QUERY`のバインド変数
    pub fn bind_parameters(&self) -> [(&'static str, &str); 2] {
        [
            ("report_pattern", self.report_pattern.as_str()),
            ("fund_pattern", self.fund_pattern.as_str()),
        ]
    }

    /// レコードがデータストア側の絞り込み条件を満たすかを判定する
    ///
    /// `REPORT_STATISTICS_QUERY`の`WHERE`句と同じ条件です。
    pub fn admits(&self, record: &CandidateRecord) -> bool {
        record.engine.eq_ignore_ascii_case(ENGINE)
            && record.status.eq_ignore_ascii_case(STATUS)
            && self.report_regex.is_match(&record.report.to_lowercase())
            && self.fund_regex.is_match(&record.parameters)
    }
}

/// 候補レコードの取得元
///
/// 実装は1回の実行の間だけ借用されます。接続エラーなどの失敗は
/// `Err`として返され、実行全体が中断されます。
pub trait CandidateSource {
    /// クエリ条件を満たす候補レコードを取得順に返す
    fn fetch(&self, query: &CandidateQuery) -> Result<Vec<CandidateRecord>>;
}

/// メモリ上のレコードを返す取得元
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<CandidateRecord>,
}

impl InMemorySource {
    /// レコードのリストから取得元を作る
    pub fn new(records: Vec<CandidateRecord>) -> Self {
        Self { records }
    }

    /// 保持しているレコード数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// レコードを保持していないか
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CandidateSource for InMemorySource {
    fn fetch(&self, query: &CandidateQuery) -> Result<Vec<CandidateRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|record| query.admits(record))
            .cloned()
            .collect())
    }
}

/// クロージャを取得元として使うためのラッパー
///
/// `from_fn`で生成します。
#[derive(Debug, Clone)]
pub struct FromFn<F> {
    f: F,
}

/// クロージャから取得元を作る
///
/// ```rust
/// use reportcase::source::{from_fn, CandidateQuery, CandidateSource};
/// use reportcase::ReportCaseError;
///
/// let source = from_fn(|_query: &CandidateQuery| {
///     Err(ReportCaseError::Source("connection refused".to_string()))
/// });
/// let query = CandidateQuery::new(["nav"], ["F1"]).unwrap();
/// assert!(source.fetch(&query).is_err());
/// ```
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(&CandidateQuery) -> Result<Vec<CandidateRecord>>,
{
    FromFn { f }
}

impl<F> CandidateSource for FromFn<F>
where
    F: Fn(&CandidateQuery) -> Result<Vec<CandidateRecord>>,
{
    fn fetch(&self, query: &CandidateQuery) -> Result<Vec<CandidateRecord>> {
        (self.f)(query)
    }
}

fn distinct<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.into();
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

fn escaped_alternation(values: &[String]) -> String {
    values
        .iter()
        .map(|value| regex::escape(value))
        .collect::<Vec<_>>()
        .join("|")
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|e| ReportCaseError::Config(format!("Invalid candidate pattern: {}", e)))
}
