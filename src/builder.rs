//! Builder Module
//!
//! Fluent Builder APIを提供し、`Generator`インスタンスを段階的に構築する。

use crate::api::{CollisionPolicy, Compression, EscapeMode, SheetSelector};
use crate::error::{ReportCaseError, Result};
use crate::matcher;
use crate::normalize::normalize_candidates;
use crate::output::{OutputArchive, StageOutcome};
use crate::parser::UploadParser;
use crate::render;
use crate::security::SecurityConfig;
use crate::source::{CandidateQuery, CandidateSource};
use crate::types::RequestRow;
use serde::Serialize;
use std::io::{Cursor, Read, Seek, Write};
use tracing::{debug, info, warn};

/// 生成処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct GenerationConfig {
    /// アップロードのシート選択方式
    pub sheet_selector: SheetSelector,

    /// 値の出力方式
    pub escape_mode: EscapeMode,

    /// エントリ名衝突時の処理方式
    pub collision_policy: CollisionPolicy,

    /// アーカイブの圧縮方式
    pub compression: Compression,

    /// サイズ制限
    pub security: SecurityConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            sheet_selector: SheetSelector::First,
            escape_mode: EscapeMode::Raw,
            collision_policy: CollisionPolicy::Overwrite,
            compression: Compression::Deflated,
            security: SecurityConfig::default(),
        }
    }
}

/// 実行結果の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// アップロードに有効なリクエスト行がない（アーカイブは書き込まれない）
    NoRequests,

    /// データストアから候補が1件も取得されなかった（アーカイブは書き込まれない）
    NoCandidates,

    /// 候補はあったが、どのリクエスト行にも一致しなかった（空のアーカイブが書き込まれる）
    NoMatches,

    /// 1件以上のドキュメントが書き込まれた
    Generated,
}

/// 1回の実行の集計結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// 実行結果の状態
    pub status: RunStatus,

    /// 読み込んだリクエスト行数
    pub request_rows: usize,

    /// 1件以上のドキュメントを生成したリクエスト行数
    pub matched_requests: usize,

    /// ドキュメントを生成しなかったリクエスト行数
    pub skipped_requests: usize,

    /// データストアから取得した候補数
    pub candidates_fetched: usize,

    /// 生成したドキュメント数
    pub documents_rendered: usize,

    /// アーカイブに書き込まれたエントリ数
    pub entries_written: usize,

    /// 上書きされたエントリ数
    pub entries_overwritten: usize,

    /// 連番付きの名前に変更されたエントリ数
    pub entries_renamed: usize,

    /// 安全な名前に書き換えて書き込まれたドキュメント数
    pub entries_sanitized: usize,

    /// 安全な名前に書き換えられず拒否されたドキュメント数
    pub entries_rejected: usize,

    /// 書き込まれたエントリ名（書き込み順）
    pub entries: Vec<String>,
}

impl RunSummary {
    fn new(status: RunStatus, request_rows: usize) -> Self {
        Self {
            status,
            request_rows,
            matched_requests: 0,
            skipped_requests: 0,
            candidates_fetched: 0,
            documents_rendered: 0,
            entries_written: 0,
            entries_overwritten: 0,
            entries_renamed: 0,
            entries_sanitized: 0,
            entries_rejected: 0,
            entries: Vec::new(),
        }
    }

    /// アーカイブが書き込まれたかどうか
    pub fn archive_written(&self) -> bool {
        matches!(self.status, RunStatus::NoMatches | RunStatus::Generated)
    }

    /// 「一致なし」として利用者に通知すべきかどうか
    pub fn is_empty(&self) -> bool {
        self.status != RunStatus::Generated
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Generator`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use reportcase::{CollisionPolicy, EscapeMode, GeneratorBuilder, SheetSelector};
///
/// # fn main() -> Result<(), reportcase::ReportCaseError> {
/// let generator = GeneratorBuilder::new()
///     .with_sheet_selector(SheetSelector::Name("Requests".to_string()))
///     .with_escape_mode(EscapeMode::Xml)
///     .with_collision_policy(CollisionPolicy::Disambiguate)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GeneratorBuilder {
    /// 内部設定（構築中）
    config: GenerationConfig,
}

impl Default for GeneratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - シート選択: 先頭のシート
    /// - 値の出力: エスケープなし
    /// - エントリ名の衝突: 上書き
    /// - 圧縮: Deflate
    /// - アップロード上限: 100MB、リクエスト行上限: 100000
    pub fn new() -> Self {
        Self {
            config: GenerationConfig::default(),
        }
    }

    /// リクエスト表を読み込むシートを選択する
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.config.sheet_selector = selector;
        self
    }

    /// 値の出力方式を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use reportcase::{EscapeMode, GeneratorBuilder};
    ///
    /// let builder = GeneratorBuilder::new().with_escape_mode(EscapeMode::Xml);
    /// ```
    pub fn with_escape_mode(mut self, mode: EscapeMode) -> Self {
        self.config.escape_mode = mode;
        self
    }

    /// エントリ名が衝突した場合の処理方式を指定する
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.config.collision_policy = policy;
        self
    }

    /// アーカイブの圧縮方式を指定する
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.config.compression = compression;
        self
    }

    /// アップロードファイルの最大サイズ（バイト）を指定する
    pub fn with_max_upload_size(mut self, bytes: u64) -> Self {
        self.config.security.max_upload_size = bytes;
        self
    }

    /// リクエスト行の最大数を指定する
    pub fn with_max_request_rows(mut self, rows: usize) -> Self {
        self.config.security.max_request_rows = rows;
        self
    }

    /// 設定を検証し、`Generator`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Generator)` - 設定が有効な場合
    /// * `Err(ReportCaseError::Config)` - 上限値が0の場合
    pub fn build(self) -> Result<Generator> {
        if self.config.security.max_upload_size == 0 {
            return Err(ReportCaseError::Config(
                "Maximum upload size must be greater than 0".to_string(),
            ));
        }

        if self.config.security.max_request_rows == 0 {
            return Err(ReportCaseError::Config(
                "Maximum request rows must be greater than 0".to_string(),
            ));
        }

        Ok(Generator {
            config: self.config,
        })
    }
}

/// 生成処理のファサード
///
/// アップロードされたスプレッドシートと候補の取得元から、
/// XMLテストケースのZIPアーカイブを生成するメインエントリーポイントです。
///
/// # 使用例
///
/// ```rust,no_run
/// use reportcase::source::CsvSource;
/// use reportcase::GeneratorBuilder;
/// use std::fs::File;
///
/// # fn main() -> Result<(), reportcase::ReportCaseError> {
/// let generator = GeneratorBuilder::new().build()?;
/// let upload = File::open("requests.xlsx")?;
/// let source = CsvSource::from_path("report_statistics.csv");
/// let output = File::create("generated_xmls.zip")?;
///
/// let summary = generator.generate(upload, &source, output)?;
/// if summary.is_empty() {
///     eprintln!("No matches found");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Generator {
    /// 生成設定
    config: GenerationConfig,
}

impl Generator {
    /// アップロードからリクエスト行を読み込む
    pub fn read_requests<R: Read>(&self, upload: R) -> Result<Vec<RequestRow>> {
        let mut parser = UploadParser::open(upload, &self.config.security)?;
        parser.read_requests(&self.config.sheet_selector, &self.config.security)
    }

    /// リクエスト行と取得元からドキュメントを生成し、アーカイブに追加する
    ///
    /// # 処理フロー
    ///
    /// 1. リクエスト行からクエリを作成し、候補を取得
    /// 2. 候補を正規化
    /// 3. 各リクエスト行について一致・選択・順位付け
    /// 4. ドキュメントを生成してアーカイブに追加
    ///
    /// # 戻り値
    ///
    /// * `Ok((RunSummary, Option<OutputArchive>))` - 候補が0件の場合アーカイブは`None`
    /// * `Err(ReportCaseError)` - 取得元でエラーが発生した場合
    pub fn process<S: CandidateSource + ?Sized>(
        &self,
        requests: &[RequestRow],
        source: &S,
    ) -> Result<(RunSummary, Option<OutputArchive>)> {
        let mut summary = RunSummary::new(RunStatus::NoRequests, requests.len());
        if requests.is_empty() {
            warn!("upload contains no request rows");
            return Ok((summary, None));
        }

        // 1. 候補の取得
        let query = CandidateQuery::from_requests(requests)?;
        let records = source.fetch(&query)?;
        summary.candidates_fetched = records.len();
        if records.is_empty() {
            warn!(
                reports = query.reports().len(),
                funds = query.funds().len(),
                "no candidate records found in data store"
            );
            summary.status = RunStatus::NoCandidates;
            return Ok((summary, None));
        }

        // 2. 正規化
        let candidates = normalize_candidates(records);

        // 3-4. 選択と生成
        let mut archive =
            OutputArchive::new(self.config.collision_policy, self.config.compression);
        for request in requests {
            let selections = matcher::select(request, &candidates);
            if selections.is_empty() {
                debug!(
                    row = request.row,
                    report = %request.report,
                    fund = %request.fund,
                    "no matching run, skipping request"
                );
                summary.skipped_requests += 1;
                continue;
            }

            summary.matched_requests += 1;
            for selection in &selections {
                let document = render::render_selection(selection, self.config.escape_mode);
                summary.documents_rendered += 1;
                match archive.stage(document) {
                    StageOutcome::Added(_) => {}
                    StageOutcome::Overwritten(_) => summary.entries_overwritten += 1,
                    StageOutcome::Renamed { .. } => summary.entries_renamed += 1,
                    StageOutcome::Rejected { .. } => summary.entries_rejected += 1,
                }
            }
        }

        summary.entries = archive
            .entry_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        summary.entries_written = summary.entries.len();
        summary.entries_sanitized = archive.sanitized_count();
        summary.status = if archive.is_empty() {
            RunStatus::NoMatches
        } else {
            RunStatus::Generated
        };

        info!(
            requests = summary.request_rows,
            matched = summary.matched_requests,
            entries = summary.entries_written,
            overwritten = summary.entries_overwritten,
            sanitized = summary.entries_sanitized,
            "generated test case documents"
        );
        Ok((summary, Some(archive)))
    }

    /// アップロードを読み込み、ZIPアーカイブを出力先に書き込む
    ///
    /// # 引数
    ///
    /// * `upload` - アップロードされたスプレッドシートのリーダー
    /// * `source` - 候補の取得元
    /// * `output` - ZIPの出力先（Write + Seekトレイトを実装）
    ///
    /// # 戻り値
    ///
    /// * `Ok(RunSummary)` - 処理に成功した場合。`NoRequests`と`NoCandidates`では
    ///   出力先には何も書き込まれません。
    /// * `Err(ReportCaseError)` - エラーが発生した場合
    pub fn generate<R, S, W>(&self, upload: R, source: &S, output: W) -> Result<RunSummary>
    where
        R: Read,
        S: CandidateSource + ?Sized,
        W: Write + Seek,
    {
        let requests = self.read_requests(upload)?;
        let (summary, archive) = self.process(&requests, source)?;

        if let Some(archive) = archive {
            let mut output = archive.write_to(output)?;
            output.flush()?;
        }

        Ok(summary)
    }

    /// アップロードを読み込み、ZIPアーカイブをバイト列として返す
    ///
    /// アーカイブが生成されなかった場合（`NoRequests` / `NoCandidates`）は`None`を返します。
    pub fn generate_to_bytes<R, S>(
        &self,
        upload: R,
        source: &S,
    ) -> Result<(RunSummary, Option<Vec<u8>>)>
    where
        R: Read,
        S: CandidateSource + ?Sized,
    {
        let requests = self.read_requests(upload)?;
        let (summary, archive) = self.process(&requests, source)?;

        let bytes = match archive {
            Some(archive) => Some(archive.write_to(Cursor::new(Vec::new()))?.into_inner()),
            None => None,
        };

        Ok((summary, bytes))
    }
}
