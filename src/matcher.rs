//! Matcher/Selector Module
//!
//! リクエスト行ごとに候補レコードを絞り込み、対象日付を決定し、
//! 開始時刻の降順で順位付けするモジュール。

use chrono::{NaiveDate, NaiveDateTime};

use crate::normalize::NormalizedCandidate;
use crate::types::RequestRow;

/// 選択された候補（リクエスト行、候補、順位の組）
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    /// 対象のリクエスト行
    pub request: &'a RequestRow,

    /// 選択された候補
    pub candidate: &'a NormalizedCandidate,

    /// リクエスト行内での順位（1始まり、開始時刻の降順）
    pub rank: usize,

    /// 候補の開始時刻（選択された候補は必ず解析済み）
    pub started_at: NaiveDateTime,
}

/// 候補がリクエスト行に一致するかを判定する
///
/// 正規化済みレポートパスがリクエストのレポート名を含み、かつ
/// パラメータ文字列がファンドを大文字小文字を区別せずに（リテラルとして）含む場合に一致します。
/// 完全一致ではなく部分一致です。
pub fn matches(request: &RequestRow, candidate: &NormalizedCandidate) -> bool {
    matches_lowercased(&request.report, &request.fund.to_lowercase(), candidate)
}

/// 小文字化済みのファンドで照合する
fn matches_lowercased(report: &str, fund_lowercase: &str, candidate: &NormalizedCandidate) -> bool {
    candidate.report_normalized.contains(report)
        && candidate.parameters_normalized.contains(fund_lowercase)
}

/// リクエスト行に一致する候補を取得順のまま返す
///
/// ファンドの小文字化はリクエスト行ごとに1回だけ行います。
pub fn candidates_for<'a>(
    request: &RequestRow,
    candidates: &'a [NormalizedCandidate],
) -> Vec<&'a NormalizedCandidate> {
    let fund_lowercase = request.fund.to_lowercase();
    candidates
        .iter()
        .filter(|candidate| matches_lowercased(&request.report, &fund_lowercase, candidate))
        .collect()
}

/// 対象日付を決定する
///
/// リクエストに有効な日付があればその日付、なければ一致した候補のうち
/// 最も新しい開始時刻の日付を返します。
/// すべての候補の開始時刻が解析不能な場合は`None`になります。
pub fn selection_date(
    request: &RequestRow,
    matched: &[&NormalizedCandidate],
) -> Option<NaiveDate> {
    if let Some(date) = request.date.as_date() {
        return Some(date);
    }

    matched
        .iter()
        .filter_map(|candidate| candidate.started_at)
        .max()
        .map(|latest| latest.date())
}

/// リクエスト行に対する候補を選択し、順位を付ける
///
/// # 引数
///
/// * `request` - リクエスト行
/// * `candidates` - 正規化済み候補（取得順）
///
/// # 戻り値
///
/// 開始時刻の降順に並べた選択結果。同時刻の候補は取得順を保持します。
/// 一致する候補がない場合、または対象日付の候補がない場合は空になります。
pub fn select<'a>(
    request: &'a RequestRow,
    candidates: &'a [NormalizedCandidate],
) -> Vec<Selection<'a>> {
    let matched = candidates_for(request, candidates);
    if matched.is_empty() {
        return Vec::new();
    }

    let Some(date) = selection_date(request, &matched) else {
        return Vec::new();
    };

    let mut dated: Vec<(&NormalizedCandidate, NaiveDateTime)> = matched
        .into_iter()
        .filter_map(|candidate| {
            candidate
                .started_at
                .filter(|started_at| started_at.date() == date)
                .map(|started_at| (candidate, started_at))
        })
        .collect();

    // 安定ソート
    dated.sort_by(|a, b| b.1.cmp(&a.1));

    dated
        .into_iter()
        .enumerate()
        .map(|(index, (candidate, started_at))| Selection {
            request,
            candidate,
            rank: index + 1,
            started_at,
        })
        .collect()
}
