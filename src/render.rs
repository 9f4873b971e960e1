//! Renderer Module
//!
//! 選択された候補からXMLテストケースドキュメントとエントリ名を生成するモジュール。
//!
//! 出力形式:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <reportTestcase name="nav" format="PDF" pfad="/Finance/Monthly">
//!   <parameter name="fund">
//!     <value>ABC</value>
//!   </parameter>
//! </reportTestcase>
//! ```

use std::borrow::Cow;

use chrono::NaiveDateTime;

use crate::api::EscapeMode;
use crate::matcher::Selection;

/// XML宣言行
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// エントリ名に埋め込む開始時刻のフォーマット
const ENTRY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M";

/// 生成済みドキュメント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// アーカイブ内のエントリ名
    pub name: String,

    /// XMLドキュメント本体
    pub body: String,
}

/// 属性値・テキスト値をXMLに埋め込む形に整形する
///
/// すべての値はこの関数を経由して出力されます。
/// `EscapeMode::Raw`では値をそのまま返し、`EscapeMode::Xml`では
/// `& < > " '`をエスケープします。
pub fn xml_text(value: &str, mode: EscapeMode) -> Cow<'_, str> {
    match mode {
        EscapeMode::Raw => Cow::Borrowed(value),
        EscapeMode::Xml => quick_xml::escape::escape(value),
    }
}

/// パラメータ文字列を`(名前, 値)`のリストに分解する
///
/// `;`で分割し、`:`を含まないセグメントは捨て、最初の`:`で名前と値に分けます。
/// 名前と値の前後の空白は除去されます。順序は元の文字列の順序です。
pub fn parse_parameters(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|segment| segment.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// `<parameter>`要素群を生成する（各要素は改行で終わる）
pub fn render_parameters(parameters: &[(String, String)], mode: EscapeMode) -> String {
    let mut out = String::new();
    for (name, value) in parameters {
        out.push_str(&format!(
            "  <parameter name=\"{}\">\n    <value>{}</value>\n  </parameter>\n",
            xml_text(name, mode),
            xml_text(value, mode)
        ));
    }
    out
}

/// レポートパスから最後のセグメントを除いたディレクトリ部分を返す
///
/// `/`を含まないパスの場合は空文字列を返します。
///
/// ```rust
/// use reportcase::render::containing_directory;
///
/// assert_eq!(containing_directory("/Finance/Monthly/NAV.rox"), "/Finance/Monthly");
/// assert_eq!(containing_directory("NAV.rox"), "");
/// ```
pub fn containing_directory(report_path: &str) -> &str {
    report_path
        .rsplit_once('/')
        .map(|(directory, _)| directory)
        .unwrap_or("")
}

/// ドキュメント全体を組み立てる
///
/// # 引数
///
/// * `name` - `reportTestcase`の`name`属性（正規化済みレポート名）
/// * `format` - `format`属性
/// * `pfad` - `pfad`属性（レポートのディレクトリ）
/// * `parameters` - 分解済みのパラメータ
/// * `mode` - 値の出力方式
pub fn render_document(
    name: &str,
    format: &str,
    pfad: &str,
    parameters: &[(String, String)],
    mode: EscapeMode,
) -> String {
    format!(
        "{}\n<reportTestcase name=\"{}\" format=\"{}\" pfad=\"{}\">\n{}</reportTestcase>",
        XML_DECLARATION,
        xml_text(name, mode),
        xml_text(format, mode),
        xml_text(pfad, mode),
        render_parameters(parameters, mode)
    )
}

/// エントリ名を生成する: `{report}_{fund}_{YYYY-MM-DD_HH-MM}_{rank}.xml`
pub fn entry_name(report: &str, fund: &str, started_at: NaiveDateTime, rank: usize) -> String {
    format!(
        "{}_{}_{}_{}.xml",
        report,
        fund,
        started_at.format(ENTRY_TIMESTAMP_FORMAT),
        rank
    )
}

/// 選択結果から1つのドキュメントを生成する
pub fn render_selection(selection: &Selection<'_>, mode: EscapeMode) -> RenderedDocument {
    let request = selection.request;
    let record = &selection.candidate.record;
    let parameters = parse_parameters(&record.parameters);

    RenderedDocument {
        name: entry_name(
            &request.report,
            &request.fund,
            selection.started_at,
            selection.rank,
        ),
        body: render_document(
            &request.report,
            &record.format,
            containing_directory(&record.report),
            &parameters,
            mode,
        ),
    }
}
