//! Upload Parser
//!
//! calamineを使用してアップロードされたスプレッドシートからリクエスト行を抽出する。

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use std::io::{Cursor, Read};
use tracing::{debug, warn};

use crate::api::SheetSelector;
use crate::error::{ReportCaseError, Result};
use crate::normalize::{excel_serial_to_datetime, parse_date};
use crate::security::SecurityConfig;
use crate::types::{RequestDate, RequestRow};

/// レポート名の列名
pub(crate) const REPORT_COLUMN: &str = "report";
/// ファンドの列名
pub(crate) const FUND_COLUMN: &str = "fund";
/// 日付の列名（任意）
pub(crate) const DATE_COLUMN: &str = "date";

/// アップロードパーサー
///
/// calamineのラッパーとして、ワークブックレベルの操作を提供します。
/// xlsx / xlsm / xlsb / xls / ods 形式を受け付けます。
pub(crate) struct UploadParser {
    workbook: Sheets<Cursor<Vec<u8>>>,
}

/// ヘッダー行から求めた列位置
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    report: usize,
    fund: usize,
    date: Option<usize>,
}

impl UploadParser {
    /// アップロードを開く
    ///
    /// # 引数
    ///
    /// * `reader` - アップロードされたファイルのリーダー
    /// * `security` - サイズ制限
    ///
    /// # 戻り値
    ///
    /// * `Ok(UploadParser)` - ワークブックの読み込みに成功した場合
    /// * `Err(ReportCaseError::SecurityViolation)` - ファイルサイズが上限を超えた場合
    /// * `Err(ReportCaseError::Parse)` - スプレッドシートとして解析できない場合
    pub fn open<R: Read>(reader: R, security: &SecurityConfig) -> Result<Self> {
        // 上限+1バイトまで読み込み、超過を検出する
        let mut buffer = Vec::new();
        let bytes_read = reader
            .take(security.max_upload_size.saturating_add(1))
            .read_to_end(&mut buffer)?;

        if bytes_read as u64 > security.max_upload_size {
            return Err(ReportCaseError::SecurityViolation(format!(
                "Upload size exceeds maximum: more than {} bytes",
                security.max_upload_size
            )));
        }

        let workbook = open_workbook_auto_from_rs(Cursor::new(buffer))?;
        Ok(Self { workbook })
    }

    /// すべてのシート名を取得
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// シート選択方式に基づいてシート名を決定する
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 選択されたシート名
    /// * `Err(ReportCaseError::Config)` - シートが存在しない、またはインデックスが範囲外の場合
    pub fn select_sheet(&self, selector: &SheetSelector) -> Result<String> {
        let names = self.sheet_names();

        match selector {
            SheetSelector::First => names
                .into_iter()
                .next()
                .ok_or_else(|| ReportCaseError::Config("Workbook has no sheets".to_string())),

            SheetSelector::Index(index) => {
                names.get(*index).cloned().ok_or_else(|| {
                    ReportCaseError::Config(format!(
                        "Sheet index {} is out of range (total: {})",
                        index,
                        names.len()
                    ))
                })
            }

            SheetSelector::Name(name) => {
                if !names.contains(name) {
                    return Err(ReportCaseError::Config(format!("Sheet '{}' not found", name)));
                }
                Ok(name.clone())
            }
        }
    }

    /// シートからリクエスト行を読み込む
    ///
    /// 先頭行をヘッダーとして扱い、`report`と`fund`列は必須、`date`列は任意です。
    /// `report`または`fund`が空の行はスキップされます。
    pub fn read_requests(
        &mut self,
        selector: &SheetSelector,
        security: &SecurityConfig,
    ) -> Result<Vec<RequestRow>> {
        let sheet = self.select_sheet(selector)?;
        let range = self.workbook.worksheet_range(&sheet)?;
        requests_from_range(&sheet, &range, security)
    }
}

/// セル範囲からリクエスト行を抽出する
fn requests_from_range(
    sheet: &str,
    range: &Range<Data>,
    security: &SecurityConfig,
) -> Result<Vec<RequestRow>> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        // 空のシートにはヘッダーもない
        return Err(ReportCaseError::MissingColumn {
            sheet: sheet.to_string(),
            column: REPORT_COLUMN.to_string(),
        });
    };
    let layout = column_layout(sheet, header)?;

    // 使用範囲の先頭行（0始まり）
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut requests = Vec::new();

    for (offset, cells) in rows.enumerate() {
        // ヘッダーの次の行からの1始まり行番号
        let row_number = first_row + offset + 2;
        let report = cells.get(layout.report).map(cell_text).unwrap_or_default();
        let fund = cells.get(layout.fund).map(cell_text).unwrap_or_default();

        if report.trim().is_empty() || fund.trim().is_empty() {
            if cells.iter().any(|cell| !cell_text(cell).trim().is_empty()) {
                warn!(sheet, row = row_number, "skipping row with empty report or fund");
            }
            continue;
        }

        if requests.len() >= security.max_request_rows {
            return Err(ReportCaseError::SecurityViolation(format!(
                "Upload has too many request rows (max: {})",
                security.max_request_rows
            )));
        }

        let date = layout
            .date
            .and_then(|index| cells.get(index))
            .map(cell_date)
            .unwrap_or(RequestDate::Absent);
        if let RequestDate::Malformed(raw) = &date {
            warn!(sheet, row = row_number, value = %raw, "unparseable date, using most recent run");
        }

        requests.push(RequestRow::new(&report, &fund, date).at_row(row_number));
    }

    debug!(sheet, rows = requests.len(), "read request rows");
    Ok(requests)
}

/// ヘッダー行から列位置を求める（列名は完全一致、大文字小文字を区別）
fn column_layout(sheet: &str, header: &[Data]) -> Result<ColumnLayout> {
    let position = |name: &str| header.iter().position(|cell| cell_text(cell) == name);
    let missing = |name: &str| ReportCaseError::MissingColumn {
        sheet: sheet.to_string(),
        column: name.to_string(),
    };

    Ok(ColumnLayout {
        report: position(REPORT_COLUMN).ok_or_else(|| missing(REPORT_COLUMN))?,
        fund: position(FUND_COLUMN).ok_or_else(|| missing(FUND_COLUMN))?,
        date: position(DATE_COLUMN),
    })
}

/// セル値を文字列に変換する
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(|datetime| datetime.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// 日付列のセル値を変換する
///
/// 数値はExcelのシリアル値（1900年日付システム）として扱います。
fn cell_date(cell: &Data) -> RequestDate {
    let serial = |value: f64| match excel_serial_to_datetime(value) {
        Some(datetime) => RequestDate::Date(datetime.date()),
        None => RequestDate::Malformed(value.to_string()),
    };

    match cell {
        Data::Empty | Data::Error(_) => RequestDate::Absent,
        Data::DateTime(dt) => serial(dt.as_f64()),
        Data::Int(i) => serial(*i as f64),
        Data::Float(f) => serial(*f),
        Data::String(s) | Data::DateTimeIso(s) => {
            if s.trim().is_empty() {
                RequestDate::Absent
            } else {
                parse_date(s)
                    .map(RequestDate::Date)
                    .unwrap_or_else(|| RequestDate::Malformed(s.clone()))
            }
        }
        other => RequestDate::Malformed(cell_text(other)),
    }
}
