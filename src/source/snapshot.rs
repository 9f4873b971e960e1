//! CSV snapshot source
//!
//! `REPORT_STATISTICS`テーブルをCSVにエクスポートしたファイルを候補の取得元として扱う。
//! ヘッダー行には`RS_REPORT`などの列名が必要です（順序は任意）。

use std::io::Read;
use std::path::PathBuf;

use tracing::debug;

use super::{CandidateQuery, CandidateSource};
use crate::error::Result;
use crate::types::CandidateRecord;

#[derive(Debug, Clone)]
enum Snapshot {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// CSVスナップショットから候補レコードを読み込む取得元
///
/// `fetch`のたびにファイルを読み直し、クエリ条件を満たす行をファイル順に返します。
/// `RS_REPORT`以外の列が欠けている場合は空文字列として扱います。
///
/// # 使用例
///
/// ```rust,no_run
/// use reportcase::source::{CandidateQuery, CandidateSource, CsvSource};
///
/// # fn main() -> Result<(), reportcase::ReportCaseError> {
/// let source = CsvSource::from_path("report_statistics.csv");
/// let query = CandidateQuery::new(["nav"], ["F1"])?;
/// let records = source.fetch(&query)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CsvSource {
    snapshot: Snapshot,
    delimiter: u8,
}

impl CsvSource {
    /// ファイルパスから取得元を作る（ファイルは`fetch`時に開かれる）
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot: Snapshot::Path(path.into()),
            delimiter: b',',
        }
    }

    /// メモリ上のCSVデータから取得元を作る
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            snapshot: Snapshot::Bytes(bytes.into()),
            delimiter: b',',
        }
    }

    /// 区切り文字を指定する（デフォルト: `,`）
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder.delimiter(self.delimiter).trim(csv::Trim::Headers);
        builder
    }
}

impl CandidateSource for CsvSource {
    fn fetch(&self, query: &CandidateQuery) -> Result<Vec<CandidateRecord>> {
        match &self.snapshot {
            Snapshot::Path(path) => {
                debug!(path = %path.display(), "reading candidate snapshot");
                read_admitted(self.builder().from_path(path)?, query)
            }
            Snapshot::Bytes(bytes) => read_admitted(self.builder().from_reader(bytes.as_slice()), query),
        }
    }
}

fn read_admitted<R: Read>(
    mut reader: csv::Reader<R>,
    query: &CandidateQuery,
) -> Result<Vec<CandidateRecord>> {
    let mut admitted = Vec::new();
    let mut total = 0usize;

    for row in reader.deserialize::<CandidateRecord>() {
        let record = row?;
        total += 1;
        if query.admits(&record) {
            admitted.push(record);
        }
    }

    debug!(total, admitted = admitted.len(), "filtered candidate snapshot");
    Ok(admitted)
}
