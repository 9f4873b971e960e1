//! Archive staging and writing
//!
//! エントリは追加順に保持され、`write_to`でまとめてZIPに書き出されます。
//! 更新時刻は固定値（1980-01-01）のため、同じ入力からは同じバイト列が生成されます。

use std::collections::HashMap;
use std::io::{Seek, Write};

use tracing::{debug, warn};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::api::{CollisionPolicy, Compression};
use crate::error::Result;
use crate::render::RenderedDocument;
use crate::security::{sanitize_entry_name, validate_entry_name};

/// エントリを追加した結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// 新しいエントリとして追加された
    Added(String),

    /// 同名のエントリを上書きした
    Overwritten(String),

    /// 名前が衝突したため、連番付きの名前で追加された
    Renamed {
        /// 元の名前
        requested: String,
        /// 実際に使われた名前
        actual: String,
    },

    /// 安全な名前に書き換えられなかったため追加されなかった
    Rejected {
        /// 拒否された名前
        name: String,
        /// 拒否理由
        reason: String,
    },
}

#[derive(Debug, Clone)]
struct StagedEntry {
    name: String,
    body: String,
}

/// 出力アーカイブ
///
/// # 使用例
///
/// ```rust
/// use reportcase::output::{OutputArchive, StageOutcome};
/// use reportcase::render::RenderedDocument;
/// use reportcase::{CollisionPolicy, Compression};
/// use std::io::Cursor;
///
/// # fn main() -> Result<(), reportcase::ReportCaseError> {
/// let mut archive = OutputArchive::new(CollisionPolicy::Overwrite, Compression::Deflated);
/// let outcome = archive.stage(RenderedDocument {
///     name: "nav_F1_2024-01-03_10-15_1.xml".to_string(),
///     body: "<reportTestcase/>".to_string(),
/// });
/// assert!(matches!(outcome, StageOutcome::Added(_)));
///
/// let bytes = archive.write_to(Cursor::new(Vec::new()))?.into_inner();
/// assert!(!bytes.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OutputArchive {
    policy: CollisionPolicy,
    compression: Compression,
    entries: Vec<StagedEntry>,
    positions: HashMap<String, usize>,
    sanitized: usize,
}

impl OutputArchive {
    /// 空のアーカイブを作る
    pub fn new(policy: CollisionPolicy, compression: Compression) -> Self {
        Self {
            policy,
            compression,
            entries: Vec::new(),
            positions: HashMap::new(),
            sanitized: 0,
        }
    }

    /// ドキュメントをエントリとして追加する
    ///
    /// 危険な名前（絶対パス、`..`セグメント、`\`）は安全な名前に書き換えてから追加し、
    /// 書き換えた件数を`sanitized_count`で数えます。
    /// 同名のエントリが既にある場合は`CollisionPolicy`に従います。
    /// `Overwrite`では元の位置のまま本文だけが置き換わります。
    pub fn stage(&mut self, document: RenderedDocument) -> StageOutcome {
        let RenderedDocument { name, body } = document;

        let name = match validate_entry_name(&name) {
            Ok(()) => name,
            Err(reason) => match sanitize_entry_name(&name) {
                Some(safe) => {
                    warn!(entry = %name, actual = %safe, %reason, "sanitized archive entry name");
                    self.sanitized += 1;
                    safe
                }
                None => {
                    warn!(entry = %name, %reason, "rejecting archive entry");
                    return StageOutcome::Rejected { name, reason };
                }
            },
        };

        let Some(&position) = self.positions.get(&name) else {
            self.push(name.clone(), body);
            debug!(entry = %name, "staged archive entry");
            return StageOutcome::Added(name);
        };

        match self.policy {
            CollisionPolicy::Overwrite => {
                self.entries[position].body = body;
                debug!(entry = %name, "overwrote archive entry");
                StageOutcome::Overwritten(name)
            }
            CollisionPolicy::Disambiguate => {
                let actual = self.free_name(&name);
                self.push(actual.clone(), body);
                debug!(entry = %actual, requested = %name, "renamed colliding archive entry");
                StageOutcome::Renamed {
                    requested: name,
                    actual,
                }
            }
        }
    }

    /// エントリ名を追加順に返す
    pub fn entry_names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// エントリの本文を取得する
    pub fn get(&self, name: &str) -> Option<&str> {
        self.positions
            .get(name)
            .map(|&position| self.entries[position].body.as_str())
    }

    /// 名前を書き換えて追加したドキュメント数
    pub fn sanitized_count(&self) -> usize {
        self.sanitized
    }

    /// エントリ数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// エントリがないか
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// ZIPアーカイブとして書き出す
    ///
    /// # 引数
    ///
    /// * `writer` - 出力先（Write + Seekトレイトを実装）
    ///
    /// # 戻り値
    ///
    /// * `Ok(W)` - 書き込みに成功した場合、出力先を返す
    /// * `Err(ReportCaseError)` - I/OまたはZIPのエラーが発生した場合
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let method = match self.compression {
            Compression::Deflated => CompressionMethod::Deflated,
            Compression::Stored => CompressionMethod::Stored,
        };
        let options = FileOptions::default()
            .compression_method(method)
            .last_modified_time(zip::DateTime::default());

        let mut zip = ZipWriter::new(writer);
        for entry in &self.entries {
            zip.start_file(entry.name.as_str(), options)?;
            zip.write_all(entry.body.as_bytes())?;
        }

        Ok(zip.finish()?)
    }

    fn push(&mut self, name: String, body: String) {
        self.positions.insert(name.clone(), self.entries.len());
        self.entries.push(StagedEntry { name, body });
    }

    fn free_name(&self, name: &str) -> String {
        let stem = name.strip_suffix(".xml").unwrap_or(name);
        (2..)
            .map(|n| format!("{}-{}.xml", stem, n))
            .find(|candidate| !self.positions.contains_key(candidate))
            .unwrap_or_else(|| name.to_string())
    }
}
