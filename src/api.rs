//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

/// アップロードシートの選択方式
///
/// リクエスト表を読み込むシートを指定します。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SheetSelector {
    /// 先頭のシート（デフォルト）
    First,

    /// インデックス指定（0始まり）
    ///
    /// 例: `SheetSelector::Index(1)` は2番目のシートを選択
    Index(usize),

    /// シート名指定
    ///
    /// 例: `SheetSelector::Name("Requests".to_string())`
    Name(String),
}

/// パラメータ値と属性値の出力方式
///
/// 生成されるXMLドキュメントに値を埋め込む際の処理方法を指定します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum EscapeMode {
    /// 値をそのまま出力（デフォルト）
    ///
    /// 既存の生成結果とバイト単位で互換な出力になります。
    /// 値に `<` や `&` が含まれる場合、整形式のXMLにはなりません。
    Raw,

    /// XML特殊文字（`& < > " '`）をエスケープして出力
    ///
    /// # 出力例
    ///
    /// ```xml
    /// <parameter name="filter">
    ///     <value>a &lt; b</value>
    /// </parameter>
    /// ```
    Xml,
}

/// アーカイブ内でエントリ名が衝突した場合の処理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CollisionPolicy {
    /// 後から書かれたエントリが先のエントリを上書き（デフォルト）
    Overwrite,

    /// 衝突したエントリ名に連番を付与して両方を残す
    ///
    /// 例: `abc_F1_2024-01-03_10-00_1.xml` が既に存在する場合、
    /// `abc_F1_2024-01-03_10-00_1-2.xml` として書き込まれます。
    Disambiguate,
}

/// アーカイブエントリの圧縮方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Compression {
    /// Deflate圧縮（デフォルト）
    Deflated,

    /// 無圧縮
    Stored,
}
