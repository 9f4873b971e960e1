//! Security Module
//!
//! セキュリティ対策を実装するモジュール。
//! アップロードサイズの制限と、アーカイブのエントリ名に対するパストラバーサル対策を提供します。

/// セキュリティ設定
///
/// ファイル処理時のセキュリティ制限を定義します。
#[derive(Debug, Clone)]
pub(crate) struct SecurityConfig {
    /// アップロードファイルの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_upload_size: u64,
    /// リクエスト行の最大数
    /// デフォルト: 100000
    pub max_request_rows: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 104_857_600, // 100MB
            max_request_rows: 100_000,
        }
    }
}

/// アーカイブのエントリ名の検証
///
/// エントリ名はアップロードされた値（レポート名・ファンド）から作られるため、
/// 展開時にアーカイブ外へ書き込まれる名前を拒否します。
/// `..`は`/`で区切ったセグメント全体が`..`の場合のみ拒否されます（`nav..v2`は許可）。
///
/// # 引数
///
/// * `name` - 検証するエントリ名
///
/// # 戻り値
///
/// * `Ok(())` - 名前が安全な場合
/// * `Err(String)` - 名前が危険な場合（`..`セグメントや絶対パスを含む）
pub(crate) fn validate_entry_name(name: &str) -> Result<(), String> {
    // 空の名前は拒否
    if name.is_empty() {
        return Err("Empty entry name is not allowed".to_string());
    }

    // 絶対パスを拒否（Windows形式の`C:\`やUnix形式の`/`で始まるパス）
    if name.starts_with('/') || name.starts_with("C:\\") || name.starts_with("c:\\") {
        return Err(format!("Absolute path is not allowed: {}", name));
    }

    // `\`を含む名前を拒否（Windows形式のパスセパレータ）
    if name.contains('\\') {
        return Err(format!("Backslash in entry name is not allowed: {}", name));
    }

    // `..`セグメントを拒否（ディレクトリトラバーサル攻撃）
    if name.split('/').any(|segment| segment == "..") {
        return Err(format!("Path traversal detected: {}", name));
    }

    Ok(())
}

/// 危険なエントリ名を安全な名前に書き換える
///
/// `\`は`_`に置き換え、先頭の`/`と空のセグメントを取り除き、
/// `.`と`..`のセグメントは`_`に置き換えます。
/// 結果が空になった場合は`None`を返します。
pub(crate) fn sanitize_entry_name(name: &str) -> Option<String> {
    let replaced = name.replace('\\', "_");
    let segments: Vec<&str> = replaced
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment {
            "." | ".." => "_",
            other => other,
        })
        .collect();

    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}
