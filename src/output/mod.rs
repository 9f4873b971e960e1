//! Output Archive Module
//!
//! 生成したドキュメントをエントリとして集め、ZIPアーカイブとして書き出すモジュール。

mod archive;

pub use archive::{OutputArchive, StageOutcome};
