//! Errors - エラー型

/// FukuError はコアのエラー型
///
/// # 分類
/// - Config / ConfigParse: 起動時に致命的（fail-fast）
/// - Storage / Io: 履歴ストア関連。読み取りは呼び出し側で fail-open に扱う
/// - NoUsableStore: 全アカウントでストア初期化に失敗（実行開始前に中断）
#[derive(Debug, thiserror::Error)]
pub enum FukuError {
    #[error("config: {0}")]
    Config(String),

    #[error("config parse: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("storage: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("no usable history store for any account")]
    NoUsableStore,
}
