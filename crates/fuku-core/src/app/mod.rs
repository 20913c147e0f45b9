//! App - アプリケーション層
//!
//! ports を組み合わせて実行ロジックを構成します。
//!
//! # 主要コンポーネント
//! - **RunContext**: 起動時に一度だけ構築する明示的な実行コンテキスト
//! - **bootstrap**: アカウントごとのストア初期化とバックログ組み立て
//! - **backlog**: カタログ − 履歴 → シャッフル済みキュー
//! - **CircuitBreaker**: ソフト失敗のしきい値で口座を打ち切る
//! - **Scheduler**: アカウント横断のタスク実行ループ

pub mod backlog;
pub mod bootstrap;
pub mod breaker;
pub mod context;
pub mod scheduler;

pub use self::bootstrap::assemble_pool;
pub use self::breaker::CircuitBreaker;
pub use self::context::RunContext;
pub use self::scheduler::{AccountWorker, Scheduler};
