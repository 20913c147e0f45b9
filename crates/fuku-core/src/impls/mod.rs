//! Impls - 実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **ScriptedExecutor**: 缶詰の outcome を返す実行器。スケジューラの
//!   決定的なテストに使う
//!
//! # 本番用実装
//! 本番の実行器は HTTP クライアントを持つ側（fuku-cli）に置く。

pub mod scripted;

pub use self::scripted::ScriptedExecutor;
