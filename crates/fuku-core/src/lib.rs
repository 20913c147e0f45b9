//! fuku-core
//!
//! Core building blocks for the Fuku runtime: a multi-account scheduler that
//! works through a backlog of giveaway posts, one task at a time, with a
//! durable per-account history so re-runs never repeat delivered work.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（task, account, outcome, report, errors）
//! - **ports**: 抽象化レイヤー（Clock, RandomSource, TaskExecutor）
//! - **app**: アプリケーションロジック（context, bootstrap, backlog, breaker, scheduler）
//! - **store**: アカウント別 SQLite 履歴ストア
//! - **impls**: 実装（ScriptedExecutor など開発・テスト用）
//! - **catalog**: URL リスト → タスク一覧
//! - **wbi**: リクエスト署名
//! - **config / retry**: 設定モデルとリトライポリシー

pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod retry;
pub mod store;
pub mod wbi;
