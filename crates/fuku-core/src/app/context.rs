//! RunContext - 実行コンテキスト
//!
//! 設定と時計をまとめ、プロセス起動時に一度だけ構築して各コンポーネントへ
//! 参照で渡す。モジュールレベルの可変グローバルは持たない。

use std::sync::Arc;

use crate::config::Config;
use crate::ports::Clock;

pub struct RunContext {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
}

impl RunContext {
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// Pause bounds between tasks, in seconds.
    pub fn delay_bounds(&self) -> (f64, f64) {
        (
            self.config.action_delay_min_seconds,
            self.config.action_delay_max_seconds,
        )
    }
}
