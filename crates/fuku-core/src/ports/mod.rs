//! Ports - 抽象化レイヤー
//!
//! このモジュールは外部との継ぎ目になる trait を定義します。
//! 実行器（HTTP クライアント側）・時刻・乱数をここで差し替え可能にし、
//! スケジューラ本体を決定的にテストできるようにします。

pub mod clock;
pub mod executor;
pub mod rng;

pub use clock::{Clock, FixedClock, SystemClock};
pub use executor::TaskExecutor;
pub use rng::{RandomSource, SeededRandom, ThreadRandom};
