//! Telegram run report.
//!
//! One HTML message per run: the counters, the duration and the first few
//! failures. Unconfigured or disabled telegram sections log and return;
//! the run itself never fails because a notification could not be sent.

use std::time::Duration;

use serde_json::json;
use tracing::{error, info, warn};

use fuku_core::config::TelegramConfig;
use fuku_core::domain::{FailureRecord, RunStats, RunSummary};

const TELEGRAM_BOT_API: &str = "https://api.telegram.org/bot";
const MAX_FAILURES_SHOWN: usize = 10;

pub async fn send_run_report(config: &TelegramConfig, summary: &RunSummary, duration: Duration) {
    if !config.enable {
        info!("telegram notification disabled");
        return;
    }
    if config.bot_token.is_empty() || config.chat_id.is_empty() {
        warn!("telegram bot_token or chat_id missing, skipping notification");
        return;
    }

    let text = build_message(&summary.stats, duration, &summary.failures);
    let payload = json!({
        "chat_id": config.chat_id,
        "text": text,
        "parse_mode": "HTML",
        "disable_web_page_preview": false,
    });

    let url = format!("{TELEGRAM_BOT_API}{}/sendMessage", config.bot_token);
    let response = reqwest::Client::new()
        .post(&url)
        .json(&payload)
        .timeout(Duration::from_secs(30))
        .send()
        .await;

    match response {
        Ok(response) => match response.json::<serde_json::Value>().await {
            Ok(body) if body["ok"] == true => {
                info!(
                    message_id = body["result"]["message_id"].as_i64().unwrap_or(-1),
                    "telegram notification sent"
                );
            }
            Ok(body) => {
                error!(
                    code = body["error_code"].as_i64().unwrap_or(-1),
                    description = body["description"].as_str().unwrap_or("none"),
                    "telegram api returned an error"
                );
            }
            Err(e) => error!(error = %e, "telegram response was not JSON"),
        },
        Err(e) => error!(error = %e, "telegram request failed"),
    }
}

pub fn build_message(stats: &RunStats, duration: Duration, failures: &[FailureRecord]) -> String {
    let minutes = duration.as_secs() / 60;
    let seconds = duration.as_secs() % 60;

    let mut message = format!(
        "<strong>本轮任务报告</strong>\n\n\
         📊 <b>操作统计：</b>\n\
         • 爬取成功：{}次\n\
         • 点赞成功：{}次\n\
         • 转发成功：{}次\n\
         • 关注成功：{}次\n\
         • 评论成功：{}次\n\
         • 失败总数：{}次\n\n\
         • 用时：{}分{}秒\n\n",
        stats.crawled,
        stats.liked,
        stats.reposted,
        stats.followed,
        stats.commented,
        stats.failed,
        minutes,
        seconds,
    );

    if failures.is_empty() {
        message.push_str("所有操作都顺利完成啦！");
        return message;
    }

    message.push_str("<b>需要关注的异常详情：</b>\n");
    for (i, failure) in failures.iter().take(MAX_FAILURES_SHOWN).enumerate() {
        message.push_str(&format!(
            "{}. 账号[{}] {}\n   ➤ 目标：<a href='{}'>{}</a>\n   ➤ 详情：{}\n\n",
            i + 1,
            escape_html(&failure.account),
            escape_html(&failure.reason),
            failure.target,
            escape_html(truncate(&failure.target, 80)),
            escape_html(truncate(&failure.detail, 150)),
        ));
    }
    if failures.len() > MAX_FAILURES_SHOWN {
        message.push_str(&format!(
            "... 还有 {} 条失败详情，请查看日志\n",
            failures.len() - MAX_FAILURES_SHOWN
        ));
    }
    message
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
