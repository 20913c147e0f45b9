//! Lottery win check: sweep each account's reply and `@` feeds for the
//! configured win keywords.
//!
//! Already-seen message ids are suppressed through the same per-account
//! history store the scheduler uses, so every sweep only surfaces new
//! messages.

use std::time::Duration;

use rand::Rng;
use tracing::{error, info, warn};

use fuku_core::config::Config;
use fuku_core::ports::{Clock, SystemClock};
use fuku_core::retry::RetryPolicy;
use fuku_core::store::{HistoryStore, store_path_for};

use crate::client::{BiliClient, FeedMessage, MessageFeed};

pub async fn check_wins(config: &Config) -> anyhow::Result<()> {
    if config.win_keywords.is_empty() {
        anyhow::bail!("win_keywords is empty; nothing to look for");
    }
    info!(keywords = ?config.win_keywords, "checking for wins");

    let clock = std::sync::Arc::new(SystemClock) as std::sync::Arc<dyn Clock>;
    let mut found_any = false;

    for account in config.accounts.iter().filter(|a| a.enabled) {
        let client = match BiliClient::connect(
            &account.cookie,
            &account.remark,
            RetryPolicy::default_http(),
            clock.clone(),
        )
        .await
        {
            Ok(client) => client,
            Err(e) => {
                warn!(remark = account.remark.as_str(), error = %e, "cookie invalid, skipping");
                continue;
            }
        };

        let path = store_path_for(&config.file_paths.database_dir, &account.remark);
        let store = match HistoryStore::open(&path) {
            Ok(store) => store,
            Err(e) => {
                error!(remark = account.remark.as_str(), error = %e, "history store unavailable");
                continue;
            }
        };

        let mut fresh: Vec<(MessageFeed, FeedMessage)> = Vec::new();
        for feed in [MessageFeed::Reply, MessageFeed::At] {
            let Some(messages) = client.message_feed(feed).await else {
                continue;
            };
            for message in messages {
                if store.exists(&message.id) {
                    continue;
                }
                if let Err(e) = store.insert(&message.id, feed.as_str()) {
                    error!(remark = account.remark.as_str(), error = %e, "failed to record message id");
                }
                fresh.push((feed, message));
            }
        }

        if fresh.is_empty() {
            info!(remark = account.remark.as_str(), "no new messages");
        }

        let mut found_for_account = false;
        for (feed, message) in &fresh {
            if let Some(keyword) = config
                .win_keywords
                .iter()
                .find(|k| message.content.contains(k.as_str()))
            {
                warn!(
                    remark = account.remark.as_str(),
                    feed = feed.as_str(),
                    keyword = keyword.as_str(),
                    from = message.nickname.as_str(),
                    content = message.content.as_str(),
                    url = message.url.as_str(),
                    "possible win!"
                );
                found_for_account = true;
                found_any = true;
            }
        }
        if !found_for_account && !fresh.is_empty() {
            info!(remark = account.remark.as_str(), new_messages = fresh.len(), "no win keywords matched");
        }

        // Unhurried sweep: a couple of seconds between accounts.
        let secs = rand::thread_rng().gen_range(2.0..=5.0);
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    if !found_any {
        info!("no new win messages on any account");
    }
    Ok(())
}
