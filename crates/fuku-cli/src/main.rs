use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fuku_core::app::{CircuitBreaker, RunContext, Scheduler, assemble_pool};
use fuku_core::catalog;
use fuku_core::config::Config;
use fuku_core::domain::Account;
use fuku_core::ports::{SystemClock, ThreadRandom};
use fuku_core::retry::RetryPolicy;

mod ai;
mod check;
mod client;
mod notify;

use client::{BiliClient, BiliExecutor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("fuku_core=info".parse()?)
                .add_directive("fuku_cli=info".parse()?),
        )
        .init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "run".to_string());
    let config = Config::load(Path::new("config.json")).context("loading config.json")?;

    match mode.as_str() {
        "run" => run(config).await,
        "check" => check::check_wins(&config).await,
        other => anyhow::bail!("unknown command `{other}`; expected `run` or `check`"),
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let started = Instant::now();
    let clock = Arc::new(SystemClock);
    let ctx = RunContext::new(config, clock.clone());

    // (A) カタログを組み立てる
    let raw = std::fs::read_to_string(&ctx.config.file_paths.origin_urls)
        .with_context(|| format!("reading {}", ctx.config.file_paths.origin_urls.display()))?;
    let entries: Vec<String> = raw.lines().map(str::to_string).collect();
    let catalog = catalog::build(&entries);
    if !catalog.dropped.is_empty() {
        warn!(dropped = catalog.dropped.len(), "some entries were unparseable");
    }
    if catalog.tasks.is_empty() {
        info!("no tasks in the catalog, nothing to do");
        return Ok(());
    }
    info!(tasks = catalog.tasks.len(), "catalog built");

    // (B) アカウントごとにセッションを検証する
    let retry = RetryPolicy::default_http();
    let mut clients = HashMap::new();
    let mut accounts = Vec::new();
    for account_config in ctx.config.accounts.iter().filter(|a| a.enabled) {
        match BiliClient::connect(
            &account_config.cookie,
            &account_config.remark,
            retry.clone(),
            clock.clone(),
        )
        .await
        {
            Ok(client) => {
                clients.insert(account_config.remark.clone(), client);
                accounts.push(Account::from_config(account_config.clone()));
            }
            Err(e) => {
                error!(remark = account_config.remark.as_str(), error = %e, "account skipped");
            }
        }
    }
    if accounts.is_empty() {
        anyhow::bail!("no account passed cookie validation");
    }

    // (C) バックログを作ってスケジューラを回す
    let mut rng = ThreadRandom;
    let pool = assemble_pool(
        accounts,
        &catalog.tasks,
        &ctx.config.file_paths.database_dir,
        &mut rng,
    )?;
    if pool.is_empty() {
        info!("every account is already up to date");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let executor = BiliExecutor::new(clients, ctx.config.deepseek.clone(), ctx.delay_bounds());
    let breaker = CircuitBreaker::new(ctx.config.soft_failure_threshold);
    let mut scheduler = Scheduler::new(breaker, ctx.delay_bounds(), shutdown_rx);
    let summary = scheduler.run(&executor, &mut rng, pool).await;

    // (D) 集計を出して通知する
    let duration = started.elapsed();
    info!(
        crawled = summary.stats.crawled,
        liked = summary.stats.liked,
        reposted = summary.stats.reposted,
        followed = summary.stats.followed,
        commented = summary.stats.commented,
        failed = summary.stats.failed,
        seconds = duration.as_secs(),
        "run finished"
    );
    notify::send_run_report(&ctx.config.telegram, &summary, duration).await;

    Ok(())
}
