//! Bilibili client: the concrete executor behind the scheduler's port.
//!
//! One client per account (the cookie is the session). The scheduler never
//! sees this module; it only consumes the summarized `TaskOutcome`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use fuku_core::config::DeepseekConfig;
use fuku_core::domain::{Account, ActionKind, ActionResult, Task, TaskKind, TaskOutcome};
use fuku_core::ports::{Clock, TaskExecutor};
use fuku_core::retry::RetryPolicy;
use fuku_core::wbi;

use crate::ai;

const URL_NAV_INFO: &str = "https://api.bilibili.com/x/web-interface/nav";
const URL_FOLLOW: &str = "https://api.bilibili.com/x/relation/modify";
const URL_CHECK_FOLLOW: &str = "https://api.bilibili.com/x/relation";
const URL_LIKE_THUMB: &str = "https://api.vc.bilibili.com/dynamic_like/v1/dynamic_like/thumb";
const URL_REPOST_DYNAMIC: &str =
    "https://api.vc.bilibili.com/dynamic_repost/v1/dynamic_repost/repost";
const URL_CREATE_DYNAMIC: &str = "https://api.bilibili.com/x/dynamic/feed/create/dyn";
const URL_COMMENT: &str = "https://api.bilibili.com/x/v2/reply/add";
const URL_COMMENT_REPLY: &str = "https://api.bilibili.com/x/v2/reply/reply";
const URL_DYNAMIC_CONTENT: &str =
    "https://api.bilibili.com/x/polymer/web-dynamic/desktop/v1/detail";
const URL_VIDEO_DETAIL: &str = "https://api.bilibili.com/x/web-interface/view";
const URL_LIKE_VIDEO: &str = "https://api.bilibili.com/x/web-interface/archive/like";
const URL_CHECK_AT: &str = "https://api.bilibili.com/x/msgfeed/at";
const URL_CHECK_REPLY: &str = "https://api.bilibili.com/x/msgfeed/reply";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// What a follow-up status check says about a posted comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStatus {
    Normal,
    /// Removed outright shortly after posting.
    Deleted,
    /// Accepted, but visible only to the author: the soft failure the
    /// circuit breaker cares about.
    ShadowBanned,
}

/// Crawled facts about one target, enough to drive every action.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub author_mid: Option<i64>,
    pub author_name: String,
    pub text: String,
    pub comment_oid: Option<i64>,
    pub comment_type: i64,
    pub video_aid: Option<i64>,
}

/// One entry from a message feed (`@` or reply), used by the win check.
#[derive(Debug, Clone)]
pub struct FeedMessage {
    pub id: String,
    pub nickname: String,
    pub content: String,
    pub url: String,
}

pub struct BiliClient {
    http: reqwest::Client,
    /// Cookie-less twin, for the anonymous half of the comment status check.
    anon: reqwest::Client,
    pub remark: String,
    pub mid: i64,
    pub uname: String,
    csrf: String,
    img_key: String,
    sub_key: String,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl BiliClient {
    /// Build a session for one account and validate the cookie against the
    /// nav endpoint. Also picks up the current signing keys from the same
    /// response.
    pub async fn connect(
        cookie: &str,
        remark: &str,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let csrf = extract_bili_jct(cookie)
            .ok_or_else(|| anyhow::anyhow!("cookie for [{remark}] has no bili_jct field"))?;

        let http = reqwest::Client::builder()
            .default_headers(base_headers(Some(cookie))?)
            .timeout(Duration::from_secs(60))
            .build()?;
        let anon = reqwest::Client::builder()
            .default_headers(base_headers(None)?)
            .timeout(Duration::from_secs(60))
            .build()?;

        let mut client = Self {
            http,
            anon,
            remark: remark.to_string(),
            mid: 0,
            uname: String::new(),
            csrf,
            img_key: String::new(),
            sub_key: String::new(),
            retry,
            clock,
        };

        let data = client
            .get_json(URL_NAV_INFO, &[])
            .await
            .ok_or_else(|| anyhow::anyhow!("nav request failed for [{remark}]"))?;
        if data["code"] != 0 {
            anyhow::bail!(
                "cookie validation failed for [{remark}]: code={} message={}",
                data["code"],
                data["message"].as_str().unwrap_or("none")
            );
        }

        client.mid = data["data"]["mid"].as_i64().unwrap_or(0);
        client.uname = data["data"]["uname"].as_str().unwrap_or("unknown").to_string();
        client.img_key = key_from_url(data["data"]["wbi_img"]["img_url"].as_str());
        client.sub_key = key_from_url(data["data"]["wbi_img"]["sub_url"].as_str());
        if client.img_key.is_empty() || client.sub_key.is_empty() {
            warn!(remark, "signing keys unavailable; signed endpoints will be refused");
        }

        info!(
            remark,
            uname = client.uname.as_str(),
            mid = client.mid,
            "cookie validated"
        );
        Ok(client)
    }

    fn has_signing_keys(&self) -> bool {
        !self.img_key.is_empty() && !self.sub_key.is_empty()
    }

    /// Send with transport-level retries, returning the decoded JSON body.
    /// A non-zero API code is logged here but returned for the caller to
    /// interpret; a JSON decode failure is not retried.
    async fn send_json(&self, request: reqwest::RequestBuilder, url: &str) -> Option<Value> {
        for attempt in 1..=self.retry.max_attempts {
            let Some(cloned) = request.try_clone() else {
                break;
            };
            match cloned.send().await {
                Ok(response) => match response.json::<Value>().await {
                    Ok(body) => {
                        if body["code"] != 0 {
                            debug!(
                                remark = self.remark.as_str(),
                                url,
                                code = body["code"].as_i64().unwrap_or(-1),
                                message = body["message"].as_str().unwrap_or(""),
                                "api returned an error code"
                            );
                        }
                        return Some(body);
                    }
                    Err(e) => {
                        error!(remark = self.remark.as_str(), url, error = %e, "response was not JSON");
                        return None;
                    }
                },
                Err(e) => {
                    warn!(
                        remark = self.remark.as_str(),
                        url,
                        attempt,
                        max = self.retry.max_attempts,
                        error = %e,
                        "transport error"
                    );
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.next_delay(attempt)).await;
                    }
                }
            }
        }
        None
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Option<Value> {
        self.send_json(self.http.get(url).query(params), url).await
    }

    async fn post_form(&self, url: &str, form: &[(&str, String)]) -> Option<Value> {
        self.send_json(self.http.post(url).form(form), url).await
    }

    pub async fn follow_user(&self, target_mid: i64) -> ActionResult {
        let form = [
            ("fid", target_mid.to_string()),
            ("act", "1".to_string()),
            ("re_src", "11".to_string()),
            ("csrf", self.csrf.clone()),
        ];
        api_result(self.post_form(URL_FOLLOW, &form).await, "followed")
    }

    /// Relation attribute: 0 none, 2 following, 6 mutual, 128 blacklisted.
    pub async fn follow_attribute(&self, target_mid: i64) -> Option<i64> {
        let params = [
            ("fid", target_mid.to_string()),
            ("mid", self.mid.to_string()),
        ];
        let data = self.get_json(URL_CHECK_FOLLOW, &params).await?;
        if data["code"] != 0 {
            return None;
        }
        data["data"]["attribute"].as_i64()
    }

    pub async fn like_dynamic(&self, dynamic_id: &str) -> ActionResult {
        let form = [
            ("dynamic_id", dynamic_id.to_string()),
            ("optype", "1".to_string()),
            ("csrf_token", self.csrf.clone()),
            ("csrf", self.csrf.clone()),
        ];
        api_result(self.post_form(URL_LIKE_THUMB, &form).await, "liked")
    }

    pub async fn like_video(&self, aid: i64) -> ActionResult {
        let form = [
            ("aid", aid.to_string()),
            ("like", "1".to_string()),
            ("csrf", self.csrf.clone()),
        ];
        api_result(self.post_form(URL_LIKE_VIDEO, &form).await, "liked")
    }

    /// Post a comment. The endpoint verifies a `w_rid` signature over the
    /// query parameters; without keys the call is refused locally.
    /// Returns the reply id on success so the status check can find it.
    pub async fn comment(
        &self,
        oid: i64,
        comment_type: i64,
        message: &str,
    ) -> (ActionResult, Option<i64>) {
        if !self.has_signing_keys() {
            return (ActionResult::failed("signing keys unavailable"), None);
        }

        let mut params: BTreeMap<String, String> = BTreeMap::new();
        params.insert("plat".to_string(), "1".to_string());
        params.insert("oid".to_string(), oid.to_string());
        params.insert("type".to_string(), comment_type.to_string());
        params.insert("message".to_string(), message.to_string());
        params.insert("gaia_source".to_string(), "main_web".to_string());
        params.insert("csrf".to_string(), self.csrf.clone());
        params.insert(
            "statistics".to_string(),
            json!({"appId": 1, "platform": 3, "version": "2.38.0", "abtest": ""}).to_string(),
        );
        let signed = wbi::sign(
            params,
            &self.img_key,
            &self.sub_key,
            self.clock.unix_timestamp(),
        );
        let query: Vec<(String, String)> = signed.into_iter().collect();

        let data = self
            .send_json(self.http.post(URL_COMMENT).query(&query), URL_COMMENT)
            .await;
        match data {
            Some(body) if body["code"] == 0 => {
                let rpid = body["data"]["rpid"].as_i64();
                (ActionResult::ok("commented"), rpid)
            }
            Some(body) if body["code"] == 12015 => {
                (ActionResult::failed("comment blocked by captcha"), None)
            }
            Some(body) => (
                ActionResult::failed(body["message"].as_str().unwrap_or("unknown error")),
                None,
            ),
            None => (ActionResult::failed("request failed, no data"), None),
        }
    }

    pub async fn repost_dynamic(&self, dynamic_id: &str, content: &str) -> ActionResult {
        let form = [
            ("dynamic_id", dynamic_id.to_string()),
            ("content", content.to_string()),
            ("type", "4".to_string()),
            ("csrf_token", self.csrf.clone()),
            ("csrf", self.csrf.clone()),
        ];
        api_result(self.post_form(URL_REPOST_DYNAMIC, &form).await, "reposted")
    }

    pub async fn repost_video(&self, aid: i64, content: &str) -> ActionResult {
        let payload = json!({
            "dyn_req": {
                "content": { "contents": [{ "raw_text": content, "type": 1 }] },
                "scene": 5
            },
            "web_repost_src": { "revs_id": { "dyn_type": 8, "rid": aid } }
        });
        let request = self
            .http
            .post(URL_CREATE_DYNAMIC)
            .query(&[("csrf", self.csrf.clone())])
            .json(&payload);
        api_result(self.send_json(request, URL_CREATE_DYNAMIC).await, "reposted")
    }

    /// Fetch a dynamic's detail page and flatten the module list.
    pub async fn fetch_dynamic_detail(&self, dynamic_id: &str) -> Result<Target, String> {
        let params = [("id", dynamic_id.to_string())];
        let data = self
            .get_json(URL_DYNAMIC_CONTENT, &params)
            .await
            .ok_or_else(|| "request failed, no data".to_string())?;
        if data["code"] != 0 {
            return Err(api_error(&data));
        }

        let mut target = Target {
            comment_type: 11,
            ..Target::default()
        };
        let modules = data["data"]["item"]["modules"].as_array().cloned().unwrap_or_default();
        for module in &modules {
            match module["module_type"].as_str().unwrap_or("") {
                "MODULE_TYPE_DESC" => {
                    if let Some(nodes) = module["module_desc"]["rich_text_nodes"].as_array() {
                        for node in nodes {
                            let piece = node["text"]
                                .as_str()
                                .or_else(|| node["orig_text"].as_str())
                                .unwrap_or("");
                            target.text.push_str(piece);
                        }
                    }
                }
                "MODULE_TYPE_STAT" => {
                    let comment = &module["module_stat"]["comment"];
                    target.comment_oid = as_i64_lenient(&comment["comment_id"]);
                    if let Some(t) = as_i64_lenient(&comment["comment_type"]) {
                        target.comment_type = t;
                    }
                }
                "MODULE_TYPE_AUTHOR" => {
                    let user = &module["module_author"]["user"];
                    target.author_mid = user["mid"].as_i64();
                    target.author_name = user["name"].as_str().unwrap_or("").to_string();
                }
                "MODULE_TYPE_DYNAMIC" => {
                    if module["module_dynamic"]["type"] == "MDL_DYN_TYPE_ARCHIVE" {
                        target.video_aid =
                            as_i64_lenient(&module["module_dynamic"]["dyn_archive"]["aid"]);
                    }
                }
                _ => {}
            }
        }
        Ok(target)
    }

    /// Fetch a video's detail; comments on videos target the aid directly.
    pub async fn fetch_video_detail(&self, bvid: &str) -> Result<Target, String> {
        let params = [("bvid", bvid.to_string())];
        let data = self
            .get_json(URL_VIDEO_DETAIL, &params)
            .await
            .ok_or_else(|| "request failed, no data".to_string())?;
        if data["code"] != 0 {
            return Err(api_error(&data));
        }

        let video = &data["data"];
        let aid = video["aid"].as_i64();
        Ok(Target {
            author_mid: video["owner"]["mid"].as_i64(),
            author_name: video["owner"]["name"].as_str().unwrap_or("").to_string(),
            text: format!(
                "标题:{}\n简介:{}",
                video["title"].as_str().unwrap_or(""),
                video["desc"].as_str().unwrap_or("")
            ),
            comment_oid: aid,
            comment_type: 1,
            video_aid: aid,
        })
    }

    /// Follow-up visibility check for a posted comment: read the reply
    /// thread once with this session and once anonymously. Code 12022 means
    /// "thread gone" — from the author's own session that is deletion, from
    /// an anonymous session it means the comment exists only for its author.
    pub async fn comment_status(
        &self,
        oid: i64,
        comment_type: i64,
        rpid: i64,
    ) -> Option<CommentStatus> {
        let params = [
            ("oid", oid.to_string()),
            ("type", comment_type.to_string()),
            ("root", rpid.to_string()),
            ("ps", "1".to_string()),
            ("pn", "1".to_string()),
        ];

        let authed = self
            .send_json(self.http.get(URL_COMMENT_REPLY).query(&params), URL_COMMENT_REPLY)
            .await?;
        if authed["code"] == 12022 {
            return Some(CommentStatus::Deleted);
        }

        let anon = self
            .send_json(self.anon.get(URL_COMMENT_REPLY).query(&params), URL_COMMENT_REPLY)
            .await?;
        if anon["code"] == 12022 {
            return Some(CommentStatus::ShadowBanned);
        }
        Some(CommentStatus::Normal)
    }

    /// `@` or reply feed, flattened for the win check.
    pub async fn message_feed(&self, feed: MessageFeed) -> Option<Vec<FeedMessage>> {
        let url = match feed {
            MessageFeed::At => URL_CHECK_AT,
            MessageFeed::Reply => URL_CHECK_REPLY,
        };
        let data = self.get_json(url, &[]).await?;
        if data["code"] != 0 {
            error!(
                remark = self.remark.as_str(),
                feed = feed.as_str(),
                message = data["message"].as_str().unwrap_or("unknown error"),
                "message feed fetch failed"
            );
            return None;
        }

        let items = data["data"]["items"].as_array().cloned().unwrap_or_default();
        let messages = items
            .iter()
            .filter_map(|item| {
                let id = as_i64_lenient(&item["id"])?;
                Some(FeedMessage {
                    id: id.to_string(),
                    nickname: item["user"]["nickname"].as_str().unwrap_or("unknown").to_string(),
                    content: item["item"]["source_content"].as_str().unwrap_or("").to_string(),
                    url: item["item"]["uri"].as_str().unwrap_or("").to_string(),
                })
            })
            .collect();
        Some(messages)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFeed {
    At,
    Reply,
}

impl MessageFeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFeed::At => "at",
            MessageFeed::Reply => "reply",
        }
    }
}

fn base_headers(cookie: Option<&str>) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert("User-Agent", HeaderValue::from_static(USER_AGENT));
    headers.insert("Referer", HeaderValue::from_static("https://www.bilibili.com/"));
    headers.insert("Origin", HeaderValue::from_static("https://www.bilibili.com"));
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    if let Some(cookie) = cookie {
        headers.insert(
            "Cookie",
            HeaderValue::from_str(cookie).map_err(|_| anyhow::anyhow!("cookie is not a valid header value"))?,
        );
    }
    Ok(headers)
}

/// Pull the CSRF token out of the cookie string.
pub fn extract_bili_jct(cookie: &str) -> Option<String> {
    cookie.split(';').find_map(|part| {
        let (name, value) = part.trim().split_once('=')?;
        (name == "bili_jct" && !value.is_empty()).then(|| value.trim().to_string())
    })
}

/// `https://i0.hdslb.com/bfs/wbi/<key>.png` -> `<key>`
fn key_from_url(url: Option<&str>) -> String {
    url.and_then(|u| u.rsplit('/').next())
        .and_then(|name| name.split('.').next())
        .unwrap_or("")
        .to_string()
}

fn as_i64_lenient(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn api_error(body: &Value) -> String {
    format!(
        "code={} message={}",
        body["code"].as_i64().unwrap_or(-1),
        body["message"].as_str().unwrap_or("unknown error")
    )
}

fn api_result(data: Option<Value>, success: &str) -> ActionResult {
    match data {
        Some(body) if body["code"] == 0 => ActionResult::ok(success),
        Some(body) => ActionResult::failed(
            body["message"].as_str().unwrap_or("unknown error").to_string(),
        ),
        None => ActionResult::failed("request failed, no data"),
    }
}

/// The production executor: one validated client per account, plus the
/// comment-material knobs the actions need.
pub struct BiliExecutor {
    clients: HashMap<String, BiliClient>,
    ai_http: reqwest::Client,
    deepseek: DeepseekConfig,
    /// Pause bounds between actions within one task, seconds.
    delay_bounds: (f64, f64),
}

impl BiliExecutor {
    pub fn new(
        clients: HashMap<String, BiliClient>,
        deepseek: DeepseekConfig,
        delay_bounds: (f64, f64),
    ) -> Self {
        Self {
            clients,
            ai_http: reqwest::Client::new(),
            deepseek,
            delay_bounds,
        }
    }

    async fn pause(&self) {
        let (min, max) = self.delay_bounds;
        let secs = if min >= max {
            min
        } else {
            rand::thread_rng().gen_range(min..=max)
        };
        if secs > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
        }
    }

    /// Pick the comment text: AI first when configured, fixed list as the
    /// fallback, emoticon suffix either way.
    async fn comment_content(&self, account: &Account, target_text: &str) -> Option<String> {
        let cfg = &account.config;
        let generated = if cfg.ai_comment && !self.deepseek.deepseek_api_key.is_empty() {
            ai::generate_comment(&self.ai_http, &self.deepseek, target_text).await
        } else {
            None
        };
        let mut content = generated.or_else(|| pick(&cfg.fixed_comments))?;
        if let Some(emoticon) = pick(&cfg.emoticons) {
            content.push_str(&emoticon);
        }
        Some(content)
    }
}

fn pick(choices: &[String]) -> Option<String> {
    choices.choose(&mut rand::thread_rng()).cloned()
}

#[async_trait]
impl TaskExecutor for BiliExecutor {
    async fn execute(&self, task: &Task, account: &Account) -> TaskOutcome {
        let Some(client) = self.clients.get(&account.remark) else {
            return TaskOutcome::crawl_failed("no validated session for this account");
        };

        let crawled = match task.kind {
            TaskKind::Dynamic => client.fetch_dynamic_detail(&task.id).await,
            TaskKind::Video => client.fetch_video_detail(&task.id).await,
        };
        let target = match crawled {
            Ok(target) => target,
            Err(detail) => return TaskOutcome::crawl_failed(detail),
        };

        let mut outcome = TaskOutcome::crawled();
        let flags = &account.config;

        if flags.follow_enabled {
            if let Some(author_mid) = target.author_mid {
                match client.follow_attribute(author_mid).await {
                    Some(128) => {
                        // Blacklisted author: nothing else is worth doing here.
                        outcome.set_action(
                            ActionKind::Follow,
                            ActionResult::ok("author blacklisted, remaining actions skipped"),
                        );
                        return outcome;
                    }
                    Some(2) | Some(6) => {
                        outcome.set_action(ActionKind::Follow, ActionResult::ok("already following"));
                    }
                    Some(0) => {
                        outcome.set_action(ActionKind::Follow, client.follow_user(author_mid).await);
                    }
                    Some(attribute) => {
                        debug!(
                            remark = account.remark.as_str(),
                            attribute, "unrecognized relation attribute, leaving it alone"
                        );
                    }
                    None => {
                        outcome.set_action(
                            ActionKind::Follow,
                            ActionResult::failed("relation check failed"),
                        );
                    }
                }
            } else {
                outcome.set_action(ActionKind::Follow, ActionResult::failed("author mid missing"));
            }
            self.pause().await;
        }

        if flags.like_enabled {
            let result = match (task.kind, target.video_aid) {
                (TaskKind::Video, Some(aid)) => client.like_video(aid).await,
                (TaskKind::Video, None) => ActionResult::failed("video aid missing"),
                (TaskKind::Dynamic, _) => client.like_dynamic(&task.id).await,
            };
            outcome.set_action(ActionKind::Like, result);
            self.pause().await;
        }

        let mut comment_text: Option<String> = None;
        if flags.comment_enabled {
            match self.comment_content(account, &target.text).await {
                Some(content) => match target.comment_oid {
                    Some(oid) => {
                        let (result, rpid) =
                            client.comment(oid, target.comment_type, &content).await;
                        let posted = result.succeeded;
                        outcome.set_action(ActionKind::Comment, result);
                        if posted {
                            comment_text = Some(content);
                            if let Some(rpid) = rpid {
                                self.pause().await;
                                if client.comment_status(oid, target.comment_type, rpid).await
                                    == Some(CommentStatus::ShadowBanned)
                                {
                                    warn!(
                                        remark = account.remark.as_str(),
                                        task = %task,
                                        rpid,
                                        "comment accepted but only visible to the author"
                                    );
                                    outcome.soft_failure_detected = true;
                                }
                            }
                        }
                    }
                    None => {
                        outcome.set_action(
                            ActionKind::Comment,
                            ActionResult::failed("comment oid missing"),
                        );
                    }
                },
                None => {
                    debug!(
                        remark = account.remark.as_str(),
                        "no comment material configured, skipping comment"
                    );
                }
            }
            self.pause().await;
        }

        if flags.repost_enabled {
            let content = comment_text
                .or_else(|| {
                    if flags.use_fixed_repost {
                        pick(&flags.fixed_reposts)
                    } else {
                        None
                    }
                })
                .unwrap_or_else(|| "转发动态".to_string());
            let result = match (task.kind, target.video_aid) {
                (TaskKind::Video, Some(aid)) => client.repost_video(aid, &content).await,
                (TaskKind::Video, None) => ActionResult::failed("video aid missing"),
                (TaskKind::Dynamic, _) => client.repost_dynamic(&task.id, &content).await,
            };
            outcome.set_action(ActionKind::Repost, result);
            self.pause().await;
        }

        outcome
    }
}
