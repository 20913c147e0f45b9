//! DeepSeek comment generation.
//!
//! Best effort: any failure returns `None` and the caller falls back to the
//! account's fixed comment list. The generated text is scrubbed of quotes,
//! parentheticals, mentions and hashtags before use.

use serde_json::{Value, json};
use tracing::{debug, error};

use fuku_core::config::DeepseekConfig;

const SYSTEM_PROMPT: &str = "# 身份\n\
你是一名B站用户，看到喜欢的UP主发起了抽奖动态，希望留言参与\n\
# 核心目标\n\
生成一条自然、真诚、不暴露抽奖目的的评论\n\
# 规则清单\n\
1. 如果动态中明确要求评论特定内容或回答问题，则你的评论内容需围绕该要求展开\n\
2. 否则评论内容只能围绕动态/视频内容本身或奖品本身展开\n\
3. 绝对禁止：描述自己的行为（我关注了、已三连）、提及抽奖相关词语、使用emoji\n\
4. 字数在 35-70 字之间，结尾可自然地加上一个可爱语气词\n\
# 输出\n\
直接输出最终评论，无需任何解释";

pub async fn generate_comment(
    http: &reqwest::Client,
    config: &DeepseekConfig,
    prompt: &str,
) -> Option<String> {
    if config.deepseek_api_key.is_empty() {
        return None;
    }

    let payload = json!({
        "model": config.deepseek_model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": prompt },
        ],
        "temperature": config.temperature,
        "max_tokens": 150,
    });

    let url = format!(
        "{}/v1/chat/completions",
        config.deepseek_base_url.trim_end_matches('/')
    );
    let response = match http
        .post(&url)
        .bearer_auth(&config.deepseek_api_key)
        .json(&payload)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "deepseek request failed");
            return None;
        }
    };

    let body: Value = match response.json().await {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "deepseek response was not JSON");
            return None;
        }
    };

    let content = extract_content(&body)?;
    let cleaned = scrub(&content);
    if cleaned.is_empty() {
        return None;
    }
    debug!(comment = cleaned.as_str(), "comment generated");
    Some(cleaned)
}

fn extract_content(body: &Value) -> Option<String> {
    let content = body["choices"][0]["message"]["content"].as_str()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        error!("deepseek returned an empty completion");
        return None;
    }
    Some(trimmed.to_string())
}

/// Strip quotes, parentheticals, mentions and hashtag pairs the model likes
/// to sneak in despite the prompt.
fn scrub(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' | '“' | '”' => {}
            '(' | '（' => {
                // Drop everything up to the matching close.
                for inner in chars.by_ref() {
                    if inner == ')' || inner == '）' {
                        break;
                    }
                }
            }
            '@' => {
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() {
                        break;
                    }
                    chars.next();
                }
            }
            '#' => {
                for inner in chars.by_ref() {
                    if inner == '#' {
                        break;
                    }
                }
            }
            other => out.push(other),
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_the_first_choice() {
        let body = json!({
            "choices": [{ "message": { "content": "  恭喜恭喜，画得真好呀  " } }],
            "usage": { "total_tokens": 30 }
        });
        assert_eq!(extract_content(&body).as_deref(), Some("恭喜恭喜，画得真好呀"));
    }

    #[test]
    fn missing_choices_is_none() {
        assert!(extract_content(&json!({"error": "rate limited"})).is_none());
        assert!(extract_content(&json!({"choices": []})).is_none());
    }

    #[test]
    fn scrub_removes_disallowed_fragments() {
        let raw = "\"真不错\"（小声）@某人 继续加油 #抽奖# 呀";
        assert_eq!(scrub(raw), "真不错 继续加油  呀");
    }

    #[test]
    fn scrub_keeps_plain_text_untouched() {
        assert_eq!(scrub("这期视频做得太用心了叭"), "这期视频做得太用心了叭");
    }
}
