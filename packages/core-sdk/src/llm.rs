use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;

use crate::models::{GenerateResponse, Message};

const API_KEY_HEADER: &str = "x-goog-api-key";

/**
 * \brief 文本生成能力：给定模型名与提示词，返回带文本字段的响应。
 */
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate_content(&self, model: &str, prompt: &str) -> Result<GenerateResponse>;
}

/**
 * \brief Gemini generateContent 接口的 HTTP 客户端。
 */
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiClient {
    /**
     * \brief 创建客户端。
     * \param api_base API 基地址，缺少版本段时自动补 /v1beta
     * \param api_key  API Key，不可为空
     */
    pub fn new(api_base: &str, api_key: &str) -> Result<Self> {
        if api_key.is_empty() {
            return Err(anyhow!("gemini api key is empty"));
        }
        let http = reqwest::Client::builder()
            .build()
            .context("build http client failed")?;
        Ok(Self {
            http,
            api_base: normalize_gemini_base(api_base),
            api_key: api_key.to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /**
     * \brief 多轮对话调用，system 消息合并为 system_instruction。
     */
    pub async fn chat(&self, model: &str, messages: &[Message]) -> Result<GenerateResponse> {
        let (system_prompt, contents) = gemini_payload(messages);
        let mut body = json!({
            "contents": contents,
        });
        if let Some(sys) = system_prompt {
            body["system_instruction"] = json!({
                "parts": [{"text": sys}]
            });
        }
        self.post_generate(model, &body).await
    }

    async fn post_generate(&self, model: &str, body: &Value) -> Result<GenerateResponse> {
        let url = format!("{}/models/{}:generateContent", self.api_base, model);
        let resp = self
            .http
            .post(url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(body)
            .send()
            .await
            .map_err(|err| err.without_url())?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("gemini request failed: {} -> {}", status, text));
        }
        let raw: Value = resp.json().await.map_err(|err| err.without_url())?;
        Ok(GenerateResponse {
            text: extract_gemini_content(&raw),
            raw,
        })
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate_content(&self, model: &str, prompt: &str) -> Result<GenerateResponse> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }],
        });
        self.post_generate(model, &body).await
    }
}

fn extract_gemini_content(v: &Value) -> String {
    if let Some(candidates) = v.get("candidates").and_then(|c| c.as_array()) {
        if let Some(first) = candidates.first() {
            if let Some(content) = first.get("content") {
                if let Some(parts) = content.get("parts").and_then(|p| p.as_array()) {
                    return parts
                        .iter()
                        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                        .collect::<Vec<_>>()
                        .join("");
                }
            }
            if let Some(text) = first.get("output").and_then(|t| t.as_str()) {
                return text.to_string();
            }
        }
    }
    v.get("text")
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .to_string()
}

fn gemini_payload(messages: &[Message]) -> (Option<String>, Vec<Value>) {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();
    for msg in messages {
        match msg.role.as_str() {
            "system" => system_parts.push(msg.content.clone()),
            "assistant" => contents.push(json!({
                "role": "model",
                "parts": [{"text": msg.content}]
            })),
            _ => contents.push(json!({
                "role": "user",
                "parts": [{"text": msg.content}]
            })),
        }
    }
    let system_prompt = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system_prompt, contents)
}

fn normalize_gemini_base(api_base: &str) -> String {
    let trimmed = api_base.trim_end_matches('/');
    if trimmed.ends_with("/v1")
        || trimmed.ends_with("/v1beta")
        || trimmed.contains("/v1/")
        || trimmed.contains("/v1beta/")
    {
        trimmed.to_string()
    } else {
        format!("{}/v1beta", trimmed)
    }
}
