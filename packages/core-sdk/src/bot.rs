use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::SmokeConfig;
use crate::llm::GeminiClient;
use crate::models::Message;

/**
 * \brief 闲鱼客服回复能力：根据当前消息、商品描述与历史对话生成回复。
 */
#[async_trait]
pub trait ReplyBot: Send + Sync {
    async fn generate_reply(
        &self,
        message: &str,
        item_description: &str,
        history: &[Message],
    ) -> Result<String>;
}

/**
 * \brief 基于 Gemini 的最小回复机器人。
 */
#[derive(Debug, Clone)]
pub struct ListingReplyBot {
    client: GeminiClient,
    model: String,
}

impl ListingReplyBot {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /**
     * \brief 读取环境配置并创建机器人，配置不完整时报错。
     */
    pub fn from_env() -> Result<Self> {
        let config = SmokeConfig::from_env();
        let api_key = config.validate().context("reply bot config invalid")?;
        let client = GeminiClient::new(&config.api_base, api_key)?;
        Ok(Self::new(client, config.model))
    }
}

#[async_trait]
impl ReplyBot for ListingReplyBot {
    async fn generate_reply(
        &self,
        message: &str,
        item_description: &str,
        history: &[Message],
    ) -> Result<String> {
        let messages = build_messages(message, item_description, history);
        let resp = self
            .client
            .chat(&self.model, &messages)
            .await
            .context("reply bot generation failed")?;
        Ok(resp.text.trim().to_string())
    }
}

fn system_prompt(item_description: &str) -> String {
    format!(
        "你是闲鱼上的一名二手卖家，正在和买家沟通。回复要简短、口语化、友好，不要暴露自己是AI。\n\n【商品信息】\n{}",
        item_description
    )
}

fn build_messages(message: &str, item_description: &str, history: &[Message]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_prompt(item_description)));
    messages.extend(history.iter().cloned());
    messages.push(Message::user(message));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages_order() {
        let history = vec![
            Message::user("这个手机还在吗？"),
            Message::assistant("在的，全新未拆封"),
        ];
        let msgs = build_messages("这个手机能便宜点吗？", "iPhone 15 Pro Max", &history);
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[0].role, "system");
        assert!(msgs[0].content.contains("iPhone 15 Pro Max"));
        assert_eq!(msgs[1], history[0]);
        assert_eq!(msgs[2], history[1]);
        assert_eq!(msgs[3], Message::user("这个手机能便宜点吗？"));
    }

    #[test]
    fn test_build_messages_without_history() {
        let msgs = build_messages("hi", "item", &[]);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].content, "hi");
    }
}
