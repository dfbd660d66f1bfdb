use anyhow::Result;

use crate::bot::{ListingReplyBot, ReplyBot};
use crate::config::SmokeConfig;
use crate::llm::{GeminiClient, GenerationClient};
use crate::models::Message;
use crate::telemetry::Reporter;

pub const CONNECTIVITY_PROMPT: &str = "系统提示：你是一个友好的助手。\n\n用户：你好，请简单介绍一下自己";

pub const TEST_ITEM: &str = "iPhone 15 Pro Max 256GB 原装未拆封";
pub const TEST_MESSAGE: &str = "这个手机能便宜点吗？";

const BANNER: &str = "==================================================";

/**
 * \brief 固定的两轮历史对话。
 */
pub fn test_history() -> Vec<Message> {
    vec![
        Message::user("这个手机还在吗？"),
        Message::assistant("在的，全新未拆封"),
    ]
}

/**
 * \brief 以 API Key 构造生成客户端。
 */
pub trait ClientFactory {
    fn connect(&self, api_key: &str) -> Result<Box<dyn GenerationClient>>;
}

/**
 * \brief 无参构造回复机器人。
 */
pub trait BotFactory {
    fn build(&self) -> Result<Box<dyn ReplyBot>>;
}

#[derive(Debug, Clone)]
pub struct GeminiClientFactory {
    pub api_base: String,
}

impl ClientFactory for GeminiClientFactory {
    fn connect(&self, api_key: &str) -> Result<Box<dyn GenerationClient>> {
        Ok(Box::new(GeminiClient::new(&self.api_base, api_key)?))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EnvBotFactory;

impl BotFactory for EnvBotFactory {
    fn build(&self) -> Result<Box<dyn ReplyBot>> {
        Ok(Box::new(ListingReplyBot::from_env()?))
    }
}

/**
 * \brief 两项检查的结果；bot 为 None 表示未执行。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmokeOutcome {
    pub connectivity: bool,
    pub bot: Option<bool>,
}

impl SmokeOutcome {
    pub fn passed(&self) -> bool {
        self.connectivity && self.bot == Some(true)
    }
}

/**
 * \brief Gemini API 连通性检查。配置不满足时不发起任何请求。
 */
pub async fn connectivity_check(
    config: &SmokeConfig,
    factory: &dyn ClientFactory,
    reporter: &dyn Reporter,
) -> bool {
    let api_key = match config.validate() {
        Ok(key) => key,
        Err(err) => {
            reporter.error(&err.to_string());
            return false;
        }
    };

    reporter.info(&format!("使用模型提供商: {}", config.provider));
    reporter.info(&format!("模型名称: {}", config.model));

    let client = match factory.connect(api_key) {
        Ok(client) => client,
        Err(err) => {
            reporter.error(&format!("Gemini API连接失败: {:#}", err));
            return false;
        }
    };

    reporter.info("测试Gemini API连接...");
    let response = match client
        .generate_content(&config.model, CONNECTIVITY_PROMPT)
        .await
    {
        Ok(resp) => resp,
        Err(err) => {
            reporter.error(&format!("Gemini API连接失败: {:#}", err));
            return false;
        }
    };

    reporter.success("Gemini API连接成功！");
    reporter.debug(&format!("完整响应对象: {}", response.raw));

    if response.text.is_empty() {
        reporter.warning("API返回了空响应，但连接成功");
    } else {
        reporter.info(&format!("测试回复: {}", response.text));
    }
    true
}

/**
 * \brief 回复机器人集成检查。
 */
pub async fn bot_check(factory: &dyn BotFactory, reporter: &dyn Reporter) -> bool {
    reporter.info("初始化XianyuReplyBot...");
    let bot = match factory.build() {
        Ok(bot) => bot,
        Err(err) => {
            report_bot_failure(reporter, &err);
            return false;
        }
    };

    let history = test_history();
    reporter.info(&format!("测试消息: {}", TEST_MESSAGE));
    match bot.generate_reply(TEST_MESSAGE, TEST_ITEM, &history).await {
        Ok(reply) => {
            reporter.success(&format!("机器人回复: {}", reply));
            true
        }
        Err(err) => {
            report_bot_failure(reporter, &err);
            false
        }
    }
}

fn report_bot_failure(reporter: &dyn Reporter, err: &anyhow::Error) {
    reporter.error(&format!("XianyuReplyBot测试失败: {:#}", err));
    reporter.error(&format!("{:?}", err));
}

/**
 * \brief 依次执行两项检查，连通性失败时跳过机器人检查。
 */
pub async fn run_all(
    config: &SmokeConfig,
    clients: &dyn ClientFactory,
    bots: &dyn BotFactory,
    reporter: &dyn Reporter,
) -> SmokeOutcome {
    reporter.info(BANNER);
    reporter.info("开始测试Gemini集成");
    reporter.info(BANNER);

    if !connectivity_check(config, clients, reporter).await {
        reporter.error("❌ Gemini API连接测试失败");
        report_hints(reporter);
        return SmokeOutcome {
            connectivity: false,
            bot: None,
        };
    }

    reporter.info(BANNER);
    reporter.info("测试XianyuReplyBot集成");
    reporter.info(BANNER);

    let bot_ok = bot_check(bots, reporter).await;
    if bot_ok {
        reporter.success("✅ 所有测试通过！Gemini已成功集成");
    } else {
        reporter.error("❌ XianyuReplyBot集成测试失败");
    }
    SmokeOutcome {
        connectivity: true,
        bot: Some(bot_ok),
    }
}

/**
 * \brief 连通性失败后的排查提示。
 */
pub fn report_hints(reporter: &dyn Reporter) {
    reporter.info("请检查：");
    reporter.info("1. .env 文件中 MODEL_PROVIDER=gemini");
    reporter.info("2. GEMINI_API_KEY 已正确设置");
    reporter.info("3. MODEL_NAME 设置为有效的Gemini模型名称");
}
