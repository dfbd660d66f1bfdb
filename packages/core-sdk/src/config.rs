use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

pub const EXPECTED_PROVIDER: &str = "gemini";
pub const DEFAULT_PROVIDER: &str = "qwen";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/**
 * \brief 配置前置条件不满足时的错误。
 */
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MODEL_PROVIDER 未设置为 'gemini'（当前为 '{found}'），请检查 .env 文件")]
    ProviderMismatch { found: String },
    #[error("GEMINI_API_KEY 未设置，请在 .env 文件中配置")]
    MissingApiKey,
}

/**
 * \brief 进程启动时读取的一次性配置快照。
 */
#[derive(Clone, PartialEq, Eq)]
pub struct SmokeConfig {
    /** \brief Provider 标识，已转为小写 */
    pub provider: String,
    /** \brief Gemini API Key */
    pub api_key: Option<String>,
    /** \brief 模型名 */
    pub model: String,
    /** \brief API 基地址 */
    pub api_base: String,
    /** \brief 是否把报告行写入日志文件 */
    pub telemetry_enabled: bool,
}

impl fmt::Debug for SmokeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmokeConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("telemetry_enabled", &self.telemetry_enabled)
            .finish()
    }
}

impl SmokeConfig {
    /**
     * \brief 从进程环境变量读取配置。
     */
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /**
     * \brief 通过任意查找函数读取配置，便于测试时替换环境。
     */
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = lookup("MODEL_PROVIDER")
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
            .to_lowercase();
        let api_key = lookup("GEMINI_API_KEY");
        let model = lookup("MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_base = lookup("GEMINI_API_BASE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let telemetry_enabled = lookup("SMOKE_TELEMETRY")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            provider,
            api_key,
            model,
            api_base,
            telemetry_enabled,
        }
    }

    /**
     * \brief 校验 Provider 与 API Key，成功时返回 Key。
     */
    pub fn validate(&self) -> Result<&str, ConfigError> {
        if self.provider != EXPECTED_PROVIDER {
            return Err(ConfigError::ProviderMismatch {
                found: self.provider.clone(),
            });
        }
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ConfigError::MissingApiKey),
        }
    }
}

/**
 * \brief 加载 .env 文件；未指定路径时文件缺失不视为错误。
 */
pub fn load_dotenv(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            dotenvy::from_path(p).with_context(|| format!("load env file {} failed", p.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> SmokeConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SmokeConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let cfg = config_from(&[]);
        assert_eq!(cfg.provider, "qwen");
        assert_eq!(cfg.model, "gemini-2.5-flash");
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert!(cfg.api_key.is_none());
        assert!(!cfg.telemetry_enabled);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ProviderMismatch {
                found: "qwen".to_string()
            })
        );
    }

    #[test]
    fn test_provider_is_case_insensitive() {
        let cfg = config_from(&[("MODEL_PROVIDER", "GeMiNi"), ("GEMINI_API_KEY", "k-1")]);
        assert_eq!(cfg.provider, "gemini");
        assert_eq!(cfg.validate(), Ok("k-1"));
    }

    #[test]
    fn test_empty_key_is_missing() {
        let cfg = config_from(&[("MODEL_PROVIDER", "gemini"), ("GEMINI_API_KEY", "")]);
        assert_eq!(cfg.validate(), Err(ConfigError::MissingApiKey));
        let cfg = config_from(&[("MODEL_PROVIDER", "gemini")]);
        assert_eq!(cfg.validate(), Err(ConfigError::MissingApiKey));
    }

    #[test]
    fn test_overrides_and_telemetry_flag() {
        let cfg = config_from(&[
            ("MODEL_NAME", "gemini-2.0-flash"),
            ("GEMINI_API_BASE", "http://localhost:8080/v1beta"),
            ("SMOKE_TELEMETRY", "TRUE"),
        ]);
        assert_eq!(cfg.model, "gemini-2.0-flash");
        assert_eq!(cfg.api_base, "http://localhost:8080/v1beta");
        assert!(cfg.telemetry_enabled);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let cfg = config_from(&[("MODEL_PROVIDER", "gemini"), ("GEMINI_API_KEY", "SECRET-KEY-123")]);
        let shown = format!("{:?}", cfg);
        assert!(!shown.contains("SECRET-KEY-123"));
        assert!(shown.contains("<redacted>"));
        assert!(shown.contains("gemini-2.5-flash"));
    }

    #[test]
    fn test_blank_api_base_falls_back() {
        let cfg = config_from(&[("GEMINI_API_BASE", "  ")]);
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
    }
}
