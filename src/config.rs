use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use toml::Value;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    // Bot 连接与回复行为
    #[serde(default)]
    pub bot: BotConfig,

    // 日志输出
    #[serde(default)]
    pub log: LogConfig,

    // 插件配置
    #[serde(flatten)]
    pub plugins: HashMap<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BotConfig {
    // 协议类型 ("onebot" 或 "console")
    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_second: u64,

    // 测试模式下发送失败会把错误原文回复出来
    #[serde(default)]
    pub test_mode: bool,

    // 未匹配命令时的回复策略，见 processor::builtin::UndefinedReply
    #[serde(default = "default_undefined_reply")]
    pub undefined_reply: String,

    // 群消息仅在 @ 机器人时处理
    #[serde(default = "default_true")]
    pub only_to_me: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_protocol() -> String {
    "onebot".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_undefined_reply() -> String {
    "not_matched_if_no_help".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            url: Some("ws://127.0.0.1:3001".to_string()),
            access_token: Some("YOUR_TOKEN_HERE".to_string()),
            timeout_second: default_timeout(),
            test_mode: false,
            undefined_reply: default_undefined_reply(),
            only_to_me: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: Some("data/messages.log".to_string()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            log: LogConfig::default(),
            plugins: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// 读取配置文件，不存在时写出默认配置
    pub async fn load<P: AsRef<Path>>(path: P, defaults: &[(&str, Value)]) -> Result<Self> {
        let path = path.as_ref();
        let mut cfg = if path.exists() {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
            toml::from_str::<AppConfig>(&content)
                .with_context(|| format!("解析配置文件失败: {}", path.display()))?
        } else {
            AppConfig::default()
        };

        // 补全缺失的插件配置
        let mut changed = !path.exists();
        for (name, value) in defaults {
            if !cfg.plugins.contains_key(*name) {
                cfg.plugins.insert(name.to_string(), value.clone());
                changed = true;
            }
        }

        if changed {
            cfg.save(path).await?;
        }
        Ok(cfg)
    }

    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)
            .await
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        Ok(())
    }

    /// 读取插件配置，缺失或格式错误时返回 None
    pub fn get_plugin_config<T: DeserializeOwned>(&self, plugin_name: &str) -> Option<T> {
        self.plugins
            .get(plugin_name)
            .and_then(|v| T::deserialize(v.clone()).ok())
    }

    /// 插件是否启用（未配置 enabled 时视为启用）
    pub fn is_plugin_enabled(&self, plugin_name: &str) -> bool {
        self.plugins
            .get(plugin_name)
            .and_then(|v| v.get("enabled"))
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }
}

/// 辅助函数：构建默认配置 Value，并确保包含 enabled 字段
pub fn build_config<T: Serialize>(data: T) -> Value {
    let mut val = Value::try_from(data).unwrap_or(Value::Table(Default::default()));
    if let Value::Table(ref mut map) = val
        && !map.contains_key("enabled")
    {
        map.insert("enabled".to_string(), Value::Boolean(true));
    }
    val
}
