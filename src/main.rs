use qqchannel::config::AppConfig;
use qqchannel::log::{self, Level};
use qqchannel::{BotResult, adapters, build_registry, error, info, plugins, warn};
use std::sync::Arc;

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> BotResult<()> {
    let config = AppConfig::load(CONFIG_PATH, &plugins::default_configs()).await?;

    match Level::parse(&config.log.level) {
        Some(level) => log::set_level(level),
        None => warn!(target: "System", "未知的日志级别: {}，使用 info", config.log.level),
    }
    if let Some(file) = &config.log.file
        && let Err(e) = log::set_file(file)
    {
        warn!(target: "System", "无法打开日志文件 {}: {}", file, e);
    }

    let registry = Arc::new(build_registry(&config));
    info!(target: "System", "已注册命令: {}", registry.list_all_keys().join(", "));

    let protocol = config.bot.protocol.as_str();
    let Some(adapter) = adapters::find_adapter(protocol) else {
        error!(target: "System", "未找到协议适配器: {}", protocol);
        return Err(format!("未知协议: {}", protocol).into());
    };

    (adapter.handler)(config.bot.clone(), registry).await;
    Ok(())
}
