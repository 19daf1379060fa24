pub mod adapters;
pub mod config;
pub mod event;
pub mod log;
pub mod message;
pub mod plugins;
pub mod processor;

use config::AppConfig;
use processor::builtin::{UndefinedReply, register_builtins};
use processor::{Registry, RegistryBuilder};

pub type BotError = Box<dyn std::error::Error + Send + Sync>;

pub type BotResult<T> = Result<T, BotError>;

/// 按配置注册内置命令与启用的插件，得到只读命令表
pub fn build_registry(config: &AppConfig) -> Registry {
    let mut builder = RegistryBuilder::new();
    register_builtins(
        &mut builder,
        UndefinedReply::parse(&config.bot.undefined_reply),
    );
    plugins::register_enabled(&mut builder, config);
    builder.build()
}
