use crate::config::AppConfig;
use crate::event::Payload;
use crate::info;
use crate::message::Message;
use crate::processor::{Context, Flow, Handler, RegistryBuilder};
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use toml::Value;

pub mod ai;
pub mod hello;
pub mod mihoyo;
pub mod zero;

/// 插件下的一条命令
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn example(&self) -> &str;
    /// 判断命令之后的内容是否由该命令处理
    fn triggered(&self, content: &str) -> bool;
    async fn handle(&self, payload: &Payload) -> Message;
}

/// 一组共享触发关键字的命令
pub trait Plugin {
    /// 如 `/zero`
    fn trigger_key(&self) -> &str;
    fn commands(&self) -> Vec<Arc<dyn Command>>;
}

/// 把插件的每条命令注册为一个过滤器，命中后引用原消息回复
pub fn register_plugin(builder: &mut RegistryBuilder, plugin: &dyn Plugin) {
    for command in plugin.commands() {
        let predicate = command.clone();
        builder.register_command(
            plugin.trigger_key(),
            command.name(),
            command.description(),
            command.example(),
            move |content| predicate.triggered(content),
            vec![],
            vec![Arc::new(CommandHandler(command.clone()))],
        );
    }
}

struct CommandHandler(Arc<dyn Command>);

#[async_trait]
impl Handler for CommandHandler {
    async fn handle(&self, ctx: &mut Context) -> Flow {
        let reply = self.0.handle(ctx.payload()).await;
        // 空消息不回复
        if !reply.is_empty() {
            ctx.reply(reply).await;
        }
        Flow::Continue
    }
}

pub type PluginBuilder = fn(&AppConfig) -> Box<dyn Plugin>;

/// 插件登记项
pub struct PluginEntry {
    /// 配置文件中的表名
    pub name: &'static str,
    pub build: PluginBuilder,
    pub default_config: fn() -> Value,
}

static PLUGINS: OnceLock<Vec<PluginEntry>> = OnceLock::new();

/// 获取全局插件列表
pub fn get_plugins() -> &'static [PluginEntry] {
    PLUGINS.get_or_init(|| {
        vec![
            PluginEntry {
                name: "hello",
                build: hello::build,
                default_config: hello::default_config,
            },
            PluginEntry {
                name: "zero",
                build: zero::build,
                default_config: zero::default_config,
            },
            PluginEntry {
                name: "mihoyo",
                build: mihoyo::build,
                default_config: mihoyo::default_config,
            },
            PluginEntry {
                name: "ai",
                build: ai::build,
                default_config: ai::default_config,
            },
        ]
    })
}

/// 所有插件的默认配置，用于补全配置文件
pub fn default_configs() -> Vec<(&'static str, Value)> {
    get_plugins()
        .iter()
        .map(|p| (p.name, (p.default_config)()))
        .collect()
}

/// 注册所有启用的插件
pub fn register_enabled(builder: &mut RegistryBuilder, config: &AppConfig) {
    for entry in get_plugins() {
        if !config.is_plugin_enabled(entry.name) {
            info!(target: "Plugin", "插件 [{}] 已禁用", entry.name);
            continue;
        }
        let plugin = (entry.build)(config);
        register_plugin(builder, plugin.as_ref());
        info!(target: "Plugin", "已加载插件 [{}] ({})", entry.name, plugin.trigger_key());
    }
}
