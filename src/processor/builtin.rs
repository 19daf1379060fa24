//! 内置命令 `/list`、`/help` 与未匹配命令时的默认回复

use async_trait::async_trait;
use std::sync::Arc;

use super::{Context, Flow, Handler, HandlerInfo, RegistryBuilder, template};
use crate::event::parse_command;
use crate::message::Message;

/// 未匹配到命令时的回复策略（对应配置 `bot.undefined_reply`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndefinedReply {
    /// 被中断且存在帮助信息时提示参数错误，否则提示命令不存在
    NotMatchedIfNoHelp,
    Ignore,
    NotMatched,
    Help,
}

impl UndefinedReply {
    /// 大小写不敏感，无法识别的值视为 Ignore
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "not_matched_if_no_help" => Self::NotMatchedIfNoHelp,
            "not_matched" => Self::NotMatched,
            "help" => Self::Help,
            _ => Self::Ignore,
        }
    }
}

/// 注册内置命令与默认回复
pub fn register_builtins(builder: &mut RegistryBuilder, mode: UndefinedReply) {
    let fallback: Option<Arc<dyn Handler>> = match mode {
        UndefinedReply::NotMatchedIfNoHelp => Some(Arc::new(NotFoundAfterHelpCheck)),
        UndefinedReply::NotMatched => Some(Arc::new(NotMatchedReply)),
        UndefinedReply::Help => Some(Arc::new(IncorrectArgumentReply)),
        UndefinedReply::Ignore => None,
    };
    builder.set_default_handlers(vec![], fallback.into_iter().collect());

    builder.register_command(
        "/list",
        "List Commands",
        "列出某服务的所有指令",
        "/list /list",
        |s| s.starts_with('/'),
        vec![],
        vec![Arc::new(ListCommands)],
    );
    builder.register_command(
        "/list",
        "List All Commands",
        "列出所有服务",
        "/list",
        |s| s.is_empty(),
        vec![],
        vec![Arc::new(ListAllCommands)],
    );
    builder.register_command(
        "/help",
        "Help",
        "查看某服务的指令帮助",
        "/help /help",
        |s| s.starts_with('/'),
        vec![],
        vec![Arc::new(HelpCommand)],
    );
}

async fn reply_text(ctx: &Context, text: String) {
    ctx.reply(Message::new().text(text)).await
}

fn help_infos(ctx: &Context) -> Vec<HandlerInfo> {
    let payload = ctx.payload();
    ctx.registry()
        .match_filter_metadata(&payload.command, &payload.content)
}

fn not_matched_text(ctx: &Context) -> String {
    let payload = ctx.payload();
    template::not_matched_command(&payload.command, &payload.content)
}

/// 列出某个命令下的所有过滤器，内容即命令名，如 `/list /zero`
struct ListCommands;

#[async_trait]
impl Handler for ListCommands {
    async fn handle(&self, ctx: &mut Context) -> Flow {
        let key = ctx.payload().content.trim().to_string();
        let infos: Vec<HandlerInfo> = ctx
            .registry()
            .list_filters_for_key(&key)
            .into_values()
            .collect();
        reply_text(ctx, template::list_help_info(&key, &infos)).await;
        Flow::Continue
    }
}

struct ListAllCommands;

#[async_trait]
impl Handler for ListAllCommands {
    async fn handle(&self, ctx: &mut Context) -> Flow {
        let keys = ctx.registry().list_all_keys();
        reply_text(ctx, template::list_all_service_info(&keys)).await;
        Flow::Continue
    }
}

/// `/help /zero 吃什么`：展示该内容会命中的过滤器
struct HelpCommand;

#[async_trait]
impl Handler for HelpCommand {
    async fn handle(&self, ctx: &mut Context) -> Flow {
        let command = parse_command(&ctx.payload().content);
        let infos = ctx
            .registry()
            .match_filter_metadata(&command.cmd, &command.content);
        reply_text(
            ctx,
            template::command_help_argument(&command.cmd, &command.content, &infos),
        )
        .await;
        Flow::Continue
    }
}

struct NotMatchedReply;

#[async_trait]
impl Handler for NotMatchedReply {
    async fn handle(&self, ctx: &mut Context) -> Flow {
        ctx.next().await;
        reply_text(ctx, not_matched_text(ctx)).await;
        Flow::Continue
    }
}

struct IncorrectArgumentReply;

#[async_trait]
impl Handler for IncorrectArgumentReply {
    async fn handle(&self, ctx: &mut Context) -> Flow {
        ctx.next().await;
        let infos = help_infos(ctx);
        reply_text(ctx, template::incorrect_command_argument(&infos)).await;
        Flow::Continue
    }
}

struct NotFoundAfterHelpCheck;

#[async_trait]
impl Handler for NotFoundAfterHelpCheck {
    async fn handle(&self, ctx: &mut Context) -> Flow {
        ctx.next().await;

        // 被中断且命令存在，说明是参数有误
        if ctx.is_aborted() {
            let infos = help_infos(ctx);
            if !infos.is_empty() {
                reply_text(ctx, template::incorrect_command_argument(&infos)).await;
                return Flow::Continue;
            }
        }
        reply_text(ctx, not_matched_text(ctx)).await;
        Flow::Continue
    }
}
