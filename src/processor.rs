//! 命令匹配与处理链
//!
//! 一条消息先被解析为 (命令, 内容)，由 [`Registry`] 找出所有匹配的过滤器，
//! 再交给 [`Context`] 依次执行可选处理器与必须处理器。

use async_trait::async_trait;
use std::sync::Arc;

pub mod builtin;
pub mod client;
pub mod context;
pub mod dispatch;
pub mod registry;
pub mod template;

pub use client::ReplyClient;
pub use context::Context;
pub use dispatch::Dispatcher;
pub use registry::{HandlerFilter, HandlerInfo, Registry, RegistryBuilder};

/// 处理器执行后的控制信号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// 继续执行链上的下一个可选处理器
    Continue,
    /// 中断可选处理器阶段（必须处理器仍会执行）
    Stop,
}

/// 消息处理器
///
/// 可选处理器与必须处理器共用同一签名。需要在后续处理器之后再做事情的
/// 处理器可以在内部 `ctx.next().await`，之后的逻辑会在链条跑完后执行。
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &mut Context) -> Flow;
}

pub type HandlerRef = Arc<dyn Handler>;
