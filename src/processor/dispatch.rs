use std::sync::Arc;

use super::{Context, Registry, ReplyClient};
use crate::event::Payload;
use crate::info;

/// 消息分发器，持有只读命令表与回复客户端
///
/// 克隆开销很小，每条消息可以在独立任务中分发。
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    client: Arc<dyn ReplyClient>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, client: Arc<dyn ReplyClient>) -> Self {
        Self { registry, client }
    }

    /// 为一条消息解析处理链并执行完毕
    pub async fn dispatch(&self, payload: Payload) {
        info!(
            target: "Processor",
            "message received: [{}] {} {}",
            payload.message().sender_name(),
            payload.command,
            payload.content
        );

        let (must, optional) = self.registry.resolve(&payload.command, &payload.content);
        let mut ctx = Context::new(
            payload,
            self.registry.clone(),
            self.client.clone(),
            must,
            optional,
        );
        ctx.next().await;
    }
}
