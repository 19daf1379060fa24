use futures_util::future::BoxFuture;
use std::sync::Arc;

use super::{Flow, HandlerRef, Registry, ReplyClient};
use crate::event::Payload;
use crate::message::Message;

/// 单条消息的执行上下文
///
/// 游标从 -1 开始，`next` 逐个执行可选处理器，可选处理器耗尽（或被中断）后
/// 执行一次全部必须处理器。上下文只属于一次分发，不会在任务间共享。
pub struct Context {
    payload: Payload,
    registry: Arc<Registry>,
    client: Arc<dyn ReplyClient>,
    must: Vec<HandlerRef>,
    optional: Vec<HandlerRef>,
    idx: isize,
    must_pending: bool,
}

impl Context {
    pub fn new(
        payload: Payload,
        registry: Arc<Registry>,
        client: Arc<dyn ReplyClient>,
        must: Vec<HandlerRef>,
        optional: Vec<HandlerRef>,
    ) -> Self {
        Self {
            payload,
            registry,
            client,
            must,
            optional,
            idx: -1,
            must_pending: true,
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// 引用当前消息回复
    pub async fn reply(&self, msg: Message) {
        self.client.reply_message(&self.payload, msg).await
    }

    /// 发送到当前消息的来源
    pub async fn send(&self, msg: Message) {
        self.client.send_message(&self.payload, msg).await
    }

    /// 推进处理链
    ///
    /// 可以在处理器内部重入调用，此时从当前游标继续向后执行，
    /// 返回后调用方看到的是链条执行完毕后的状态。
    pub fn next(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.idx += 1;
            while self.idx < self.optional.len() as isize {
                let handler = self.optional[self.idx as usize].clone();
                if handler.handle(self).await == Flow::Stop {
                    self.abort();
                }
                self.idx += 1;
            }

            // 先置位再执行，必须处理器内部重入 next 时不会再跑一遍
            if self.must_pending {
                self.must_pending = false;
                let must = self.must.clone();
                for handler in must {
                    handler.handle(self).await;
                }
            }
        })
    }

    /// 跳过剩余的可选处理器，必须处理器不受影响
    pub fn abort(&mut self) {
        self.idx = self.optional.len() as isize + 1;
    }

    pub fn is_aborted(&self) -> bool {
        self.idx > self.optional.len() as isize
    }
}
