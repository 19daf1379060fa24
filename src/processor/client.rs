use async_trait::async_trait;

use crate::event::Payload;
use crate::message::Message;

/// 处理器回复消息所用的客户端，与具体传输方式无关
///
/// 发送失败由实现自行记录并兜底，处理链不感知错误。
#[async_trait]
pub trait ReplyClient: Send + Sync {
    /// 引用原消息进行回复
    async fn reply_message(&self, payload: &Payload, msg: Message);

    /// 直接发送到消息来源（群或私聊），不引用原消息
    async fn send_message(&self, payload: &Payload, msg: Message);
}

/// 记录所有回复内容的客户端，测试用
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingClient {
    pub replies: std::sync::Mutex<Vec<String>>,
    pub sent: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingClient {
    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ReplyClient for RecordingClient {
    async fn reply_message(&self, _payload: &Payload, msg: Message) {
        self.replies.lock().unwrap().push(msg.plain_text());
    }

    async fn send_message(&self, _payload: &Payload, msg: Message) {
        self.sent.lock().unwrap().push(msg.plain_text());
    }
}
