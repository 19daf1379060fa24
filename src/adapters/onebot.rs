use crate::config::BotConfig;
use crate::event::{Event, Payload};
use crate::message::Message;
use crate::processor::{Dispatcher, Registry, ReplyClient};
use crate::{BotError, BotResult, debug, error, info, warn};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::{Sink, SinkExt, StreamExt};
use http::HeaderValue;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, protocol::Message as WsMessage},
};

pub type TraitSink =
    Box<dyn Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error> + Send + Unpin>;
pub type LockedWriter = Arc<AsyncMutex<TraitSink>>;

/// 发送失败且非测试模式时的兜底回复
const REPLY_FAILED: &str = "回复被夹掉了，换个话题吧";

#[derive(Serialize)]
struct ActionFrame<T> {
    action: &'static str,
    params: T,
}

#[derive(Serialize)]
struct SendParamsInner<'a> {
    message_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<i64>,
    message: &'a Message,
}

/// 适配器入口函数 (Adapter Entry)
pub fn entry(bot_config: BotConfig, registry: Arc<Registry>) -> BoxFuture<'static, ()> {
    Box::pin(async move { run_bot_loop(bot_config, registry).await })
}

/// OneBot 协议的主循环逻辑，断线后 3 秒重连
pub async fn run_bot_loop(bot_config: BotConfig, registry: Arc<Registry>) {
    let bot_url = bot_config
        .url
        .clone()
        .unwrap_or_else(|| "Unknown".to_string());
    loop {
        match connect_and_listen(&bot_config, registry.clone()).await {
            Ok(()) => warn!(target: "Bot", "Bot [{}] 连接断开，3秒后重连...", bot_url),
            Err(e) => {
                error!(target: "Bot", "Bot [{}] 连接失败: {}。3秒后重试...", bot_url, e)
            }
        }
        tokio::time::sleep(Duration::from_secs(3)).await;
    }
}

async fn connect_and_listen(config: &BotConfig, registry: Arc<Registry>) -> BotResult<()> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| BotError::from("OneBot URL 未配置"))?;

    let mut request = url.into_client_request()?;

    if let Some(token) = &config.access_token
        && !token.is_empty()
    {
        let token_header = format!("Bearer {}", token);
        request
            .headers_mut()
            .insert("Authorization", HeaderValue::from_str(&token_header)?);
    }

    let timeout = Duration::from_secs(config.timeout_second.max(1));
    let (ws_stream, _) = tokio::time::timeout(timeout, connect_async(request))
        .await
        .map_err(|_| BotError::from(format!("连接超时 ({}s)", timeout.as_secs())))??;
    info!(target: "Bot", "Bot [{}] 连接成功！(OneBot)", url);

    let (write_half, mut read_half) = ws_stream.split();

    let writer: LockedWriter = Arc::new(AsyncMutex::new(Box::new(write_half)));
    let client = Arc::new(OneBotClient::new(writer, config.test_mode));
    let dispatcher = Dispatcher::new(registry, client);
    let only_to_me = config.only_to_me;

    while let Some(message) = read_half.next().await {
        match message {
            Ok(WsMessage::Text(text)) => {
                let mut data = text.as_bytes().to_vec();
                let dispatcher = dispatcher.clone();

                // 每一帧独立处理，慢处理器不会阻塞读取
                tokio::spawn(async move {
                    process_frame(&mut data, &dispatcher, only_to_me).await;
                });
            }
            Ok(WsMessage::Close(_)) => return Ok(()),
            Err(e) => return Err(Box::new(e)),
            _ => {}
        }
    }
    Ok(())
}

/// 解析一帧事件并分发，非消息事件与解析失败的帧直接丢弃
pub async fn process_frame(data: &mut [u8], dispatcher: &Dispatcher, only_to_me: bool) {
    let event: Event = match simd_json::to_owned_value(data) {
        Ok(v) => v,
        Err(e) => {
            debug!(target: "Bot", "忽略无法解析的帧: {}", e);
            return;
        }
    };

    let Some(payload) = Payload::from_event(event) else {
        return;
    };

    if only_to_me && !payload.message().is_to_me() {
        return;
    }

    dispatcher.dispatch(payload).await;
}

pub async fn send_frame_raw(writer: &LockedWriter, json_str: String) -> BotResult<()> {
    let mut guard = writer.lock().await;
    guard.send(WsMessage::Text(json_str.into())).await?;
    Ok(())
}

/// 通过 `send_msg` 动作回复消息的客户端
pub struct OneBotClient {
    writer: LockedWriter,
    test_mode: bool,
}

impl OneBotClient {
    pub fn new(writer: LockedWriter, test_mode: bool) -> Self {
        Self { writer, test_mode }
    }

    /// 按消息来源发送到群或私聊
    pub async fn send_msg(&self, payload: &Payload, message: &Message) -> BotResult<()> {
        let event = payload.message();
        let (message_type, group_id, user_id) = match event.group_id().filter(|&id| id != 0) {
            Some(gid) => ("group", Some(gid), None),
            None => ("private", None, Some(event.user_id())),
        };

        if message_type == "private" && user_id == Some(0) {
            return Err("无法确定消息的发送目标".into());
        }

        let frame = ActionFrame {
            action: "send_msg",
            params: SendParamsInner {
                message_type,
                group_id,
                user_id,
                message,
            },
        };

        let json_str = simd_json::to_string(&frame)?;
        send_frame_raw(&self.writer, json_str).await
    }

    async fn deliver(&self, payload: &Payload, message: Message) {
        match self.send_msg(payload, &message).await {
            Ok(()) => {
                info!(target: "Bot", "message sent: {}", message.plain_text());
            }
            Err(e) => {
                error!(target: "Bot", "回复失败: {}", e);
                let notice = if self.test_mode {
                    e.to_string()
                } else {
                    REPLY_FAILED.to_string()
                };
                if let Err(e) = self.send_msg(payload, &Message::new().text(notice)).await {
                    error!(target: "Bot", "发送失败提示也失败了: {}", e);
                }
            }
        }
    }
}

#[async_trait]
impl ReplyClient for OneBotClient {
    async fn reply_message(&self, payload: &Payload, msg: Message) {
        let message_id = payload.message().message_id();
        self.deliver(payload, msg.reply(message_id)).await
    }

    async fn send_message(&self, payload: &Payload, msg: Message) {
        self.deliver(payload, msg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::group_event;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    type Frames = Arc<Mutex<Vec<String>>>;

    /// 把写出的文本帧收集起来的 writer
    fn capture_writer(frames: Frames) -> LockedWriter {
        let sink = futures_util::sink::unfold(frames, |frames, item: WsMessage| async move {
            if let WsMessage::Text(text) = item {
                frames.lock().unwrap().push(text.as_str().to_string());
            }
            Ok::<_, tokio_tungstenite::tungstenite::Error>(frames)
        });
        Arc::new(AsyncMutex::new(Box::new(Box::pin(sink))))
    }

    fn parsed(frames: &Frames) -> Vec<Value> {
        frames
            .lock()
            .unwrap()
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }

    fn group_payload() -> Payload {
        Payload::from_event(group_event(json!({
            "post_type": "message",
            "message_type": "group",
            "self_id": 10001,
            "group_id": 123,
            "user_id": 456,
            "message_id": 789,
            "raw_message": "[CQ:at,qq=10001] /hello",
            "sender": { "nickname": "nick" }
        })))
        .unwrap()
    }

    #[tokio::test]
    async fn reply_quotes_original_message_in_group() {
        let frames = Frames::default();
        let client = OneBotClient::new(capture_writer(frames.clone()), false);

        client
            .reply_message(&group_payload(), Message::new().text("hi"))
            .await;

        let sent = parsed(&frames);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["action"], "send_msg");
        assert_eq!(sent[0]["params"]["message_type"], "group");
        assert_eq!(sent[0]["params"]["group_id"], 123);
        assert!(sent[0]["params"].get("user_id").is_none());
        assert_eq!(sent[0]["params"]["message"][0]["type"], "reply");
        assert_eq!(sent[0]["params"]["message"][0]["data"]["id"], "789");
        assert_eq!(sent[0]["params"]["message"][1]["data"]["text"], "hi");
    }

    #[tokio::test]
    async fn send_message_goes_to_private_chat() {
        let frames = Frames::default();
        let client = OneBotClient::new(capture_writer(frames.clone()), false);
        let payload = Payload::from_text(42, "u", 7, "/hello").unwrap();

        client.send_message(&payload, Message::new().text("hi")).await;

        let sent = parsed(&frames);
        assert_eq!(sent[0]["params"]["message_type"], "private");
        assert_eq!(sent[0]["params"]["user_id"], 42);
        assert_eq!(sent[0]["params"]["message"][0]["type"], "text");
    }

    #[tokio::test]
    async fn frames_not_addressed_to_bot_are_ignored() {
        use crate::processor::RegistryBuilder;
        use crate::processor::builtin::{UndefinedReply, register_builtins};

        let frames = Frames::default();
        let client = Arc::new(OneBotClient::new(capture_writer(frames.clone()), false));
        let mut builder = RegistryBuilder::new();
        register_builtins(&mut builder, UndefinedReply::NotMatched);
        let dispatcher = Dispatcher::new(Arc::new(builder.build()), client);

        let mut plain = br#"{"post_type":"message","message_type":"group","self_id":1,"group_id":2,"user_id":3,"message_id":4,"raw_message":"/foo"}"#.to_vec();
        process_frame(&mut plain, &dispatcher, true).await;
        assert!(parsed(&frames).is_empty());

        let mut mention = br#"{"post_type":"message","message_type":"group","self_id":1,"group_id":2,"user_id":3,"message_id":4,"raw_message":"[CQ:at,qq=1] /foo"}"#.to_vec();
        process_frame(&mut mention, &dispatcher, true).await;
        assert_eq!(parsed(&frames).len(), 1);

        let mut garbage = b"not json".to_vec();
        process_frame(&mut garbage, &dispatcher, true).await;
        assert_eq!(parsed(&frames).len(), 1);
    }
}
