use crate::adapters::onebot::{LockedWriter, OneBotClient};
use crate::config::BotConfig;
use crate::event::Payload;
use crate::processor::{Dispatcher, Registry};
use crate::{info, warn};
use futures_util::Sink;
use futures_util::future::BoxFuture;
use simd_json::base::ValueAsScalar;
use simd_json::derived::{ValueObjectAccess, ValueObjectAccessAsArray, ValueObjectAccessAsScalar};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

const CONSOLE_USER_ID: i64 = 1;
const CONSOLE_USER_NAME: &str = "ConsoleUser";

/// 控制台适配器入口
pub fn entry(bot_config: BotConfig, registry: Arc<Registry>) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        info!(target: "Console", "已启动控制台模式。请输入指令 (例如: /hello)");
        info!(target: "Console", "模拟环境: User ID: {} | Group ID: None (Private)", CONSOLE_USER_ID);

        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin).lines();

        // 创建一个模拟的 Writer，将 Bot 回复打印到控制台
        let writer: LockedWriter = Arc::new(AsyncMutex::new(Box::new(ConsoleSink)));
        let client = Arc::new(OneBotClient::new(writer, bot_config.test_mode));
        let dispatcher = Dispatcher::new(registry, client);

        let mut message_id: i64 = 0;
        while let Ok(Some(line)) = reader.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            message_id += 1;
            match Payload::from_text(CONSOLE_USER_ID, CONSOLE_USER_NAME, message_id, line) {
                Some(payload) => dispatcher.dispatch(payload).await,
                None => warn!(target: "Console", "构造模拟消息失败: {}", line),
            }
        }
    })
}

/// 把 `send_msg` 帧中的消息段还原为可读文本
fn render_frame(text: &str) -> Option<String> {
    let mut data = text.as_bytes().to_vec();
    let val = simd_json::to_owned_value(&mut data).ok()?;
    if val.get_str("action") != Some("send_msg") {
        return None;
    }

    let segments = val.get("params")?.get_array("message")?;
    let mut out = String::new();
    for seg in segments {
        let data = seg.get("data");
        match seg.get_str("type").unwrap_or("") {
            "text" => out.push_str(data.and_then(|d| d.get_str("text")).unwrap_or("")),
            "at" => {
                out.push('@');
                out.push_str(data.and_then(|d| d.get_str("qq")).unwrap_or(""));
                out.push(' ');
            }
            "reply" => {
                let id = data.and_then(|d| d.get("id")).and_then(|v| v.as_str());
                out.push_str(&format!("[回复:{}] ", id.unwrap_or("?")));
            }
            "image" => out.push_str("[图片]"),
            other => out.push_str(&format!("[{}]", other)),
        }
    }
    Some(out)
}

struct ConsoleSink;

impl Sink<WsMessage> for ConsoleSink {
    type Error = WsError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: WsMessage) -> Result<(), Self::Error> {
        if let WsMessage::Text(text) = item {
            match render_frame(text.as_str()) {
                Some(content) => println!("\x1b[36m[Bot Reply] > \x1b[0m{}", content),
                None => println!("\x1b[90m[Bot Raw] > {}\x1b[0m", text.as_str()),
            }
        }
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}
