use regex::Regex;
use serde::Serialize;
use simd_json::OwnedValue;
use simd_json::derived::{ValueObjectAccess, ValueObjectAccessAsScalar};
use std::sync::LazyLock;

use crate::message::Message;

pub type Event = OwnedValue;

static CQ_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[CQ:[^\]]*\]").unwrap());
static CQ_AT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[CQ:at,qq=([^,\]]+)[^\]]*\]").unwrap());

/// 一条入站消息解析后的完整载荷，在整个处理链中只读
#[derive(Debug, Clone)]
pub struct Payload {
    /// 原始 OneBot 事件
    pub event: Event,
    /// 命令关键字，如 `/help`
    pub command: String,
    /// 命令之后的剩余内容
    pub content: String,
    /// 未经处理的原始消息（保留 CQ 码，用于提取 @ 成员等）
    pub raw_content: String,
}

impl Payload {
    /// 从 OneBot 事件构建载荷，非消息事件返回 None
    pub fn from_event(event: Event) -> Option<Self> {
        if event.get_str("post_type") != Some("message") {
            return None;
        }

        let raw_content = event.get_str("raw_message").unwrap_or("").to_string();
        let input = etl_input(&raw_content).to_lowercase();
        let cmd = parse_command(&input);

        Some(Self {
            event,
            command: cmd.cmd,
            content: cmd.content,
            raw_content,
        })
    }

    /// 构造一条模拟的私聊消息（控制台适配器使用）
    pub fn from_text(user_id: i64, nickname: &str, message_id: i64, text: &str) -> Option<Self> {
        let event = MockMessageEvent {
            post_type: "message",
            message_type: "private",
            time: chrono::Local::now().timestamp(),
            self_id: 0,
            sub_type: "friend",
            user_id,
            message_id,
            sender: MockSender {
                user_id,
                nickname: nickname.to_string(),
                card: String::new(),
            },
            raw_message: text.to_string(),
            message: Message::new().text(text),
        };

        let mut bytes = simd_json::to_vec(&event).ok()?;
        let value = simd_json::to_owned_value(&mut bytes).ok()?;
        Self::from_event(value)
    }

    pub fn message(&self) -> MessageEvent<'_> {
        MessageEvent(&self.event)
    }

    /// 解析原始消息中被 @ 的成员，跳过前 skip 个
    pub fn at_members(&self, skip: usize) -> Vec<String> {
        get_at_members_from_raw_content(&self.raw_content, skip)
    }
}

/// 已解析的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub cmd: String,
    pub content: String,
}

/// 去掉 CQ 码（@、引用、表情等）并还原转义字符
pub fn etl_input(raw: &str) -> String {
    let stripped = CQ_CODE.replace_all(raw, "");
    unescape_cq(stripped.trim())
}

fn unescape_cq(s: &str) -> String {
    s.replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&#44;", ",")
        .replace("&amp;", "&")
}

/// 按第一个空格切分命令与内容，内容保持原样
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    match input.split_once(' ') {
        Some((cmd, content)) => Command {
            cmd: cmd.trim().to_string(),
            content: content.to_string(),
        },
        None => Command {
            cmd: input.to_string(),
            content: String::new(),
        },
    }
}

pub fn get_at_members_from_raw_content(raw_content: &str, skip: usize) -> Vec<String> {
    CQ_AT
        .captures_iter(raw_content)
        .skip(skip)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

// ================== 事件封装工具 ==================

/// 消息事件封装，提供便捷的强类型访问
pub struct MessageEvent<'a>(pub &'a Event);

impl<'a> MessageEvent<'a> {
    /// 获取群号 (如果是群消息)
    pub fn group_id(&self) -> Option<i64> {
        self.0
            .get_i64("group_id")
            .or_else(|| self.0.get_u64("group_id").map(|v| v as i64))
    }

    /// 获取用户 ID
    pub fn user_id(&self) -> i64 {
        self.0
            .get_i64("user_id")
            .or_else(|| self.0.get_u64("user_id").map(|v| v as i64))
            .unwrap_or(0)
    }

    /// 机器人自身 ID
    pub fn self_id(&self) -> i64 {
        self.0
            .get_i64("self_id")
            .or_else(|| self.0.get_u64("self_id").map(|v| v as i64))
            .unwrap_or(0)
    }

    /// 获取消息 ID
    pub fn message_id(&self) -> i64 {
        self.0
            .get_i64("message_id")
            .or_else(|| self.0.get_u64("message_id").map(|v| v as i64))
            .unwrap_or(0)
    }

    /// 是否为群消息
    pub fn is_group(&self) -> bool {
        self.0.get_str("message_type") == Some("group")
    }

    /// 获取发送者昵称
    pub fn sender_nickname(&self) -> Option<&'a str> {
        self.0.get("sender").and_then(|s| s.get_str("nickname"))
    }

    /// 获取发送者群名片 (如果为空则返回 None)
    pub fn sender_card(&self) -> Option<&'a str> {
        self.0
            .get("sender")
            .and_then(|s| s.get_str("card"))
            .filter(|s| !s.is_empty())
    }

    /// 获取发送者显示名称 (优先名片，其次昵称)
    pub fn sender_name(&self) -> &'a str {
        self.sender_card()
            .or_else(|| self.sender_nickname())
            .unwrap_or("Unknown")
    }

    /// 私聊，或群聊中 @ 了机器人
    pub fn is_to_me(&self) -> bool {
        if !self.is_group() {
            return true;
        }
        let me = self.self_id().to_string();
        let raw = self.0.get_str("raw_message").unwrap_or("");
        get_at_members_from_raw_content(raw, 0)
            .iter()
            .any(|id| *id == me)
    }
}

// ================= 模拟数据结构 =================

#[derive(Serialize)]
struct MockSender {
    user_id: i64,
    nickname: String,
    card: String,
}

#[derive(Serialize)]
struct MockMessageEvent {
    post_type: &'static str,
    message_type: &'static str,
    time: i64,
    self_id: i64,
    sub_type: &'static str,
    user_id: i64,
    message_id: i64,
    sender: MockSender,
    raw_message: String,
    message: Message,
}

#[cfg(test)]
pub(crate) fn group_event(json: serde_json::Value) -> Event {
    let mut bytes = serde_json::to_vec(&json).unwrap();
    simd_json::to_owned_value(&mut bytes).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_command_splits_on_first_space() {
        assert_eq!(
            parse_command("/zero 早上吃什么"),
            Command {
                cmd: "/zero".into(),
                content: "早上吃什么".into()
            }
        );
        assert_eq!(parse_command("/ai chat gpt-4 hi there").content, "chat gpt-4 hi there");
        assert_eq!(parse_command("  /list  ").cmd, "/list");
        assert_eq!(parse_command("/list").content, "");
    }

    #[test]
    fn etl_input_strips_cq_codes() {
        assert_eq!(etl_input("[CQ:at,qq=10001] /hello"), "/hello");
        assert_eq!(etl_input("[CQ:reply,id=5][CQ:at,qq=1] /echo &#91;x&#93;"), "/echo [x]");
    }

    #[test]
    fn at_members_respects_skip() {
        let raw = "[CQ:at,qq=10001] /ai [CQ:at,qq=20002,name=bob] [CQ:at,qq=30003]";
        assert_eq!(get_at_members_from_raw_content(raw, 0).len(), 3);
        assert_eq!(get_at_members_from_raw_content(raw, 1), vec!["20002", "30003"]);
        assert!(get_at_members_from_raw_content(raw, 3).is_empty());
    }

    #[test]
    fn payload_from_group_event() {
        let event = group_event(json!({
            "post_type": "message",
            "message_type": "group",
            "self_id": 10001,
            "group_id": 123,
            "user_id": 456,
            "message_id": 789,
            "raw_message": "[CQ:at,qq=10001] /HELP /zero",
            "sender": { "nickname": "nick", "card": "" }
        }));

        let payload = Payload::from_event(event).unwrap();
        assert_eq!(payload.command, "/help");
        assert_eq!(payload.content, "/zero");
        assert_eq!(payload.raw_content, "[CQ:at,qq=10001] /HELP /zero");

        let msg = payload.message();
        assert!(msg.is_group());
        assert!(msg.is_to_me());
        assert_eq!(msg.group_id(), Some(123));
        assert_eq!(msg.user_id(), 456);
        assert_eq!(msg.message_id(), 789);
        assert_eq!(msg.sender_name(), "nick");

        assert_eq!(payload.at_members(0), vec!["10001"]);
        assert!(payload.at_members(1).is_empty());
    }

    #[test]
    fn non_message_events_are_skipped() {
        let event = group_event(json!({ "post_type": "meta_event", "meta_event_type": "heartbeat" }));
        assert!(Payload::from_event(event).is_none());
    }

    #[test]
    fn group_message_without_mention_is_not_to_me() {
        let event = group_event(json!({
            "post_type": "message",
            "message_type": "group",
            "self_id": 10001,
            "raw_message": "/hello"
        }));
        assert!(!Payload::from_event(event).unwrap().message().is_to_me());
    }

    #[test]
    fn mock_private_message() {
        let payload = Payload::from_text(1, "ConsoleUser", 2, "/zero 吃什么").unwrap();
        assert_eq!(payload.command, "/zero");
        assert_eq!(payload.content, "吃什么");
        assert!(payload.message().is_to_me());
        assert_eq!(payload.message().sender_name(), "ConsoleUser");
    }
}
