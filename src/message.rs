use serde::Serialize;
use simd_json::base::ValueAsScalar;
use simd_json::owned::{Object, Value};

/// 消息段 (Segment)
#[derive(Debug, Serialize, Clone)]
pub struct Segment {
    #[serde(rename = "type")]
    pub type_: String,
    pub data: Object,
}

impl Segment {
    pub fn new(type_: &str, data: Object) -> Self {
        Self {
            type_: type_.to_string(),
            data,
        }
    }
}

/// 消息链 (Message Chain)
#[derive(Debug, Serialize, Clone, Default)]
pub struct Message(Vec<Segment>);

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// 通用添加方法：手动构建 Segment
    pub fn add(mut self, type_: &str, data: Object) -> Self {
        self.0.push(Segment::new(type_, data));
        self
    }

    /// 纯文本，与前一个文本段相邻时直接拼接
    pub fn text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if let Some(last) = self.0.last_mut()
            && last.type_ == "text"
        {
            let prev = last.data.get("text").and_then(|v| v.as_str()).unwrap_or("");
            let merged = format!("{}{}", prev, text);
            last.data.insert("text".into(), Value::from(merged));
            return self;
        }
        let mut data = Object::new();
        data.insert("text".into(), Value::from(text));
        self.add("text", data)
    }

    pub fn new_line(self) -> Self {
        self.text("\n")
    }

    /// QQ 表情 (ID)
    pub fn face(self, id: impl ToString) -> Self {
        let mut data = Object::new();
        data.insert("id".into(), Value::from(id.to_string()));
        self.add("face", data)
    }

    /// 图片
    /// - `file`: 图片文件名、URL、Base64 或文件路径
    pub fn image(self, file: impl Into<String>) -> Self {
        let mut data = Object::new();
        data.insert("file".into(), Value::from(file.into()));
        self.add("image", data)
    }

    /// @某人
    pub fn at(self, user_id: impl ToString) -> Self {
        let mut data = Object::new();
        data.insert("qq".into(), Value::from(user_id.to_string()));
        self.add("at", data)
    }

    /// 回复消息，引用段总是放在消息链最前面
    pub fn reply(mut self, message_id: impl ToString) -> Self {
        let mut data = Object::new();
        data.insert("id".into(), Value::from(message_id.to_string()));
        self.0.retain(|seg| seg.type_ != "reply");
        self.0.insert(0, Segment::new("reply", data));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 被引用的消息 ID
    pub fn reply_id(&self) -> Option<&str> {
        self.0
            .iter()
            .find(|seg| seg.type_ == "reply")
            .and_then(|seg| seg.data.get("id"))
            .and_then(|v| v.as_str())
    }

    /// 转换为便于日志展示的纯文本
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for seg in &self.0 {
            match seg.type_.as_str() {
                "text" => {
                    out.push_str(seg.data.get("text").and_then(|v| v.as_str()).unwrap_or(""))
                }
                "at" => {
                    out.push('@');
                    out.push_str(seg.data.get("qq").and_then(|v| v.as_str()).unwrap_or(""));
                }
                "face" => {
                    out.push_str("[表情:");
                    out.push_str(seg.data.get("id").and_then(|v| v.as_str()).unwrap_or(""));
                    out.push(']');
                }
                "image" => out.push_str("[图片]"),
                _ => {}
            }
        }
        out
    }
}
