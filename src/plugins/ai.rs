use super::{Command, Plugin};
use crate::config::{AppConfig, build_config};
use crate::event::Payload;
use crate::message::Message;
use crate::{error, info};
use anyhow::{Context, Result, bail};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        chat::{
            ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
            ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        },
        images::{CreateImageRequestArgs, Image, ImageResponseFormat, ImageSize},
    },
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use toml::Value;

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const SUPPORTED_MODELS: &[&str] = &[
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
    "gpt-3.5-turbo-0613",
    "gpt-3.5-turbo-16k-0613",
    "gpt-4",
    "gpt-4-poe",
    "gpt-4-0314",
    "gpt-4-0613",
];

/// 每千 token 的价格 (提问, 回答)，单位 CNY，只对默认模型计费
const PRICE_PER_K: (f64, f64) = (0.03, 0.04);

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
struct Config {
    enabled: bool,
    base_url: String,
    api_key: String,
    prompt: String,
    model: String,
    temperature: f32,
    presence_penalty: f32,
    frequency_penalty: f32,
    timeout_second: u64,
    /// 允许的画画尺寸：small / medium / large
    draw_sizes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            prompt: "你是一个乐于助人的 QQ 频道机器人，请用简洁的中文回答。".to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.5,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            timeout_second: 120,
            draw_sizes: vec!["small".to_string()],
        }
    }
}

pub fn default_config() -> Value {
    build_config(Config::default())
}

pub fn build(config: &AppConfig) -> Box<dyn Plugin> {
    let cfg = config.get_plugin_config::<Config>("ai").unwrap_or_default();
    let client = Client::with_config(
        OpenAIConfig::new()
            .with_api_base(&cfg.base_url)
            .with_api_key(&cfg.api_key),
    );
    Box::new(AiPlugin {
        draw: Arc::new(DrawCommand {
            client: client.clone(),
            config: cfg.clone(),
        }),
        chat: Arc::new(ChatCommand { client, config: cfg }),
    })
}

pub struct AiPlugin {
    chat: Arc<ChatCommand>,
    draw: Arc<DrawCommand>,
}

impl Plugin for AiPlugin {
    fn trigger_key(&self) -> &str {
        "/ai"
    }

    fn commands(&self) -> Vec<Arc<dyn Command>> {
        vec![self.chat.clone(), self.draw.clone()]
    }
}

/// 采样参数，超出 [0, 1] 的值会被修正
#[derive(Debug, Clone, PartialEq)]
struct ChatOptions {
    model: String,
    temperature: f32,
    presence_penalty: f32,
    frequency_penalty: f32,
}

impl ChatOptions {
    fn normalized(mut self) -> Self {
        if !is_supported(&self.model) {
            self.model = DEFAULT_MODEL.to_string();
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            self.temperature = 0.5;
        }
        if !(0.0..=1.0).contains(&self.presence_penalty) {
            self.presence_penalty = 0.0;
        }
        if !(0.0..=1.0).contains(&self.frequency_penalty) {
            self.frequency_penalty = 0.0;
        }
        self
    }
}

fn is_supported(model: &str) -> bool {
    SUPPORTED_MODELS.contains(&model)
}

/// 解析 `chat [模型] 问题`，第二个词是已知模型名时视为模型选项
fn parse_question(content: &str) -> (Option<&str>, String) {
    let mut words = content.split(' ').skip(1);
    let first = words.next().unwrap_or("");
    if is_supported(first) {
        (Some(first), words.collect::<Vec<_>>().join(" "))
    } else {
        let rest: Vec<&str> = std::iter::once(first).chain(words).collect();
        (None, rest.join(" "))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

fn footer(model: &str, usage: Usage) -> String {
    if model == DEFAULT_MODEL {
        let cost = usage.prompt_tokens as f64 / 1000.0 * PRICE_PER_K.0
            + usage.completion_tokens as f64 / 1000.0 * PRICE_PER_K.1;
        format!(
            "回复自{}模型\ntoken消耗：{}，扣费: {:.6} CNY",
            model, usage.total_tokens, cost
        )
    } else {
        format!(
            "回复自{}模型\ntoken消耗：{}，扣费: N/A(只支持GPT3.5计算费用)",
            model, usage.total_tokens
        )
    }
}

struct ChatCommand {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl ChatCommand {
    fn options(&self, model: Option<&str>) -> ChatOptions {
        ChatOptions {
            model: model.unwrap_or(&self.config.model).to_string(),
            temperature: self.config.temperature,
            presence_penalty: self.config.presence_penalty,
            frequency_penalty: self.config.frequency_penalty,
        }
        .normalized()
    }

    async fn ask(&self, question: &str, options: &ChatOptions) -> Result<(String, Usage)> {
        let mut msgs: Vec<ChatCompletionRequestMessage> = Vec::new();
        if !self.config.prompt.is_empty() {
            msgs.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(self.config.prompt.clone())
                    .build()?
                    .into(),
            );
        }
        msgs.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(question)
                .build()?
                .into(),
        );

        let req = CreateChatCompletionRequestArgs::default()
            .model(&options.model)
            .messages(msgs)
            .temperature(options.temperature)
            .presence_penalty(options.presence_penalty)
            .frequency_penalty(options.frequency_penalty)
            .top_p(1.0)
            .build()
            .context("请求构建失败")?;

        let timeout = Duration::from_secs(self.config.timeout_second.max(1));
        let res = tokio::time::timeout(timeout, self.client.chat().create(req))
            .await
            .context("请求超时")?
            .context("请求失败")?;

        let Some(content) = res
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
        else {
            bail!("ERROR: 没有回复");
        };

        let usage = res
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();
        Ok((content, usage))
    }
}

#[async_trait]
impl Command for ChatCommand {
    fn name(&self) -> &str {
        "ChatGPT"
    }

    fn description(&self) -> &str {
        "与ChatGPT对话"
    }

    fn example(&self) -> &str {
        "/ai chat [对话内容]\n/ai chat gpt-4 [对话内容]"
    }

    fn triggered(&self, content: &str) -> bool {
        content.starts_with("chat ")
    }

    async fn handle(&self, payload: &Payload) -> Message {
        let start = Instant::now();
        let event = payload.message();
        let (model, question) = parse_question(&payload.content);
        let options = self.options(model);

        let (reply, footer) = match self.ask(&question, &options).await {
            Ok((answer, usage)) => (answer, footer(&options.model, usage)),
            Err(e) => {
                error!(target: "AI", "对话失败: {:#}", e);
                (format!("{:#}", e), String::new())
            }
        };
        info!(
            target: "AI",
            "complete conversation: [{}] {} -> {}",
            options.model,
            question,
            reply
        );

        Message::new()
            .at(event.user_id())
            .new_line()
            .text(reply)
            .new_line()
            .text(footer)
            .new_line()
            .text(format!("耗时: {:.2?}", start.elapsed()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrawSize {
    Small,
    Medium,
    Large,
}

impl DrawSize {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "小" | "small" | "s" | "1" => Some(DrawSize::Small),
            "中" | "medium" | "m" | "2" => Some(DrawSize::Medium),
            "大" | "large" | "l" | "3" => Some(DrawSize::Large),
            _ => None,
        }
    }

    /// 配置 `draw_sizes` 中使用的名字
    fn key(self) -> &'static str {
        match self {
            DrawSize::Small => "small",
            DrawSize::Medium => "medium",
            DrawSize::Large => "large",
        }
    }

    fn label(self) -> &'static str {
        match self {
            DrawSize::Small => "小",
            DrawSize::Medium => "中",
            DrawSize::Large => "大",
        }
    }

    fn request_size(self) -> ImageSize {
        match self {
            DrawSize::Small => ImageSize::S256x256,
            DrawSize::Medium => ImageSize::S512x512,
            DrawSize::Large => ImageSize::S1024x1024,
        }
    }
}

/// 解析 `draw [尺寸] 描述`，只有描述之前还有内容时第二个词才会被当作尺寸
fn parse_draw(content: &str) -> Option<(DrawSize, String)> {
    let args: Vec<&str> = content.split(' ').collect();
    let (size, prompt) = match args.as_slice() {
        [] | [_] => return None,
        [_, prompt] => (DrawSize::Small, prompt.to_string()),
        [_, word, rest @ ..] => match DrawSize::parse(word) {
            Some(size) => (size, rest.join(" ")),
            None => (DrawSize::Small, args[1..].join(" ")),
        },
    };
    if prompt.trim().is_empty() {
        return None;
    }
    Some((size, prompt))
}

struct DrawCommand {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl DrawCommand {
    fn allowed(&self, size: DrawSize) -> bool {
        self.config.draw_sizes.iter().any(|s| s == size.key())
    }

    async fn draw(&self, prompt: &str, size: DrawSize) -> Result<String> {
        let req = CreateImageRequestArgs::default()
            .prompt(prompt)
            .n(1u8)
            .size(size.request_size())
            .response_format(ImageResponseFormat::Url)
            .build()
            .context("请求构建失败")?;

        let timeout = Duration::from_secs(self.config.timeout_second.max(1));
        let res = tokio::time::timeout(timeout, self.client.images().generate(req))
            .await
            .context("请求超时")?
            .context("请求失败")?;

        match res.data.first().map(|image| image.as_ref()) {
            Some(Image::Url { url, .. }) => Ok(url.clone()),
            _ => bail!("没有返回图片地址"),
        }
    }
}

#[async_trait]
impl Command for DrawCommand {
    fn name(&self) -> &str {
        "Dalle"
    }

    fn description(&self) -> &str {
        "使用Dalle画画"
    }

    fn example(&self) -> &str {
        "/ai draw [(可选)画画大小，小/中/大] [画画描述]"
    }

    fn triggered(&self, content: &str) -> bool {
        content.starts_with("draw ")
    }

    async fn handle(&self, payload: &Payload) -> Message {
        let Some((size, prompt)) = parse_draw(&payload.content) else {
            return Message::new().text("请输入画画描述");
        };
        if !self.allowed(size) {
            return Message::new().text(format!("您没有使用{}画画的权限", size.label()));
        }

        match self.draw(&prompt, size).await {
            Ok(url) => {
                info!(target: "AI", "draw [{}] {} -> {}", size.key(), prompt, url);
                Message::new().image(url)
            }
            Err(e) => {
                error!(target: "AI", "画画失败: {:#}", e);
                Message::new().text(format!("画画失败，请联系管理员查看：{:#}", e))
            }
        }
    }
}
