use super::{Command, Plugin};
use crate::config::{AppConfig, build_config};
use crate::event::Payload;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use toml::Value;

/// QQ 表情 [太阳]
const FACE_SUN: u32 = 74;

#[derive(Serialize, Deserialize)]
struct Config {
    enabled: bool,
}

pub fn default_config() -> Value {
    build_config(Config { enabled: true })
}

pub fn build(_config: &AppConfig) -> Box<dyn Plugin> {
    Box::new(MihoyoPlugin)
}

pub struct MihoyoPlugin;

impl Plugin for MihoyoPlugin {
    fn trigger_key(&self) -> &str {
        "/mihoyo"
    }

    fn commands(&self) -> Vec<Arc<dyn Command>> {
        vec![
            Arc::new(GameCommand {
                name: "genshin",
                description: "原神相关命令",
                example: "/mihoyo gs [命令]\n/mihoyo ys [命令]",
                prefixes: &["gs", "ys"],
                notice: "原神相关功能仍在开发适配中，敬请期待！",
            }),
            Arc::new(GameCommand {
                name: "star-rail",
                description: "星穹铁道相关指令",
                example: "/mihoyo sr [命令]",
                prefixes: &["sr"],
                notice: "星铁相关功能仍在开发适配中，敬请期待！",
            }),
        ]
    }
}

/// 尚未接入的游戏功能，统一回复开发中提示
struct GameCommand {
    name: &'static str,
    description: &'static str,
    example: &'static str,
    prefixes: &'static [&'static str],
    notice: &'static str,
}

#[async_trait]
impl Command for GameCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn example(&self) -> &str {
        self.example
    }

    fn triggered(&self, content: &str) -> bool {
        self.prefixes.iter().any(|p| content.starts_with(p))
    }

    async fn handle(&self, payload: &Payload) -> Message {
        Message::new()
            .at(payload.message().user_id())
            .face(FACE_SUN)
            .text(self.notice)
    }
}
