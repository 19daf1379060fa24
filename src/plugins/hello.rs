use super::{Command, Plugin};
use crate::config::{AppConfig, build_config};
use crate::event::Payload;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use toml::Value;

#[derive(Serialize, Deserialize)]
struct Config {
    enabled: bool,
}

pub fn default_config() -> Value {
    build_config(Config { enabled: true })
}

pub fn build(_config: &AppConfig) -> Box<dyn Plugin> {
    Box::new(HelloPlugin)
}

pub struct HelloPlugin;

impl Plugin for HelloPlugin {
    fn trigger_key(&self) -> &str {
        "/hello"
    }

    fn commands(&self) -> Vec<Arc<dyn Command>> {
        vec![Arc::new(HelloCommand)]
    }
}

struct HelloCommand;

#[async_trait]
impl Command for HelloCommand {
    fn name(&self) -> &str {
        "Hello"
    }

    fn description(&self) -> &str {
        "你好，世界！"
    }

    fn example(&self) -> &str {
        "/hello"
    }

    fn triggered(&self, _content: &str) -> bool {
        true
    }

    async fn handle(&self, payload: &Payload) -> Message {
        let event = payload.message();
        Message::new()
            .at(event.user_id())
            .text(format!("Hello, {}!", event.sender_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn greets_sender_by_name() {
        let payload = Payload::from_text(42, "Alice", 1, "/hello").unwrap();
        let reply = HelloCommand.handle(&payload).await;
        assert_eq!(reply.plain_text(), "@42Hello, Alice!");
    }
}
