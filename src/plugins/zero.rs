use super::{Command, Plugin};
use crate::config::{AppConfig, build_config};
use crate::event::Payload;
use crate::message::Message;
use async_trait::async_trait;
use chrono::{Local, Timelike};
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use toml::Value;

const CLOSED: &str = "饭店这个时候都关了，吃西北风吧";

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
struct Config {
    enabled: bool,
    breakfast: Vec<String>,
    lunch: Vec<String>,
    dinner: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let list = |items: &[&str]| -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        };
        Self {
            enabled: true,
            breakfast: list(&["豆浆油条", "小笼包", "煎饼果子", "皮蛋瘦肉粥"]),
            lunch: list(&["黄焖鸡米饭", "兰州拉面", "麻辣香锅", "酸菜鱼"]),
            dinner: list(&["火锅", "烧烤", "螺蛳粉", "饺子"]),
        }
    }
}

pub fn default_config() -> Value {
    build_config(Config::default())
}

pub fn build(config: &AppConfig) -> Box<dyn Plugin> {
    let menu = config
        .get_plugin_config::<Config>("zero")
        .unwrap_or_default();
    Box::new(ZeroPlugin {
        menu: Arc::new(menu),
    })
}

pub struct ZeroPlugin {
    menu: Arc<Config>,
}

impl Plugin for ZeroPlugin {
    fn trigger_key(&self) -> &str {
        "/zero"
    }

    fn commands(&self) -> Vec<Arc<dyn Command>> {
        vec![Arc::new(MenuCommand {
            menu: self.menu.clone(),
        })]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

impl Meal {
    /// 按小时推断当前是哪一餐，深夜返回 None
    fn at_hour(hour: u32) -> Option<Self> {
        match hour {
            6..=9 => Some(Meal::Breakfast),
            10..=14 => Some(Meal::Lunch),
            15..=23 => Some(Meal::Dinner),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Meal::Breakfast => "早餐",
            Meal::Lunch => "午餐",
            Meal::Dinner => "晚餐",
        }
    }
}

struct MenuCommand {
    menu: Arc<Config>,
}

impl MenuCommand {
    fn pick(&self, meal: Meal) -> Option<&str> {
        let list = match meal {
            Meal::Breakfast => &self.menu.breakfast,
            Meal::Lunch => &self.menu.lunch,
            Meal::Dinner => &self.menu.dinner,
        };
        list.choose(&mut rand::rng()).map(|s| s.as_str())
    }

    fn suggest(&self, content: &str, hour: u32, name: &str) -> String {
        let meal = match content {
            "早上吃什么" => Some(Meal::Breakfast),
            "中午吃什么" => Some(Meal::Lunch),
            "晚上吃什么" => Some(Meal::Dinner),
            _ => Meal::at_hour(hour),
        };

        match meal.and_then(|m| self.pick(m).map(|dish| (m, dish))) {
            Some((meal, dish)) => format!("{}今天{}的食谱为：{}", name, meal.label(), dish),
            None => CLOSED.to_string(),
        }
    }
}

#[async_trait]
impl Command for MenuCommand {
    fn name(&self) -> &str {
        "menu"
    }

    fn description(&self) -> &str {
        "食谱菜单"
    }

    fn example(&self) -> &str {
        "/zero 吃什么\n/zero ${早上/中午/晚上}吃什么"
    }

    fn triggered(&self, content: &str) -> bool {
        matches!(content, "吃什么" | "早上吃什么" | "中午吃什么" | "晚上吃什么")
    }

    async fn handle(&self, payload: &Payload) -> Message {
        let event = payload.message();
        let text = self.suggest(&payload.content, Local::now().hour(), event.sender_name());
        Message::new().at(event.user_id()).text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> MenuCommand {
        MenuCommand {
            menu: Arc::new(Config {
                enabled: true,
                breakfast: vec!["粥".into()],
                lunch: vec!["面".into()],
                dinner: vec![],
            }),
        }
    }

    #[test]
    fn triggers_on_known_questions_only() {
        let cmd = command();
        assert!(cmd.triggered("吃什么"));
        assert!(cmd.triggered("晚上吃什么"));
        assert!(!cmd.triggered("喝什么"));
        assert!(!cmd.triggered(" 吃什么"));
    }

    #[test]
    fn picks_meal_by_hour() {
        let cmd = command();
        assert_eq!(cmd.suggest("吃什么", 7, "小明"), "小明今天早餐的食谱为：粥");
        assert_eq!(cmd.suggest("吃什么", 12, "小明"), "小明今天午餐的食谱为：面");
        assert_eq!(cmd.suggest("吃什么", 3, "小明"), CLOSED);
    }

    #[test]
    fn explicit_meal_ignores_hour() {
        let cmd = command();
        assert_eq!(cmd.suggest("早上吃什么", 23, "A"), "A今天早餐的食谱为：粥");
        // 晚餐菜单为空
        assert_eq!(cmd.suggest("晚上吃什么", 18, "A"), CLOSED);
    }

    #[test]
    fn menu_is_read_from_config_table() {
        let config: AppConfig = toml::from_str("[zero]\nbreakfast = [\"包子\"]\n").unwrap();
        let menu = config.get_plugin_config::<Config>("zero").unwrap();
        assert_eq!(menu.breakfast, vec!["包子"]);
        // 未配置的餐次沿用默认菜单
        assert!(!menu.dinner.is_empty());
    }
}
