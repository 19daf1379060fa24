use async_trait::async_trait;
use qqchannel::build_registry;
use qqchannel::config::AppConfig;
use qqchannel::event::Payload;
use qqchannel::message::Message;
use qqchannel::processor::{Context, Dispatcher, Flow, Handler, RegistryBuilder, ReplyClient};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorder {
    replies: Mutex<Vec<String>>,
}

impl Recorder {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.replies.lock().unwrap())
    }
}

#[async_trait]
impl ReplyClient for Recorder {
    async fn reply_message(&self, _payload: &Payload, msg: Message) {
        self.replies.lock().unwrap().push(msg.plain_text());
    }

    async fn send_message(&self, _payload: &Payload, msg: Message) {
        self.replies.lock().unwrap().push(msg.plain_text());
    }
}

fn message(text: &str) -> Payload {
    Payload::from_text(7, "Tester", 1, text).unwrap()
}

fn console_config(undefined_reply: &str) -> AppConfig {
    toml::from_str(&format!(
        "[bot]\nprotocol = \"console\"\nundefined_reply = \"{}\"\n",
        undefined_reply
    ))
    .unwrap()
}

#[tokio::test]
async fn full_registry_routes_plugin_commands() {
    let recorder = Arc::new(Recorder::default());
    let registry = Arc::new(build_registry(&console_config("not_matched")));
    let dispatcher = Dispatcher::new(registry, recorder.clone());

    dispatcher.dispatch(message("/hello")).await;
    assert_eq!(recorder.take(), vec!["@7Hello, Tester!"]);

    dispatcher.dispatch(message("/mihoyo ys")).await;
    assert_eq!(
        recorder.take(),
        vec!["@7[表情:74]原神相关功能仍在开发适配中，敬请期待！"]
    );

    // 默认配置只开放小尺寸，不会请求接口
    dispatcher.dispatch(message("/ai draw 大 a cat")).await;
    assert_eq!(recorder.take(), vec!["您没有使用大画画的权限"]);

    dispatcher.dispatch(message("/zero 早上吃什么")).await;
    let reply = recorder.take();
    assert_eq!(reply.len(), 1);
    assert!(reply[0].starts_with("@7Tester今天早餐的食谱为："));
}

#[tokio::test]
async fn unknown_commands_use_configured_fallback() {
    let recorder = Arc::new(Recorder::default());
    let dispatcher = Dispatcher::new(
        Arc::new(build_registry(&console_config("not_matched"))),
        recorder.clone(),
    );
    dispatcher.dispatch(message("/weather 北京")).await;
    assert_eq!(
        recorder.take(),
        vec!["很抱歉，没有找到这个命令，这个命令可能不存在或者仍在测试中，命令：/weather，参数：北京"]
    );

    let silent = Arc::new(Recorder::default());
    let dispatcher = Dispatcher::new(
        Arc::new(build_registry(&console_config("ignore"))),
        silent.clone(),
    );
    dispatcher.dispatch(message("/weather 北京")).await;
    assert!(silent.take().is_empty());
}

#[tokio::test]
async fn help_and_list_describe_registered_plugins() {
    let recorder = Arc::new(Recorder::default());
    let dispatcher = Dispatcher::new(
        Arc::new(build_registry(&console_config("ignore"))),
        recorder.clone(),
    );

    dispatcher.dispatch(message("/list")).await;
    assert_eq!(
        recorder.take(),
        vec!["所有功能如下：\n\n1. /ai\n2. /hello\n3. /help\n4. /list\n5. /mihoyo\n6. /zero"]
    );

    dispatcher.dispatch(message("/list /mihoyo")).await;
    assert_eq!(
        recorder.take(),
        vec!["功能/mihoyo的命令如下：\n\n1. genshin: 原神相关命令\n2. star-rail: 星穹铁道相关指令"]
    );

    dispatcher.dispatch(message("/list /ai")).await;
    assert_eq!(
        recorder.take(),
        vec!["功能/ai的命令如下：\n\n1. ChatGPT: 与ChatGPT对话\n2. Dalle: 使用Dalle画画"]
    );

    dispatcher.dispatch(message("/help /zero 吃什么")).await;
    let help = recorder.take();
    assert!(help[0].contains("1. /zero: menu"));
    assert!(help[0].contains("描述：食谱菜单"));
}

/// 必须处理器：记录本次分发结束
struct Audit(Arc<Mutex<Vec<String>>>);

#[async_trait]
impl Handler for Audit {
    async fn handle(&self, ctx: &mut Context) -> Flow {
        self.0
            .lock()
            .unwrap()
            .push(format!("audit {}", ctx.payload().command));
        Flow::Continue
    }
}

/// 内容为空时拒绝继续
struct Guard;

#[async_trait]
impl Handler for Guard {
    async fn handle(&self, ctx: &mut Context) -> Flow {
        if ctx.payload().content.trim().is_empty() {
            ctx.reply(Message::new().text("缺少参数")).await;
            return Flow::Stop;
        }
        Flow::Continue
    }
}

struct Echo;

#[async_trait]
impl Handler for Echo {
    async fn handle(&self, ctx: &mut Context) -> Flow {
        let text = ctx.payload().content.clone();
        ctx.reply(Message::new().text(text)).await;
        Flow::Continue
    }
}

#[tokio::test]
async fn stop_short_circuits_but_audit_always_runs() {
    let recorder = Arc::new(Recorder::default());
    let audit = Arc::new(Mutex::new(Vec::new()));

    let mut builder = RegistryBuilder::new();
    builder.register_command(
        "/echo",
        "echo",
        "复读",
        "/echo 内容",
        |_| true,
        vec![Arc::new(Audit(audit.clone()))],
        vec![Arc::new(Guard), Arc::new(Echo)],
    );
    let dispatcher = Dispatcher::new(Arc::new(builder.build()), recorder.clone());

    dispatcher.dispatch(message("/echo hi")).await;
    dispatcher.dispatch(message("/echo")).await;

    assert_eq!(recorder.take(), vec!["hi", "缺少参数"]);
    assert_eq!(*audit.lock().unwrap(), vec!["audit /echo", "audit /echo"]);
}

#[tokio::test]
async fn dispatches_run_concurrently_without_sharing_state() {
    let recorder = Arc::new(Recorder::default());
    let mut builder = RegistryBuilder::new();
    builder.register_command("/echo", "echo", "", "", |_| true, vec![], vec![Arc::new(Echo)]);
    let dispatcher = Dispatcher::new(Arc::new(builder.build()), recorder.clone());

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch(message(&format!("/echo {}", i))).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let mut replies = recorder.take();
    replies.sort_by_key(|s| s.parse::<u32>().unwrap());
    let expected: Vec<String> = (0..16).map(|i| i.to_string()).collect();
    assert_eq!(replies, expected);
}
