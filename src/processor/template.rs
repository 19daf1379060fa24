//! 内置命令的回复文案

use super::HandlerInfo;

const NOT_FOUND: &str = "没有找到结果";
const NO_COMMANDS: &str = "该功能下没有命令";

pub fn not_matched_command(command: &str, content: &str) -> String {
    format!(
        "很抱歉，没有找到这个命令，这个命令可能不存在或者仍在测试中，命令：{}，参数：{}",
        command, content
    )
}

pub fn command_argument_info(index: usize, info: &HandlerInfo) -> String {
    format!(
        "{}. {}: {}\n描述：{}\n\n使用示例：\n{}\n",
        index, info.command_key, info.command_name, info.description, info.example
    )
}

pub fn incorrect_command_argument(infos: &[HandlerInfo]) -> String {
    format!(
        "很抱歉，您的命令输入有误，您使用的命令可能是：\n{}",
        join_or(infos, NOT_FOUND, command_argument_info)
    )
}

pub fn command_help_argument(command: &str, content: &str, infos: &[HandlerInfo]) -> String {
    format!(
        "功能{}，参数{}的命令使用提示如下：\n{}",
        command,
        content,
        join_or(infos, NOT_FOUND, command_argument_info)
    )
}

pub fn help_info(index: usize, info: &HandlerInfo) -> String {
    format!("{}. {}: {}", index, info.command_name, info.description)
}

pub fn list_help_info(command: &str, infos: &[HandlerInfo]) -> String {
    format!(
        "功能{}的命令如下：\n{}",
        command,
        join_or(infos, NO_COMMANDS, help_info)
    )
}

pub fn service_info(index: usize, service: &str) -> String {
    format!("{}. {}", index, service)
}

pub fn list_all_service_info(services: &[String]) -> String {
    let body = if services.is_empty() {
        NOT_FOUND.to_string()
    } else {
        services
            .iter()
            .enumerate()
            .map(|(i, s)| format!("\n{}", service_info(i + 1, s)))
            .collect()
    };
    format!("所有功能如下：\n{}", body)
}

// 每一项前面带一个换行，序号从 1 开始
fn join_or(infos: &[HandlerInfo], empty: &str, item: fn(usize, &HandlerInfo) -> String) -> String {
    if infos.is_empty() {
        return empty.to_string();
    }
    infos
        .iter()
        .enumerate()
        .map(|(i, info)| format!("\n{}", item(i + 1, info)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str) -> HandlerInfo {
        HandlerInfo {
            command_key: "/zero".into(),
            command_name: name.into(),
            description: "菜单".into(),
            example: "/zero 吃什么".into(),
        }
    }

    #[test]
    fn not_matched_mentions_command_and_content() {
        assert_eq!(
            not_matched_command("/foo", "bar"),
            "很抱歉，没有找到这个命令，这个命令可能不存在或者仍在测试中，命令：/foo，参数：bar"
        );
    }

    #[test]
    fn empty_lists_use_placeholders() {
        assert_eq!(
            incorrect_command_argument(&[]),
            "很抱歉，您的命令输入有误，您使用的命令可能是：\n没有找到结果"
        );
        assert_eq!(list_help_info("/x", &[]), "功能/x的命令如下：\n该功能下没有命令");
        assert_eq!(list_all_service_info(&[]), "所有功能如下：\n没有找到结果");
    }

    #[test]
    fn list_items_are_numbered() {
        assert_eq!(
            list_help_info("/zero", &[info("a"), info("b")]),
            "功能/zero的命令如下：\n\n1. a: 菜单\n2. b: 菜单"
        );
        assert_eq!(
            list_all_service_info(&["/help".to_string(), "/list".to_string()]),
            "所有功能如下：\n\n1. /help\n2. /list"
        );
    }

    #[test]
    fn help_lists_usage_examples() {
        let text = command_help_argument("/zero", "吃什么", &[info("menu")]);
        assert_eq!(
            text,
            "功能/zero，参数吃什么的命令使用提示如下：\n\n1. /zero: menu\n描述：菜单\n\n使用示例：\n/zero 吃什么\n"
        );
    }
}
