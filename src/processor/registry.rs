use std::collections::BTreeMap;
use std::sync::Arc;

use super::HandlerRef;
use crate::debug;

/// 内容过滤条件，必须是无副作用的纯函数
pub type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// 同一命令下的一个具名过滤器
#[derive(Clone)]
pub struct HandlerFilter {
    pub predicate: Predicate,
    pub must: Vec<HandlerRef>,
    pub optional: Vec<HandlerRef>,
    pub description: String,
    pub example: String,
}

/// 过滤器的展示信息，供 /list 与 /help 使用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    pub command_key: String,
    pub command_name: String,
    pub description: String,
    pub example: String,
}

type FilterMap = BTreeMap<String, BTreeMap<String, HandlerFilter>>;

/// 启动阶段的注册器，`build` 之后变为只读的 [`Registry`]
#[derive(Default)]
pub struct RegistryBuilder {
    filters: FilterMap,
    default_must: Vec<HandlerRef>,
    default_optional: Vec<HandlerRef>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册命令过滤器，相同 (命令, 名称) 后注册的覆盖先注册的
    #[allow(clippy::too_many_arguments)]
    pub fn register_command<P>(
        &mut self,
        command_key: &str,
        command_name: &str,
        description: &str,
        example: &str,
        predicate: P,
        must: Vec<HandlerRef>,
        optional: Vec<HandlerRef>,
    ) -> &mut Self
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        let filter = HandlerFilter {
            predicate: Arc::new(predicate),
            must,
            optional,
            description: description.to_string(),
            example: example.to_string(),
        };

        let previous = self
            .filters
            .entry(command_key.to_string())
            .or_default()
            .insert(command_name.to_string(), filter);

        if previous.is_some() {
            debug!(target: "Registry", "覆盖已注册的命令: {} / {}", command_key, command_name);
        }
        self
    }

    /// 追加默认处理器，多次调用会累加而不是替换
    pub fn set_default_handlers(
        &mut self,
        must: Vec<HandlerRef>,
        optional: Vec<HandlerRef>,
    ) -> &mut Self {
        self.default_must.extend(must);
        self.default_optional.extend(optional);
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            filters: self.filters,
            default_must: self.default_must,
            default_optional: self.default_optional,
        }
    }
}

/// 只读的命令表，可在多个分发任务间共享
pub struct Registry {
    filters: FilterMap,
    default_must: Vec<HandlerRef>,
    default_optional: Vec<HandlerRef>,
}

impl Registry {
    /// 查找 (命令, 内容) 对应的 (必须处理器, 可选处理器)
    ///
    /// 命令未注册，或没有任何过滤器命中时，返回默认处理器。
    /// 多个过滤器命中时按过滤器名称顺序拼接。
    pub fn resolve(&self, command_key: &str, content: &str) -> (Vec<HandlerRef>, Vec<HandlerRef>) {
        let Some(filters) = self.filters.get(command_key) else {
            return self.defaults();
        };

        let mut must = Vec::new();
        let mut optional = Vec::new();
        for filter in filters.values() {
            if (filter.predicate)(content) {
                must.extend(filter.must.iter().cloned());
                optional.extend(filter.optional.iter().cloned());
            }
        }

        if must.is_empty() && optional.is_empty() {
            return self.defaults();
        }
        (must, optional)
    }

    fn defaults(&self) -> (Vec<HandlerRef>, Vec<HandlerRef>) {
        (self.default_must.clone(), self.default_optional.clone())
    }

    pub fn list_filters_for_key(&self, command_key: &str) -> BTreeMap<String, HandlerInfo> {
        self.filters
            .get(command_key)
            .map(|filters| {
                filters
                    .iter()
                    .map(|(name, filter)| (name.clone(), info(command_key, name, filter)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn list_all_keys(&self) -> Vec<String> {
        self.filters.keys().cloned().collect()
    }

    /// 命令下所有接受该内容的过滤器信息
    pub fn match_filter_metadata(&self, command_key: &str, content: &str) -> Vec<HandlerInfo> {
        self.filters
            .get(command_key)
            .map(|filters| {
                filters
                    .iter()
                    .filter(|(_, filter)| (filter.predicate)(content))
                    .map(|(name, filter)| info(command_key, name, filter))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn info(command_key: &str, name: &str, filter: &HandlerFilter) -> HandlerInfo {
    HandlerInfo {
        command_key: command_key.to_string(),
        command_name: name.to_string(),
        description: filter.description.clone(),
        example: filter.example.clone(),
    }
}
