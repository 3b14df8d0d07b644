//! 错误类型定义

use thiserror::Error;

/// 配置加载 / 订阅源校验错误（启动阶段即失败）
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("解析配置文件失败: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("订阅源 #{index} 无效 ({url}): {reason}")]
    InvalidSource {
        index: usize,
        url: String,
        reason: String,
    },

    #[error("订阅源 #{index} 疑似多个链接被拼接在一起 ({count} 个协议头): {url}")]
    ConcatenatedSource {
        index: usize,
        url: String,
        count: usize,
    },

    #[error("订阅源 #{index} 与前面的条目重复: {url}")]
    DuplicateSource { index: usize, url: String },

    #[error("没有启用的订阅源")]
    NoSources,

    #[error("配置项 {field} 无效: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// 单个订阅源的获取 / 解析错误（可恢复，跳过该源）
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YAML 解析失败: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("订阅内容不是映射结构")]
    NotAMapping,

    #[error("proxies 字段不是列表")]
    ProxiesNotASequence,

    #[cfg(test)]
    #[error("订阅不可用: {0}")]
    Unavailable(String),
}
