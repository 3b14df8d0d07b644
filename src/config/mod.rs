use crate::error::ConfigError;
use crate::proxy::UNREACHABLE_DELAY;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

lazy_static! {
    // 用于识别多个链接被直接拼接成一个字符串的情况
    static ref SCHEME_MARKER: Regex = Regex::new(r"(?i)https?://").expect("scheme regex");
}

/// 内置的订阅源列表，每一项都是独立的链接
const DEFAULT_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/YFTree/ClashNodes/refs/heads/main/Clash/2.yaml",
    "https://raw.githubusercontent.com/YFTree/ClashNodes/refs/heads/main/Clash/1.yaml",
    "https://raw.githubusercontent.com/shaoyouvip/free/refs/heads/main/mihomo.yaml",
    "https://raw.githubusercontent.com/JanuaryEleX/clash/refs/heads/main/1.yaml",
    "https://raw.githubusercontent.com/Roywaller/update-clash/refs/heads/main/clash.yaml",
    "https://raw.githubusercontent.com/jiaxiezheng/clash-zjx/refs/heads/main/zjx(1).yaml",
    "https://raw.githubusercontent.com/anaer/Sub/refs/heads/main/clash.yaml",
    "https://fastly.jsdelivr.net/gh/freenodes/freenodes@main/clash.yaml",
    "https://raw.githubusercontent.com/jiaxiezheng/clash-zjx/refs/heads/main/zhengjx-vmess_clash_config.yaml",
    "https://raw.githubusercontent.com/zhangkaiitugithub/passcro/main/speednodes.yaml",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub name: String,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// 生成的 Clash 配置中的固定字段
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub port: u16,
    pub socks_port: u16,
    pub allow_lan: bool,
    pub mode: String,
    pub log_level: String,
    pub external_controller: String,
    // url-test 组的测速地址与间隔（秒）
    pub test_url: String,
    pub test_interval: u64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            port: 7890,
            socks_port: 7891,
            allow_lan: true,
            mode: "Rule".to_string(),
            log_level: "info".to_string(),
            external_controller: "127.0.0.1:9090".to_string(),
            test_url: "http://www.gstatic.com/generate_204".to_string(),
            test_interval: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // 进度显示
    pub print_progress: bool,

    // 订阅获取参数（毫秒）
    pub fetch_timeout: u64,
    pub fetch_concurrent: usize,

    // 测速参数（毫秒）
    pub probe_timeout: u64,
    pub probe_concurrent: usize,

    // 数量上限：去重后保留数、最终输出数
    pub dedupe_limit: usize,
    pub select_limit: usize,

    // 订阅配置
    pub subscriptions: Vec<Subscription>,

    // 输出配置
    pub output_path: String,
    pub output: OutputSettings,

    // 日志配置
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            print_progress: true,
            fetch_timeout: 15_000,
            fetch_concurrent: 1,
            probe_timeout: 1_000,
            probe_concurrent: 1,
            dedupe_limit: 50,
            select_limit: 20,
            subscriptions: DEFAULT_SOURCES
                .iter()
                .enumerate()
                .map(|(i, url)| Subscription {
                    name: format!("订阅-{}", i + 1),
                    url: url.to_string(),
                    enabled: true,
                })
                .collect(),
            output_path: "subscription.yaml".to_string(),
            output: OutputSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// 校验数值类配置，以及全部启用的订阅源
    pub fn validate(&self) -> Result<SourceList, ConfigError> {
        if self.fetch_timeout == 0 {
            return Err(invalid("fetch_timeout", "必须大于 0"));
        }
        if self.probe_timeout == 0 {
            return Err(invalid("probe_timeout", "必须大于 0"));
        }
        // 实测延迟不能达到不可达标记值
        if self.probe_timeout as f64 >= UNREACHABLE_DELAY {
            return Err(invalid(
                "probe_timeout",
                &format!("必须小于 {} 毫秒", UNREACHABLE_DELAY),
            ));
        }
        if self.fetch_concurrent == 0 {
            return Err(invalid("fetch_concurrent", "至少为 1"));
        }
        if self.probe_concurrent == 0 {
            return Err(invalid("probe_concurrent", "至少为 1"));
        }
        self.validated_sources()
    }

    pub fn validated_sources(&self) -> Result<SourceList, ConfigError> {
        SourceList::parse(
            self.subscriptions
                .iter()
                .filter(|s| s.enabled)
                .map(|s| s.url.as_str()),
        )
    }

    pub fn fetch_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout)
    }

    pub fn probe_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.probe_timeout)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

/// 经过校验、顺序固定的订阅源列表
#[derive(Debug, Clone, PartialEq)]
pub struct SourceList {
    urls: Vec<Url>,
}

impl SourceList {
    /// 逐条校验；任何一条不合法都会让整个列表被拒绝
    pub fn parse<'a, I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut urls: Vec<Url> = Vec::new();

        for (i, raw) in entries.into_iter().enumerate() {
            let index = i + 1;
            let url = validate_source_url(index, raw)?;
            if urls.contains(&url) {
                return Err(ConfigError::DuplicateSource {
                    index,
                    url: url.to_string(),
                });
            }
            urls.push(url);
        }

        if urls.is_empty() {
            return Err(ConfigError::NoSources);
        }

        Ok(Self { urls })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.urls.iter()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// 校验单个订阅链接，`index` 从 1 开始，仅用于错误信息
pub fn validate_source_url(index: usize, raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();

    let markers = SCHEME_MARKER.find_iter(trimmed).count();
    if markers > 1 {
        return Err(ConfigError::ConcatenatedSource {
            index,
            url: trimmed.to_string(),
            count: markers,
        });
    }

    let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidSource {
        index,
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidSource {
            index,
            url: trimmed.to_string(),
            reason: format!("不支持的协议: {}", url.scheme()),
        });
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidSource {
            index,
            url: trimmed.to_string(),
            reason: "缺少主机名".to_string(),
        });
    }

    Ok(url)
}
