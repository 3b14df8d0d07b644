//! 生成最终的 Clash 配置文件

use crate::config::OutputSettings;
use crate::proxy::ProxyNode;
use anyhow::Context;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const SELECT_GROUP: &str = "🚀 节点选择";
pub const AUTO_GROUP: &str = "自动选择";

/// 规则列表：前面的走手动选择组，其余全部走自动选择组
const RULES: &[(&str, &str, &str)] = &[
    ("DOMAIN-SUFFIX", "google.com", SELECT_GROUP),
    ("DOMAIN-SUFFIX", "facebook.com", SELECT_GROUP),
    ("DOMAIN-KEYWORD", "youtube", SELECT_GROUP),
    ("DOMAIN-SUFFIX", "github.com", SELECT_GROUP),
];

#[derive(Debug, Clone, Serialize)]
pub struct ProxyGroup {
    pub name: String,
    #[serde(rename = "type")]
    pub group_type: String,
    pub proxies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

impl ProxyGroup {
    pub fn new(name: &str, group_type: &str, proxies: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            group_type: group_type.to_string(),
            proxies,
            url: None,
            interval: None,
        }
    }
}

/// 字段声明顺序即输出顺序
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashConfig {
    pub port: u16,
    pub socks_port: u16,
    pub allow_lan: bool,
    pub mode: String,
    pub log_level: String,
    pub external_controller: String,
    pub proxies: Vec<ProxyNode>,
    pub proxy_groups: Vec<ProxyGroup>,
    pub rules: Vec<String>,
}

impl ClashConfig {
    pub fn assemble(settings: &OutputSettings, nodes: &[ProxyNode]) -> Self {
        let names: Vec<String> = nodes.iter().map(|n| n.name.clone()).collect();

        let select_group = ProxyGroup::new(SELECT_GROUP, "select", names.clone());
        let mut auto_group = ProxyGroup::new(AUTO_GROUP, "url-test", names);
        auto_group.url = Some(settings.test_url.clone());
        auto_group.interval = Some(settings.test_interval);

        let mut rules: Vec<String> = RULES
            .iter()
            .map(|(kind, pattern, target)| format!("{},{},{}", kind, pattern, target))
            .collect();
        rules.push(format!("MATCH,{}", AUTO_GROUP));

        Self {
            port: settings.port,
            socks_port: settings.socks_port,
            allow_lan: settings.allow_lan,
            mode: settings.mode.clone(),
            log_level: settings.log_level.clone(),
            external_controller: settings.external_controller.clone(),
            proxies: nodes.to_vec(),
            proxy_groups: vec![select_group, auto_group],
            rules,
        }
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// 覆盖写入目标文件
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let yaml = self.to_yaml()?;
        fs::write(path, yaml).with_context(|| format!("写入 {} 失败", path.display()))?;
        Ok(())
    }

    /// 分组成员都是已有节点，规则目标都是已有分组或内置策略
    pub fn group_references_resolve(&self) -> bool {
        let node_names: HashSet<&str> = self.proxies.iter().map(|n| n.name.as_str()).collect();
        let group_names: HashSet<&str> = self.proxy_groups.iter().map(|g| g.name.as_str()).collect();

        let members_ok = self.proxy_groups.iter().all(|g| {
            g.proxies
                .iter()
                .all(|p| node_names.contains(p.as_str()) || group_names.contains(p.as_str()))
        });

        let rules_ok = self.rules.iter().all(|rule| {
            let target = rule.rsplit(',').next().unwrap_or_default();
            group_names.contains(target) || matches!(target, "DIRECT" | "REJECT")
        });

        members_ok && rules_ok
    }
}
