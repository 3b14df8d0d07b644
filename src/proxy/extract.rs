use super::ProxyNode;
use crate::error::FetchError;
use log::debug;
use serde_yaml::Value;

/// 从一份订阅文档的 `proxies` 列表中提取节点
///
/// 缺少 `proxies` 字段视为空列表；不合格的单条记录直接丢弃。
pub fn extract_nodes(document: &Value) -> Result<Vec<ProxyNode>, FetchError> {
    let root = document.as_mapping().ok_or(FetchError::NotAMapping)?;

    let entries = match root.get("proxies") {
        None => return Ok(Vec::new()),
        Some(Value::Sequence(entries)) => entries,
        Some(_) => return Err(FetchError::ProxiesNotASequence),
    };

    let mut nodes = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        match entry.as_mapping().and_then(ProxyNode::from_mapping) {
            Some(node) => nodes.push(node),
            None => debug!("丢弃第 {} 条不完整的节点记录", i + 1),
        }
    }

    Ok(nodes)
}
