use super::ProxyNode;
use std::collections::HashSet;

/// 节点去重用的地址键
pub fn endpoint_key(server: &str, port: u16) -> String {
    format!("{}:{}", server, port)
}

/// 按 server:port 去重，先出现的节点保留，再截取前 `limit` 个
pub fn dedupe_nodes(nodes: Vec<ProxyNode>, limit: usize) -> Vec<ProxyNode> {
    let mut seen = HashSet::new();
    nodes
        .into_iter()
        .filter(|node| seen.insert(node.get_address()))
        .take(limit)
        .collect()
}
