use crate::proxy::ProxyNode;

/// 按延迟升序排序并截取前 `limit` 个
///
/// 不可达节点永远排在已测得延迟的节点之后；延迟相同的节点保持原有顺序。
pub fn rank_nodes(mut nodes: Vec<ProxyNode>, limit: usize) -> Vec<ProxyNode> {
    nodes.sort_by(|a, b| {
        a.is_unreachable()
            .cmp(&b.is_unreachable())
            .then_with(|| sort_delay(a).total_cmp(&sort_delay(b)))
    });
    nodes.truncate(limit);
    nodes
}

fn sort_delay(node: &ProxyNode) -> f64 {
    node.delay.unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::{UNREACHABLE_DELAY, test_node};

    fn node(name: &str, delay: f64) -> ProxyNode {
        test_node(name, &format!("{name}.example.com"), 443).with_delay(delay)
    }

    fn names(nodes: &[ProxyNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_sorted_ascending_with_sentinel_last() {
        let nodes = vec![
            node("slow", 300.0),
            node("dead", UNREACHABLE_DELAY),
            node("fast", 12.0),
            node("mid", 80.5),
        ];
        let ranked = rank_nodes(nodes, 20);
        assert_eq!(names(&ranked), vec!["fast", "mid", "slow", "dead"]);
    }

    #[test]
    fn test_truncated_to_limit() {
        let nodes: Vec<ProxyNode> = (0..30).map(|i| node(&format!("n{i}"), (30 - i) as f64)).collect();
        let ranked = rank_nodes(nodes, 20);
        assert_eq!(ranked.len(), 20);
        assert_eq!(ranked[0].name, "n29");
        assert!(ranked.windows(2).all(|w| w[0].delay <= w[1].delay));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let nodes = vec![
            node("a", UNREACHABLE_DELAY),
            node("b", 50.0),
            node("c", UNREACHABLE_DELAY),
            node("d", 50.0),
        ];
        let ranked = rank_nodes(nodes.clone(), 20);
        assert_eq!(names(&ranked), vec!["b", "d", "a", "c"]);
        // 相同输入重复运行结果一致
        assert_eq!(rank_nodes(nodes, 20), ranked);
    }
}
