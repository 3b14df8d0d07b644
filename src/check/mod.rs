//! 延迟测速模块
//! 先解析域名，再对节点地址做一次 TCP 连接，连接耗时即为延迟；两步共用同一超时

use crate::config::Config;
use crate::proxy::{ProxyNode, UNREACHABLE_DELAY};
use crate::ui::progress::ProgressTracker;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::{TcpStream, lookup_host};
use tokio::time::{Instant, timeout_at};

/// 单节点延迟测量；失败返回 None
#[async_trait]
pub trait LatencyProbe: Send + Sync {
    async fn probe(&self, node: &ProxyNode) -> Option<f64>;
}

#[derive(Debug, Clone)]
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.probe_timeout_duration())
    }

    async fn connect(&self, server: &str, port: u16) -> anyhow::Result<Duration> {
        let deadline = Instant::now() + self.timeout;

        // 解析耗时不计入延迟，但受同一截止时间约束
        let addrs: Vec<SocketAddr> = timeout_at(deadline, lookup_host((server, port)))
            .await??
            .collect();
        if addrs.is_empty() {
            anyhow::bail!("{} 没有可用的地址", server);
        }

        let start = Instant::now();
        timeout_at(deadline, TcpStream::connect(&addrs[..])).await??;
        Ok(start.elapsed())
    }
}

#[async_trait]
impl LatencyProbe for TcpProber {
    async fn probe(&self, node: &ProxyNode) -> Option<f64> {
        match self.connect(&node.server, node.port).await {
            Ok(elapsed) => Some(elapsed.as_secs_f64() * 1000.0),
            Err(e) => {
                debug!("测速失败 {} ({}): {}", node.name, node.get_address(), e);
                None
            }
        }
    }
}

pub struct ProbeStats {
    pub total_nodes: AtomicU64,
    pub reachable_nodes: AtomicU64,
    pub unreachable_nodes: AtomicU64,
}

impl ProbeStats {
    pub fn new() -> Self {
        Self {
            total_nodes: AtomicU64::new(0),
            reachable_nodes: AtomicU64::new(0),
            unreachable_nodes: AtomicU64::new(0),
        }
    }

    pub fn record(&self, reachable: bool) {
        if reachable {
            self.reachable_nodes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.unreachable_nodes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn reachable(&self) -> u64 {
        self.reachable_nodes.load(Ordering::Relaxed)
    }

    pub fn unreachable(&self) -> u64 {
        self.unreachable_nodes.load(Ordering::Relaxed)
    }

    pub fn get_success_rate(&self) -> f64 {
        let total = self.total_nodes.load(Ordering::Relaxed);
        let alive = self.reachable();

        if total > 0 {
            (alive as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }
}

impl Default for ProbeStats {
    fn default() -> Self {
        Self::new()
    }
}

/// 为每个节点测速并写入 delay；失败的节点记为 [`UNREACHABLE_DELAY`]
///
/// 返回顺序与输入一致，排序交给 `select::rank_nodes`。
pub async fn probe_all<P: LatencyProbe + ?Sized>(
    prober: &P,
    nodes: Vec<ProxyNode>,
    concurrent: usize,
    progress: &ProgressTracker,
) -> (Vec<ProxyNode>, Arc<ProbeStats>) {
    let stats = Arc::new(ProbeStats::new());
    stats
        .total_nodes
        .store(nodes.len() as u64, Ordering::Relaxed);

    let probed: Vec<ProxyNode> = stream::iter(nodes)
        .map(|node| {
            let stats = stats.clone();
            async move {
                let measured = prober.probe(&node).await;
                stats.record(measured.is_some());
                progress.increment_probe(measured.is_some());

                let delay = measured.unwrap_or(UNREACHABLE_DELAY);
                info!("{} - {} 延迟: {:.2} ms", node.name, node.server, delay);
                node.with_delay(delay)
            }
        })
        .buffered(concurrent.max(1))
        .collect()
        .await;

    progress.finish_probe_stage();
    (probed, stats)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::proxy::test_node;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    /// 按服务器地址返回固定延迟的测速器；`settle` 为真时按延迟实际等待，
    /// 使完成顺序与输入顺序不同
    pub(crate) struct FixedProbe {
        pub delays: HashMap<String, f64>,
        pub settle: bool,
    }

    impl FixedProbe {
        pub(crate) fn new(entries: &[(&str, f64)]) -> Self {
            Self {
                delays: entries
                    .iter()
                    .map(|(server, delay)| (server.to_string(), *delay))
                    .collect(),
                settle: false,
            }
        }

        pub(crate) fn settled(mut self) -> Self {
            self.settle = true;
            self
        }
    }

    #[async_trait]
    impl LatencyProbe for FixedProbe {
        async fn probe(&self, node: &ProxyNode) -> Option<f64> {
            let delay = self.delays.get(&node.server).copied();
            if self.settle {
                if let Some(ms) = delay {
                    tokio::time::sleep(Duration::from_millis(ms as u64)).await;
                }
            }
            delay
        }
    }

    #[tokio::test]
    async fn test_tcp_latency_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((_socket, _)) = listener.accept().await {}
        });

        let prober = TcpProber::new(Duration::from_secs(1));
        let node = test_node("local", "127.0.0.1", port);
        let delay = prober.probe(&node).await;
        assert!(delay.is_some());
        assert!(delay.unwrap() < 1000.0);
    }

    #[tokio::test]
    async fn test_tcp_latency_resolves_hostname() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((_socket, _)) = listener.accept().await {}
        });

        let prober = TcpProber::new(Duration::from_secs(1));
        let node = test_node("named", "localhost", port);
        assert!(prober.probe(&node).await.is_some());
    }

    #[tokio::test]
    async fn test_tcp_latency_refused_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = TcpProber::new(Duration::from_secs(1));
        let node = test_node("closed", "127.0.0.1", port);
        assert_eq!(prober.probe(&node).await, None);
    }

    #[tokio::test]
    async fn test_tcp_latency_unresolvable_host() {
        let prober = TcpProber::new(Duration::from_millis(500));
        let node = test_node("bad", "host.invalid", 443);
        assert_eq!(prober.probe(&node).await, None);
    }

    #[tokio::test]
    async fn test_failed_connect_assigns_sentinel() {
        let prober = FixedProbe::new(&[("1.1.1.1", 30.0)]);
        let nodes = vec![test_node("A", "1.1.1.1", 443), test_node("B", "9.9.9.9", 443)];

        let (probed, stats) = probe_all(&prober, nodes, 2, &ProgressTracker::disabled()).await;
        assert_eq!(probed[0].delay, Some(30.0));
        assert_eq!(probed[1].delay, Some(UNREACHABLE_DELAY));
        assert_eq!(stats.reachable(), 1);
        assert_eq!(stats.unreachable(), 1);
        assert_eq!(stats.get_success_rate(), 50.0);
    }

    #[tokio::test]
    async fn test_latency_order_follows_input_when_concurrent() {
        // 第一个节点最慢完成
        let prober = FixedProbe::new(&[("1.1.1.1", 150.0), ("2.2.2.2", 60.0), ("3.3.3.3", 5.0)]).settled();
        let nodes = vec![
            test_node("A", "1.1.1.1", 443),
            test_node("B", "2.2.2.2", 443),
            test_node("C", "3.3.3.3", 443),
        ];

        let (probed, _) = probe_all(&prober, nodes, 3, &ProgressTracker::disabled()).await;
        let names: Vec<&str> = probed.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(probed[0].delay, Some(150.0));
    }
}
