//! 聚合流程：获取 → 提取 → 去重 → 测速 → 排序 → 生成配置

use crate::check::{self, LatencyProbe, TcpProber};
use crate::config::{Config, SourceList};
use crate::fetch::{self, DocumentSource, HttpFetcher};
use crate::output::ClashConfig;
use crate::proxy::{self, ProxyNode};
use crate::select;
use crate::ui::progress::ProgressTracker;
use log::{info, warn};
use std::path::PathBuf;

/// 一次运行的统计
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub sources_total: usize,
    pub sources_ok: usize,
    pub nodes_collected: usize,
    pub nodes_unique: usize,
    pub reachable: u64,
    pub unreachable: u64,
    /// 可连通节点占测速节点的百分比
    pub reachable_rate: f64,
    pub selected: Vec<ProxyNode>,
    pub output_path: PathBuf,
}

pub struct Aggregator<S, P> {
    config: Config,
    sources: SourceList,
    source: S,
    prober: P,
    progress: ProgressTracker,
}

impl Aggregator<HttpFetcher, TcpProber> {
    /// 使用 HTTP 获取器和 TCP 测速器
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::from_config(&config)?;
        let prober = TcpProber::from_config(&config);
        let progress = ProgressTracker::new(&config);
        Self::new(config, fetcher, prober, progress)
    }
}

impl<S: DocumentSource, P: LatencyProbe> Aggregator<S, P> {
    /// 订阅源在这里校验，任何不合法的条目都会直接返回错误
    pub fn new(
        config: Config,
        source: S,
        prober: P,
        progress: ProgressTracker,
    ) -> anyhow::Result<Self> {
        let sources = config.validate()?;
        Ok(Self {
            config,
            sources,
            source,
            prober,
            progress,
        })
    }

    pub fn sources(&self) -> &SourceList {
        &self.sources
    }

    pub fn progress_enabled(&self) -> bool {
        self.progress.is_enabled()
    }

    /// 完整执行一次；只有写文件失败才返回错误
    pub async fn run(&self) -> anyhow::Result<RunReport> {
        let (nodes, sources_ok) = self.collect().await;
        let nodes_collected = nodes.len();

        let unique = proxy::dedupe_nodes(nodes, self.config.dedupe_limit);
        let nodes_unique = unique.len();
        info!("共获取到 {} 个节点，去重后 {} 个，开始测速...", nodes_collected, nodes_unique);

        self.progress.set_probe_total(nodes_unique as u64);
        let (probed, stats) = check::probe_all(
            &self.prober,
            unique,
            self.config.probe_concurrent,
            &self.progress,
        )
        .await;

        let selected = select::rank_nodes(probed, self.config.select_limit);

        let clash = ClashConfig::assemble(&self.config.output, &selected);
        debug_assert!(clash.group_references_resolve());

        let output_path = PathBuf::from(&self.config.output_path);
        clash.write_to_file(&output_path)?;
        info!(
            "{} 已生成，运行结束于 {}",
            output_path.display(),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        Ok(RunReport {
            sources_total: self.sources.len(),
            sources_ok,
            nodes_collected,
            nodes_unique,
            reachable: stats.reachable(),
            unreachable: stats.unreachable(),
            reachable_rate: stats.get_success_rate(),
            selected,
            output_path,
        })
    }

    /// 获取全部订阅并提取节点，保持订阅列表顺序
    async fn collect(&self) -> (Vec<ProxyNode>, usize) {
        self.progress.set_fetch_total(self.sources.len() as u64);
        let documents = fetch::fetch_all(
            &self.source,
            &self.sources,
            self.config.fetch_concurrent,
            &self.progress,
        )
        .await;

        let mut nodes = Vec::new();
        let mut sources_ok = 0;
        for doc in &documents {
            match proxy::extract_nodes(&doc.document) {
                Ok(extracted) => {
                    info!("{} 提取到 {} 个节点", doc.url, extracted.len());
                    sources_ok += 1;
                    nodes.extend(extracted);
                }
                Err(e) => warn!("Failed: {} ({})", doc.url, e),
            }
        }

        (nodes, sources_ok)
    }
}
