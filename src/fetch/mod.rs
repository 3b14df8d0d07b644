//! 订阅获取模块
//! 按列表顺序下载订阅并解析为 YAML，单个订阅失败只记录日志并跳过

mod document;

pub use document::parse_document;

use crate::config::{Config, SourceList};
use crate::error::FetchError;
use crate::ui::progress::ProgressTracker;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{info, warn};
use reqwest::Client;
use serde_yaml::Value;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// 订阅文档来源
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_document(&self, url: &Url) -> Result<Value, FetchError>;
}

/// 基于 reqwest 的 HTTP 订阅获取器
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(config.fetch_timeout_duration())
    }
}

#[async_trait]
impl DocumentSource for HttpFetcher {
    async fn fetch_document(&self, url: &Url) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        parse_document(&body)
    }
}

/// 成功获取的订阅
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: Url,
    pub document: Value,
}

/// 获取所有订阅；结果顺序与订阅列表一致，与完成先后无关
pub async fn fetch_all<S: DocumentSource + ?Sized>(
    source: &S,
    sources: &SourceList,
    concurrent: usize,
    progress: &ProgressTracker,
) -> Vec<FetchedDocument> {
    let results: Vec<(Url, Result<Value, FetchError>)> = stream::iter(sources.iter().cloned())
        .map(|url| async move {
            info!("Fetching: {}", url);
            let result = source.fetch_document(&url).await;
            progress.increment_fetch(result.is_ok());
            (url, result)
        })
        .buffered(concurrent.max(1))
        .collect()
        .await;

    let mut documents = Vec::new();
    for (url, result) in results {
        match result {
            Ok(document) => documents.push(FetchedDocument { url, document }),
            Err(e) => warn!("Failed: {} ({})", url, e),
        }
    }
    progress.finish_fetch_stage();

    documents
}
