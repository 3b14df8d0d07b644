//! 从多个 Clash 订阅中聚合节点，去重、测速后生成合并的订阅文件

pub mod check;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod proxy;
pub mod select;
pub mod ui;

pub use config::Config;
pub use pipeline::{Aggregator, RunReport};
