use anyhow::{Context, Result};
use clap::Parser;
use clash_sub_merge::config::Config;
use clash_sub_merge::pipeline::{Aggregator, RunReport};
use std::path::Path;

/// Clash 订阅聚合工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 配置文件路径（不指定则使用内置配置）
    #[arg(short = 'f', long)]
    config: Option<String>,

    /// 输出文件
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// 日志级别
    #[arg(long)]
    log_level: Option<String>,

    /// 测速并发数
    #[arg(long)]
    concurrent: Option<usize>,

    /// 是否显示进度条
    #[arg(long)]
    progress: Option<bool>,

    /// 详细输出
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            println!("📁 从配置文件加载设置: {}", path);
            Config::load_from_file(Path::new(path))
                .with_context(|| format!("配置文件加载失败: {}", path))?
        }
        None => Config::default(),
    };

    // 覆盖命令行参数
    if let Some(output) = &args.output {
        config.output_path = output.clone();
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if let Some(concurrent) = args.concurrent {
        config.probe_concurrent = concurrent;
    }
    if let Some(progress) = args.progress {
        config.print_progress = progress;
    }
    if args.verbose {
        config.log_level = "debug".to_string();
    }

    Ok(config)
}

fn print_summary(report: &RunReport) {
    println!("\n聚合摘要:");
    println!("{:=<80}", "");
    println!("订阅源: {}/{} 成功", report.sources_ok, report.sources_total);
    println!("获取节点: {}", report.nodes_collected);
    println!("去重后: {}", report.nodes_unique);
    println!(
        "可连通: {} ({:.1}%)，不可达: {}",
        report.reachable, report.reachable_rate, report.unreachable
    );
    println!("输出节点: {}", report.selected.len());

    let fastest: Vec<_> = report
        .selected
        .iter()
        .filter(|n| !n.is_unreachable())
        .take(3)
        .collect();
    if !fastest.is_empty() {
        println!("\n  最快节点:");
        for (i, node) in fastest.iter().enumerate() {
            println!(
                "    {}. {}: {:.2} ms",
                i + 1,
                node.name,
                node.delay.unwrap_or_default()
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // RUST_LOG 优先
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    println!("🚀 Clash 订阅聚合工具 v{}", env!("CARGO_PKG_VERSION"));
    println!("{:=<80}", "");

    let aggregator = Aggregator::from_config(config)?;
    println!("📡 订阅源数量: {}", aggregator.sources().len());
    println!(
        "  进度显示: {}",
        if aggregator.progress_enabled() {
            "✅ 启用"
        } else {
            "❌ 禁用"
        }
    );

    let started = chrono::Local::now();
    let report = aggregator.run().await?;
    let elapsed = chrono::Local::now() - started;

    print_summary(&report);

    println!(
        "\n🎉 {} 已生成，耗时 {:.1}s",
        report.output_path.display(),
        elapsed.num_milliseconds() as f64 / 1000.0
    );

    Ok(())
}
