use crate::config::Config;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;

/// 订阅获取与测速两个阶段的进度条；计数由 `check::ProbeStats` 负责
#[derive(Clone)]
pub struct ProgressTracker {
    multi_progress: Option<Arc<MultiProgress>>,
    fetch_progress: Option<ProgressBar>,
    probe_progress: Option<ProgressBar>,
}

impl ProgressTracker {
    pub fn new(config: &Config) -> Self {
        if !config.print_progress {
            return Self::disabled();
        }

        let multi_progress = Arc::new(MultiProgress::new());

        // 订阅获取进度
        let fetch_progress = multi_progress.add(ProgressBar::new(0));
        fetch_progress.set_style(bar_style(
            "  {spinner:.yellow} 订阅获取: [{bar:30.yellow}] {pos}/{len} {msg}",
        ));

        // 测速进度
        let probe_progress = multi_progress.add(ProgressBar::new(0));
        probe_progress.set_style(bar_style(
            "  {spinner:.green} 延迟测速: [{bar:30.green}] {pos}/{len} ({eta}) {msg}",
        ));

        Self {
            multi_progress: Some(multi_progress),
            fetch_progress: Some(fetch_progress),
            probe_progress: Some(probe_progress),
        }
    }

    /// 不显示进度条
    pub fn disabled() -> Self {
        Self {
            multi_progress: None,
            fetch_progress: None,
            probe_progress: None,
        }
    }

    pub fn set_fetch_total(&self, total: u64) {
        set_total(&self.fetch_progress, total);
    }

    pub fn set_probe_total(&self, total: u64) {
        set_total(&self.probe_progress, total);
    }

    pub fn increment_fetch(&self, success: bool) {
        tick(&self.fetch_progress, success);
    }

    pub fn increment_probe(&self, success: bool) {
        tick(&self.probe_progress, success);
    }

    pub fn finish_fetch_stage(&self) {
        if let Some(pb) = &self.fetch_progress {
            pb.finish_with_message("完成");
        }
    }

    pub fn finish_probe_stage(&self) {
        if let Some(pb) = &self.probe_progress {
            pb.finish_with_message("完成");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.multi_progress.is_some()
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
}

fn set_total(bar: &Option<ProgressBar>, total: u64) {
    if let Some(pb) = bar {
        pb.set_length(total);
        pb.set_position(0);
    }
}

fn tick(bar: &Option<ProgressBar>, success: bool) {
    if let Some(pb) = bar {
        pb.inc(1);
        pb.set_message(if success { "✅" } else { "❌" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_follows_config() {
        let mut config = Config::default();
        config.print_progress = false;
        assert!(!ProgressTracker::new(&config).is_enabled());

        config.print_progress = true;
        let tracker = ProgressTracker::new(&config);
        assert!(tracker.is_enabled());

        tracker.set_probe_total(2);
        tracker.increment_probe(true);
        tracker.increment_probe(false);
        let bar = tracker.probe_progress.as_ref().unwrap();
        assert_eq!(bar.length(), Some(2));
        assert_eq!(bar.position(), 2);
    }

    #[test]
    fn test_disabled_tracker_is_noop() {
        let tracker = ProgressTracker::disabled();
        tracker.set_fetch_total(3);
        tracker.increment_fetch(true);
        tracker.finish_fetch_stage();
        assert!(tracker.fetch_progress.is_none());
    }
}
