//! 日志工具模块
//!
//! 订阅器初始化，以及批处理各阶段的日志格式

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::orchestrator::BatchSummary;
use crate::workflow::VerifyCtx;

/// 初始化 tracing 订阅器
///
/// `RUST_LOG` 优先；未设置时按 `verbose` 选择 debug / info。
/// 重复调用不会报错（测试里会多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ps_verify={},warn", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 证件号批量核验模式");
    info!("🌐 核验地址: {}", config.target_url);
    info!(
        "📊 输入: {:?} / 检查点: {:?}",
        config.input_kind,
        config.checkpoint_strategy()
    );
    info!(
        "⏱️ 响应超时 {}s，每次间隔 {}ms",
        config.response_timeout_secs, config.pacing_millis
    );
    if let Some(limit) = config.limit {
        info!("📋 本轮最多处理 {} 个", limit);
    }
    info!("{}", "=".repeat(60));
}

/// 记录待处理集合
pub fn log_pending_loaded(loaded: usize, skipped: usize, queued: usize, checkpoint: &str) {
    info!("✓ 共读取 {} 个证件号", loaded);
    info!("⏭️ 已完成跳过 {} 个（依据: {}）", skipped, checkpoint);
    info!("📋 本轮待处理 {} 个\n", queued);
}

/// 单个证件号开始
pub fn log_identifier_start(ctx: &VerifyCtx) {
    debug!("{}", "─".repeat(60));
    info!("{} 开始核验", ctx);
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &BatchSummary) {
    info!("\n{}", "=".repeat(60));
    info!("📊 本轮核验统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已确定: {}/{}", summary.resolved(), summary.attempted);
    info!("   ├ 查询到记录: {}", summary.match_found);
    info!("   └ 查询不到: {}", summary.no_match);
    info!("⚠️ 临时失败（下一轮重试）: {}", summary.transient);
    info!("⏭️ 已完成跳过: {}", summary.skipped_completed);
    if summary.aborted {
        info!("❌ 因驱动故障中止");
    } else if summary.cancelled {
        info!("🛑 收到停止信号，已提前结束");
    }
    info!("{}", "=".repeat(60));
}
