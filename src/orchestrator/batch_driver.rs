//! 批量核验驱动 - 编排层
//!
//! ## 职责
//!
//! 1. **计算待处理集合**：来源中的全部证件号减去已有终态检查点的部分
//! 2. **会话管理**：打开唯一的核验会话，驱动崩溃时重建，任何退出路径都会关闭
//! 3. **恢复策略**：按结果决定继续、重建后重试、还是中止
//! 4. **先写后推进**：每个证件号的检查点写入后才处理下一个
//! 5. **节奏控制**：每次尝试后固定间隔，避免压垮目标页面
//!
//! | 结果 | 动作 |
//! |---|---|
//! | Resolved | 写结果 → 写终态检查点 → 下一个 |
//! | TransientFailure | 写非终态检查点 → 下一个（本轮不重试） |
//! | FatalFailure，还能重建 | 关闭会话 → 重建 → 同一证件号重试一次 |
//! | FatalFailure，不能重建 | 写非终态检查点 → 中止本轮 |

use anyhow::Result;
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::DriverFactory;
use crate::models::loaders::IdentifierSource;
use crate::models::{Category, CheckpointRecord, Identifier, Outcome};
use crate::services::{CheckpointTracker, PersistenceSink, ResponseClassifier};
use crate::utils::logging;
use crate::workflow::{FormSettings, VerifyCtx, VerifySession};

/// 批处理参数
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// 每次尝试后的固定间隔
    pub pacing: Duration,
    /// 单个证件号遇到驱动崩溃时最多重建会话次数
    pub max_session_recreations: usize,
    /// 本轮最多处理多少个证件号
    pub limit: Option<usize>,
}

impl BatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pacing: config.pacing(),
            max_session_recreations: config.max_session_recreations,
            limit: config.limit,
        }
    }
}

/// 本轮统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// 来源中的证件号总数
    pub loaded: usize,
    /// 已有终态记录或重复而跳过的数量
    pub skipped_completed: usize,
    /// 实际尝试的证件号数量（重建后的重试不重复计数）
    pub attempted: usize,
    pub match_found: usize,
    pub no_match: usize,
    pub transient: usize,
    pub fatal_aborts: usize,
    /// 因驱动故障无法恢复而中止
    pub aborted: bool,
    /// 收到停止信号后在两个证件号之间停下
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn resolved(&self) -> usize {
        self.match_found + self.no_match
    }
}

/// 单个证件号处理完之后的走向
enum Step {
    Next,
    Abort,
}

/// 批量核验驱动
pub struct BatchDriver {
    settings: BatchSettings,
    form: FormSettings,
    classifier: ResponseClassifier,
    stop: Arc<AtomicBool>,
}

impl BatchDriver {
    pub fn new(settings: BatchSettings, form: FormSettings, classifier: ResponseClassifier) -> Self {
        Self {
            settings,
            form,
            classifier,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 停止标志，置位后在下一个证件号开始前停下
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// 跑一整轮
    pub async fn run(
        &self,
        source: &dyn IdentifierSource,
        sink: &dyn PersistenceSink,
        tracker: &dyn CheckpointTracker,
        factory: &dyn DriverFactory,
    ) -> Result<BatchSummary> {
        info!("\n📁 正在读取待核验证件号: {}", source.describe());
        let all = source.load().await?;
        let mut summary = BatchSummary {
            loaded: all.len(),
            ..Default::default()
        };

        let pending = tracker.pending_set(all).await?;
        summary.skipped_completed = summary.loaded - pending.len();

        let mut queue = pending.to_vec();
        if let Some(limit) = self.settings.limit {
            queue.truncate(limit);
        }
        logging::log_pending_loaded(summary.loaded, summary.skipped_completed, queue.len(), &tracker.describe());

        if queue.is_empty() {
            warn!("⚠️ 没有需要处理的证件号，程序结束");
            sink.finish().await?;
            return Ok(summary);
        }

        let mut slot = match self.open_session(factory).await {
            Some(session) => Some(session),
            None => {
                error!("❌ 无法打开核验会话，本轮中止");
                summary.aborted = true;
                sink.finish().await?;
                return Ok(summary);
            }
        };

        let result = self
            .process_queue(&mut slot, &queue, sink, tracker, factory, &mut summary)
            .await;

        // 任何退出路径都要释放浏览器
        if let Some(session) = slot.take() {
            if let Err(e) = session.close().await {
                warn!("关闭核验会话失败: {}", e);
            }
        }
        let finished = sink.finish().await;

        result?;
        finished?;
        Ok(summary)
    }

    async fn process_queue(
        &self,
        slot: &mut Option<VerifySession>,
        queue: &[Identifier],
        sink: &dyn PersistenceSink,
        tracker: &dyn CheckpointTracker,
        factory: &dyn DriverFactory,
        summary: &mut BatchSummary,
    ) -> Result<()> {
        let total = queue.len();

        for (index, identifier) in queue.iter().enumerate() {
            if self.stop.load(Ordering::SeqCst) {
                warn!("🛑 收到停止信号，剩余 {} 个证件号留到下一轮", total - index);
                summary.cancelled = true;
                break;
            }

            let ctx = VerifyCtx::new(identifier.clone(), index + 1, total);
            logging::log_identifier_start(&ctx);
            summary.attempted += 1;

            match self.process_one(slot, &ctx, sink, tracker, factory, summary).await? {
                Step::Next => {}
                Step::Abort => {
                    summary.aborted = true;
                    error!("❌ {} 会话重建次数已用完，本轮中止", ctx);
                    break;
                }
            }

            if index + 1 < total && !self.settings.pacing.is_zero() {
                sleep(self.settings.pacing).await;
            }
        }

        Ok(())
    }

    /// 处理一个证件号，必要时重建会话后重试
    async fn process_one(
        &self,
        slot: &mut Option<VerifySession>,
        ctx: &VerifyCtx,
        sink: &dyn PersistenceSink,
        tracker: &dyn CheckpointTracker,
        factory: &dyn DriverFactory,
        summary: &mut BatchSummary,
    ) -> Result<Step> {
        let mut recreations = 0;

        loop {
            let outcome = match slot.as_mut() {
                Some(session) => session.run(ctx).await,
                None => Outcome::fatal("没有可用的核验会话"),
            };
            let attempted_at = Local::now();

            match &outcome {
                Outcome::Resolved { category, detail } => {
                    if let Some(resolution) = outcome.resolution() {
                        sink.record(&ctx.identifier, &resolution, attempted_at).await?;
                    }
                    tracker
                        .record(&CheckpointRecord::from_outcome(&ctx.identifier, &outcome, attempted_at))
                        .await?;
                    match category {
                        Category::MatchFound => summary.match_found += 1,
                        Category::NoMatch => summary.no_match += 1,
                    }
                    info!("{} ✓ 已记录: {} ({})", ctx, category, detail);
                    return Ok(Step::Next);
                }
                Outcome::TransientFailure { reason } => {
                    tracker
                        .record(&CheckpointRecord::from_outcome(&ctx.identifier, &outcome, attempted_at))
                        .await?;
                    summary.transient += 1;
                    warn!("{} ⚠️ 跳过，原因: {}（下一轮重试）", ctx, reason);
                    return Ok(Step::Next);
                }
                Outcome::FatalFailure { reason } if recreations < self.settings.max_session_recreations => {
                    recreations += 1;
                    warn!(
                        "{} 驱动故障: {}，重建会话 ({}/{})",
                        ctx, reason, recreations, self.settings.max_session_recreations
                    );
                    if let Some(old) = slot.take() {
                        if let Err(e) = old.close().await {
                            warn!("关闭旧会话失败: {}", e);
                        }
                    }
                    *slot = self.try_open(factory).await;
                }
                Outcome::FatalFailure { reason } => {
                    error!("{} ❌ 驱动故障: {}", ctx, reason);
                    tracker
                        .record(&CheckpointRecord::from_outcome(&ctx.identifier, &outcome, attempted_at))
                        .await?;
                    summary.fatal_aborts += 1;
                    return Ok(Step::Abort);
                }
            }
        }
    }

    /// 启动时打开会话，失败按重建次数重试
    async fn open_session(&self, factory: &dyn DriverFactory) -> Option<VerifySession> {
        for attempt in 0..=self.settings.max_session_recreations {
            if attempt > 0 {
                warn!("重新尝试打开核验会话 ({}/{})", attempt, self.settings.max_session_recreations);
            }
            if let Some(session) = self.try_open(factory).await {
                return Some(session);
            }
        }
        None
    }

    async fn try_open(&self, factory: &dyn DriverFactory) -> Option<VerifySession> {
        let driver = match factory.open().await {
            Ok(driver) => driver,
            Err(e) => {
                error!("创建页面驱动失败: {}", e);
                return None;
            }
        };

        match VerifySession::open(driver, self.form.clone(), self.classifier.clone()).await {
            Ok(session) => Some(session),
            Err(e) => {
                error!("打开核验会话失败: {}", e);
                None
            }
        }
    }
}
