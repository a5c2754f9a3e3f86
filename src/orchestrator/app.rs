//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **装配**：按配置选出证件号来源、结果落地、检查点三件套
//! 2. **浏览器**：创建 `ChromeDriverFactory`，会话由批处理驱动自行打开和关闭
//! 3. **停止信号**：Ctrl+C 置位停止标志，当前证件号处理完后退出
//! 4. **统计**：本轮结束后输出汇总

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{CheckpointStrategy, Config, InputKind};
use crate::error::AppError;
use crate::infrastructure::ChromeDriverFactory;
use crate::models::loaders::{CsvSource, IdentifierSource};
use crate::orchestrator::batch_driver::{BatchDriver, BatchSettings, BatchSummary};
use crate::services::{
    CheckpointLog, CheckpointTracker, CsvSink, PersistenceSink, ResponseClassifier, SqliteStore,
};
use crate::utils::logging;
use crate::workflow::FormSettings;

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate().map_err(AppError::from)?;
        logging::log_startup(&config);
        Ok(Self { config })
    }

    /// 把 CSV 里的证件号导入数据库，已存在的行保持不变
    pub async fn import_csv(&self, csv_path: &Path) -> Result<u64> {
        let source = CsvSource::new(csv_path, self.config.id_column.clone());
        let ids = source.load().await?;
        let store = SqliteStore::open(&self.config.database_path)
            .await
            .with_context(|| format!("无法打开数据库: {}", self.config.database_path.display()))?;

        let inserted = store.insert_pending(&ids).await?;
        info!(
            "✓ 从 {} 读取 {} 个证件号，新增 {} 行",
            csv_path.display(),
            ids.len(),
            inserted
        );
        store.finish().await?;
        Ok(inserted)
    }

    /// 跑一轮核验
    pub async fn run(&self) -> Result<BatchSummary> {
        let classifier = ResponseClassifier::new(self.config.no_match_message.clone())?;
        let driver = BatchDriver::new(
            BatchSettings::from_config(&self.config),
            FormSettings::from_config(&self.config),
            classifier,
        );
        spawn_stop_listener(driver.stop_handle());

        let factory = ChromeDriverFactory::new(&self.config);

        let summary = match self.config.input_kind {
            InputKind::Sqlite => {
                let store = SqliteStore::open(&self.config.database_path)
                    .await
                    .with_context(|| {
                        format!("无法打开数据库: {}", self.config.database_path.display())
                    })?;
                let tracker = self.tracker_for(&store)?;
                driver.run(&store, &store, tracker.as_ref(), &factory).await?
            }
            InputKind::Csv => {
                let source = CsvSource::new(self.config.input_csv.clone(), self.config.id_column.clone());
                let sink = CsvSink::new(self.config.output_csv.clone());
                let tracker = CheckpointLog::new(self.config.checkpoint_log.clone())?;
                driver.run(&source, &sink, &tracker, &factory).await?
            }
        };

        logging::print_final_stats(&summary);
        Ok(summary)
    }

    fn tracker_for(&self, store: &SqliteStore) -> Result<Box<dyn CheckpointTracker>> {
        Ok(match self.config.checkpoint_strategy() {
            CheckpointStrategy::Store => Box::new(store.clone()),
            CheckpointStrategy::Log => Box::new(CheckpointLog::new(self.config.checkpoint_log.clone())?),
        })
    }
}

/// 第一次 Ctrl+C 置位停止标志，第二次直接退出
fn spawn_stop_listener(stop: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("🛑 收到 Ctrl+C，处理完当前证件号后停止（再按一次强制退出）");
        stop.store(true, Ordering::SeqCst);

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("强制退出");
            std::process::exit(130);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_rejects_invalid_config() {
        let config = Config {
            input_kind: InputKind::Csv,
            checkpoint_strategy: Some(CheckpointStrategy::Store),
            ..Default::default()
        };

        let err = App::initialize(config).await.err().unwrap();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Config(_))));
    }
}
