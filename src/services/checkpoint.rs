//! 检查点接口
//!
//! 两种可互换的实现：数据库标志位（`SqliteStore`）和检查点日志扫描（`CheckpointLog`）。
//! 都是单调的：一旦记为终态，之后无论追加什么都不会重新进入待处理集合。

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

use crate::models::{CheckpointRecord, Identifier, PendingSet};

#[async_trait]
pub trait CheckpointTracker: Send + Sync {
    /// 已有终态记录的证件号
    async fn completed(&self) -> Result<HashSet<Identifier>>;

    /// 写入一次尝试的记录（终态或非终态）
    async fn record(&self, record: &CheckpointRecord) -> Result<()>;

    /// 全部证件号减去已完成的部分，保持原顺序
    async fn pending_set(&self, all: Vec<Identifier>) -> Result<PendingSet> {
        let completed = self.completed().await?;
        Ok(PendingSet::compute(all, &completed))
    }

    fn describe(&self) -> String;
}
