//! 检查点日志 - 业务能力层
//!
//! 追加写入的纯文本文件，每次尝试一行。
//! 只有包含 `Outcome recorded for ID <id>:` 的行算终态，失败行永远不会被匹配。

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use crate::models::{AttemptStatus, CheckpointRecord, Identifier};
use crate::services::checkpoint::CheckpointTracker;

/// 检查点日志
pub struct CheckpointLog {
    path: PathBuf,
    completed_line: Regex,
}

impl CheckpointLog {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            path: path.into(),
            completed_line: Regex::new(r"Outcome recorded for ID (\S+): Category = ")?,
        })
    }

    /// 格式化一行记录
    fn format_line(record: &CheckpointRecord) -> String {
        let timestamp = record.attempted_at.format("%Y-%m-%d %H:%M:%S");
        let detail = single_line(&record.detail);
        match &record.status {
            AttemptStatus::Resolved(category) => format!(
                "{} - Outcome recorded for ID {}: Category = {}, Detail = {}\n",
                timestamp, record.identifier, category, detail
            ),
            status => format!(
                "{} - Attempt failed for ID {}: Status = {}, Reason = {}\n",
                timestamp,
                record.identifier,
                status.label(),
                detail
            ),
        }
    }

    /// 从日志内容中提取终态证件号
    fn scan(&self, content: &str) -> HashSet<Identifier> {
        content
            .lines()
            .filter_map(|line| self.completed_line.captures(line))
            .filter_map(|cap| cap.get(1).and_then(|m| Identifier::new(m.as_str())))
            .collect()
    }
}

#[async_trait]
impl CheckpointTracker for CheckpointLog {
    async fn completed(&self) -> Result<HashSet<Identifier>> {
        // 读不到日志只会导致重复处理，不能阻止运行
        match fs::read(&self.path).await {
            Ok(bytes) => {
                let ids = self.scan(&String::from_utf8_lossy(&bytes));
                debug!("检查点日志中有 {} 个已完成证件号", ids.len());
                Ok(ids)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("⚠️ 检查点日志不存在: {}，视为没有已完成记录", self.path.display());
                Ok(HashSet::new())
            }
            Err(e) => {
                error!("读取检查点日志失败 ({}): {}，视为没有已完成记录", self.path.display(), e);
                Ok(HashSet::new())
            }
        }
    }

    async fn record(&self, record: &CheckpointRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("无法打开检查点日志: {}", self.path.display()))?;

        file.write_all(Self::format_line(record).as_bytes()).await?;
        file.sync_data().await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("检查点日志 {}", self.path.display())
    }
}

/// 换行会破坏"一次尝试一行"的格式
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
