//! 结果落地接口
//!
//! 只接收已确定的结论；失败尝试由检查点负责记录。

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::models::{Identifier, Resolution};

#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// 持久化一条结论，返回前必须已经落盘
    async fn record(&self, identifier: &Identifier, resolution: &Resolution, at: DateTime<Local>) -> Result<()>;

    /// 批处理结束时调用（包括中止）
    async fn finish(&self) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String;
}
