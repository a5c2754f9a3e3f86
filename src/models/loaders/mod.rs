pub mod csv_loader;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::identifier::Identifier;

pub use csv_loader::CsvSource;

/// 待处理证件号的来源
///
/// 只读：核心流程不会向来源写回任何东西。返回顺序即处理顺序。
#[async_trait]
pub trait IdentifierSource: Send + Sync {
    /// 读取全部待处理证件号
    async fn load(&self) -> Result<Vec<Identifier>>;

    /// 用于日志的来源描述
    fn describe(&self) -> String;
}
