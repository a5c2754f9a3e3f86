//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 按配置装配来源 / 结果落地 / 检查点
//! - 监听 Ctrl+C，输出本轮统计
//!
//! ### `batch_driver` - 批量核验驱动
//! - 计算待处理集合，按来源顺序逐个核验
//! - 持有唯一的核验会话，崩溃时重建，任何退出路径都会关闭
//! - 决定继续 / 重建重试 / 中止
//!
//! ## 层次关系
//!
//! ```text
//! app (装配)
//!     ↓
//! batch_driver (处理 Vec<Identifier>)
//!     ↓
//! workflow::VerifySession (处理单个 Identifier)
//!     ↓
//! services (能力层：classifier / sink / checkpoint)
//!     ↓
//! infrastructure (基础设施：PageDriver)
//! ```

pub mod app;
pub mod batch_driver;

pub use app::App;
pub use batch_driver::{BatchDriver, BatchSettings, BatchSummary};
