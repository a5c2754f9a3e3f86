//! # PS Verify
//!
//! 批量核验证件号是否为在职公务员：逐个填进公开核验表单，
//! 记录页面给出的结论，并支持中断后续跑。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器页面），只暴露能力
//! - `PageDriver` - 页面操作接口（等待 / 填写 / 点击 / 读取 / 刷新）
//! - `ChromePage` - 基于 chromiumoxide 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个证件号
//! - `ResponseClassifier` - 把结果面板映射成结论
//! - `PersistenceSink` - 结论落地（SQLite / CSV）
//! - `CheckpointTracker` - 断点记录（数据库标志 / 日志扫描）
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个证件号"的完整表单流程
//! - `VerifyCtx` - 上下文封装（序号 + 证件号）
//! - `VerifySession` - 状态机（填写 → 提交 → 等待 → 分类 → 重置）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_driver` - 逐个核验、恢复策略、先写后推进
//! - `orchestrator/app` - 按配置装配并运行一轮

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, ConfigError};
pub use infrastructure::{DriverError, DriverFactory, PageDriver};
pub use models::{Category, CheckpointRecord, Identifier, Outcome, PendingSet};
pub use orchestrator::{App, BatchDriver, BatchSummary};
pub use workflow::{VerifyCtx, VerifySession};
