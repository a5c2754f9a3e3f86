//! 页面驱动抽象 - 基础设施层
//!
//! 会话只通过这里的能力操作页面：导航、等待、填写、点击、取文本、刷新。
//! 选择器一律是 CSS 选择器（`#id` 也算）。

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 页面操作错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// 在给定时间内条件未满足
    #[error("等待 {locator} 超时 ({waited:?})")]
    Timeout { locator: String, waited: Duration },

    /// 元素不存在或不可交互
    #[error("找不到元素: {0}")]
    ElementNotFound(String),

    /// 驱动本身出错：导航丢失、页面崩溃、CDP 通道断开
    #[error("浏览器驱动错误: {0}")]
    Fault(String),
}

impl DriverError {
    pub fn fault(message: impl std::fmt::Display) -> Self {
        DriverError::Fault(message.to_string())
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, DriverError::Fault(_))
    }
}

/// 页面驱动
///
/// 职责：
/// - 持有唯一的页面句柄
/// - 只暴露通用能力，不认识证件号、不做分类
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// 等待元素可见
    async fn wait_visible(&self, locator: &str, timeout: Duration) -> Result<(), DriverError>;

    /// 等待元素可见且未禁用
    async fn wait_clickable(&self, locator: &str, timeout: Duration) -> Result<(), DriverError>;

    /// 等待元素出现在 DOM 中（不要求可见）
    async fn wait_present(&self, locator: &str, timeout: Duration) -> Result<(), DriverError>;

    /// 立即检查元素是否存在，不等待
    async fn is_present(&self, locator: &str) -> Result<bool, DriverError>;

    /// 清空后填入文本
    async fn fill(&self, locator: &str, text: &str) -> Result<(), DriverError>;

    async fn click(&self, locator: &str) -> Result<(), DriverError>;

    /// 取元素的可见文本
    async fn text_of(&self, locator: &str) -> Result<String, DriverError>;

    /// 整页刷新
    async fn reload(&self) -> Result<(), DriverError>;

    /// 释放页面（以及自行启动的浏览器）
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// 页面驱动工厂
///
/// 驱动崩溃后，批处理通过工厂重新创建一个全新的驱动。
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError>;
}
