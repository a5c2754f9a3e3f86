//! 单次核验的结果与会话状态

use serde::{Deserialize, Serialize};
use std::fmt;

/// 核验结论类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// 查询到记录（公务员）
    MatchFound,
    /// 查询不到记录
    NoMatch,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::MatchFound => "MatchFound",
            Category::NoMatch => "NoMatch",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 可恢复失败的原因，下一轮会重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransientReason {
    /// 等待响应超时
    Timeout,
    /// 填写 / 提交 / 重置时找不到预期元素
    ElementNotFound,
    /// 响应到了，但两个面板都不存在
    ResponseNotFound,
}

impl TransientReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransientReason::Timeout => "Timeout",
            TransientReason::ElementNotFound => "ElementNotFound",
            TransientReason::ResponseNotFound => "ResponseNotFound",
        }
    }
}

impl fmt::Display for TransientReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 不可恢复失败：当前会话对象已经不能再用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalReason {
    DriverError(String),
}

impl fmt::Display for FatalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalReason::DriverError(msg) => write!(f, "DriverError: {}", msg),
        }
    }
}

/// 已确定的核验结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub category: Category,
    pub detail: String,
}

/// 单个证件号一次尝试的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Resolved { category: Category, detail: String },
    TransientFailure { reason: TransientReason },
    FatalFailure { reason: FatalReason },
}

impl Outcome {
    pub fn resolved(category: Category, detail: impl Into<String>) -> Self {
        Outcome::Resolved {
            category,
            detail: detail.into(),
        }
    }

    pub fn transient(reason: TransientReason) -> Self {
        Outcome::TransientFailure { reason }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Outcome::FatalFailure {
            reason: FatalReason::DriverError(message.into()),
        }
    }

    /// 只有 Resolved 会阻止后续重新处理
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::Resolved { .. })
    }

    pub fn resolution(&self) -> Option<Resolution> {
        match self {
            Outcome::Resolved { category, detail } => Some(Resolution {
                category: *category,
                detail: detail.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Resolved { category, detail } => write!(f, "{} ({})", category, detail),
            Outcome::TransientFailure { reason } => write!(f, "TransientFailure: {}", reason),
            Outcome::FatalFailure { reason } => write!(f, "FatalFailure: {}", reason),
        }
    }
}

/// 页面交互状态机的当前阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    FormReady,
    Filled,
    Submitted,
    AwaitingResponse,
    ResponseReceived,
    Resetting,
    /// 本次尝试卡住，下一次 run 前需要恢复
    Stuck,
}

impl SessionState {
    /// 页面处于提交中途，不能直接接受下一次填写
    pub fn is_mid_submission(&self) -> bool {
        matches!(self, SessionState::Submitted | SessionState::AwaitingResponse)
    }
}
