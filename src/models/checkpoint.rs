use chrono::{DateTime, Local};

use crate::models::identifier::Identifier;
use crate::models::outcome::{Category, Outcome, TransientReason};

/// 一次尝试的持久化状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    Resolved(Category),
    Transient(TransientReason),
    Fatal,
}

impl AttemptStatus {
    pub fn label(&self) -> String {
        match self {
            AttemptStatus::Resolved(category) => format!("Resolved:{}", category),
            AttemptStatus::Transient(reason) => format!("Transient:{}", reason),
            AttemptStatus::Fatal => "Fatal".to_string(),
        }
    }
}

/// "证件号 X 在时间 T 以结果 O 被尝试过" 这一持久事实
///
/// 断点续跑的唯一依据。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    pub identifier: Identifier,
    pub status: AttemptStatus,
    /// Resolved 时是结论详情，失败时是原因描述
    pub detail: String,
    pub attempted_at: DateTime<Local>,
}

impl CheckpointRecord {
    pub fn from_outcome(identifier: &Identifier, outcome: &Outcome, attempted_at: DateTime<Local>) -> Self {
        let (status, detail) = match outcome {
            Outcome::Resolved { category, detail } => (AttemptStatus::Resolved(*category), detail.clone()),
            Outcome::TransientFailure { reason } => {
                (AttemptStatus::Transient(*reason), reason.to_string())
            }
            Outcome::FatalFailure { reason } => (AttemptStatus::Fatal, reason.to_string()),
        };

        Self {
            identifier: identifier.clone(),
            status,
            detail,
            attempted_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, AttemptStatus::Resolved(_))
    }
}
