//! 核验上下文
//!
//! 封装"我正在处理第几个证件号"这一信息

use std::fmt::Display;

use crate::models::Identifier;

/// 单个证件号的处理上下文
#[derive(Debug, Clone)]
pub struct VerifyCtx {
    /// 证件号
    pub identifier: Identifier,

    /// 在本轮待处理集合中的序号（从1开始，仅用于日志显示）
    pub index: usize,

    /// 本轮待处理总数
    pub total: usize,
}

impl VerifyCtx {
    pub fn new(identifier: Identifier, index: usize, total: usize) -> Self {
        Self {
            identifier,
            index,
            total,
        }
    }
}

impl Display for VerifyCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[ID {}/{} #{}]", self.index, self.total, self.identifier)
    }
}
