//! 错误类型
//!
//! 页面层错误（`DriverError`）定义在 `infrastructure::page_driver`，
//! 这里只放基础设施错误：配置、存储、文件、CSV。
//! 业务上的失败（超时、元素缺失、驱动崩溃）不是错误，而是 `Outcome` 的变体。

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 数据库错误
    #[error("数据库错误: {0}")]
    Store(#[from] sqlx::Error),

    /// 文件操作错误
    #[error("文件错误 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV 读写错误
    #[error("CSV错误 ({path}): {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },

    /// 配置文件读取或解析失败
    #[error("配置文件 {path} 无效: {message}")]
    InvalidFile { path: String, message: String },

    /// 配置项组合不合法
    #[error("配置项不合法: {0}")]
    Invalid(String),
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件错误
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// 创建 CSV 错误
    pub fn csv(path: impl Into<String>, source: csv::Error) -> Self {
        AppError::Csv {
            path: path.into(),
            source,
        }
    }
}
