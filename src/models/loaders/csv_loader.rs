use crate::error::AppError;
use crate::models::identifier::Identifier;
use crate::models::loaders::IdentifierSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// 从表格文件（CSV）读取证件号
pub struct CsvSource {
    path: PathBuf,
    id_column: String,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, id_column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id_column: id_column.into(),
        }
    }
}

#[async_trait]
impl IdentifierSource for CsvSource {
    async fn load(&self) -> Result<Vec<Identifier>> {
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| AppError::io(self.path.display().to_string(), e))?;

        let ids = parse_identifiers(&content, &self.id_column)
            .with_context(|| format!("无法解析CSV文件: {}", self.path.display()))?;

        tracing::info!(
            "从 {} 读取到 {} 个证件号",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            ids.len()
        );
        Ok(ids)
    }

    fn describe(&self) -> String {
        format!("CSV 文件 {}", self.path.display())
    }
}

/// 按列名取出证件号，空单元格跳过
fn parse_identifiers(content: &str, id_column: &str) -> Result<Vec<Identifier>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let column = headers
        .iter()
        .position(|h| h == id_column)
        .with_context(|| format!("找不到列 '{}'，现有列: {:?}", id_column, headers))?;

    let mut ids = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("第 {} 行格式错误", row + 2))?;
        match record.get(column).and_then(Identifier::new) {
            Some(id) => ids.push(id),
            None => tracing::debug!("第 {} 行证件号为空，跳过", row + 2),
        }
    }

    Ok(ids)
}
