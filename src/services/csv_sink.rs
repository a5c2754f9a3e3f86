//! CSV 结果写入服务 - 业务能力层
//!
//! 每条结论追加一行并立即 flush，先落盘再推进到下一个证件号。
//! 以证件号为键：同一证件号再次写入时替换旧行，文件里每个证件号最多一行。

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::{Identifier, Resolution};
use crate::services::persistence::PersistenceSink;

const HEADER: [&str; 4] = ["ID_Number", "Category", "Detail", "Timestamp"];

/// 已打开的结果文件
struct OpenFile {
    writer: csv::Writer<File>,
    /// 文件中已有的证件号
    recorded: HashSet<String>,
}

/// CSV 结果写入
pub struct CsvSink {
    path: PathBuf,
    file: Mutex<Option<OpenFile>>,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }

    /// 第一次写入时才打开文件，并记下上一轮已写过的证件号
    fn open_file(&self) -> Result<OpenFile> {
        let recorded = self.existing_ids()?;
        let writer = self.append_writer()?;
        Ok(OpenFile { writer, recorded })
    }

    fn existing_ids(&self) -> Result<HashSet<String>> {
        let is_empty = std::fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        if is_empty {
            return Ok(HashSet::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| AppError::csv(self.path_str(), e))?;

        let mut ids = HashSet::new();
        for record in reader.records() {
            let record = record.map_err(|e| AppError::csv(self.path_str(), e))?;
            if let Some(id) = record.get(0) {
                ids.insert(id.to_string());
            }
        }
        Ok(ids)
    }

    /// 追加模式打开，新文件先写表头
    fn append_writer(&self) -> Result<csv::Writer<File>> {
        let is_new = std::fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("无法打开结果文件: {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer
                .write_record(HEADER)
                .map_err(|e| AppError::csv(self.path_str(), e))?;
            writer.flush().map_err(|e| AppError::io(self.path_str(), e))?;
        }
        Ok(writer)
    }

    /// 去掉该证件号的旧行，把新行写在末尾；先写临时文件再替换
    fn replace_row(&self, row: &[&str; 4]) -> Result<()> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| AppError::csv(self.path_str(), e))?;

        let tmp_path = self.path.with_extension("csv.tmp");
        let mut writer = csv::Writer::from_path(&tmp_path)
            .map_err(|e| AppError::csv(tmp_path.display().to_string(), e))?;
        writer
            .write_record(HEADER)
            .map_err(|e| AppError::csv(self.path_str(), e))?;

        for record in reader.records() {
            let record = record.map_err(|e| AppError::csv(self.path_str(), e))?;
            if record.get(0) != Some(row[0]) {
                writer
                    .write_record(&record)
                    .map_err(|e| AppError::csv(self.path_str(), e))?;
            }
        }
        writer
            .write_record(row)
            .map_err(|e| AppError::csv(self.path_str(), e))?;
        writer.flush().map_err(|e| AppError::io(self.path_str(), e))?;
        drop(writer);

        std::fs::rename(&tmp_path, &self.path).map_err(|e| AppError::io(self.path_str(), e))?;
        Ok(())
    }
}

#[async_trait]
impl PersistenceSink for CsvSink {
    async fn record(&self, identifier: &Identifier, resolution: &Resolution, at: DateTime<Local>) -> Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("结果文件写入锁已损坏"))?;

        if guard.is_none() {
            *guard = Some(self.open_file()?);
        }
        if let Some(open) = guard.as_mut() {
            let timestamp = at.format("%Y-%m-%d %H:%M:%S").to_string();
            let row = [
                identifier.as_str(),
                resolution.category.as_str(),
                resolution.detail.as_str(),
                timestamp.as_str(),
            ];

            if open.recorded.contains(identifier.as_str()) {
                warn!("结果文件中已有 {}，替换旧行", identifier);
                open.writer.flush().map_err(|e| AppError::io(self.path_str(), e))?;
                self.replace_row(&row)?;
                // 旧句柄指向被替换的文件，重新打开
                open.writer = self.append_writer()?;
            } else {
                open.writer
                    .write_record(row)
                    .map_err(|e| AppError::csv(self.path_str(), e))?;
                open.writer.flush().map_err(|e| AppError::io(self.path_str(), e))?;
                open.recorded.insert(identifier.as_str().to_string());
            }
        }

        debug!("已写入结果: {} -> {}", identifier, resolution.category);
        Ok(())
    }

    async fn finish(&self) -> Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("结果文件写入锁已损坏"))?;
        if let Some(mut open) = guard.take() {
            open.writer.flush()?;
            info!("结果已保存至: {}", self.path.display());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("CSV 文件 {}", self.path.display())
    }
}
