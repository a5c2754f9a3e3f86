//! SQLite 存储 - 业务能力层
//!
//! 同一张表同时充当：
//! - 输入来源：`updated = 0` 的行
//! - 结果落地：按证件号更新 category / detail / information_date，并置 `updated = 1`
//! - 检查点：`updated = 1` 即终态；失败只记 last_status，永远不清除 updated

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::loaders::IdentifierSource;
use crate::models::{AttemptStatus, CheckpointRecord, Identifier, Resolution};
use crate::services::checkpoint::CheckpointTracker;
use crate::services::persistence::PersistenceSink;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite 存储
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteStore {
    /// 打开（必要时创建）数据库并建表
    pub async fn open(db_path: &Path) -> Result<Self> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::io(parent.display().to_string(), e))?;
            }
        }

        // 单写者
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&db_url)
            .await
            .map_err(AppError::from)?;

        if newly_created {
            info!("已创建新数据库: {}", db_path.display());
        } else {
            info!("已打开数据库: {}", db_path.display());
        }

        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;
        create_verifications_table(&pool).await?;

        Ok(Self {
            pool,
            path: db_path.to_path_buf(),
        })
    }

    /// 导入待核验证件号，已存在的行保持不变
    pub async fn insert_pending(&self, ids: &[Identifier]) -> Result<u64> {
        let mut inserted = 0;
        for id in ids {
            let result = sqlx::query("INSERT OR IGNORE INTO verifications (id_number, updated) VALUES (?, 0)")
                .bind(id.as_str())
                .execute(&self.pool)
                .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// 读取单个证件号的已记录结论
    pub async fn load_resolution(&self, identifier: &Identifier) -> Result<Option<StoredRow>> {
        let row = sqlx::query(
            "SELECT category, detail, updated, last_status FROM verifications WHERE id_number = ?",
        )
        .bind(identifier.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| StoredRow {
            category: row.get("category"),
            detail: row.get("detail"),
            updated: row.get::<i64, _>("updated") != 0,
            last_status: row.get("last_status"),
        }))
    }

    async fn upsert_resolution(&self, identifier: &Identifier, resolution: &Resolution, at: DateTime<Local>) -> Result<()> {
        let timestamp = at.format(TIMESTAMP_FORMAT).to_string();
        sqlx::query(
            r#"
            INSERT INTO verifications (id_number, category, detail, updated, information_date)
            VALUES (?, ?, ?, 1, ?)
            ON CONFLICT(id_number) DO UPDATE SET
                category = excluded.category,
                detail = excluded.detail,
                updated = 1,
                information_date = excluded.information_date
            "#,
        )
        .bind(identifier.as_str())
        .bind(resolution.category.as_str())
        .bind(&resolution.detail)
        .bind(&timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// 数据库中的一行（测试和排查用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub category: Option<String>,
    pub detail: Option<String>,
    pub updated: bool,
    pub last_status: Option<String>,
}

async fn create_verifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verifications (
            id_number TEXT PRIMARY KEY NOT NULL,
            category TEXT,
            detail TEXT,
            updated INTEGER NOT NULL DEFAULT 0,
            information_date TEXT,
            last_status TEXT,
            last_attempt_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_verifications_updated ON verifications(updated, information_date)")
        .execute(pool)
        .await?;

    Ok(())
}

#[async_trait]
impl IdentifierSource for SqliteStore {
    async fn load(&self) -> Result<Vec<Identifier>> {
        let rows = sqlx::query(
            "SELECT id_number FROM verifications WHERE updated = 0 ORDER BY information_date ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Identifier> = rows
            .iter()
            .filter_map(|row| Identifier::new(row.get::<String, _>("id_number")))
            .collect();
        info!("数据库中有 {} 个未更新的证件号", ids.len());
        Ok(ids)
    }

    fn describe(&self) -> String {
        format!("SQLite {}", self.path.display())
    }
}

#[async_trait]
impl PersistenceSink for SqliteStore {
    async fn record(&self, identifier: &Identifier, resolution: &Resolution, at: DateTime<Local>) -> Result<()> {
        self.upsert_resolution(identifier, resolution, at).await?;
        info!(
            "数据库已更新 ID {}: Category = {}, Detail = {}",
            identifier, resolution.category, resolution.detail
        );
        Ok(())
    }

    async fn finish(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("SQLite {}", self.path.display())
    }
}

#[async_trait]
impl CheckpointTracker for SqliteStore {
    async fn completed(&self) -> Result<HashSet<Identifier>> {
        let rows = sqlx::query("SELECT id_number FROM verifications WHERE updated = 1")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| Identifier::new(row.get::<String, _>("id_number")))
            .collect())
    }

    async fn record(&self, record: &CheckpointRecord) -> Result<()> {
        let timestamp = record.attempted_at.format(TIMESTAMP_FORMAT).to_string();

        if let AttemptStatus::Resolved(category) = &record.status {
            let resolution = Resolution {
                category: *category,
                detail: record.detail.clone(),
            };
            self.upsert_resolution(&record.identifier, &resolution, record.attempted_at)
                .await?;
        }

        // 非终态只更新尝试信息，updated 保持原值
        sqlx::query(
            r#"
            INSERT INTO verifications (id_number, updated, last_status, last_attempt_at)
            VALUES (?, 0, ?, ?)
            ON CONFLICT(id_number) DO UPDATE SET
                last_status = excluded.last_status,
                last_attempt_at = excluded.last_attempt_at
            "#,
        )
        .bind(record.identifier.as_str())
        .bind(record.status.label())
        .bind(&timestamp)
        .execute(&self.pool)
        .await?;

        debug!("检查点已记录: {} -> {}", record.identifier, record.status.label());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("数据库标志位 {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Outcome, TransientReason};

    fn id(raw: &str) -> Identifier {
        Identifier::new(raw).unwrap()
    }

    async fn open_temp() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("gov.db")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_open_directory_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SqliteStore::open(dir.path()).await.err().unwrap();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Store(_))));
    }

    #[tokio::test]
    async fn test_source_returns_only_unupdated() {
        let (_dir, store) = open_temp().await;
        store.insert_pending(&[id("A"), id("B"), id("C")]).await.unwrap();

        let resolution = Resolution {
            category: Category::NoMatch,
            detail: "B - Not a Public Servant".to_string(),
        };
        PersistenceSink::record(&store, &id("B"), &resolution, Local::now())
            .await
            .unwrap();

        let ids = IdentifierSource::load(&store).await.unwrap();
        assert_eq!(ids, vec![id("A"), id("C")]);
    }

    #[tokio::test]
    async fn test_transient_record_is_not_terminal() {
        let (_dir, store) = open_temp().await;
        store.insert_pending(&[id("A")]).await.unwrap();

        let record = CheckpointRecord::from_outcome(&id("A"), &Outcome::transient(TransientReason::Timeout), Local::now());
        CheckpointTracker::record(&store, &record).await.unwrap();

        assert!(store.completed().await.unwrap().is_empty());
        let row = store.load_resolution(&id("A")).await.unwrap().unwrap();
        assert!(!row.updated);
        assert_eq!(row.last_status.as_deref(), Some("Transient:Timeout"));
    }

    #[tokio::test]
    async fn test_failure_never_clears_terminal_flag() {
        let (_dir, store) = open_temp().await;

        let resolved = CheckpointRecord::from_outcome(&id("A"), &Outcome::resolved(Category::MatchFound, "Health: Nursing"), Local::now());
        CheckpointTracker::record(&store, &resolved).await.unwrap();

        let failed = CheckpointRecord::from_outcome(&id("A"), &Outcome::fatal("crashed"), Local::now());
        CheckpointTracker::record(&store, &failed).await.unwrap();

        let pending = store.pending_set(vec![id("A"), id("B")]).await.unwrap();
        assert_eq!(pending.to_vec(), vec![id("B")]);

        let row = store.load_resolution(&id("A")).await.unwrap().unwrap();
        assert!(row.updated);
        assert_eq!(row.category.as_deref(), Some("MatchFound"));
        assert_eq!(row.detail.as_deref(), Some("Health: Nursing"));
    }

    #[tokio::test]
    async fn test_reopen_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gov.db");
        {
            let store = SqliteStore::open(&path).await.unwrap();
            let record = CheckpointRecord::from_outcome(&id("A"), &Outcome::resolved(Category::NoMatch, "A - Not a Public Servant"), Local::now());
            CheckpointTracker::record(&store, &record).await.unwrap();
            store.finish().await.unwrap();
        }

        let store = SqliteStore::open(&path).await.unwrap();
        assert!(store.completed().await.unwrap().contains(&id("A")));
    }
}
