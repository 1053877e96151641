// ==========================================
// 服装生产数据接入平台 - RawImport 仓储
// ==========================================
// 职责: 上传文件记录的增删查与状态迁移
// 并发控制: 状态迁移带前置状态守卫（乐观并发）
// ==========================================

use crate::domain::import::RawImport;
use crate::domain::types::ImportStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

const DT_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub struct RawImportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RawImportRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入上传记录
    pub fn create(&self, import: &RawImport) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO raw_import (
                id, factory_id, line_id, file_path, content_hash,
                original_filename, file_size, mime_type, status, sheet_count,
                failure_reason, match_report_json, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &import.id,
                &import.factory_id,
                &import.line_id,
                &import.file_path,
                &import.content_hash,
                &import.original_filename,
                import.file_size as i64,
                &import.mime_type,
                import.status.to_db_str(),
                import.sheet_count,
                &import.failure_reason,
                &import.match_report_json,
                import.created_at.format(DT_FMT).to_string(),
                import.updated_at.format(DT_FMT).to_string(),
            ],
        )?;
        Ok(import.id.clone())
    }

    /// 按 id 查询
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<RawImport>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            &format!("{} WHERE id = ?", SELECT_BASE),
            params![id],
            map_row,
        ) {
            Ok(import) => Ok(Some(import)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按内容哈希 + 产线查重（上传去重）
    pub fn find_by_hash_and_line(
        &self,
        content_hash: &str,
        line_id: &str,
    ) -> RepositoryResult<Option<RawImport>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            &format!("{} WHERE content_hash = ? AND line_id = ?", SELECT_BASE),
            params![content_hash, line_id],
            map_row,
        ) {
            Ok(import) => Ok(Some(import)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 状态迁移（带合法性检查与前置状态守卫）
    ///
    /// # 错误
    /// - `InvalidStateTransition`: 状态机不允许的迁移，或并发下前置状态已变化
    pub fn transition_status(
        &self,
        id: &str,
        from: ImportStatus,
        to: ImportStatus,
    ) -> RepositoryResult<()> {
        if !from.can_transition_to(to) {
            return Err(RepositoryError::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE raw_import SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
            params![
                to.to_db_str(),
                Utc::now().naive_utc().format(DT_FMT).to_string(),
                id,
                from.to_db_str(),
            ],
        )?;

        if rows == 0 {
            // 记录不存在，或前置状态已被并发修改
            let actual: Result<String, _> = conn.query_row(
                "SELECT status FROM raw_import WHERE id = ?",
                params![id],
                |row| row.get(0),
            );
            return match actual {
                Ok(actual_status) => Err(RepositoryError::InvalidStateTransition {
                    from: actual_status,
                    to: to.to_string(),
                }),
                Err(_) => Err(RepositoryError::NotFound {
                    entity: "RawImport".to_string(),
                    id: id.to_string(),
                }),
            };
        }
        Ok(())
    }

    /// 标记失败并记录原因（任意状态可达）
    pub fn mark_failed(&self, id: &str, reason: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE raw_import SET status = 'failed', failure_reason = ?, updated_at = ? WHERE id = ?",
            params![
                reason,
                Utc::now().naive_utc().format(DT_FMT).to_string(),
                id
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "RawImport".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// 解析完成后回写 sheet 数与匹配报告快照
    pub fn save_process_result(
        &self,
        id: &str,
        sheet_count: i32,
        match_report_json: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE raw_import SET sheet_count = ?, match_report_json = ?, updated_at = ? WHERE id = ?",
            params![
                sheet_count,
                match_report_json,
                Utc::now().naive_utc().format(DT_FMT).to_string(),
                id
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "RawImport".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// 删除导入记录（历史清理；staging 行随外键级联删除）
    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM raw_import WHERE id = ?", params![id])?;
        Ok(())
    }
}

const SELECT_BASE: &str = r#"SELECT id, factory_id, line_id, file_path, content_hash,
       original_filename, file_size, mime_type, status, sheet_count,
       failure_reason, match_report_json, created_at, updated_at
  FROM raw_import"#;

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<RawImport> {
    let status_str: String = row.get(8)?;
    Ok(RawImport {
        id: row.get(0)?,
        factory_id: row.get(1)?,
        line_id: row.get(2)?,
        file_path: row.get(3)?,
        content_hash: row.get(4)?,
        original_filename: row.get(5)?,
        file_size: row.get::<_, i64>(6)? as u64,
        mime_type: row.get(7)?,
        status: ImportStatus::from_db_str(&status_str),
        sheet_count: row.get(9)?,
        failure_reason: row.get(10)?,
        match_report_json: row.get(11)?,
        created_at: parse_dt(row, 12)?,
        updated_at: parse_dt(row, 13)?,
    })
}

fn parse_dt(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let s: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&s, DT_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
