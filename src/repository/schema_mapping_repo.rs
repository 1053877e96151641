// ==========================================
// 服装生产数据接入平台 - 映射版本仓储
// ==========================================
// 职责: SchemaMapping 追加式版本日志 + 单一 active 指针
// 红线: 版本创建与旧版本停用必须在同一事务内完成
// ==========================================

use crate::domain::mapping::{ColumnMapEntry, ExtractionRules, SchemaMapping};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

const DT_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SchemaMappingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SchemaMappingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建下一个版本并切换 active 指针
    ///
    /// 说明：
    /// - 在同一事务内查询 MAX(version_no)、停用旧 active、插入新行，
    ///   保证并发确认下 version_no 分配与“单一 active”不变量的原子性。
    /// - 该方法会覆盖传入的 `mapping.version_no`。
    pub fn create_next_version(&self, mapping: &mut SchemaMapping) -> RepositoryResult<String> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let max_version_no: Option<i32> = tx.query_row(
            "SELECT MAX(version_no) FROM schema_mapping WHERE data_source_id = ?",
            params![&mapping.data_source_id],
            |row| row.get(0),
        )?;
        mapping.version_no = max_version_no.unwrap_or(0) + 1;

        tx.execute(
            "UPDATE schema_mapping SET active = 0 WHERE data_source_id = ? AND active = 1",
            params![&mapping.data_source_id],
        )?;

        tx.execute(
            r#"INSERT INTO schema_mapping (
                id, data_source_id, version_no, columns_json, extraction_rules_json,
                confidence_summary, human_reviewed, active, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?)"#,
            params![
                &mapping.id,
                &mapping.data_source_id,
                mapping.version_no,
                serde_json::to_string(&mapping.columns)?,
                serde_json::to_string(&mapping.extraction_rules)?,
                mapping.confidence_summary,
                mapping.human_reviewed as i32,
                mapping.created_at.format(DT_FMT).to_string(),
            ],
        )?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        mapping.active = true;
        Ok(mapping.id.clone())
    }

    /// 查询数据源的 active 版本
    pub fn find_active(&self, data_source_id: &str) -> RepositoryResult<Option<SchemaMapping>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            &format!("{} WHERE data_source_id = ? AND active = 1", SELECT_BASE),
            params![data_source_id],
            map_row,
        ) {
            Ok(mapping) => Ok(Some(mapping)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按 id 查询
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<SchemaMapping>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            &format!("{} WHERE id = ?", SELECT_BASE),
            params![id],
            map_row,
        ) {
            Ok(mapping) => Ok(Some(mapping)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询数据源的全部版本（审计用，新版本在前）
    pub fn find_history(&self, data_source_id: &str) -> RepositoryResult<Vec<SchemaMapping>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE data_source_id = ? ORDER BY version_no DESC",
            SELECT_BASE
        ))?;
        let mappings = stmt
            .query_map(params![data_source_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(mappings)
    }
}

const SELECT_BASE: &str = r#"SELECT id, data_source_id, version_no, columns_json,
       extraction_rules_json, confidence_summary, human_reviewed, active, created_at
  FROM schema_mapping"#;

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<SchemaMapping> {
    let columns_json: String = row.get(3)?;
    let rules_json: String = row.get(4)?;
    let columns: Vec<ColumnMapEntry> = serde_json::from_str(&columns_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let extraction_rules: ExtractionRules = serde_json::from_str(&rules_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at_str: String = row.get(8)?;
    Ok(SchemaMapping {
        id: row.get(0)?,
        data_source_id: row.get(1)?,
        version_no: row.get(2)?,
        columns,
        extraction_rules,
        confidence_summary: row.get(5)?,
        human_reviewed: row.get::<_, i32>(6)? != 0,
        active: row.get::<_, i32>(7)? != 0,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, DT_FMT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?,
    })
}
