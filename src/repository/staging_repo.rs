// ==========================================
// 服装生产数据接入平台 - 暂存行仓储
// ==========================================
// 职责: StagingRecord 的批量替换与读取
// 幂等性: 重新解析同一导入时整体替换旧暂存行
// ==========================================

use crate::domain::import::{CellValue, StagingRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct StagingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StagingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 整体替换某导入的暂存行（单事务：删旧 + 批量插入）
    pub fn replace_for_import(
        &self,
        raw_import_id: &str,
        rows: &[(usize, Vec<CellValue>)],
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            "DELETE FROM staging_record WHERE raw_import_id = ?",
            params![raw_import_id],
        )?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO staging_record (raw_import_id, row_index, cells_json) VALUES (?, ?, ?)",
            )?;
            for (row_index, cells) in rows {
                let cells_json = serde_json::to_string(cells)?;
                stmt.execute(params![raw_import_id, *row_index as i64, cells_json])?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }

    /// 按行序读取暂存行（limit = 0 表示不限）
    pub fn find_for_import(
        &self,
        raw_import_id: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<StagingRecord>> {
        let conn = self.get_conn()?;
        let sql = if limit > 0 {
            format!(
                "SELECT id, raw_import_id, row_index, cells_json FROM staging_record \
                 WHERE raw_import_id = ? ORDER BY row_index LIMIT {}",
                limit
            )
        } else {
            "SELECT id, raw_import_id, row_index, cells_json FROM staging_record \
             WHERE raw_import_id = ? ORDER BY row_index"
                .to_string()
        };

        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![raw_import_id], |row| {
                let cells_json: String = row.get(3)?;
                let cells: Vec<CellValue> = serde_json::from_str(&cells_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(StagingRecord {
                    id: row.get(0)?,
                    raw_import_id: row.get(1)?,
                    row_index: row.get::<_, i64>(2)? as usize,
                    cells,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 暂存行计数
    pub fn count_for_import(&self, raw_import_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM staging_record WHERE raw_import_id = ?",
            params![raw_import_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
