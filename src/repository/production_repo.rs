// ==========================================
// 服装生产数据接入平台 - 生产记录仓储
// ==========================================
// 职责: 晋升阶段的正式记录写入与时序查询
// 幂等性: 唯一键 (po_number, data_source_id, production_date, shift) 上 UPSERT
// ==========================================

use crate::domain::production::ProductionRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};

const DT_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub struct ProductionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在既有事务中 UPSERT 单条记录（晋升引擎在单事务内批量调用）
    pub fn upsert_tx(tx: &Transaction, record: &ProductionRecord) -> RepositoryResult<()> {
        tx.execute(
            r#"INSERT INTO production_record (
                id, data_source_id, factory_id, production_date, shift,
                style_number, po_number, line_number, order_qty, target_qty,
                actual_qty, defect_qty, rework_qty, efficiency_pct, dhu,
                operator_count, working_hours, remarks,
                source_import_id, source_row_index, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(po_number, data_source_id, production_date, shift) DO UPDATE SET
                style_number = excluded.style_number,
                line_number = excluded.line_number,
                order_qty = excluded.order_qty,
                target_qty = excluded.target_qty,
                actual_qty = excluded.actual_qty,
                defect_qty = excluded.defect_qty,
                rework_qty = excluded.rework_qty,
                efficiency_pct = excluded.efficiency_pct,
                dhu = excluded.dhu,
                operator_count = excluded.operator_count,
                working_hours = excluded.working_hours,
                remarks = excluded.remarks,
                source_import_id = excluded.source_import_id,
                source_row_index = excluded.source_row_index,
                updated_at = excluded.updated_at"#,
            params![
                &record.id,
                &record.data_source_id,
                &record.factory_id,
                record.production_date.format(DT_FMT).to_string(),
                &record.shift,
                &record.style_number,
                record.po_number.clone().unwrap_or_default(),
                &record.line_number,
                record.order_qty,
                record.target_qty,
                record.actual_qty,
                record.defect_qty,
                record.rework_qty,
                record.efficiency_pct,
                record.dhu,
                record.operator_count,
                record.working_hours,
                &record.remarks,
                &record.source_import_id,
                record.source_row_index as i64,
                record.created_at.format(DT_FMT).to_string(),
                record.updated_at.format(DT_FMT).to_string(),
            ],
        )?;
        Ok(())
    }

    /// 按数据源查询时序（按日期升序）
    pub fn find_by_data_source(
        &self,
        data_source_id: &str,
    ) -> RepositoryResult<Vec<ProductionRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, data_source_id, factory_id, production_date, shift,
                      style_number, po_number, line_number, order_qty, target_qty,
                      actual_qty, defect_qty, rework_qty, efficiency_pct, dhu,
                      operator_count, working_hours, remarks,
                      source_import_id, source_row_index, created_at, updated_at
                 FROM production_record
                WHERE data_source_id = ?
             ORDER BY production_date, po_number, shift"#,
        )?;
        let records = stmt
            .query_map(params![data_source_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 数据源内记录计数
    pub fn count_by_data_source(&self, data_source_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM production_record WHERE data_source_id = ?",
            params![data_source_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ProductionRecord> {
    let date_str: String = row.get(3)?;
    let po: String = row.get(6)?;
    Ok(ProductionRecord {
        id: row.get(0)?,
        data_source_id: row.get(1)?,
        factory_id: row.get(2)?,
        production_date: parse_dt_str(&date_str, 3)?,
        shift: row.get(4)?,
        style_number: row.get(5)?,
        po_number: if po.is_empty() { None } else { Some(po) },
        line_number: row.get(7)?,
        order_qty: row.get(8)?,
        target_qty: row.get(9)?,
        actual_qty: row.get(10)?,
        defect_qty: row.get(11)?,
        rework_qty: row.get(12)?,
        efficiency_pct: row.get(13)?,
        dhu: row.get(14)?,
        operator_count: row.get(15)?,
        working_hours: row.get(16)?,
        remarks: row.get(17)?,
        source_import_id: row.get(18)?,
        source_row_index: row.get::<_, i64>(19)? as usize,
        created_at: parse_dt_str(&row.get::<_, String>(20)?, 20)?,
        updated_at: parse_dt_str(&row.get::<_, String>(21)?, 21)?,
    })
}

fn parse_dt_str(s: &str, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DT_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
