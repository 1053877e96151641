// ==========================================
// 服装生产数据接入平台 - 学习别名仓储
// ==========================================
// 职责: AliasMapping 的作用域链查找、使用计数、纠正学习
// 不变量: (scope, scope_id, alias) 唯一；纠正达阈值自动停用
// ==========================================

use crate::domain::mapping::{AliasMapping, ALIAS_CORRECTION_DISABLE_THRESHOLD};
use crate::domain::types::AliasScope;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const DT_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub struct AliasRepository {
    conn: Arc<Mutex<Connection>>,
}

/// 一次学习操作的结论（日志与测试用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnOutcome {
    /// 新别名入库
    Inserted,
    /// 已有别名指向同一字段，仅复用
    Reaffirmed,
    /// 已有别名被改指到新字段（计一次纠正）
    Corrected,
    /// 纠正次数达阈值，别名已停用
    Disabled,
}

impl AliasRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按作用域链查找别名：factory > organization > global，仅取 active 行
    pub fn find_for_scope_chain(
        &self,
        alias: &str,
        factory_id: &str,
        organization_id: &str,
    ) -> RepositoryResult<Option<AliasMapping>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, scope, scope_id, alias, canonical_field, usage_count,
                      last_used_at, correction_count, active, created_at
                 FROM alias_mapping
                WHERE alias = ? AND active = 1
                  AND (
                        (scope = 'factory' AND scope_id = ?)
                     OR (scope = 'organization' AND scope_id = ?)
                     OR (scope = 'global')
                      )
             ORDER BY CASE scope
                        WHEN 'factory' THEN 0
                        WHEN 'organization' THEN 1
                        ELSE 2
                      END
                LIMIT 1"#,
        )?;

        let mut rows = stmt.query_map(params![alias, factory_id, organization_id], map_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// 记录一次命中（使用计数 + 最近使用时间）
    pub fn record_usage(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE alias_mapping SET usage_count = usage_count + 1, last_used_at = ? WHERE id = ?",
            params![Utc::now().naive_utc().format(DT_FMT).to_string(), id],
        )?;
        Ok(())
    }

    /// 学习（或纠正）一条别名
    ///
    /// 规则：
    /// - 不存在 → 插入新别名（usage_count 从 0 起，仅作用域链命中时累计）
    /// - 存在且指向相同字段 → 复用（usage_count + 1）
    /// - 存在且指向不同字段 → 改指新字段并 correction_count + 1；
    ///   达到阈值（3）即停用，后续匹配不再返回该别名
    pub fn learn(
        &self,
        scope: AliasScope,
        scope_id: &str,
        alias: &str,
        canonical_field: &str,
    ) -> RepositoryResult<LearnOutcome> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let existing: Option<(String, String, i32)> = match tx.query_row(
            r#"SELECT id, canonical_field, correction_count FROM alias_mapping
                WHERE scope = ? AND scope_id = ? AND alias = ?"#,
            params![scope.to_db_str(), scope_id, alias],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        ) {
            Ok(v) => Some(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now().naive_utc().format(DT_FMT).to_string();
        let outcome = match existing {
            None => {
                tx.execute(
                    r#"INSERT INTO alias_mapping (
                        id, scope, scope_id, alias, canonical_field,
                        usage_count, last_used_at, correction_count, active, created_at
                    ) VALUES (?, ?, ?, ?, ?, 0, NULL, 0, 1, ?)"#,
                    params![
                        Uuid::new_v4().to_string(),
                        scope.to_db_str(),
                        scope_id,
                        alias,
                        canonical_field,
                        &now,
                    ],
                )?;
                LearnOutcome::Inserted
            }
            Some((id, field, corrections)) if field == canonical_field => {
                tx.execute(
                    "UPDATE alias_mapping SET usage_count = usage_count + 1, last_used_at = ? WHERE id = ?",
                    params![&now, &id],
                )?;
                let _ = corrections;
                LearnOutcome::Reaffirmed
            }
            Some((id, _field, corrections)) => {
                let new_count = corrections + 1;
                let disable = new_count >= ALIAS_CORRECTION_DISABLE_THRESHOLD;
                tx.execute(
                    r#"UPDATE alias_mapping
                          SET canonical_field = ?, correction_count = ?,
                              active = ?, last_used_at = ?
                        WHERE id = ?"#,
                    params![canonical_field, new_count, !disable as i32, &now, &id],
                )?;
                if disable {
                    LearnOutcome::Disabled
                } else {
                    LearnOutcome::Corrected
                }
            }
        };

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(outcome)
    }

    /// 作用域内的使用统计（供外部跨作用域提升决策使用）
    pub fn usage_stats(
        &self,
        scope: AliasScope,
        scope_id: &str,
    ) -> RepositoryResult<Vec<AliasMapping>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, scope, scope_id, alias, canonical_field, usage_count,
                      last_used_at, correction_count, active, created_at
                 FROM alias_mapping
                WHERE scope = ? AND scope_id = ?
             ORDER BY usage_count DESC"#,
        )?;
        let aliases = stmt
            .query_map(params![scope.to_db_str(), scope_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(aliases)
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<AliasMapping> {
    let scope_str: String = row.get(1)?;
    let last_used: Option<String> = row.get(6)?;
    let created_at_str: String = row.get(9)?;
    Ok(AliasMapping {
        id: row.get(0)?,
        scope: AliasScope::from_db_str(&scope_str),
        scope_id: row.get(2)?,
        alias: row.get(3)?,
        canonical_field: row.get(4)?,
        usage_count: row.get(5)?,
        last_used_at: last_used.and_then(|s| NaiveDateTime::parse_from_str(&s, DT_FMT).ok()),
        correction_count: row.get(7)?,
        active: row.get::<_, i32>(8)? != 0,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, DT_FMT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?,
    })
}
