// ==========================================
// 服装生产数据接入平台 - 数据库 Schema 初始化
// ==========================================
// 职责: 建表语句集中管理（测试与初次建库共用）
// 说明: 所有时间列以 TEXT 存储（格式 %Y-%m-%d %H:%M:%S）
// ==========================================

use rusqlite::Connection;

/// 初始化全部业务表（IF NOT EXISTS，可重复调用）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS raw_import (
            id TEXT PRIMARY KEY,
            factory_id TEXT NOT NULL,
            line_id TEXT NOT NULL,
            file_path TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            original_filename TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            mime_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'uploaded',
            sheet_count INTEGER NOT NULL DEFAULT 0,
            failure_reason TEXT,
            match_report_json TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_raw_import_hash_line
            ON raw_import(content_hash, line_id);

        CREATE TABLE IF NOT EXISTS staging_record (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            raw_import_id TEXT NOT NULL REFERENCES raw_import(id) ON DELETE CASCADE,
            row_index INTEGER NOT NULL,
            cells_json TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_staging_import
            ON staging_record(raw_import_id, row_index);

        CREATE TABLE IF NOT EXISTS schema_mapping (
            id TEXT PRIMARY KEY,
            data_source_id TEXT NOT NULL,
            version_no INTEGER NOT NULL,
            columns_json TEXT NOT NULL,
            extraction_rules_json TEXT NOT NULL,
            confidence_summary REAL NOT NULL,
            human_reviewed INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            UNIQUE(data_source_id, version_no)
        );
        CREATE INDEX IF NOT EXISTS idx_schema_mapping_active
            ON schema_mapping(data_source_id, active);

        CREATE TABLE IF NOT EXISTS alias_mapping (
            id TEXT PRIMARY KEY,
            scope TEXT NOT NULL,
            scope_id TEXT NOT NULL,
            alias TEXT NOT NULL,
            canonical_field TEXT NOT NULL,
            usage_count INTEGER NOT NULL DEFAULT 0,
            last_used_at TEXT,
            correction_count INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            UNIQUE(scope, scope_id, alias)
        );

        CREATE TABLE IF NOT EXISTS production_record (
            id TEXT PRIMARY KEY,
            data_source_id TEXT NOT NULL,
            factory_id TEXT NOT NULL,
            production_date TEXT NOT NULL,
            shift TEXT NOT NULL DEFAULT 'day',
            style_number TEXT,
            -- 唯一键成员，缺失时以空串落库（SQLite 唯一索引对 NULL 不去重）
            po_number TEXT NOT NULL DEFAULT '',
            line_number TEXT,
            order_qty REAL,
            target_qty REAL,
            actual_qty REAL CHECK (actual_qty IS NULL OR actual_qty >= 0),
            defect_qty REAL CHECK (defect_qty IS NULL OR defect_qty >= 0),
            rework_qty REAL,
            efficiency_pct REAL,
            dhu REAL,
            operator_count REAL,
            working_hours REAL,
            remarks TEXT,
            source_import_id TEXT NOT NULL,
            source_row_index INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(po_number, data_source_id, production_date, shift)
        );
        CREATE INDEX IF NOT EXISTS idx_production_source_date
            ON production_record(data_source_id, production_date);
        "#,
    )?;
    Ok(())
}
