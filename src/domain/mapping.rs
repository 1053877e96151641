// ==========================================
// 服装生产数据接入平台 - 映射配置实体
// ==========================================
// 职责: SchemaMapping（版本化映射配置）/ AliasMapping（学习别名）
// 红线: 映射版本创建后不可变，仅 active 标志与纠正计数可更新
// ==========================================

use crate::domain::types::{AliasScope, MatchTier};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 学习别名自动停用阈值：纠正次数达到该值后不再参与匹配
pub const ALIAS_CORRECTION_DISABLE_THRESHOLD: i32 = 3;

// ==========================================
// 列映射条目（schema_mapping.column_mappings 的 JSON 单元）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapEntry {
    pub source_header: String,
    /// None 表示该列被用户忽略
    pub target_field: Option<String>,
    pub tier: MatchTier,
    pub confidence: f64,
}

// ==========================================
// 提取规则（表头行/跳过行）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRules {
    pub header_row: usize,
    pub skip_rows: Vec<usize>,
    /// 指定时间列的源表头
    pub time_column: Option<String>,
    /// 时间列显式格式串（如 "YYYY-MM-DD"）
    pub time_format: Option<String>,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            header_row: 0,
            skip_rows: Vec::new(),
            time_column: None,
            time_format: None,
        }
    }
}

// ==========================================
// SchemaMapping - 版本化映射配置
// ==========================================
// 追加式日志：每个数据源同一时刻只有一个 active 版本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaMapping {
    pub id: String,
    pub data_source_id: String,
    pub version_no: i32,
    pub columns: Vec<ColumnMapEntry>,
    pub extraction_rules: ExtractionRules,
    /// 本版本整体置信度（列置信度均值）
    pub confidence_summary: f64,
    pub human_reviewed: bool,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

impl SchemaMapping {
    pub fn new(
        data_source_id: &str,
        columns: Vec<ColumnMapEntry>,
        extraction_rules: ExtractionRules,
        human_reviewed: bool,
    ) -> Self {
        let mapped: Vec<&ColumnMapEntry> =
            columns.iter().filter(|c| c.target_field.is_some()).collect();
        let confidence_summary = if mapped.is_empty() {
            0.0
        } else {
            mapped.iter().map(|c| c.confidence).sum::<f64>() / mapped.len() as f64
        };
        Self {
            id: Uuid::new_v4().to_string(),
            data_source_id: data_source_id.to_string(),
            version_no: 0, // 落库时在事务内分配
            columns,
            extraction_rules,
            confidence_summary,
            human_reviewed,
            active: true,
            created_at: Utc::now().naive_utc(),
        }
    }

    /// 源表头 → 标准字段 查找表（忽略列不出现）
    pub fn field_lookup(&self) -> HashMap<String, String> {
        self.columns
            .iter()
            .filter_map(|c| {
                c.target_field
                    .as_ref()
                    .map(|f| (c.source_header.clone(), f.clone()))
            })
            .collect()
    }
}

// ==========================================
// AliasMapping - 学习别名
// ==========================================
// 唯一性: (scope, scope_id, alias)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasMapping {
    pub id: String,
    pub scope: AliasScope,
    pub scope_id: String,
    /// 规范化后的源表头
    pub alias: String,
    pub canonical_field: String,
    pub usage_count: i64,
    pub last_used_at: Option<NaiveDateTime>,
    pub correction_count: i32,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

impl AliasMapping {
    pub fn new(scope: AliasScope, scope_id: &str, alias: &str, canonical_field: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            scope,
            scope_id: scope_id.to_string(),
            alias: alias.to_string(),
            canonical_field: canonical_field.to_string(),
            usage_count: 0,
            last_used_at: None,
            correction_count: 0,
            active: true,
            created_at: Utc::now().naive_utc(),
        }
    }
}

// ==========================================
// 作用域链（匹配查找用）
// ==========================================
#[derive(Debug, Clone)]
pub struct ScopeChain {
    pub factory_id: String,
    pub organization_id: String,
}
