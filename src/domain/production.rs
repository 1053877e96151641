// ==========================================
// 服装生产数据接入平台 - 正式生产记录实体
// ==========================================
// 职责: 晋升（promote）阶段物化的标准化生产记录
// 唯一键: (po_number, data_source_id, production_date, shift)
// ==========================================

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub id: String,
    pub data_source_id: String,
    pub factory_id: String,
    pub production_date: NaiveDateTime,
    pub shift: String,
    pub style_number: Option<String>,
    pub po_number: Option<String>,
    pub line_number: Option<String>,
    pub order_qty: Option<f64>,
    pub target_qty: Option<f64>,
    pub actual_qty: Option<f64>,
    pub defect_qty: Option<f64>,
    pub rework_qty: Option<f64>,
    /// 效率，百分比口径（85% → 85.0）
    pub efficiency_pct: Option<f64>,
    /// 百件疵点数 (Defects per Hundred Units)
    pub dhu: Option<f64>,
    pub operator_count: Option<f64>,
    pub working_hours: Option<f64>,
    pub remarks: Option<String>,
    /// 来源追溯
    pub source_import_id: String,
    pub source_row_index: usize,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ProductionRecord {
    pub fn new(
        data_source_id: &str,
        factory_id: &str,
        production_date: NaiveDateTime,
        source_import_id: &str,
        source_row_index: usize,
    ) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            data_source_id: data_source_id.to_string(),
            factory_id: factory_id.to_string(),
            production_date,
            shift: "day".to_string(),
            style_number: None,
            po_number: None,
            line_number: None,
            order_qty: None,
            target_qty: None,
            actual_qty: None,
            defect_qty: None,
            rework_qty: None,
            efficiency_pct: None,
            dhu: None,
            operator_count: None,
            working_hours: None,
            remarks: None,
            source_import_id: source_import_id.to_string(),
            source_row_index,
            created_at: now,
            updated_at: now,
        }
    }
}
