// ==========================================
// 服装生产数据接入平台 - 导入实体
// ==========================================
// 职责: RawImport / StagingRecord / 单元格值 / 列匹配结果
// ==========================================

use crate::domain::types::{CanonicalType, ImportStatus, IssueSeverity, MappingStatus, MatchTier};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// RawImport - 一次上传的原始文件
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawImport {
    pub id: String,
    pub factory_id: String,
    /// 产线标识，同时作为数据源（data source）标识
    pub line_id: String,
    pub file_path: String,
    /// SHA-256 内容哈希（上传去重依据）
    pub content_hash: String,
    pub original_filename: String,
    pub file_size: u64,
    pub mime_type: String,
    pub status: ImportStatus,
    pub sheet_count: i32,
    /// 解析失败原因（status = failed 时填充）
    pub failure_reason: Option<String>,
    /// 解析阶段产生的列匹配报告快照（JSON，确认阶段用于识别用户纠正）
    pub match_report_json: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RawImport {
    pub fn new(
        factory_id: &str,
        line_id: &str,
        file_path: &str,
        content_hash: &str,
        original_filename: &str,
        file_size: u64,
        mime_type: &str,
    ) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            factory_id: factory_id.to_string(),
            line_id: line_id.to_string(),
            file_path: file_path.to_string(),
            content_hash: content_hash.to_string(),
            original_filename: original_filename.to_string(),
            file_size,
            mime_type: mime_type.to_string(),
            status: ImportStatus::Uploaded,
            sheet_count: 0,
            failure_reason: None,
            match_report_json: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ==========================================
// CellValue - 解析后的单元格值
// ==========================================
// CSV 全部为 Text；Excel 保留原生类型供日期解析第一层使用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
    Bool(bool),
}

impl CellValue {
    /// 空白判定（空串/纯空白视同 Empty）
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 展示用文本（预览/样本值）
    pub fn display_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

// ==========================================
// StagingRecord - 暂存行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingRecord {
    pub id: i64,
    pub raw_import_id: String,
    /// 原文件中的行号（0 基，含表头前的行）
    pub row_index: usize,
    /// 原始单元格值（按列序）
    pub cells: Vec<CellValue>,
}

// ==========================================
// ColumnMappingResult - 单列匹配结果（瞬态，不落库）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMappingResult {
    pub source_header: String,
    pub target_field: Option<String>,
    /// 置信度，构造时校验 [0,1]
    confidence: f64,
    pub tier: MatchTier,
    pub fuzzy_score: Option<f64>,
    pub reasoning: Option<String>,
    pub sample_values: Vec<String>,
    pub status: MappingStatus,
}

impl ColumnMappingResult {
    /// 构造并校验置信度范围，超出 [0,1] 即失败
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_header: &str,
        target_field: Option<String>,
        confidence: f64,
        tier: MatchTier,
        fuzzy_score: Option<f64>,
        reasoning: Option<String>,
        sample_values: Vec<String>,
        status: MappingStatus,
    ) -> Result<Self, String> {
        if !(0.0..=1.0).contains(&confidence) || confidence.is_nan() {
            return Err(format!(
                "置信度超出范围 [0,1]: {} (列 {})",
                confidence, source_header
            ));
        }
        Ok(Self {
            source_header: source_header.to_string(),
            target_field,
            confidence,
            tier,
            fuzzy_score,
            reasoning,
            sample_values,
            status,
        })
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

// ==========================================
// MatchReport - 一次编排运行的聚合结果
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchStats {
    pub hash: usize,
    pub fuzzy: usize,
    pub llm: usize,
    pub unmatched: usize,
    pub auto_mapped: usize,
    pub needs_review: usize,
    pub needs_attention: usize,
    pub ignored: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub header_row_index: usize,
    pub columns: Vec<ColumnMappingResult>,
    pub stats: MatchStats,
}

impl MatchReport {
    pub fn new(header_row_index: usize, columns: Vec<ColumnMappingResult>) -> Self {
        let mut stats = MatchStats::default();
        for col in &columns {
            match col.tier {
                MatchTier::Hash => stats.hash += 1,
                MatchTier::Fuzzy => stats.fuzzy += 1,
                MatchTier::Llm => stats.llm += 1,
                MatchTier::Unmatched => stats.unmatched += 1,
                MatchTier::Manual => {}
            }
            match col.status {
                MappingStatus::AutoMapped => stats.auto_mapped += 1,
                MappingStatus::NeedsReview => stats.needs_review += 1,
                MappingStatus::NeedsAttention => stats.needs_attention += 1,
                MappingStatus::Ignored => stats.ignored += 1,
            }
        }
        Self {
            header_row_index,
            columns,
            stats,
        }
    }
}

// ==========================================
// DataQualityIssue - 结构化数据质量问题
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityIssue {
    pub row_index: usize,
    pub field: String,
    pub severity: IssueSeverity,
    pub message: String,
    /// 触发问题的原始值（便于追溯）
    pub raw_value: Option<String>,
}

// ==========================================
// 类型推断辅助
// ==========================================
/// 从样本值推断列值类型（供分类器提示与清洗使用）
pub fn infer_sample_type(samples: &[String]) -> CanonicalType {
    let non_blank: Vec<&String> = samples.iter().filter(|s| !s.trim().is_empty()).collect();
    if non_blank.is_empty() {
        return CanonicalType::Text;
    }
    let pct = non_blank.iter().filter(|s| s.trim().ends_with('%')).count();
    if pct * 2 > non_blank.len() {
        return CanonicalType::Percentage;
    }
    let numeric = non_blank
        .iter()
        .filter(|s| s.trim().replace(',', "").parse::<f64>().is_ok())
        .count();
    if numeric == non_blank.len() {
        return CanonicalType::Numeric;
    }
    CanonicalType::Text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let r = ColumnMappingResult::new(
            "qty",
            Some("actual_qty".to_string()),
            1.2,
            MatchTier::Hash,
            None,
            None,
            vec![],
            MappingStatus::AutoMapped,
        );
        assert!(r.is_err());

        let r = ColumnMappingResult::new(
            "qty",
            None,
            -0.1,
            MatchTier::Unmatched,
            None,
            None,
            vec![],
            MappingStatus::NeedsAttention,
        );
        assert!(r.is_err());
    }

    #[test]
    fn test_match_report_stats() {
        let cols = vec![
            ColumnMappingResult::new(
                "date",
                Some("production_date".to_string()),
                1.0,
                MatchTier::Hash,
                None,
                None,
                vec![],
                MappingStatus::AutoMapped,
            )
            .unwrap(),
            ColumnMappingResult::new(
                "qtyy",
                Some("actual_qty".to_string()),
                0.7,
                MatchTier::Fuzzy,
                Some(0.7),
                None,
                vec![],
                MappingStatus::NeedsReview,
            )
            .unwrap(),
            ColumnMappingResult::new(
                "misc",
                None,
                0.0,
                MatchTier::Unmatched,
                None,
                None,
                vec![],
                MappingStatus::NeedsAttention,
            )
            .unwrap(),
        ];
        let report = MatchReport::new(0, cols);
        assert_eq!(report.stats.hash, 1);
        assert_eq!(report.stats.fuzzy, 1);
        assert_eq!(report.stats.unmatched, 1);
        assert_eq!(report.stats.auto_mapped, 1);
        assert_eq!(report.stats.needs_review, 1);
        assert_eq!(report.stats.needs_attention, 1);
    }

    #[test]
    fn test_infer_sample_type() {
        assert_eq!(
            infer_sample_type(&["85%".to_string(), "90%".to_string()]),
            CanonicalType::Percentage
        );
        assert_eq!(
            infer_sample_type(&["1,200".to_string(), "500".to_string()]),
            CanonicalType::Numeric
        );
        assert_eq!(
            infer_sample_type(&["ST-001".to_string()]),
            CanonicalType::Text
        );
    }

    #[test]
    fn test_cell_value_blank() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::Text("   ".to_string()).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }
}
