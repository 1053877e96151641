// ==========================================
// 服装生产数据接入平台 - 领域类型定义
// ==========================================
// 职责: 导入生命周期状态、匹配层级、置信度分档等基础枚举
// 序列化格式: snake_case (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 导入生命周期状态 (Import Status)
// ==========================================
// 状态机: uploaded → processed → confirmed → promoted
// failed 可从任意状态进入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Uploaded,  // 已上传，文件已落盘
    Processed, // 已解析，暂存行与列匹配报告就绪
    Confirmed, // 映射已人工确认，版本已落库
    Promoted,  // 已物化为正式生产记录
    Failed,    // 不可恢复错误
}

impl ImportStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ImportStatus::Uploaded => "uploaded",
            ImportStatus::Processed => "processed",
            ImportStatus::Confirmed => "confirmed",
            ImportStatus::Promoted => "promoted",
            ImportStatus::Failed => "failed",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "uploaded" => ImportStatus::Uploaded,
            "processed" => ImportStatus::Processed,
            "confirmed" => ImportStatus::Confirmed,
            "promoted" => ImportStatus::Promoted,
            _ => ImportStatus::Failed,
        }
    }

    /// 状态机合法迁移判定
    pub fn can_transition_to(&self, next: ImportStatus) -> bool {
        use ImportStatus::*;
        match (self, next) {
            (_, Failed) => true,
            (Uploaded, Processed) => true,
            // 重新解析允许（幂等替换暂存行）
            (Processed, Processed) => true,
            (Processed, Confirmed) => true,
            // 重新确认允许（产生新映射版本）
            (Confirmed, Confirmed) => true,
            (Confirmed, Promoted) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 匹配层级 (Match Tier)
// ==========================================
// 瀑布式匹配: hash → fuzzy → llm，manual 为人工指定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Hash,      // 精确/别名表命中
    Fuzzy,     // 相似度匹配
    Llm,       // 语义分类器
    Manual,    // 用户手工指定
    Unmatched, // 全部层级未命中
}

impl MatchTier {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MatchTier::Hash => "hash",
            MatchTier::Fuzzy => "fuzzy",
            MatchTier::Llm => "llm",
            MatchTier::Manual => "manual",
            MatchTier::Unmatched => "unmatched",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "hash" => MatchTier::Hash,
            "fuzzy" => MatchTier::Fuzzy,
            "llm" => MatchTier::Llm,
            "manual" => MatchTier::Manual,
            _ => MatchTier::Unmatched,
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 列匹配结论分档 (Mapping Status)
// ==========================================
// 置信度分档: >=0.9 auto_mapped / 0.6~0.9 needs_review / 其余 needs_attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStatus {
    AutoMapped,
    NeedsReview,
    NeedsAttention,
    Ignored,
}

impl MappingStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MappingStatus::AutoMapped => "auto_mapped",
            MappingStatus::NeedsReview => "needs_review",
            MappingStatus::NeedsAttention => "needs_attention",
            MappingStatus::Ignored => "ignored",
        }
    }
}

impl fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 别名作用域 (Alias Scope)
// ==========================================
// 查找优先级: factory > organization > global
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasScope {
    Factory,
    Organization,
    Global,
}

impl AliasScope {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AliasScope::Factory => "factory",
            AliasScope::Organization => "organization",
            AliasScope::Global => "global",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "factory" => AliasScope::Factory,
            "organization" => AliasScope::Organization,
            _ => AliasScope::Global,
        }
    }
}

// ==========================================
// 数据质量等级 (Issue Severity)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueSeverity::Info => write!(f, "info"),
            IssueSeverity::Warning => write!(f, "warning"),
            IssueSeverity::Error => write!(f, "error"),
            IssueSeverity::Critical => write!(f, "critical"),
        }
    }
}

// ==========================================
// 标准字段值类型 (Canonical Value Type)
// ==========================================
// 用于清洗阶段的类型强制与样本类型推断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalType {
    Numeric,
    Date,
    Text,
    Percentage,
}

// ==========================================
// 日期解析层级 (Date Tier)
// ==========================================
// 诊断模式下随解析结果一并返回
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateTier {
    Native,      // 已是时间类型
    Format,      // 显式格式串严格解析
    ExcelSerial, // 电子表格序列号
    Heuristic,   // 自由文本启发式
    Failed,      // 全部层级失败
}

impl fmt::Display for DateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateTier::Native => write!(f, "native"),
            DateTier::Format => write!(f, "format"),
            DateTier::ExcelSerial => write!(f, "excel_serial"),
            DateTier::Heuristic => write!(f, "heuristic"),
            DateTier::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_status_roundtrip() {
        for s in [
            ImportStatus::Uploaded,
            ImportStatus::Processed,
            ImportStatus::Confirmed,
            ImportStatus::Promoted,
            ImportStatus::Failed,
        ] {
            assert_eq!(ImportStatus::from_db_str(s.to_db_str()), s);
        }
    }

    #[test]
    fn test_status_transition_rules() {
        assert!(ImportStatus::Uploaded.can_transition_to(ImportStatus::Processed));
        assert!(ImportStatus::Processed.can_transition_to(ImportStatus::Confirmed));
        assert!(ImportStatus::Confirmed.can_transition_to(ImportStatus::Promoted));
        assert!(ImportStatus::Promoted.can_transition_to(ImportStatus::Failed));
        // 不允许跳级或回退
        assert!(!ImportStatus::Uploaded.can_transition_to(ImportStatus::Promoted));
        assert!(!ImportStatus::Promoted.can_transition_to(ImportStatus::Confirmed));
    }

    #[test]
    fn test_match_tier_unknown_falls_back() {
        assert_eq!(MatchTier::from_db_str("something"), MatchTier::Unmatched);
    }
}
